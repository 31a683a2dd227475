use serde::{Deserialize, Serialize};

use super::world::Vec3;

pub const MAX_VITAL: f32 = 100.0;
pub const WALK_SPEED: f32 = 5.0;
pub const SPRINT_SPEED: f32 = 8.0;
/// Hunger lost per second
pub const HUNGER_RATE: f32 = 0.1;
/// Thirst lost per second
pub const THIRST_RATE: f32 = 0.15;
/// Health lost per second while starving or dehydrated
pub const STARVATION_DAMAGE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f32,
    pub hunger: f32,
    pub thirst: f32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: MAX_VITAL,
            hunger: MAX_VITAL,
            thirst: MAX_VITAL,
        }
    }
}

impl Vitals {
    /// Keep every vital inside `[0, MAX_VITAL]`
    pub fn clamped(self) -> Self {
        Self {
            health: self.health.clamp(0.0, MAX_VITAL),
            hunger: self.hunger.clamp(0.0, MAX_VITAL),
            thirst: self.thirst.clamp(0.0, MAX_VITAL),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub position: Vec3,
    pub vitals: Vitals,
}

impl Player {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            vitals: Vitals::default(),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.vitals.health <= 0.0
    }

    /// Advance survival needs by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        if self.is_dead() || dt <= 0.0 {
            return;
        }
        let v = &mut self.vitals;
        v.hunger = (v.hunger - HUNGER_RATE * dt).max(0.0);
        v.thirst = (v.thirst - THIRST_RATE * dt).max(0.0);
        if v.hunger <= 0.0 || v.thirst <= 0.0 {
            v.health = (v.health - STARVATION_DAMAGE * dt).max(0.0);
        }
    }

    /// Move along the ground plane. `dir_x`/`dir_z` need not be normalized;
    /// the result is clamped to `half_extent` on both axes.
    pub fn move_by(&mut self, dir_x: f32, dir_z: f32, dt: f32, sprint: bool, half_extent: f32) {
        if self.is_dead() {
            return;
        }
        let len = (dir_x * dir_x + dir_z * dir_z).sqrt();
        if len <= f32::EPSILON || dt <= 0.0 {
            return;
        }
        let speed = if sprint { SPRINT_SPEED } else { WALK_SPEED };
        let step = speed * dt / len;
        self.position.x = (self.position.x + dir_x * step).clamp(-half_extent, half_extent);
        self.position.z = (self.position.z + dir_z * step).clamp(-half_extent, half_extent);
    }

    pub fn restore(&mut self, health: f32, hunger: f32, thirst: f32) {
        self.vitals = Vitals {
            health: self.vitals.health + health,
            hunger: self.vitals.hunger + hunger,
            thirst: self.vitals.thirst + thirst,
        }
        .clamped();
    }
}
