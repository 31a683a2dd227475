use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt::Display;

use super::crafting::{self, CraftError, InventoryDelta};
use super::inventory::{InsufficientQuantity, Inventory};
use super::loot::roll_loot;
use super::player::Player;
use super::recipe::RecipeCatalog;
use super::world::{generate_world, EntityKind, Vec3, WorldConfig, WorldState};
use crate::save::snapshot::{SaveSnapshot, TreeSnapshot};

/// Reach added to an entity's footprint for interactions
pub const INTERACT_RANGE: f32 = 3.0;
/// Thirst restored per drink at a water body
pub const DRINK_AMOUNT: f32 = 25.0;
/// Number of queued notifications kept for the UI
const MAX_NOTIFICATIONS: usize = 32;

// ============================================================================
// Errors & Notifications
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InteractError {
    #[error("nothing there")]
    UnknownEntity(u32),
    #[error("{0} is too far away")]
    OutOfRange(&'static str),
    #[error("{0} can't be used like that")]
    WrongTarget(&'static str),
    #[error("{0} has already been searched")]
    NotHarvestable(&'static str),
    #[error("{0} can't be consumed")]
    NotConsumable(String),
    #[error(transparent)]
    Inventory(#[from] InsufficientQuantity),
    #[error("you are dead")]
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

/// User-facing message, shown once by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// What a hit on an animal did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackOutcome {
    Wounded { health_left: i32 },
    Killed { drop: Option<String> },
}

/// Restoration applied by a consumable: (health, hunger, thirst)
fn consumable_effect(item: &str) -> Option<(f32, f32, f32)> {
    match item {
        "Cooked Meat" => Some((5.0, 35.0, 0.0)),
        "Raw Meat" => Some((-5.0, 15.0, 0.0)),
        "Berries" => Some((0.0, 10.0, 5.0)),
        "Bandage" => Some((25.0, 0.0, 0.0)),
        "Water Bottle" => Some((0.0, 0.0, 40.0)),
        _ => None,
    }
}

// ============================================================================
// Game State
// ============================================================================

/// Everything the simulation owns. Driven by the host loop, one call at a time.
pub struct GameState {
    pub player: Player,
    pub inventory: Inventory,
    pub world: WorldState,
    pub catalog: RecipeCatalog,
    config: WorldConfig,
    rng: ChaCha8Rng,
    notifications: Vec<Notification>,
}

impl GameState {
    /// Generate a new world from `seed` and spawn the player at its centre
    pub fn new(catalog: RecipeCatalog, config: WorldConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let world = generate_world(&config, &mut rng);
        Self {
            player: Player::new(Vec3::default()),
            inventory: Inventory::new(),
            world,
            catalog,
            config,
            rng,
            notifications: Vec::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        if self.notifications.len() >= MAX_NOTIFICATIONS {
            self.notifications.remove(0);
        }
        self.notifications.push(Notification {
            kind,
            message: message.into(),
        });
    }

    /// Hand queued notifications to the UI; each is returned exactly once
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn surface<T, E: Display>(&mut self, result: Result<T, E>) -> Result<T, E> {
        if let Err(e) = &result {
            log::warn!("{}", e);
            self.notify(NotificationKind::Error, e.to_string());
        }
        result
    }

    // ------------------------------------------------------------------------
    // Movement & needs
    // ------------------------------------------------------------------------

    pub fn tick(&mut self, dt: f32) {
        let was_alive = !self.player.is_dead();
        self.player.tick(dt);
        if was_alive && self.player.is_dead() {
            self.notify(NotificationKind::Error, "You died");
        }
    }

    pub fn move_player(&mut self, dir_x: f32, dir_z: f32, dt: f32, sprint: bool) {
        let half = self.world.half_extent;
        self.player.move_by(dir_x, dir_z, dt, sprint, half);
    }

    // ------------------------------------------------------------------------
    // Crafting
    // ------------------------------------------------------------------------

    /// Stations the player can craft at: any held item that gates a recipe
    pub fn nearby_stations(&self) -> Vec<&str> {
        self.catalog
            .stations()
            .into_iter()
            .filter(|s| self.inventory.has(s, 1))
            .collect()
    }

    pub fn craft(&mut self, recipe_name: &str) -> Result<InventoryDelta, CraftError> {
        let stations: Vec<String> = self.nearby_stations().into_iter().map(str::to_string).collect();
        let stations: Vec<&str> = stations.iter().map(String::as_str).collect();
        let result = crafting::attempt_craft(&self.catalog, recipe_name, &mut self.inventory, &stations);
        if let Ok(delta) = &result {
            log::info!("Crafted {}", delta.recipe);
            self.notify(NotificationKind::Info, format!("Crafted {}", delta.recipe));
        }
        self.surface(result)
    }

    // ------------------------------------------------------------------------
    // World interactions
    // ------------------------------------------------------------------------

    fn reach(&self, id: u32, expected: &[EntityKind]) -> Result<EntityKind, InteractError> {
        if self.player.is_dead() {
            return Err(InteractError::Dead);
        }
        let entity = self.world.get(id).ok_or(InteractError::UnknownEntity(id))?;
        if !expected.contains(&entity.kind) {
            return Err(InteractError::WrongTarget(entity.kind.name()));
        }
        let reach = INTERACT_RANGE + self.config.radius_of(entity.kind);
        if entity.position.planar_distance(&self.player.position) > reach {
            return Err(InteractError::OutOfRange(entity.kind.name()));
        }
        Ok(entity.kind)
    }

    /// Take one unit from a resource node; the node disappears once empty
    pub fn harvest(&mut self, id: u32) -> Result<&'static str, InteractError> {
        let result = self.try_harvest(id);
        self.surface(result)
    }

    fn try_harvest(&mut self, id: u32) -> Result<&'static str, InteractError> {
        let kind = self.reach(
            id,
            &[EntityKind::Tree, EntityKind::Rock, EntityKind::Grass, EntityKind::Scrap],
        )?;
        let item = kind.resource_item().ok_or(InteractError::WrongTarget(kind.name()))?;

        let entity = self.world.get_mut(id).ok_or(InteractError::UnknownEntity(id))?;
        if !entity.harvestable {
            return Err(InteractError::NotHarvestable(kind.name()));
        }
        let left = entity.health.unwrap_or(0) - 1;
        entity.health = Some(left.max(0));
        self.inventory.add(item, 1);

        if left <= 0 {
            self.world.remove(id);
            log::debug!("{} {} exhausted", kind.name(), id);
        }
        Ok(item)
    }

    /// Hit an animal; a kill rolls its loot table into the inventory
    pub fn attack(&mut self, id: u32, damage: i32) -> Result<AttackOutcome, InteractError> {
        let result = self.try_attack(id, damage);
        self.surface(result)
    }

    fn try_attack(&mut self, id: u32, damage: i32) -> Result<AttackOutcome, InteractError> {
        self.reach(id, &[EntityKind::Animal])?;
        let entity = self.world.get_mut(id).ok_or(InteractError::UnknownEntity(id))?;
        let health = entity.health.unwrap_or(0) - damage.max(0);
        entity.health = Some(health.max(0));

        if health > 0 {
            return Ok(AttackOutcome::Wounded { health_left: health });
        }

        let drop = entity
            .loot_table
            .as_ref()
            .and_then(|table| roll_loot(table, &mut self.rng))
            .map(str::to_string);
        self.world.remove(id);
        if let Some(item) = &drop {
            self.inventory.add(item, 1);
        }
        Ok(AttackOutcome::Killed { drop })
    }

    /// Search a barrel (destroyed afterwards) or a building (searchable once)
    pub fn loot(&mut self, id: u32) -> Result<Option<String>, InteractError> {
        let result = self.try_loot(id);
        if let Ok(found) = &result {
            let message = match found {
                Some(item) => format!("Found {}", item),
                None => "Found nothing".to_string(),
            };
            self.notify(NotificationKind::Info, message);
        }
        self.surface(result)
    }

    fn try_loot(&mut self, id: u32) -> Result<Option<String>, InteractError> {
        let kind = self.reach(id, &[EntityKind::Barrel, EntityKind::Building])?;
        let entity = self.world.get_mut(id).ok_or(InteractError::UnknownEntity(id))?;
        if !entity.harvestable {
            return Err(InteractError::NotHarvestable(kind.name()));
        }

        let found = entity
            .loot_table
            .as_ref()
            .and_then(|table| roll_loot(table, &mut self.rng))
            .map(str::to_string);
        entity.harvestable = false;
        if kind == EntityKind::Barrel {
            self.world.remove(id);
        }
        if let Some(item) = &found {
            self.inventory.add(item, 1);
        }
        Ok(found)
    }

    pub fn drink(&mut self, id: u32) -> Result<(), InteractError> {
        let result = self
            .reach(id, &[EntityKind::WaterBody])
            .map(|_| self.player.restore(0.0, 0.0, DRINK_AMOUNT));
        self.surface(result)
    }

    /// Eat, drink or apply one unit of a consumable
    pub fn use_item(&mut self, item: &str) -> Result<(), InteractError> {
        let result = self.try_use_item(item);
        self.surface(result)
    }

    fn try_use_item(&mut self, item: &str) -> Result<(), InteractError> {
        if self.player.is_dead() {
            return Err(InteractError::Dead);
        }
        let (health, hunger, thirst) =
            consumable_effect(item).ok_or_else(|| InteractError::NotConsumable(item.to_string()))?;
        self.inventory.remove(item, 1)?;
        self.player.restore(health, hunger, thirst);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Save / Load
    // ------------------------------------------------------------------------

    /// Project the live state into a snapshot. Reads only.
    pub fn snapshot(&self) -> SaveSnapshot {
        SaveSnapshot {
            player_stats: self.player.vitals,
            player_position: self.player.position,
            inventory: self.inventory.clone(),
            trees: self
                .world
                .of_kind(EntityKind::Tree)
                .map(|tree| TreeSnapshot {
                    position: tree.position,
                    health: tree.health.unwrap_or(0),
                    harvestable: tree.harvestable,
                })
                .collect(),
        }
    }

    /// Replace player, inventory and trees with a loaded snapshot
    pub fn apply_snapshot(&mut self, snapshot: SaveSnapshot) {
        self.player.vitals = snapshot.player_stats.clamped();
        self.player.position = self.world.clamp(snapshot.player_position);
        self.inventory = snapshot.inventory;

        let trees = snapshot
            .trees
            .into_iter()
            .filter(|t| t.health > 0)
            .map(|t| WorldState::restored_tree(self.world.clamp(t.position), t.health, t.harvestable))
            .collect();
        self.world.replace_kind(EntityKind::Tree, trees);

        log::info!(
            "Loaded save: {} items, {} trees",
            self.inventory.total_items(),
            self.world.count(EntityKind::Tree)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new(RecipeCatalog::builtin(), WorldConfig::default(), 77)
    }

    fn walk_to(state: &mut GameState, id: u32) {
        let target = state.world.get(id).unwrap().position;
        state.player.position = target;
    }

    fn first(state: &GameState, kind: EntityKind) -> u32 {
        state.world.of_kind(kind).next().unwrap().id
    }

    #[test]
    fn test_harvest_tree_until_gone() {
        let mut state = state();
        let id = first(&state, EntityKind::Tree);
        let units = state.world.get(id).unwrap().harvest_yield.unwrap();
        walk_to(&mut state, id);

        for _ in 0..units {
            assert_eq!(state.harvest(id).unwrap(), "Wood");
        }
        assert_eq!(state.inventory.get("Wood"), units);
        assert!(state.world.get(id).is_none());
        assert_eq!(state.world.count(EntityKind::Tree), 29);
        assert_eq!(state.harvest(id), Err(InteractError::UnknownEntity(id)));
    }

    #[test]
    fn test_harvest_out_of_range() {
        let mut state = state();
        let id = first(&state, EntityKind::Rock);
        let rock = state.world.get(id).unwrap().position;
        state.player.position = Vec3::new(rock.x + 50.0, 0.0, rock.z);

        assert_eq!(state.harvest(id), Err(InteractError::OutOfRange("Rock")));
        assert_eq!(state.inventory.get("Stone"), 0);

        let notes = state.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Error);
        assert!(state.drain_notifications().is_empty());
    }

    #[test]
    fn test_harvest_wrong_target() {
        let mut state = state();
        let id = first(&state, EntityKind::Animal);
        walk_to(&mut state, id);
        assert_eq!(state.harvest(id), Err(InteractError::WrongTarget("Animal")));
    }

    #[test]
    fn test_kill_animal() {
        let mut state = state();
        let id = first(&state, EntityKind::Animal);
        walk_to(&mut state, id);

        assert_eq!(state.attack(id, 10).unwrap(), AttackOutcome::Wounded { health_left: 20 });
        match state.attack(id, 100).unwrap() {
            AttackOutcome::Killed { drop } => {
                if let Some(item) = drop {
                    assert_eq!(state.inventory.get(&item), 1);
                }
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(state.world.get(id).is_none());
    }

    #[test]
    fn test_barrel_removed_building_searched_once() {
        let mut state = state();
        let barrel = first(&state, EntityKind::Barrel);
        walk_to(&mut state, barrel);
        state.loot(barrel).unwrap();
        assert!(state.world.get(barrel).is_none());

        let building = first(&state, EntityKind::Building);
        walk_to(&mut state, building);
        state.loot(building).unwrap();
        assert_eq!(state.loot(building), Err(InteractError::NotHarvestable("Building")));
        assert!(state.world.get(building).is_some());
    }

    #[test]
    fn test_drink_and_eat() {
        let mut state = state();
        state.player.vitals.thirst = 10.0;
        state.player.vitals.hunger = 10.0;

        let water = first(&state, EntityKind::WaterBody);
        walk_to(&mut state, water);
        state.drink(water).unwrap();
        assert_eq!(state.player.vitals.thirst, 35.0);

        assert!(matches!(state.use_item("Cooked Meat"), Err(InteractError::Inventory(_))));
        state.inventory.add("Cooked Meat", 1);
        state.use_item("Cooked Meat").unwrap();
        assert_eq!(state.player.vitals.hunger, 45.0);
        assert_eq!(state.inventory.get("Cooked Meat"), 0);

        state.inventory.add("Wood", 1);
        assert_eq!(
            state.use_item("Wood"),
            Err(InteractError::NotConsumable("Wood".to_string()))
        );
        assert_eq!(state.inventory.get("Wood"), 1);
    }

    #[test]
    fn test_craft_uses_held_stations() {
        let mut state = state();
        state.inventory.add("Wood", 18);
        state.inventory.add("Stone", 2);
        state.inventory.add("Rope", 1);

        assert!(matches!(state.craft("Stone Axe"), Err(CraftError::MissingStation { .. })));
        state.craft("Crafting Table").unwrap();
        assert_eq!(state.nearby_stations(), vec!["Crafting Table"]);
        state.craft("Stone Axe").unwrap();
        assert_eq!(state.inventory.get("Stone Axe"), 1);
        assert_eq!(state.inventory.get("Crafting Table"), 1);
    }

    #[test]
    fn test_snapshot_is_read_only_and_restorable() {
        let mut state = state();
        state.inventory.add("Wood", 4);
        state.player.position = Vec3::new(3.0, 0.0, 4.0);
        let tree = first(&state, EntityKind::Tree);
        walk_to(&mut state, tree);
        state.harvest(tree).unwrap();

        let snap = state.snapshot();
        assert_eq!(snap.trees.len(), 30);
        assert_eq!(snap.inventory.get("Wood"), 5);

        let mut other = GameState::new(RecipeCatalog::builtin(), WorldConfig::default(), 1);
        other.apply_snapshot(snap.clone());
        assert_eq!(other.snapshot(), snap);
        assert_eq!(other.world.count(EntityKind::Rock), 20);
    }

    #[test]
    fn test_apply_snapshot_drops_dead_trees() {
        let mut state = state();
        let mut snap = state.snapshot();
        snap.trees[0].health = 0;
        state.apply_snapshot(snap);
        assert_eq!(state.world.count(EntityKind::Tree), 29);
    }

    #[test]
    fn test_starvation_notifies_death_once() {
        let mut state = state();
        state.player.vitals.hunger = 0.0;
        state.player.vitals.health = 1.0;
        state.tick(5.0);
        state.tick(5.0);
        let deaths = state
            .drain_notifications()
            .into_iter()
            .filter(|n| n.message == "You died")
            .count();
        assert_eq!(deaths, 1);
        assert_eq!(state.harvest(first(&state, EntityKind::Tree)), Err(InteractError::Dead));
    }
}
