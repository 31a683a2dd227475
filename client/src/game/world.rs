//! World Generator
//!
//! Places every entity category at seeded random positions inside the world
//! bounds, keeping resources and animals clear of the structures (buildings
//! and water bodies) placed before them.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::loot::LootTable;

// ============================================================================
// Geometry
// ============================================================================

/// World-space position. `y` is up; placement happens on the `x`/`z` plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Distance on the ground plane, ignoring height
    pub fn planar_distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

// ============================================================================
// Entity Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tree,
    Rock,
    Barrel,
    Building,
    WaterBody,
    Animal,
    Grass,
    Scrap,
}

impl EntityKind {
    /// Generation order: structures first so everything else can avoid them
    pub const ALL: [EntityKind; 8] = [
        EntityKind::WaterBody,
        EntityKind::Building,
        EntityKind::Tree,
        EntityKind::Rock,
        EntityKind::Grass,
        EntityKind::Scrap,
        EntityKind::Barrel,
        EntityKind::Animal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Tree => "Tree",
            EntityKind::Rock => "Rock",
            EntityKind::Barrel => "Barrel",
            EntityKind::Building => "Building",
            EntityKind::WaterBody => "Water",
            EntityKind::Animal => "Animal",
            EntityKind::Grass => "Tall Grass",
            EntityKind::Scrap => "Scrap Pile",
        }
    }

    /// Item granted per harvest action, for resource nodes
    pub fn resource_item(&self) -> Option<&'static str> {
        match self {
            EntityKind::Tree => Some("Wood"),
            EntityKind::Rock => Some("Stone"),
            EntityKind::Grass => Some("Tall Grass"),
            EntityKind::Scrap => Some("Scrap"),
            _ => None,
        }
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, EntityKind::Building | EntityKind::WaterBody)
    }
}

/// Inclusive range used for sampled attributes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax<T> {
    pub min: T,
    pub max: T,
}

impl<T> MinMax<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

/// Any placed, interactable object in the world
#[derive(Debug, Clone, PartialEq)]
pub struct WorldEntity {
    pub id: u32,
    pub kind: EntityKind,
    pub position: Vec3,
    /// Rotation around the up axis, in degrees
    pub yaw: f32,
    /// Hit points for animals, units left for resource nodes
    pub health: Option<i32>,
    pub harvestable: bool,
    /// Units the node started with
    pub harvest_yield: Option<u32>,
    pub loot_table: Option<LootTable>,
    /// Seconds an animal idles between wanders
    pub idle_secs: Option<MinMax<f32>>,
}

impl WorldEntity {
    fn new(id: u32, kind: EntityKind, position: Vec3, yaw: f32) -> Self {
        Self {
            id,
            kind,
            position,
            yaw,
            health: None,
            harvestable: false,
            harvest_yield: None,
            loot_table: None,
            idle_secs: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health.map_or(true, |h| h > 0)
    }
}

// ============================================================================
// Config
// ============================================================================

/// Instances per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityCounts {
    pub trees: u32,
    pub rocks: u32,
    pub barrels: u32,
    pub buildings: u32,
    pub water_bodies: u32,
    pub animals: u32,
    pub grass: u32,
    pub scrap: u32,
}

impl EntityCounts {
    pub fn get(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Tree => self.trees,
            EntityKind::Rock => self.rocks,
            EntityKind::Barrel => self.barrels,
            EntityKind::Building => self.buildings,
            EntityKind::WaterBody => self.water_bodies,
            EntityKind::Animal => self.animals,
            EntityKind::Grass => self.grass,
            EntityKind::Scrap => self.scrap,
        }
    }
}

impl Default for EntityCounts {
    fn default() -> Self {
        Self {
            trees: 30,
            rocks: 20,
            barrels: 10,
            buildings: 5,
            water_bodies: 3,
            animals: 8,
            grass: 40,
            scrap: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side length of the square world; positions span `[-scale/2, scale/2]`
    pub world_scale: f32,
    pub counts: EntityCounts,
    pub tree_yield: MinMax<u32>,
    pub rock_yield: MinMax<u32>,
    pub grass_yield: MinMax<u32>,
    pub scrap_yield: MinMax<u32>,
    pub animal_health: i32,
    pub animal_idle_secs: MinMax<f32>,
    pub barrel_loot: LootTable,
    pub building_loot: LootTable,
    pub animal_loot: LootTable,
    pub building_radius: f32,
    pub water_radius: f32,
    /// Samples tried per entity before settling for the last clamped one
    pub max_placement_attempts: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_scale: 200.0,
            counts: EntityCounts::default(),
            tree_yield: MinMax::new(5, 9),
            rock_yield: MinMax::new(3, 6),
            grass_yield: MinMax::new(1, 3),
            scrap_yield: MinMax::new(1, 2),
            animal_health: 30,
            animal_idle_secs: MinMax::new(2.0, 6.0),
            barrel_loot: LootTable::from_names(&[
                "Cloth", "Cloth", "Scrap", "Bandage", "Rope", "nothing", "nothing",
            ]),
            building_loot: LootTable::from_names(&[
                "Cloth", "Scrap", "Scrap", "Water Bottle", "Bandage", "nothing",
            ]),
            animal_loot: LootTable::from_names(&["Raw Meat", "Raw Meat", "Leather", "nothing"]),
            building_radius: 8.0,
            water_radius: 12.0,
            max_placement_attempts: 10,
        }
    }
}

impl WorldConfig {
    pub fn half_extent(&self) -> f32 {
        self.world_scale / 2.0
    }

    /// Reject values that cannot describe a world, such as `inf` or negative sizes
    pub fn validate(&self) -> Result<(), String> {
        if !self.world_scale.is_finite() || self.world_scale <= 0.0 {
            return Err(format!("world_scale must be a positive number, got {}", self.world_scale));
        }
        for (name, radius) in [
            ("building_radius", self.building_radius),
            ("water_radius", self.water_radius),
        ] {
            if !radius.is_finite() || radius < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, radius));
            }
        }
        let idle = self.animal_idle_secs;
        if !idle.min.is_finite() || !idle.max.is_finite() {
            return Err("animal_idle_secs must be finite".to_string());
        }
        Ok(())
    }

    /// Footprint radius used for overlap checks
    pub fn radius_of(&self, kind: EntityKind) -> f32 {
        match kind {
            EntityKind::Building => self.building_radius,
            EntityKind::WaterBody => self.water_radius,
            EntityKind::Tree => 1.0,
            EntityKind::Rock | EntityKind::Barrel | EntityKind::Animal => 0.75,
            EntityKind::Grass | EntityKind::Scrap => 0.5,
        }
    }
}

// ============================================================================
// World State
// ============================================================================

/// One-way sink for whatever draws the world
pub trait SceneSink {
    fn spawn(&mut self, id: u32, kind: EntityKind, position: Vec3, yaw: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    pub half_extent: f32,
    entities: Vec<WorldEntity>,
    next_id: u32,
}

impl WorldState {
    /// Bounds that are not a finite, non-negative size collapse to a point
    pub fn new(half_extent: f32) -> Self {
        let half_extent = if half_extent.is_finite() && half_extent > 0.0 {
            half_extent
        } else {
            0.0
        };
        Self {
            half_extent,
            entities: Vec::new(),
            next_id: 1,
        }
    }

    fn push(&mut self, mut entity: WorldEntity) -> u32 {
        entity.id = self.next_id;
        self.next_id += 1;
        let id = entity.id;
        self.entities.push(entity);
        id
    }

    pub fn get(&self, id: u32) -> Option<&WorldEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut WorldEntity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn remove(&mut self, id: u32) -> Option<WorldEntity> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldEntity> {
        self.entities.iter()
    }

    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &WorldEntity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Closest entity to `from` accepted by `filter`
    pub fn nearest<F>(&self, from: &Vec3, filter: F) -> Option<&WorldEntity>
    where
        F: Fn(&WorldEntity) -> bool,
    {
        self.entities
            .iter()
            .filter(|e| filter(e))
            .min_by(|a, b| {
                a.position
                    .planar_distance(from)
                    .total_cmp(&b.position.planar_distance(from))
            })
    }

    /// Replace every entity of `kind` with `replacement`, assigning fresh ids
    pub fn replace_kind(&mut self, kind: EntityKind, replacement: Vec<WorldEntity>) {
        self.entities.retain(|e| e.kind != kind);
        for entity in replacement {
            self.push(entity);
        }
    }

    /// Clamp a point into the world bounds
    pub fn clamp(&self, mut position: Vec3) -> Vec3 {
        position.x = position.x.clamp(-self.half_extent, self.half_extent);
        position.z = position.z.clamp(-self.half_extent, self.half_extent);
        position
    }

    /// Hand every entity to the renderer
    pub fn render_into<S: SceneSink + ?Sized>(&self, scene: &mut S) {
        for entity in &self.entities {
            scene.spawn(entity.id, entity.kind, entity.position, entity.yaw);
        }
    }

    /// A tree as it comes back from a saved game
    pub fn restored_tree(position: Vec3, health: i32, harvestable: bool) -> WorldEntity {
        let mut entity = WorldEntity::new(0, EntityKind::Tree, position, 0.0);
        entity.health = Some(health);
        entity.harvestable = harvestable;
        entity.harvest_yield = Some(health.max(0) as u32);
        entity
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Populate a fresh world. Same config and same rng state give the same world.
///
/// Placement samples the `x`/`z` plane uniformly inside the bounds and rejects
/// samples overlapping an already placed structure, retrying up to
/// `max_placement_attempts` times. When every attempt collides the last sample
/// is kept, so category counts are always exact.
pub fn generate_world<R: Rng + ?Sized>(config: &WorldConfig, rng: &mut R) -> WorldState {
    let mut world = WorldState::new(config.half_extent());
    let mut crowded = 0u32;

    for kind in EntityKind::ALL {
        for _ in 0..config.counts.get(kind) {
            let (position, clear) = place(config, &world, kind, rng);
            if !clear {
                crowded += 1;
            }
            let yaw = rng.gen_range(0.0..360.0);
            let entity = init_entity(config, kind, position, yaw, rng);
            world.push(entity);
        }
    }

    log::info!(
        "Generated world: {} entities over {}x{} ({} trees, {} animals)",
        world.len(),
        config.world_scale,
        config.world_scale,
        world.count(EntityKind::Tree),
        world.count(EntityKind::Animal),
    );
    if crowded > 0 {
        log::warn!(
            "{} entities overlap a structure after {} placement attempts",
            crowded,
            config.max_placement_attempts
        );
    }

    world
}

fn place<R: Rng + ?Sized>(
    config: &WorldConfig,
    world: &WorldState,
    kind: EntityKind,
    rng: &mut R,
) -> (Vec3, bool) {
    let half = config.half_extent();
    let radius = config.radius_of(kind);
    let attempts = config.max_placement_attempts.max(1);
    let mut position = Vec3::default();

    for _ in 0..attempts {
        position = world.clamp(Vec3::new(
            sample_axis(half, rng),
            0.0,
            sample_axis(half, rng),
        ));
        let overlaps = world.iter().filter(|e| e.kind.is_structure()).any(|s| {
            s.position.planar_distance(&position) < config.radius_of(s.kind) + radius
        });
        if !overlaps {
            return (position, true);
        }
    }

    (position, false)
}

fn sample_axis<R: Rng + ?Sized>(half: f32, rng: &mut R) -> f32 {
    if !half.is_finite() || half <= 0.0 {
        0.0
    } else {
        rng.gen_range(-half..=half)
    }
}

fn sample_yield<R: Rng + ?Sized>(range: &MinMax<u32>, rng: &mut R) -> u32 {
    let min = range.min.max(1);
    rng.gen_range(min..=range.max.max(min))
}

fn init_entity<R: Rng + ?Sized>(
    config: &WorldConfig,
    kind: EntityKind,
    position: Vec3,
    yaw: f32,
    rng: &mut R,
) -> WorldEntity {
    let mut entity = WorldEntity::new(0, kind, position, yaw);

    let yield_range = match kind {
        EntityKind::Tree => Some(&config.tree_yield),
        EntityKind::Rock => Some(&config.rock_yield),
        EntityKind::Grass => Some(&config.grass_yield),
        EntityKind::Scrap => Some(&config.scrap_yield),
        _ => None,
    };
    if let Some(range) = yield_range {
        let units = sample_yield(range, rng);
        entity.harvest_yield = Some(units);
        entity.health = Some(units as i32);
        entity.harvestable = true;
    }

    match kind {
        EntityKind::Animal => {
            entity.health = Some(config.animal_health);
            entity.loot_table = Some(config.animal_loot.clone());
            let idle = config.animal_idle_secs;
            entity.idle_secs = Some(MinMax::new(idle.min.min(idle.max), idle.max.max(idle.min)));
        }
        EntityKind::Barrel => {
            entity.harvestable = true;
            entity.loot_table = Some(config.barrel_loot.clone());
        }
        EntityKind::Building => {
            entity.harvestable = true;
            entity.loot_table = Some(config.building_loot.clone());
        }
        _ => {}
    }

    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn generate(seed: u64, config: &WorldConfig) -> WorldState {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        generate_world(config, &mut rng)
    }

    #[test]
    fn test_thirty_trees_with_yield_in_range() {
        let mut config = WorldConfig::default();
        config.counts.trees = 30;
        let world = generate(3, &config);

        let trees: Vec<&WorldEntity> = world.of_kind(EntityKind::Tree).collect();
        assert_eq!(trees.len(), 30);
        for tree in trees {
            let units = tree.harvest_yield.unwrap();
            assert!((5..=9).contains(&units), "tree yield {units}");
            assert_eq!(tree.health, Some(units as i32));
            assert!(tree.harvestable);
        }
    }

    #[test]
    fn test_counts_match_config() {
        let config = WorldConfig::default();
        let world = generate(11, &config);
        for kind in EntityKind::ALL {
            assert_eq!(world.count(kind) as u32, config.counts.get(kind), "{kind:?}");
        }
    }

    #[test]
    fn test_same_seed_same_world() {
        let config = WorldConfig::default();
        assert_eq!(generate(1234, &config), generate(1234, &config));
    }

    #[test]
    fn test_different_seed_different_positions() {
        let config = WorldConfig::default();
        let a = generate(1, &config);
        let b = generate(2, &config);
        let pa: Vec<Vec3> = a.iter().map(|e| e.position).collect();
        let pb: Vec<Vec3> = b.iter().map(|e| e.position).collect();
        assert_ne!(pa, pb);
    }

    #[test]
    fn test_positions_within_bounds() {
        let config = WorldConfig {
            world_scale: 50.0,
            ..WorldConfig::default()
        };
        let world = generate(5, &config);
        for entity in world.iter() {
            assert!(entity.position.x.abs() <= 25.0);
            assert!(entity.position.z.abs() <= 25.0);
            assert_eq!(entity.position.y, 0.0);
        }
    }

    #[test]
    fn test_resources_avoid_structures_when_room() {
        let config = WorldConfig::default();
        let world = generate(8, &config);
        let structures: Vec<&WorldEntity> =
            world.iter().filter(|e| e.kind.is_structure()).collect();

        let mut overlapping = 0;
        for entity in world.iter().filter(|e| !e.kind.is_structure()) {
            for s in &structures {
                let min = config.radius_of(s.kind) + config.radius_of(entity.kind);
                if s.position.planar_distance(&entity.position) < min {
                    overlapping += 1;
                }
            }
        }
        assert_eq!(overlapping, 0);
    }

    #[test]
    fn test_crowded_world_keeps_exact_counts() {
        let mut config = WorldConfig {
            world_scale: 10.0,
            max_placement_attempts: 3,
            ..WorldConfig::default()
        };
        config.counts.buildings = 20;
        let world = generate(9, &config);
        assert_eq!(world.count(EntityKind::Building), 20);
        assert_eq!(world.count(EntityKind::Tree), 30);
    }

    #[test]
    fn test_type_specific_defaults() {
        let config = WorldConfig::default();
        let world = generate(21, &config);

        for animal in world.of_kind(EntityKind::Animal) {
            assert_eq!(animal.health, Some(30));
            assert_eq!(animal.idle_secs, Some(MinMax::new(2.0, 6.0)));
            assert!(animal.loot_table.is_some());
        }
        for barrel in world.of_kind(EntityKind::Barrel) {
            assert_eq!(barrel.loot_table.as_ref(), Some(&config.barrel_loot));
            assert_eq!(barrel.health, None);
        }
        for water in world.of_kind(EntityKind::WaterBody) {
            assert!(!water.harvestable);
            assert!(water.loot_table.is_none());
        }
        for rock in world.of_kind(EntityKind::Rock) {
            assert!((3..=6).contains(&rock.harvest_yield.unwrap()));
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let world = generate(4, &WorldConfig::default());
        let mut ids: Vec<u32> = world.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), world.len());
    }

    #[test]
    fn test_render_into_scene() {
        struct Recorder(Vec<(u32, EntityKind)>);
        impl SceneSink for Recorder {
            fn spawn(&mut self, id: u32, kind: EntityKind, _position: Vec3, _yaw: f32) {
                self.0.push((id, kind));
            }
        }

        let world = generate(6, &WorldConfig::default());
        let mut scene = Recorder(Vec::new());
        world.render_into(&mut scene);
        assert_eq!(scene.0.len(), world.len());
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config: WorldConfig = toml::from_str(
            r#"
            world_scale = 120.0
            barrel_loot = ["Scrap", "nothing"]

            [counts]
            trees = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.world_scale, 120.0);
        assert_eq!(config.counts.trees, 12);
        assert_eq!(config.counts.rocks, 20);
        assert_eq!(config.barrel_loot.len(), 2);
        assert_eq!(config.tree_yield, MinMax::new(5, 9));
    }

    #[test]
    fn test_non_finite_scale_is_invalid_but_harmless() {
        let config: WorldConfig = toml::from_str("world_scale = inf").unwrap();
        assert!(config.validate().is_err());
        assert!(WorldConfig::default().validate().is_ok());

        let world = generate(2, &config);
        assert_eq!(world.count(EntityKind::Tree), 30);
        assert!(world.iter().all(|e| e.position.x.is_finite() && e.position.z.is_finite()));

        let config = WorldConfig {
            world_scale: f32::NAN,
            ..WorldConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(generate(2, &config).len(), 131);
    }
}
