pub mod crafting;
pub mod inventory;
pub mod loot;
pub mod player;
pub mod recipe;
pub mod state;
pub mod view;
pub mod world;

pub use crafting::{attempt_craft, CraftError, InventoryDelta, MissingIngredient};
pub use inventory::{InsufficientQuantity, Inventory};
pub use loot::{roll_loot, LootTable};
pub use player::{Player, Vitals};
pub use recipe::{Recipe, RecipeCatalog};
pub use state::{AttackOutcome, GameState, InteractError, Notification, NotificationKind};
pub use view::{project, HudView};
pub use world::{generate_world, EntityKind, SceneSink, Vec3, WorldConfig, WorldEntity, WorldState};
