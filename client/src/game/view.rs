//! Read-only projection of [`GameState`] for whatever UI hosts the game.

use std::collections::BTreeMap;

use super::crafting::{check_recipe, CraftError, MissingIngredient};
use super::player::Vitals;
use super::state::GameState;
use super::world::{EntityKind, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRow {
    pub item: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRow {
    pub name: String,
    pub craftable: bool,
    pub station: Option<String>,
    pub station_missing: bool,
    pub missing: Vec<MissingIngredient>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HudView {
    pub vitals: Vitals,
    pub position: Vec3,
    pub inventory: Vec<InventoryRow>,
    pub recipes: Vec<RecipeRow>,
    pub entity_counts: BTreeMap<EntityKind, usize>,
}

pub fn project(state: &GameState) -> HudView {
    let stations = state.nearby_stations();

    let recipes = state
        .catalog
        .all()
        .into_iter()
        .map(|recipe| {
            let check = check_recipe(recipe, &state.inventory, &stations);
            let (station_missing, missing) = match check {
                Err(CraftError::MissingStation { .. }) => (true, Vec::new()),
                Err(CraftError::InsufficientIngredients { missing, .. }) => (false, missing),
                _ => (false, Vec::new()),
            };
            RecipeRow {
                name: recipe.name.clone(),
                craftable: !station_missing && missing.is_empty(),
                station: recipe.required_station.clone(),
                station_missing,
                missing,
            }
        })
        .collect();

    let mut entity_counts = BTreeMap::new();
    for entity in state.world.iter() {
        *entity_counts.entry(entity.kind).or_insert(0) += 1;
    }

    HudView {
        vitals: state.player.vitals,
        position: state.player.position,
        inventory: state
            .inventory
            .non_empty()
            .map(|(item, quantity)| InventoryRow {
                item: item.to_string(),
                quantity,
            })
            .collect(),
        recipes,
        entity_counts,
    }
}
