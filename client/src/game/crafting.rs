//! Crafting Resolver
//!
//! Checks a recipe against the player's inventory and the stations in reach,
//! then consumes ingredients and produces outputs as a single step.

use super::inventory::Inventory;
use super::recipe::{Recipe, RecipeCatalog};

/// An ingredient the player is short of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingIngredient {
    pub item: String,
    pub required: u32,
    pub held: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CraftError {
    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),
    #[error("'{recipe}' must be crafted at a {station}")]
    MissingStation { recipe: String, station: String },
    /// Every short ingredient, in item name order
    #[error("not enough ingredients for '{recipe}': {}", describe_missing(.missing))]
    InsufficientIngredients {
        recipe: String,
        missing: Vec<MissingIngredient>,
    },
}

fn describe_missing(missing: &[MissingIngredient]) -> String {
    missing
        .iter()
        .map(|m| format!("{} {}/{}", m.item, m.held, m.required))
        .collect::<Vec<_>>()
        .join(", ")
}

/// What a successful craft did to the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryDelta {
    pub recipe: String,
    pub consumed: Vec<(String, u32)>,
    pub produced: Vec<(String, u32)>,
}

/// Check whether `recipe` could be crafted right now, without mutating anything.
pub fn check_recipe(
    recipe: &Recipe,
    inventory: &Inventory,
    nearby_stations: &[&str],
) -> Result<(), CraftError> {
    if let Some(station) = &recipe.required_station {
        if !nearby_stations.iter().any(|s| s == station) {
            return Err(CraftError::MissingStation {
                recipe: recipe.name.clone(),
                station: station.clone(),
            });
        }
    }

    let missing: Vec<MissingIngredient> = recipe
        .ingredients
        .iter()
        .filter(|(item, required)| !inventory.has(item, **required))
        .map(|(item, required)| MissingIngredient {
            item: item.clone(),
            required: *required,
            held: inventory.get(item),
        })
        .collect();

    if !missing.is_empty() {
        return Err(CraftError::InsufficientIngredients {
            recipe: recipe.name.clone(),
            missing,
        });
    }

    Ok(())
}

/// Craft `recipe_name` once.
///
/// On any failure the inventory is left exactly as it was. On success every
/// ingredient has been removed and every output added.
pub fn attempt_craft(
    catalog: &RecipeCatalog,
    recipe_name: &str,
    inventory: &mut Inventory,
    nearby_stations: &[&str],
) -> Result<InventoryDelta, CraftError> {
    let recipe = catalog
        .get(recipe_name)
        .ok_or_else(|| CraftError::UnknownRecipe(recipe_name.to_string()))?;

    check_recipe(recipe, inventory, nearby_stations)?;

    inventory
        .remove_all(recipe.ingredients.iter().map(|(item, q)| (item.as_str(), *q)))
        .map_err(|short| CraftError::InsufficientIngredients {
            recipe: recipe.name.clone(),
            missing: vec![MissingIngredient {
                item: short.item,
                required: short.requested,
                held: short.held,
            }],
        })?;

    for (item, quantity) in &recipe.outputs {
        inventory.add(item, *quantity);
    }

    Ok(InventoryDelta {
        recipe: recipe.name.clone(),
        consumed: recipe
            .ingredients
            .iter()
            .map(|(item, q)| (item.clone(), *q))
            .collect(),
        produced: recipe
            .outputs
            .iter()
            .map(|(item, q)| (item.clone(), *q))
            .collect(),
    })
}
