//! Recipe Catalog
//!
//! Static mapping of craftable item name to its ingredients, outputs and
//! optional crafting station. The built-in catalog can be extended from TOML
//! files (Raw* structures) resolved into immutable [`Recipe`]s.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

// ============================================================================
// Raw TOML Structures
// ============================================================================

fn default_count() -> u32 {
    1
}

/// Raw ingredient or output entry from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawItemStack {
    pub item: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

/// Raw recipe definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecipe {
    #[serde(default)]
    pub ingredients: Vec<RawItemStack>,
    /// Defaults to one unit of the recipe name when omitted
    #[serde(default)]
    pub outputs: Vec<RawItemStack>,
    pub station: Option<String>,
}

// ============================================================================
// Resolved Structures
// ============================================================================

/// A fully resolved, immutable recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub name: String,
    pub ingredients: BTreeMap<String, u32>,
    pub outputs: BTreeMap<String, u32>,
    pub required_station: Option<String>,
}

impl Recipe {
    /// Create a resolved Recipe from raw TOML data.
    ///
    /// Zero counts are rejected, and repeated items are summed.
    pub fn from_raw(name: &str, raw: &RawRecipe) -> Result<Self, String> {
        let ingredients = collect_stacks(name, "ingredient", &raw.ingredients)?;
        let mut outputs = collect_stacks(name, "output", &raw.outputs)?;
        if outputs.is_empty() {
            outputs.insert(name.to_string(), 1);
        }

        Ok(Self {
            name: name.to_string(),
            ingredients,
            outputs,
            required_station: raw.station.clone(),
        })
    }

    fn builtin(
        name: &str,
        ingredients: &[(&str, u32)],
        station: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_string(),
            ingredients: ingredients
                .iter()
                .map(|(item, count)| (item.to_string(), *count))
                .collect(),
            outputs: BTreeMap::from([(name.to_string(), 1)]),
            required_station: station.map(str::to_string),
        }
    }
}

fn collect_stacks(
    recipe: &str,
    what: &str,
    stacks: &[RawItemStack],
) -> Result<BTreeMap<String, u32>, String> {
    let mut out = BTreeMap::new();
    for stack in stacks {
        if stack.count == 0 {
            return Err(format!(
                "Recipe '{}' has {} '{}' with count 0",
                recipe, what, stack.item
            ));
        }
        *out.entry(stack.item.clone()).or_insert(0) += stack.count;
    }
    Ok(out)
}

// ============================================================================
// Catalog
// ============================================================================

/// Registry of every craftable recipe, keyed by recipe name
#[derive(Debug, Clone)]
pub struct RecipeCatalog {
    recipes: HashMap<String, Recipe>,
}

impl RecipeCatalog {
    pub fn new() -> Self {
        Self {
            recipes: HashMap::new(),
        }
    }

    /// The recipes shipped with the game
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for recipe in [
            Recipe::builtin("Rope", &[("Tall Grass", 3)], None),
            Recipe::builtin("Crafting Table", &[("Wood", 15)], None),
            Recipe::builtin("Campfire", &[("Wood", 5), ("Stone", 3)], None),
            Recipe::builtin("Bandage", &[("Cloth", 2)], None),
            Recipe::builtin(
                "Stone Axe",
                &[("Wood", 3), ("Stone", 2), ("Rope", 1)],
                Some("Crafting Table"),
            ),
            Recipe::builtin(
                "Stone Pickaxe",
                &[("Wood", 3), ("Stone", 3), ("Rope", 1)],
                Some("Crafting Table"),
            ),
            Recipe::builtin(
                "Spear",
                &[("Wood", 4), ("Stone", 1), ("Rope", 1)],
                Some("Crafting Table"),
            ),
            Recipe::builtin(
                "Scrap Knife",
                &[("Scrap", 3), ("Wood", 1)],
                Some("Crafting Table"),
            ),
            Recipe::builtin(
                "Water Bottle",
                &[("Scrap", 2), ("Leather", 1)],
                Some("Crafting Table"),
            ),
            Recipe::builtin("Cooked Meat", &[("Raw Meat", 1)], Some("Campfire")),
        ] {
            catalog.insert(recipe);
        }
        catalog
    }

    /// Add or replace a recipe
    pub fn insert(&mut self, recipe: Recipe) {
        if self.recipes.contains_key(&recipe.name) {
            log::warn!("Recipe '{}' redefined, overwriting", recipe.name);
        }
        self.recipes.insert(recipe.name.clone(), recipe);
    }

    /// Load extra recipe definitions from `<data_dir>/recipes/*.toml`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), String> {
        let recipes_dir = data_dir.join("recipes");

        if !recipes_dir.exists() {
            log::warn!("Recipes directory does not exist: {:?}", recipes_dir);
            return Ok(());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&recipes_dir)
            .map_err(|e| format!("Failed to read recipes directory: {}", e))?
        {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            paths.push(entry.path());
        }
        // Files load in name order, so a later file wins a duplicate recipe
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            if path.extension().map_or(false, |ext| ext == "toml") {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

                let table: HashMap<String, RawRecipe> = toml::from_str(&content)
                    .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

                for (name, raw) in table {
                    let recipe = Recipe::from_raw(&name, &raw)
                        .map_err(|e| format!("{} in {:?}", e, path))?;
                    log::debug!(
                        "Loaded recipe: {} - {} ingredients -> {} outputs",
                        name,
                        recipe.ingredients.len(),
                        recipe.outputs.len()
                    );
                    self.insert(recipe);
                    loaded += 1;
                }
            }
        }

        log::info!("Loaded {} recipe definitions from {:?}", loaded, recipes_dir);

        Ok(())
    }

    /// Get a recipe by name
    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// All recipes sorted by name
    pub fn all(&self) -> Vec<&Recipe> {
        let mut recipes: Vec<&Recipe> = self.recipes.values().collect();
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        recipes
    }

    /// Every item name that gates at least one recipe
    pub fn stations(&self) -> BTreeSet<&str> {
        self.recipes
            .values()
            .filter_map(|r| r.required_station.as_deref())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl Default for RecipeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
