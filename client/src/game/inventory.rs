use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not enough {item}: requested {requested}, holding {held}")]
pub struct InsufficientQuantity {
    pub item: String,
    pub requested: u32,
    pub held: u32,
}

// ============================================================================
// Inventory
// ============================================================================

/// Item name -> quantity held by the player.
///
/// A missing key reads as quantity 0. Keys stay present at 0 after being
/// drained so the UI keeps a stable row for items the player has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity held of `item`
    pub fn get(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn has(&self, item: &str, quantity: u32) -> bool {
        self.get(item) >= quantity
    }

    pub fn add(&mut self, item: &str, quantity: u32) {
        let held = self.items.entry(item.to_string()).or_insert(0);
        *held = held.saturating_add(quantity);
    }

    /// Remove `quantity` of `item`. Fails without touching the inventory when
    /// the player holds less than requested.
    pub fn remove(&mut self, item: &str, quantity: u32) -> Result<(), InsufficientQuantity> {
        let held = self.get(item);
        if held < quantity {
            return Err(InsufficientQuantity {
                item: item.to_string(),
                requested: quantity,
                held,
            });
        }
        if let Some(slot) = self.items.get_mut(item) {
            *slot = held - quantity;
        }
        Ok(())
    }

    /// Remove several stacks at once: either every stack is removed or none is.
    pub fn remove_all<'a, I>(&mut self, stacks: I) -> Result<(), InsufficientQuantity>
    where
        I: IntoIterator<Item = (&'a str, u32)> + Clone,
    {
        let mut wanted: BTreeMap<&str, u32> = BTreeMap::new();
        for (item, quantity) in stacks.clone() {
            *wanted.entry(item).or_insert(0) += quantity;
        }
        for (item, quantity) in &wanted {
            let held = self.get(item);
            if held < *quantity {
                return Err(InsufficientQuantity {
                    item: item.to_string(),
                    requested: *quantity,
                    held,
                });
            }
        }
        for (item, quantity) in wanted {
            if let Some(slot) = self.items.get_mut(item) {
                *slot -= quantity;
            }
        }
        Ok(())
    }

    /// Entries with a non-zero quantity, sorted by item name
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items
            .iter()
            .filter(|(_, q)| **q > 0)
            .map(|(item, q)| (item.as_str(), *q))
    }

    /// All entries including drained ones
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(item, q)| (item.as_str(), *q))
    }

    pub fn total_items(&self) -> u64 {
        self.items.values().map(|q| *q as u64).sum()
    }
}

impl FromIterator<(String, u32)> for Inventory {
    fn from_iter<T: IntoIterator<Item = (String, u32)>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
