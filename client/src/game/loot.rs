use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name used in data files for the empty slot of a loot table
pub const NOTHING: &str = "nothing";

/// Ordered list of equally likely drops. `None` slots are the no-drop outcome,
/// so a table of `[Cloth, Scrap, nothing, nothing]` drops nothing half the time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LootTable {
    entries: Vec<Option<String>>,
}

impl LootTable {
    pub fn new(entries: Vec<Option<String>>) -> Self {
        Self { entries }
    }

    /// Build a table from item names, mapping [`NOTHING`] to the no-drop slot
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            entries: names.iter().map(|n| slot_from_name(n.as_ref())).collect(),
        }
    }

    pub fn entries(&self) -> &[Option<String>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn slot_from_name(name: &str) -> Option<String> {
    if name == NOTHING {
        None
    } else {
        Some(name.to_string())
    }
}

/// Pick one slot uniformly over the table length.
///
/// Returns `None` for the no-drop slot and for an empty table.
pub fn roll_loot<'a, R: Rng + ?Sized>(table: &'a LootTable, rng: &mut R) -> Option<&'a str> {
    if table.entries.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..table.entries.len());
    table.entries[index].as_deref()
}

impl Serialize for LootTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<&str> = self
            .entries
            .iter()
            .map(|e| e.as_deref().unwrap_or(NOTHING))
            .collect();
        names.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LootTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_names(names.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn barrel_table() -> LootTable {
        LootTable::from_names(&["Cloth", "Scrap", "Bandage", "nothing"])
    }

    #[test]
    fn test_nothing_maps_to_none() {
        let table = barrel_table();
        assert_eq!(table.len(), 4);
        assert_eq!(table.entries()[3], None);
        assert_eq!(table.entries()[0].as_deref(), Some("Cloth"));
    }

    #[test]
    fn test_empty_table_rolls_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(roll_loot(&LootTable::default(), &mut rng), None);
    }

    #[test]
    fn test_single_entry_always_drops() {
        let table = LootTable::from_names(&["Raw Meat"]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(roll_loot(&table, &mut rng), Some("Raw Meat"));
        }
    }

    #[test]
    fn test_rolls_are_reproducible_with_seed() {
        let table = barrel_table();
        let roll = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..64)
                .map(|_| roll_loot(&table, &mut rng).map(str::to_string))
                .collect::<Vec<_>>()
        };
        assert_eq!(roll(42), roll(42));
    }

    #[test]
    fn test_every_slot_is_reachable() {
        let table = barrel_table();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut nothing = 0;
        let mut cloth = 0;
        for _ in 0..2000 {
            match roll_loot(&table, &mut rng) {
                None => nothing += 1,
                Some("Cloth") => cloth += 1,
                Some(_) => {}
            }
        }
        // Roughly a quarter each
        assert!((350..650).contains(&nothing), "nothing rolled {nothing} times");
        assert!((350..650).contains(&cloth), "cloth rolled {cloth} times");
    }

    #[test]
    fn test_serde_uses_nothing_sentinel() {
        let table = LootTable::from_names(&["Scrap", "nothing"]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"["Scrap","nothing"]"#);
        let back: LootTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
