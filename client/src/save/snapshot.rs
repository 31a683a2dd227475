use serde::{Deserialize, Serialize};

use crate::game::inventory::Inventory;
use crate::game::player::Vitals;
use crate::game::world::Vec3;

/// Reduced, serializable projection of a running game.
///
/// Built from live state for sending to the save endpoint; never the
/// canonical copy of anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSnapshot {
    pub player_stats: Vitals,
    pub player_position: Vec3,
    pub inventory: Inventory,
    #[serde(default)]
    pub trees: Vec<TreeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub position: Vec3,
    pub health: i32,
    pub harvestable: bool,
}

/// Body of `POST /api/save`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest<'a> {
    pub game_state: &'a SaveSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of a `GET /api/load` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    #[serde(default)]
    pub game_state: Option<SaveSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SaveSnapshot {
        let mut inventory = Inventory::new();
        inventory.add("Wood", 5);
        SaveSnapshot {
            player_stats: Vitals {
                health: 80.0,
                hunger: 60.0,
                thirst: 40.0,
            },
            player_position: Vec3::new(1.5, 0.0, -2.0),
            inventory,
            trees: vec![TreeSnapshot {
                position: Vec3::new(10.0, 0.0, 12.0),
                health: 7,
                harvestable: true,
            }],
        }
    }

    #[test]
    fn test_wire_shape() {
        let snap = snapshot();
        let body = serde_json::to_value(SaveRequest { game_state: &snap }).unwrap();

        let state = &body["gameState"];
        assert_eq!(state["playerStats"]["health"], 80.0);
        assert_eq!(state["playerPosition"]["z"], -2.0);
        assert_eq!(state["inventory"]["Wood"], 5);
        assert_eq!(state["trees"][0]["health"], 7);
        assert_eq!(state["trees"][0]["harvestable"], true);
    }

    #[test]
    fn test_load_response_absent_state() {
        let resp: LoadResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.game_state.is_none());

        let resp: LoadResponse = serde_json::from_str(r#"{"gameState":null}"#).unwrap();
        assert!(resp.game_state.is_none());
    }

    #[test]
    fn test_load_response_with_state() {
        let snap = snapshot();
        let body = serde_json::json!({ "gameState": snap });
        let resp: LoadResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.game_state, Some(snap));
    }
}
