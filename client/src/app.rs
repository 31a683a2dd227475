use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::game::{project, EntityKind, GameState, NotificationKind, RecipeCatalog, WorldConfig};
use crate::save::{SaveEvent, SaveWorker};

// Development server
pub const DEFAULT_SERVER_URL: &str = "http://localhost:2567";

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub server_url: String,
    /// Bearer token from `/api/login`; without one the game runs offline
    pub auth_token: Option<String>,
    /// Fixed world seed; a random one is drawn when unset
    pub seed: Option<u64>,
    pub autosave_secs: f32,
    /// How long the headless session runs
    pub session_secs: f32,
    pub tick_hz: u32,
    /// Directory holding extra `recipes/*.toml`
    pub data_dir: Option<PathBuf>,
    pub world: WorldConfig,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            auth_token: None,
            seed: None,
            autosave_secs: 30.0,
            session_secs: 120.0,
            tick_hz: 20,
            data_dir: None,
            world: WorldConfig::default(),
        }
    }
}

pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("survival").join("settings.toml"))
}

pub fn load_settings_from(path: &Path) -> Result<ClientSettings, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
    let settings: ClientSettings =
        toml::from_str(&contents).map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;
    settings
        .world
        .validate()
        .map_err(|e| format!("Invalid world settings in {:?}: {}", path, e))?;
    Ok(settings)
}

/// Settings from the user config dir, or defaults when missing or broken
pub fn load_settings() -> ClientSettings {
    let Some(path) = settings_path() else {
        return ClientSettings::default();
    };
    if !path.exists() {
        return ClientSettings::default();
    }
    match load_settings_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("{}, using defaults", e);
            ClientSettings::default()
        }
    }
}

/// Built-in recipes plus anything found under `data_dir`
pub fn load_catalog(settings: &ClientSettings) -> RecipeCatalog {
    let mut catalog = RecipeCatalog::builtin();
    if let Some(dir) = &settings.data_dir {
        if let Err(e) = catalog.load_from_directory(dir) {
            log::error!("Failed to load recipes: {}", e);
        }
    }
    catalog
}

// ============================================================================
// Session
// ============================================================================

/// Thirst below which the autopilot heads for water
const THIRSTY: f32 = 50.0;
/// Hunger below which the autopilot eats whatever it carries
const HUNGRY: f32 = 60.0;

/// Top-level loop driver: owns the game state and the save worker, and plays
/// the game on autopilot for a headless run.
pub struct Session {
    pub state: GameState,
    pub autopilot: bool,
    saves: Option<SaveWorker>,
    autosave_secs: f32,
    since_save: f32,
    elapsed: f32,
}

impl Session {
    pub fn new(state: GameState, saves: Option<SaveWorker>, autosave_secs: f32) -> Self {
        Self {
            state,
            autopilot: true,
            saves,
            autosave_secs,
            since_save: 0.0,
            elapsed: 0.0,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn request_load(&mut self) {
        if let Some(saves) = &mut self.saves {
            saves.request_load();
        }
    }

    pub fn request_save(&mut self) {
        if let Some(saves) = &mut self.saves {
            let seq = saves.request_save(self.state.snapshot());
            log::debug!("Save {} requested", seq);
        }
        self.since_save = 0.0;
    }

    /// Advance one fixed step
    pub fn step(&mut self, dt: f32) {
        self.elapsed += dt;
        self.since_save += dt;

        self.handle_save_events();
        self.state.tick(dt);
        if self.autopilot {
            self.run_autopilot(dt);
        }

        if self.autosave_secs > 0.0 && self.since_save >= self.autosave_secs {
            self.request_save();
        }

        for note in self.state.drain_notifications() {
            match note.kind {
                NotificationKind::Info => log::info!("{}", note.message),
                NotificationKind::Error => log::debug!("shown: {}", note.message),
            }
        }
    }

    fn handle_save_events(&mut self) {
        let Some(saves) = &mut self.saves else {
            return;
        };
        for event in saves.poll() {
            match event {
                SaveEvent::Saved { seq } => log::info!("Game saved ({})", seq),
                SaveEvent::SaveFailed { error, .. } => {
                    log::warn!("{}", error);
                    self.state.notify(NotificationKind::Error, error.to_string());
                }
                SaveEvent::Loaded { snapshot: Some(snapshot), .. } => {
                    self.state.apply_snapshot(snapshot);
                    self.state.notify(NotificationKind::Info, "Save loaded");
                }
                SaveEvent::Loaded { snapshot: None, .. } => {
                    log::info!("No saved game, starting fresh");
                }
                SaveEvent::LoadFailed { error, .. } => {
                    log::warn!("{}", error);
                    self.state.notify(NotificationKind::Error, error.to_string());
                }
            }
        }
    }

    fn run_autopilot(&mut self, dt: f32) {
        if self.state.player.is_dead() {
            return;
        }

        let vitals = self.state.player.vitals;
        if vitals.hunger < HUNGRY {
            for food in ["Cooked Meat", "Berries"] {
                if self.state.inventory.has(food, 1) {
                    let _ = self.state.use_item(food);
                    break;
                }
            }
        }

        // One of each station is enough
        let stations = self.state.catalog.stations();
        let craftable: Vec<String> = project(&self.state)
            .recipes
            .into_iter()
            .filter(|r| r.craftable)
            .filter(|r| !(stations.contains(r.name.as_str()) && self.state.inventory.has(&r.name, 1)))
            .map(|r| r.name)
            .collect();
        for recipe in craftable {
            let _ = self.state.craft(&recipe);
        }

        let from = self.state.player.position;
        let thirsty = vitals.thirst < THIRSTY;
        let target = self
            .state
            .world
            .nearest(&from, |e| {
                if thirsty {
                    e.kind == EntityKind::WaterBody
                } else {
                    e.harvestable && e.kind.resource_item().is_some()
                }
            })
            .map(|e| (e.id, e.kind, e.position));

        let Some((id, kind, position)) = target else {
            return;
        };

        let reach = crate::game::state::INTERACT_RANGE + self.state.config().radius_of(kind);
        if position.planar_distance(&from) <= reach {
            let _ = if kind == EntityKind::WaterBody {
                self.state.drink(id)
            } else {
                self.state.harvest(id).map(|_| ())
            };
        } else {
            self.state
                .move_player(position.x - from.x, position.z - from.z, dt, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::{LoadError, MemoryStore, SaveError, SaveSnapshot, SaveStore};
    use std::io::Write;
    use std::sync::mpsc::{self, Receiver};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_settings_from_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"
seed = 42
auth_token = "t0k3n"

[world]
world_scale = 80.0

[world.counts]
trees = 12
"#,
        )
        .unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.auth_token.as_deref(), Some("t0k3n"));
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
        assert_eq!(settings.world.world_scale, 80.0);
        assert_eq!(settings.world.counts.trees, 12);
        assert_eq!(settings.world.counts.rocks, 20);
    }

    #[test]
    fn test_broken_settings_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "seed = \"not a number\"").unwrap();
        assert!(load_settings_from(&path).is_err());
    }

    #[test]
    fn test_autopilot_gathers_resources() {
        let state = GameState::new(RecipeCatalog::builtin(), WorldConfig::default(), 3);
        let mut session = Session::new(state, None, 0.0);
        for _ in 0..(20 * 60) {
            session.step(0.05);
        }
        assert!(session.state.inventory.total_items() > 0);
        assert!((session.elapsed() - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_session_autosaves_and_loads() {
        let store = MemoryStore::new();
        let state = GameState::new(RecipeCatalog::builtin(), WorldConfig::default(), 3);
        let mut session = Session::new(state, Some(SaveWorker::spawn(store.clone())), 1.0);

        for _ in 0..25 {
            session.step(0.05);
        }
        // Let the worker finish writing
        drop(session);
        let saved = store.current().expect("autosave written");

        let fresh = GameState::new(RecipeCatalog::builtin(), WorldConfig::default(), 9);
        let mut session = Session::new(fresh, Some(SaveWorker::spawn(store.clone())), 0.0);
        session.autopilot = false;
        session.request_load();
        for _ in 0..100 {
            session.step(0.0);
            if session.state.snapshot().trees == saved.trees {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(session.state.snapshot().trees, saved.trees);
    }

    /// Store whose load blocks until the test releases it
    struct HeldLoadStore {
        inner: MemoryStore,
        gate: Mutex<Receiver<()>>,
    }

    impl SaveStore for HeldLoadStore {
        fn save(&self, snapshot: &SaveSnapshot) -> Result<(), SaveError> {
            self.inner.save(snapshot)
        }

        fn load(&self) -> Result<Option<SaveSnapshot>, LoadError> {
            let snapshot = self.inner.load();
            let _ = self.gate.lock().unwrap().recv();
            snapshot
        }
    }

    #[test]
    fn test_late_load_does_not_revert_newer_progress() {
        let inner = MemoryStore::new();
        let mut old = GameState::new(RecipeCatalog::builtin(), WorldConfig::default(), 3);
        old.inventory.add("Wood", 1);
        inner.save(&old.snapshot()).unwrap();

        let (gate_tx, gate_rx) = mpsc::channel();
        let store = HeldLoadStore {
            inner: inner.clone(),
            gate: Mutex::new(gate_rx),
        };
        let state = GameState::new(RecipeCatalog::builtin(), WorldConfig::default(), 3);
        let mut session = Session::new(state, Some(SaveWorker::spawn(store)), 0.0);
        session.autopilot = false;

        session.request_load();
        session.state.inventory.add("Wood", 50);
        session.request_save();
        gate_tx.send(()).unwrap();

        for _ in 0..200 {
            session.step(0.0);
            if inner.current().map(|s| s.inventory.get("Wood")) == Some(50) {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        // Both results are in the channel once the save has landed
        session.step(0.0);

        assert_eq!(inner.current().map(|s| s.inventory.get("Wood")), Some(50));
        assert_eq!(session.state.inventory.get("Wood"), 50);
    }

    struct BrokenStore;

    impl SaveStore for BrokenStore {
        fn save(&self, _snapshot: &SaveSnapshot) -> Result<(), SaveError> {
            panic!("disk on fire");
        }

        fn load(&self) -> Result<Option<SaveSnapshot>, LoadError> {
            Ok(None)
        }
    }

    #[test]
    fn test_stopped_worker_notifies_player() {
        let state = GameState::new(RecipeCatalog::builtin(), WorldConfig::default(), 3);
        let mut session = Session::new(state, Some(SaveWorker::spawn(BrokenStore)), 0.0);
        session.request_save();

        let mut notes = Vec::new();
        for _ in 0..200 {
            session.handle_save_events();
            notes = session.state.drain_notifications();
            if !notes.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Error);
        assert!(notes[0].message.contains("save worker stopped"));
    }

    #[test]
    fn test_non_finite_world_scale_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[world]\nworld_scale = inf\n").unwrap();
        assert!(load_settings_from(&path).is_err());
    }
}
