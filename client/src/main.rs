use std::time::{Duration, Instant};

use survival_client::app::{self, Session};
use survival_client::game::GameState;
use survival_client::save::{SaveClient, SaveWorker};

fn main() {
    env_logger::init();

    let settings = app::load_settings();
    let seed = settings.seed.unwrap_or_else(rand::random);
    log::info!("Starting session with world seed {}", seed);

    let catalog = app::load_catalog(&settings);
    let state = GameState::new(catalog, settings.world.clone(), seed);

    // Without a token there is nobody to save for
    let saves = settings.auth_token.as_deref().map(|token| {
        log::info!("Saving to {}", settings.server_url);
        SaveWorker::spawn(SaveClient::new(&settings.server_url, token))
    });
    if saves.is_none() {
        log::warn!("No auth token configured, progress will not be saved");
    }

    let mut session = Session::new(state, saves, settings.autosave_secs);
    session.request_load();

    let tick_hz = settings.tick_hz.max(1);
    let dt = 1.0 / tick_hz as f32;
    let frame = Duration::from_secs_f32(dt);

    while session.elapsed() < settings.session_secs && !session.state.player.is_dead() {
        let frame_start = Instant::now();
        session.step(dt);
        let spent = frame_start.elapsed();
        if spent < frame {
            std::thread::sleep(frame - spent);
        }
    }

    session.request_save();
    let inventory: Vec<String> = session
        .state
        .inventory
        .non_empty()
        .map(|(item, q)| format!("{} x{}", item, q))
        .collect();
    log::info!(
        "Session over after {:.0}s, carrying: {}",
        session.elapsed(),
        inventory.join(", ")
    );
}
