//! Survival game simulation core.
//!
//! World generation, gathering, crafting and player needs run synchronously
//! on the caller's loop; saving and loading go through a background worker.

pub mod app;
pub mod game;
pub mod save;

pub use app::{ClientSettings, Session};
pub use game::GameState;
