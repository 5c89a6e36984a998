pub mod analysis;
pub mod config;
pub mod engine;
pub mod events;
pub mod fitness;
pub mod forcing;
pub mod history;
pub mod manager;
pub mod model;
pub mod selection;
pub mod stats;
pub mod variation;

pub use config::Config;
pub use engine::{Engine, TerminalReason};
