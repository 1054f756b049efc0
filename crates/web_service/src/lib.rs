pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod server;

pub use config::ServerConfig;
pub use server::{app_config, run, AppState};
