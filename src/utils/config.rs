use once_cell::sync::Lazy;
use std::env;
use std::net::SocketAddr;

use crate::models::config::GameConfig;

pub static CONFIG: Lazy<Config> = Lazy::new(Config::new);

pub struct Config {
    pub addr: SocketAddr,
    pub allowed_origin: String,
    pub game: GameConfig,
}

impl Config {
    fn new() -> Self {
        let addr = env::var("SERVER_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));
        let allowed_origin =
            env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self {
            addr,
            allowed_origin,
            game: GameConfig::from_env(),
        }
    }
}
