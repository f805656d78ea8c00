use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use super::role::MIN_PLAYERS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    pub night_seconds: u64,
    pub dawn_seconds: u64,
    pub trial_seconds: u64,
    pub banishment_seconds: u64,
    // start on our own once min_players have joined
    pub auto_start: bool,
    pub auto_start_seconds: u64,
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            max_players: 10,
            night_seconds: 30,
            dawn_seconds: 10,
            trial_seconds: 45,
            banishment_seconds: 10,
            auto_start: true,
            auto_start_seconds: 3,
            rng_seed: None,
        }
    }
}

fn read_u64(key: &str, fallback: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn read_usize(key: &str, fallback: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(fallback)
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let min_players = read_usize("MIN_PLAYERS", defaults.min_players).max(MIN_PLAYERS);
        let max_players = read_usize("MAX_PLAYERS", defaults.max_players).max(min_players);
        let auto_start = env::var("AUTO_START")
            .map(|v| v == "true")
            .unwrap_or(defaults.auto_start);
        let rng_seed = env::var("RNG_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok());

        Self {
            min_players,
            max_players,
            night_seconds: read_u64("NIGHT_SECONDS", defaults.night_seconds),
            dawn_seconds: read_u64("DAWN_SECONDS", defaults.dawn_seconds),
            trial_seconds: read_u64("TRIAL_SECONDS", defaults.trial_seconds),
            banishment_seconds: read_u64("BANISHMENT_SECONDS", defaults.banishment_seconds),
            auto_start,
            auto_start_seconds: read_u64("AUTO_START_SECONDS", defaults.auto_start_seconds),
            rng_seed,
        }
    }

    pub fn night(&self) -> Duration {
        Duration::from_secs(self.night_seconds)
    }

    pub fn dawn(&self) -> Duration {
        Duration::from_secs(self.dawn_seconds)
    }

    pub fn trial(&self) -> Duration {
        Duration::from_secs(self.trial_seconds)
    }

    pub fn banishment(&self) -> Duration {
        Duration::from_secs(self.banishment_seconds)
    }

    pub fn auto_start_delay(&self) -> Duration {
        Duration::from_secs(self.auto_start_seconds)
    }
}
