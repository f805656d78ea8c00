use std::sync::Arc;

use crate::models::config::GameConfig;
use crate::services::game_service::GameService;
use crate::services::notifier::BroadcastNotifier;

#[derive(Clone)]
pub struct AppState {
    pub game: GameService,
    pub events: BroadcastNotifier,
}

impl AppState {
    pub fn new(config: GameConfig) -> Self {
        let events = BroadcastNotifier::new(1000);
        let game = GameService::new(config, Arc::new(events.clone()));
        AppState { game, events }
    }
}
