use crate::models::config::GameConfig;
use crate::routes;
use crate::state::AppState;
use axum::Router;

pub fn create_app(config: GameConfig) -> Router {
    let state = AppState::new(config);
    routes::create_routes(state)
}
