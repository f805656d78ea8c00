use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::models::game::{Ballot, DayAction};
use crate::models::role::{self, Capability};
use crate::state::AppState;
use crate::utils::websocket;

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub participant_id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NightActionRequest {
    pub actor_id: String,
    pub capability: Capability,
    /// `None` skips the action.
    pub target_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter_id: String,
    pub ballot: Ballot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DayActionRequest {
    pub actor_id: String,
    pub action: DayAction,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // curl -X POST localhost:8080/api/game/join -H 'content-type: application/json' \
        //   -d '{"participant_id":"1","name":"Ada"}'
        .route("/join", post(join))
        .route("/start", post(start_match))
        .route("/end", post(end_match))
        .route("/state", get(get_state))
        .route("/roles", get(get_roles))
        .route("/result", get(get_result))
        .route("/phase/next", post(advance_phase))
        .nest(
            "/actions",
            Router::new()
                .route("/night", post(night_action))
                .route("/vote", post(cast_vote))
                .route("/day", post(day_action)),
        )
        // websocat ws://localhost:8080/api/game/ws/{participant_id}
        .route("/ws/:participant_id", get(websocket::handler))
        .with_state(state)
}

fn status_for(error: &GameError) -> StatusCode {
    match error {
        GameError::UnknownActor(_) | GameError::UnknownTarget(_) | GameError::UnknownRole(_) => {
            StatusCode::NOT_FOUND
        }
        GameError::IllegalActionPhase
        | GameError::WrongPhase
        | GameError::NoActiveMatch
        | GameError::GameFull(_)
        | GameError::AlreadyJoined(_)
        | GameError::AlreadyAssigned
        | GameError::InsufficientPlayers { .. } => StatusCode::CONFLICT,
        GameError::DeadActor(_)
        | GameError::DeadTarget(_)
        | GameError::IllegalTarget(_)
        | GameError::CapabilityNotHeld(_)
        | GameError::AbilityAlreadyUsed(_) => StatusCode::BAD_REQUEST,
    }
}

fn reply<T: Serialize>(result: Result<T, GameError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => (status_for(&error), Json(error)).into_response(),
    }
}

async fn join(State(state): State<AppState>, Json(req): Json<JoinRequest>) -> Response {
    let result = state
        .game
        .add_participant(&req.participant_id, &req.name)
        .await
        .map(|size| format!("{} joined ({}/{})", req.name, size, state.game.config().max_players));
    reply(result)
}

async fn start_match(State(state): State<AppState>) -> Response {
    reply(
        state
            .game
            .begin_match()
            .await
            .map(|_| "Match started".to_string()),
    )
}

async fn end_match(State(state): State<AppState>) -> Response {
    reply(
        state
            .game
            .force_end()
            .await
            .map(|_| "Match ended".to_string()),
    )
}

async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.game.status().await))
}

async fn get_roles() -> impl IntoResponse {
    (StatusCode::OK, Json(role::catalog()))
}

async fn get_result(State(state): State<AppState>) -> Response {
    match state.game.last_result().await {
        Some(result) => (StatusCode::OK, Json(result)).into_response(),
        None => (StatusCode::NOT_FOUND, Json("No match has finished yet")).into_response(),
    }
}

async fn advance_phase(State(state): State<AppState>) -> Response {
    reply(state.game.advance_phase().await)
}

async fn night_action(
    State(state): State<AppState>,
    Json(req): Json<NightActionRequest>,
) -> Response {
    let result = match &req.target_id {
        Some(target) => {
            state
                .game
                .submit_night_action(&req.actor_id, req.capability, target)
                .await
        }
        None => state.game.skip_night_action(&req.actor_id).await,
    };
    reply(result.map(|_| "Night action recorded".to_string()))
}

async fn cast_vote(State(state): State<AppState>, Json(req): Json<VoteRequest>) -> Response {
    reply(
        state
            .game
            .submit_vote(&req.voter_id, req.ballot)
            .await
            .map(|_| "Vote cast".to_string()),
    )
}

async fn day_action(
    State(state): State<AppState>,
    Json(req): Json<DayActionRequest>,
) -> Response {
    reply(
        state
            .game
            .submit_day_action(&req.actor_id, req.action)
            .await
            .map(|_| "Day action accepted".to_string()),
    )
}
