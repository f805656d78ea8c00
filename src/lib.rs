pub mod app;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use error::GameError;
pub use models::config::GameConfig;
pub use models::event::{Audience, Envelope, GameEvent};
pub use models::game::{Ballot, DayAction, GameSession, Phase};
pub use models::role::{Capability, RoleId, Team};
pub use services::game_service::GameService;
pub use services::notifier::{BroadcastNotifier, Notifier, RecordingNotifier};
