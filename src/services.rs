pub mod assignment;
pub mod game_service;
pub mod night;
pub mod notifier;
pub mod trial;
pub mod victory;
