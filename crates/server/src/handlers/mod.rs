//! HTTP and WebSocket handlers

pub mod auth;
pub mod messages;
pub mod users;
pub mod ws;

pub use auth::{login, logout, me, signup, update_profile};
pub use messages::get_history;
pub use users::list_users;
pub use ws::ws_connect;
