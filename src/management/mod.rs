mod auth;
mod playlists;
mod session;

pub use auth::TokenManager;
pub use playlists::ConfigBuilder;
pub use session::SessionLog;
