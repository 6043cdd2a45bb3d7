pub mod health;
pub mod names;

use crate::db::ConnectionProvider;

#[derive(Clone)]
pub struct AppState {
    pub provider: ConnectionProvider,
}

impl AppState {
    pub fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }
}
