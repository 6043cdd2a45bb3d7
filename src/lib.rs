pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;

pub use config::Config;
pub use db::{ensure_schema, ConnectionProvider};
pub use error::{AppError, Result};
pub use handlers::AppState;
pub use routes::create_router;
