pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod notes;
pub mod router;
pub mod state;
pub mod storage;


pub use config::ServerConfig;
pub use error::AppError;
pub use router::{build_app, build_router};
pub use state::{ServerState, Stores};
