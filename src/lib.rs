pub mod auth;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;
pub mod state;
pub mod store;
pub mod utils;

pub use auth::{Gate, GateChain, Gatekeeper, RequestIdentity, SessionCodec};
pub use router::create_app;
pub use state::AppState;
pub use utils::{ApiError, ApiResult, Config};
