//! API key and session authorization
//!
//! ## Architecture
//!
//! Requests to protected routes pass through two kinds of checks:
//!
//! 1. **API key gates**: every client presents a key in the configured
//!    header (`x-api-key` by default)
//!    - The key must exist and be active (`Gate::ApiKey`)
//!    - The key must hold the route's scope (`Gate::Scope`)
//!    - Both failures answer `403` with the same message
//!
//! 2. **Session gate**: user-protected routes also need the `jwt` cookie
//!    - HS256 token minted at login, verified statelessly
//!    - The subject is resolved to a user profile (no password hash)
//!    - Missing cookie or failed verification answers `401`
//!
//! ## Usage
//!
//! ```rust,ignore
//! let chain = Arc::new(GateChain::new(
//!     gatekeeper,
//!     [Gate::ApiKey, Gate::Scope(Scope::General), Gate::Session],
//! ));
//! let routes = Router::new()
//!     .route("/api/users/profile", get(profile))
//!     .route_layer(from_fn_with_state(chain, enforce_gates));
//! ```

pub mod api_key;
pub mod gate;
pub mod identity;
pub mod password;
pub mod scope;
pub mod token;

pub use api_key::ApiKeyAuthenticator;
pub use gate::{enforce_gates, session_cookie, Gate, GateChain, Gatekeeper};
pub use identity::{CurrentUser, RequestIdentity};
pub use password::{hash_password, verify_password};
pub use scope::authorize;
pub use token::{SessionClaims, SessionCodec, TokenError};
