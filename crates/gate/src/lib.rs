//! Request authorization for token-bearing HTTP services.
//!
//! The crate gates routes in three layers:
//! - [`engine::AuthorizationEngine`] verifies bearer tokens and runs the
//!   role / blacklist / self-access / partner-substitution pipeline;
//! - [`route::RouteAuthorizationSpec`] declares, per route, who may enter and
//!   which request/response validators apply;
//! - [`middleware`] and [`ip`] plug both into an axum router.

pub mod engine;
pub mod ip;
pub mod middleware;
pub mod partner;
pub mod route;

pub use engine::{AuthDecision, AuthorizationDenied, AuthorizationEngine, RequestContext};
pub use ip::{CallerAddress, IpGateError, IpGateState, authenticate, ip_gate};
pub use middleware::{AuthState, authorize};
pub use partner::{HttpPartnerDirectory, PartnerDirectory, PartnerLookupError};
pub use route::{Params, RouteAuthorizationSpec, ValidationRejection, Validator};
