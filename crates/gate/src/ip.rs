//! Source-address allowlisting for internal routes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpGateError {
    /// Neither a forwarded-for header nor a socket address was available.
    /// A deployment fault, reported as a server error rather than a denial.
    #[error("no caller address available on the request")]
    MissingAddress,

    #[error("caller address not in the route allowlist")]
    Unauthorized,
}

/// Check the caller's address against `allowed`.
///
/// The `x-forwarded-for` value takes precedence over the socket address and
/// may carry a comma-separated chain; any hop matching the allowlist admits
/// the request. Returns the matching address.
pub fn authenticate(
    forwarded_for: Option<&str>,
    remote_addr: Option<&str>,
    allowed: &[String],
) -> Result<String, IpGateError> {
    let raw = match forwarded_for {
        Some(header) if !header.trim().is_empty() => header,
        _ => remote_addr.ok_or(IpGateError::MissingAddress)?,
    };

    raw.split(',')
        .map(str::trim)
        .find(|candidate| allowed.iter().any(|ip| ip == candidate))
        .map(str::to_string)
        .ok_or(IpGateError::Unauthorized)
}

/// The admitted caller address, exposed to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct CallerAddress(pub String);

#[derive(Clone)]
pub struct IpGateState {
    pub allowed: Arc<Vec<String>>,
}

impl IpGateState {
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: Arc::new(allowed.into_iter().map(Into::into).collect()),
        }
    }
}

/// Middleware form of [`authenticate`] for use with
/// `axum::middleware::from_fn_with_state`.
pub async fn ip_gate(
    State(state): State<IpGateState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string());

    match authenticate(forwarded.as_deref(), remote.as_deref(), &state.allowed) {
        Ok(address) => {
            req.extensions_mut().insert(CallerAddress(address));
            Ok(next.run(req).await)
        }
        Err(IpGateError::Unauthorized) => Err(StatusCode::UNAUTHORIZED),
        Err(IpGateError::MissingAddress) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist() -> Vec<String> {
        vec!["10.0.0.1".to_string(), "10.0.0.5".to_string()]
    }

    #[test]
    fn exact_match_is_admitted() {
        let addr = authenticate(Some("10.0.0.1"), None, &allowlist()).unwrap();
        assert_eq!(addr, "10.0.0.1");
    }

    #[test]
    fn any_hop_in_the_chain_may_match() {
        let addr = authenticate(Some("10.0.0.2,10.0.0.1"), None, &allowlist()).unwrap();
        assert_eq!(addr, "10.0.0.1");
    }

    #[test]
    fn unlisted_address_is_refused() {
        assert_eq!(
            authenticate(Some("10.0.0.9"), None, &allowlist()),
            Err(IpGateError::Unauthorized)
        );
    }

    #[test]
    fn socket_address_is_the_fallback() {
        let addr = authenticate(None, Some("10.0.0.5"), &allowlist()).unwrap();
        assert_eq!(addr, "10.0.0.5");

        // An empty header does not shadow the socket address.
        let addr = authenticate(Some(""), Some("10.0.0.5"), &allowlist()).unwrap();
        assert_eq!(addr, "10.0.0.5");
    }

    #[test]
    fn header_takes_precedence_over_socket() {
        assert_eq!(
            authenticate(Some("10.0.0.9"), Some("10.0.0.1"), &allowlist()),
            Err(IpGateError::Unauthorized)
        );
    }

    #[test]
    fn no_address_at_all_is_a_server_fault() {
        assert_eq!(
            authenticate(None, None, &allowlist()),
            Err(IpGateError::MissingAddress)
        );
    }
}
