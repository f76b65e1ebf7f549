//! Axum middleware wiring the engine into a router.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::{RawPathParams, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use crate::engine::{AuthDecision, AuthorizationEngine, RequestContext};
use crate::route::RouteAuthorizationSpec;

/// Cookie consulted when no Authorization header is present.
const TOKEN_COOKIE: &str = "authToken";

/// Bodies past this size are refused before any parsing.
const MAX_BODY_BYTES: usize = 1 << 20;

/// State handed to [`authorize`] via `from_fn_with_state`; one per protected
/// route (or route group sharing a spec).
#[derive(Clone)]
pub struct AuthState {
    pub engine: Arc<AuthorizationEngine>,
    pub route: Arc<RouteAuthorizationSpec>,
}

impl AuthState {
    pub fn new(engine: Arc<AuthorizationEngine>, route: RouteAuthorizationSpec) -> Self {
        Self {
            engine,
            route: Arc::new(route),
        }
    }
}

/// Full-pipeline middleware: authenticate the bearer token, run the
/// authorization stages, then the request hook; after the handler, the
/// response hook. Handlers receive the effective [`warden_core::Credentials`]
/// as a request extension.
///
/// Attach with
/// `route_layer(axum::middleware::from_fn_with_state(state, authorize))`.
pub async fn authorize(
    State(state): State<AuthState>,
    params: RawPathParams,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;
    let credentials = state
        .engine
        .verify_token(&token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    let ctx = RequestContext {
        payload,
        params: params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        token: Some(token),
    };

    let credentials = match state.engine.validate(&credentials, &ctx, &state.route).await {
        AuthDecision::Allowed(effective) => effective,
        AuthDecision::Denied => return Err(StatusCode::UNAUTHORIZED),
    };

    state
        .engine
        .authorize_request(&credentials, &ctx, &state.route)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(credentials.clone());
    let response = next.run(req).await;

    if state.route.response.is_none() || response.status() != StatusCode::OK {
        return Ok(response);
    }

    // Buffer the response so the hook can inspect the body it returns.
    let (resp_parts, resp_body) = response.into_parts();
    let resp_bytes = to_bytes(resp_body, MAX_BODY_BYTES)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let resp_value: Value = serde_json::from_slice(&resp_bytes).unwrap_or(Value::Null);

    state
        .engine
        .authorize_response(&credentials, &ctx, &state.route, 200, &resp_value)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(Response::from_parts(resp_parts, Body::from(resp_bytes)))
}

/// Pull the bearer token from the Authorization header, falling back to the
/// `authToken` cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().ok()?;
        return value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
    }

    for cookies in headers.get_all(header::COOKIE) {
        let Ok(cookies) = cookies.to_str() else {
            continue;
        };
        for cookie in cookies.split(';') {
            if let Some((name, value)) = cookie.trim().split_once('=') {
                if name == TOKEN_COOKIE && !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}
