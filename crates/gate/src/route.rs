//! Per-route authorization declarations.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use warden_core::{Credentials, Role};

/// Path parameters as extracted from the matched route.
pub type Params = HashMap<String, String>;

/// Raised by a route validator to veto a request or response.
#[derive(Debug, Error, Clone)]
#[error("rejected by route validator: {0}")]
pub struct ValidationRejection(pub String);

impl ValidationRejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Boxed async hook over `(payload, credentials, params)`.
///
/// For the request stage `payload` is the parsed JSON request body; for the
/// response stage it is the JSON response body. Either may be `Value::Null`
/// when there is no body or it is not JSON.
pub type Validator = Arc<
    dyn Fn(
            Value,
            Credentials,
            Params,
        ) -> Pin<Box<dyn Future<Output = Result<(), ValidationRejection>> + Send>>
        + Send
        + Sync,
>;

/// What a route demands of its callers.
///
/// `roles` lists who may enter at all; the optional validators add
/// content-level checks on top. Super users skip the validators entirely.
#[derive(Clone, Default)]
pub struct RouteAuthorizationSpec {
    pub roles: Vec<Role>,
    pub request: Option<Validator>,
    pub response: Option<Validator>,
}

impl RouteAuthorizationSpec {
    pub fn allow(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            request: None,
            response: None,
        }
    }

    pub fn with_request_validator<F, Fut>(mut self, validator: F) -> Self
    where
        F: Fn(Value, Credentials, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ValidationRejection>> + Send + 'static,
    {
        self.request = Some(Arc::new(move |payload, credentials, params| {
            Box::pin(validator(payload, credentials, params))
        }));
        self
    }

    pub fn with_response_validator<F, Fut>(mut self, validator: F) -> Self
    where
        F: Fn(Value, Credentials, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ValidationRejection>> + Send + 'static,
    {
        self.response = Some(Arc::new(move |payload, credentials, params| {
            Box::pin(validator(payload, credentials, params))
        }));
        self
    }
}

impl std::fmt::Debug for RouteAuthorizationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteAuthorizationSpec")
            .field("roles", &self.roles)
            .field("request", &self.request.as_ref().map(|_| "<validator>"))
            .field("response", &self.response.as_ref().map(|_| "<validator>"))
            .finish()
    }
}
