//! The request authorization pipeline.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use warden_core::{Credentials, Role};
use warden_store::{InvalidationError, InvalidationStore};
use warden_token::{Direction, SecretResolver, TokenCodec};

use crate::partner::{PartnerDirectory, PartnerLookupError};
use crate::route::{Params, RouteAuthorizationSpec};

/// Terminal pipeline outcome. `Allowed` carries the credentials the handler
/// should see, which for sales partners are the substituted entity claims
/// rather than the token's own.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    Allowed(Credentials),
    Denied,
}

/// Raised by the stage hooks when a request or response must be refused.
/// Deliberately detail-free: callers translate it to a generic 401.
#[derive(Debug, Error)]
#[error("authorization denied")]
pub struct AuthorizationDenied;

#[derive(Debug, Error)]
enum StageError {
    #[error(transparent)]
    Invalidation(#[from] InvalidationError),

    #[error(transparent)]
    Partner(#[from] PartnerLookupError),
}

/// The per-request facts the pipeline inspects besides the credentials.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Parsed JSON request body, `Value::Null` when absent or not JSON.
    pub payload: Value,
    pub params: Params,
    /// The raw presented token, for blacklist lookups.
    pub token: Option<String>,
}

impl RequestContext {
    /// The user id the request is about: body `userId` first, then the path
    /// parameter of the same name.
    pub fn requested_user_id(&self) -> Option<&str> {
        self.payload
            .get("userId")
            .and_then(Value::as_str)
            .or_else(|| self.params.get("userId").map(String::as_str))
    }
}

/// Verifies presented tokens and runs the route authorization pipeline.
///
/// The pipeline is ordered and fail-closed past role admission:
///
/// 1. super users pass unconditionally;
/// 2. the token's role must be among the route's allowed roles;
/// 3. (optional) the token and its actor must not be blacklisted;
/// 4. ordinary users may only touch their own `userId`;
/// 5. sales partners are swapped for the partner entity they act for.
///
/// Any store or lookup failure inside stages 3-5 denies the request.
pub struct AuthorizationEngine {
    resolver: SecretResolver,
    codec: TokenCodec,
    blacklist: Arc<InvalidationStore>,
    partners: Arc<dyn PartnerDirectory>,
    check_blacklist: bool,
}

impl AuthorizationEngine {
    pub fn new(
        resolver: SecretResolver,
        codec: TokenCodec,
        blacklist: Arc<InvalidationStore>,
        partners: Arc<dyn PartnerDirectory>,
    ) -> Self {
        Self {
            resolver,
            codec,
            blacklist,
            partners,
            // The blacklist stage ships disarmed; arming it is an explicit
            // deployment decision.
            check_blacklist: false,
        }
    }

    pub fn with_blacklist_checks(mut self, enabled: bool) -> Self {
        self.check_blacklist = enabled;
        self
    }

    /// Authenticate a presented token: peek at its claimed role, pick that
    /// role's verify secret, then verify for real.
    ///
    /// Tokens without a role claim are admitted only under the legacy
    /// partner convention and are checked against the sales-partner secret.
    pub fn verify_token(&self, token: &str) -> Option<Credentials> {
        let peeked = self.codec.peek(token)?;
        let role = match peeked.role {
            Some(role) => role,
            None if peeked.acts_as_sales_partner() => Role::SalesPartner,
            None => return None,
        };

        let secret = match self.resolver.resolve(role, Direction::Verify) {
            Ok(secret) => secret,
            Err(err) => {
                tracing::error!(error = %err, "token presented for a role with no verify secret");
                return None;
            }
        };

        self.codec.decode(token, secret, false)
    }

    /// Run the pipeline for verified `credentials` against the route.
    pub async fn validate(
        &self,
        credentials: &Credentials,
        ctx: &RequestContext,
        route: &RouteAuthorizationSpec,
    ) -> AuthDecision {
        if credentials.role == Some(Role::SuperUser) {
            return AuthDecision::Allowed(credentials.clone());
        }

        let admitted = match credentials.role {
            Some(role) => route.roles.contains(&role),
            // Legacy role-less partner tokens, only where partners may go.
            None => {
                credentials.acts_as_sales_partner() && route.roles.contains(&Role::SalesPartner)
            }
        };
        if !admitted {
            return AuthDecision::Denied;
        }

        match self.guarded_stages(credentials, ctx).await {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(error = %err, user_id = %credentials.user_id, "authorization stage failed; denying");
                AuthDecision::Denied
            }
        }
    }

    async fn guarded_stages(
        &self,
        credentials: &Credentials,
        ctx: &RequestContext,
    ) -> Result<AuthDecision, StageError> {
        if self.check_blacklist {
            if let Some(role) = credentials.role {
                if !self
                    .blacklist
                    .is_actor_valid(role, &credentials.user_id)
                    .await?
                {
                    return Ok(AuthDecision::Denied);
                }
            }
            if let Some(token) = &ctx.token {
                if !self.blacklist.is_token_valid(token).await? {
                    return Ok(AuthDecision::Denied);
                }
            }
        }

        if credentials.role == Some(Role::User) {
            if let Some(requested) = ctx.requested_user_id() {
                if requested != credentials.user_id {
                    return Ok(AuthDecision::Denied);
                }
            }
        }

        if credentials.acts_as_sales_partner() {
            let entity = self.partners.fetch(&credentials.user_id).await?;
            return Ok(AuthDecision::Allowed(substitute(credentials, entity)));
        }

        Ok(AuthDecision::Allowed(credentials.clone()))
    }

    /// Request-stage hook: run the route's request validator, if any.
    pub async fn authorize_request(
        &self,
        credentials: &Credentials,
        ctx: &RequestContext,
        route: &RouteAuthorizationSpec,
    ) -> Result<(), AuthorizationDenied> {
        if credentials.role == Some(Role::SuperUser) {
            return Ok(());
        }
        let Some(validator) = &route.request else {
            return Ok(());
        };

        validator(ctx.payload.clone(), credentials.clone(), ctx.params.clone())
            .await
            .map_err(|err| {
                tracing::debug!(error = %err, "request validator rejected the call");
                AuthorizationDenied
            })
    }

    /// Response-stage hook: run the route's response validator against the
    /// outgoing body. Applies only to `200 OK` responses.
    pub async fn authorize_response(
        &self,
        credentials: &Credentials,
        ctx: &RequestContext,
        route: &RouteAuthorizationSpec,
        status: u16,
        body: &Value,
    ) -> Result<(), AuthorizationDenied> {
        if credentials.role == Some(Role::SuperUser) {
            return Ok(());
        }
        let Some(validator) = &route.response else {
            return Ok(());
        };
        if status != 200 {
            return Ok(());
        }

        validator(body.clone(), credentials.clone(), ctx.params.clone())
            .await
            .map_err(|err| {
                tracing::debug!(error = %err, "response validator rejected the body");
                AuthorizationDenied
            })
    }
}

/// Replace a partner's own claims with the entity it acts for. The entity's
/// fields become the extra claims; its `userId`, when present, wins.
fn substitute(credentials: &Credentials, entity: Value) -> Credentials {
    let mut extra = match entity {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("entity".to_string(), other);
            map
        }
    };

    let user_id = match extra.remove("userId") {
        Some(Value::String(id)) => id,
        _ => credentials.user_id.clone(),
    };
    extra.remove("role");

    Credentials {
        user_id,
        role: Some(Role::SalesPartner),
        extra,
    }
}
