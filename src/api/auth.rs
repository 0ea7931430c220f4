//! Privilege-gated request authorization.
//!
//! Each route is wrapped with a [`RouteAuth`] middleware naming the auth
//! scheme and the required privilege. Routes without a required privilege
//! skip credential resolution entirely and run with an anonymous context.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;

use super::ApiError;
use crate::services::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Hint appended to bearer failures, pointing at the credential exchange.
const LOGIN_HINT: &str = "obtain a token via POST /api/users/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Basic <base64 user:pass>`; exchanges credentials
    /// for a fresh session on every request.
    Basic,

    /// `Authorization: Bearer <hex-token>`; resolves a previously minted
    /// session token.
    Bearer,
}

/// The credential context attached to every request that passed through
/// the authorization middleware.
#[derive(Debug, Clone)]
pub enum Credentials {
    Anonymous,
    User(AuthenticatedUser),
}

impl Credentials {
    /// The authenticated identity, or an internal error on routes that
    /// should never have been registered without a privilege.
    pub fn user(&self) -> Result<&AuthenticatedUser, ApiError> {
        match self {
            Credentials::User(identity) => Ok(identity),
            Credentials::Anonymous => Err(ApiError::internal(
                "handler requires an identity but the route is anonymous",
            )),
        }
    }
}

/// Per-route middleware state: which scheme gates the route and which
/// privilege it requires. `privilege: None` means the route is open.
#[derive(Clone)]
pub struct RouteAuth {
    pub state: Arc<AppState>,
    pub scheme: AuthScheme,
    pub privilege: Option<&'static str>,
}

pub async fn authorize(
    State(route): State<RouteAuth>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = match route.privilege {
        None => Credentials::Anonymous,
        Some(required) => {
            let identity = resolve_identity(&route, request.headers()).await?;
            if !identity.has_privilege(required) {
                return Err(ApiError::Forbidden(format!(
                    "privilege {required} required"
                )));
            }
            Credentials::User(identity)
        }
    };

    request.extensions_mut().insert(credentials);
    Ok(next.run(request).await)
}

async fn resolve_identity(
    route: &RouteAuth,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, ApiError> {
    let realm = route.state.config.realm();

    match route.scheme {
        AuthScheme::Basic => {
            let (username, password) = basic_credentials(headers).ok_or_else(|| {
                ApiError::unauthorized("missing basic credentials", AuthScheme::Basic, realm)
            })?;

            route
                .state
                .auth()
                .login(&username, &password)
                .await
                .map_err(|e| challenge_on_rejection(e, AuthScheme::Basic, realm))
        }
        AuthScheme::Bearer => {
            let token = bearer_token(headers).ok_or_else(|| {
                ApiError::unauthorized(
                    format!("missing bearer token; {LOGIN_HINT}"),
                    AuthScheme::Bearer,
                    realm,
                )
            })?;

            route
                .state
                .auth()
                .resolve_token(&token)
                .await
                .map_err(|e| challenge_on_rejection(e, AuthScheme::Bearer, realm))
        }
    }
}

/// Rejected credentials carry the scheme's challenge; everything else
/// keeps its own mapping.
fn challenge_on_rejection(err: AuthError, scheme: AuthScheme, realm: &str) -> ApiError {
    match err {
        AuthError::InvalidCredentials => {
            let message = match scheme {
                AuthScheme::Basic => "invalid credentials".to_string(),
                AuthScheme::Bearer => format!("invalid token; {LOGIN_HINT}"),
            };
            ApiError::unauthorized(message, scheme, realm)
        }
        other => ApiError::from(other),
    }
}

/// Extract username and password from an `Authorization: Basic` header.
/// The scheme keyword is matched case-insensitively.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let (scheme, payload) = authorization_parts(headers)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = BASE64.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some((username.to_string(), password.to_string()))
}

/// Extract the token from an `Authorization: Bearer` header. The scheme
/// keyword is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let (scheme, payload) = authorization_parts(headers)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = payload.trim();
    if token.is_empty() {
        return None;
    }

    Some(token.to_string())
}

fn authorization_parts(headers: &HeaderMap) -> Option<(&str, &str)> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .split_once(' ')
}
