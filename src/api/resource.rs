//! Generic CRUD route wiring.
//!
//! A resource supplies its handler set, a per-operation privilege map and
//! a per-operation auth scheme; [`crud_router`] turns that into the
//! standard list/get/create/update/delete endpoints, each wrapped with
//! the authorization middleware for its operation. Update and the
//! privilege-scoped extra listing are optional.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::auth::{AuthScheme, Credentials, RouteAuth, authorize};
use super::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
    ExtraList,
}

/// How one operation is gated: which scheme resolves credentials and
/// which privilege the identity must hold. No privilege means the
/// operation is open and runs anonymously.
#[derive(Debug, Clone, Copy)]
pub struct OperationAuth {
    pub scheme: AuthScheme,
    pub privilege: Option<&'static str>,
}

impl OperationAuth {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            scheme: AuthScheme::Bearer,
            privilege: None,
        }
    }

    #[must_use]
    pub const fn bearer(privilege: &'static str) -> Self {
        Self {
            scheme: AuthScheme::Bearer,
            privilege: Some(privilege),
        }
    }

    #[must_use]
    pub const fn basic(privilege: &'static str) -> Self {
        Self {
            scheme: AuthScheme::Basic,
            privilege: Some(privilege),
        }
    }
}

/// A named resource's handler set. List, get, create and delete are
/// mandatory; update and the extra listing are opt-in.
#[async_trait::async_trait]
pub trait CrudResource: Send + Sync + 'static {
    /// Path segment the resource is mounted under.
    const NAME: &'static str;

    /// Whether `PUT /{name}/{id}` is registered.
    const HAS_UPDATE: bool = false;

    /// Privilege-named path segment of the filtered listing
    /// (`GET /{segment}/{name}`), if the resource has one.
    const EXTRA_LIST_SEGMENT: Option<&'static str> = None;

    type Presented: Serialize + Send;
    type CreateBody: DeserializeOwned + Send + 'static;
    type UpdateBody: DeserializeOwned + Send + 'static;

    /// The privilege map and scheme map, combined.
    fn auth(operation: Operation) -> OperationAuth;

    async fn list(
        state: &AppState,
        credentials: &Credentials,
    ) -> Result<Vec<Self::Presented>, ApiError>;

    async fn get(
        state: &AppState,
        credentials: &Credentials,
        id: &str,
    ) -> Result<Self::Presented, ApiError>;

    async fn create(
        state: &AppState,
        credentials: &Credentials,
        body: Self::CreateBody,
    ) -> Result<Self::Presented, ApiError>;

    async fn update(
        state: &AppState,
        credentials: &Credentials,
        id: &str,
        body: Self::UpdateBody,
    ) -> Result<Self::Presented, ApiError> {
        let _ = (state, credentials, id, body);
        Err(ApiError::validation(format!(
            "{} cannot be updated",
            Self::NAME
        )))
    }

    async fn delete(
        state: &AppState,
        credentials: &Credentials,
        id: &str,
    ) -> Result<(), ApiError>;

    async fn extra_list(
        state: &AppState,
        credentials: &Credentials,
    ) -> Result<Vec<Self::Presented>, ApiError> {
        let _ = (state, credentials);
        Err(ApiError::not_found("resource", Self::NAME))
    }
}

/// The middleware state gating one operation, usable on custom routes
/// registered beside the generated ones.
#[must_use]
pub fn route_auth(state: &Arc<AppState>, auth: OperationAuth) -> RouteAuth {
    RouteAuth {
        state: state.clone(),
        scheme: auth.scheme,
        privilege: auth.privilege,
    }
}

/// Register the standard endpoints for a resource.
pub fn crud_router<R: CrudResource>(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let base = format!("/{}", R::NAME);
    let id_path = format!("/{}/{{id}}", R::NAME);

    let mut router = Router::new()
        .route(
            &base,
            get(list_handler::<R>).layer(middleware::from_fn_with_state(
                route_auth(state, R::auth(Operation::List)),
                authorize,
            )),
        )
        .route(
            &base,
            post(create_handler::<R>).layer(middleware::from_fn_with_state(
                route_auth(state, R::auth(Operation::Create)),
                authorize,
            )),
        )
        .route(
            &id_path,
            get(get_handler::<R>).layer(middleware::from_fn_with_state(
                route_auth(state, R::auth(Operation::Get)),
                authorize,
            )),
        )
        .route(
            &id_path,
            delete(delete_handler::<R>).layer(middleware::from_fn_with_state(
                route_auth(state, R::auth(Operation::Delete)),
                authorize,
            )),
        );

    if R::HAS_UPDATE {
        router = router.route(
            &id_path,
            put(update_handler::<R>).layer(middleware::from_fn_with_state(
                route_auth(state, R::auth(Operation::Update)),
                authorize,
            )),
        );
    }

    if let Some(segment) = R::EXTRA_LIST_SEGMENT {
        let path = format!("/{segment}/{}", R::NAME);
        router = router.route(
            &path,
            get(extra_list_handler::<R>).layer(middleware::from_fn_with_state(
                route_auth(state, R::auth(Operation::ExtraList)),
                authorize,
            )),
        );
    }

    router
}

async fn list_handler<R: CrudResource>(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<Credentials>,
) -> Result<Json<ApiResponse<Vec<R::Presented>>>, ApiError> {
    let items = R::list(&state, &credentials).await?;
    Ok(Json(ApiResponse::success(items)))
}

async fn get_handler<R: CrudResource>(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<Credentials>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<R::Presented>>, ApiError> {
    let item = R::get(&state, &credentials, &id).await?;
    Ok(Json(ApiResponse::success(item)))
}

async fn create_handler<R: CrudResource>(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<Credentials>,
    Json(body): Json<R::CreateBody>,
) -> Result<Json<ApiResponse<R::Presented>>, ApiError> {
    let item = R::create(&state, &credentials, body).await?;
    Ok(Json(ApiResponse::success(item)))
}

async fn update_handler<R: CrudResource>(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<Credentials>,
    Path(id): Path<String>,
    Json(body): Json<R::UpdateBody>,
) -> Result<Json<ApiResponse<R::Presented>>, ApiError> {
    let item = R::update(&state, &credentials, &id, body).await?;
    Ok(Json(ApiResponse::success(item)))
}

async fn delete_handler<R: CrudResource>(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<Credentials>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    R::delete(&state, &credentials, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn extra_list_handler<R: CrudResource>(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<Credentials>,
) -> Result<Json<ApiResponse<Vec<R::Presented>>>, ApiError> {
    let items = R::extra_list(&state, &credentials).await?;
    Ok(Json(ApiResponse::success(items)))
}
