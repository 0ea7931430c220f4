use axum::{
    Extension, Json, Router, extract::State, http::StatusCode, middleware, routing::post,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{Credentials, authorize};
use super::resource::{CrudResource, Operation, OperationAuth, crud_router, route_auth};
use super::{ApiError, ApiResponse, UserDto};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

pub struct UsersResource;

#[async_trait::async_trait]
impl CrudResource for UsersResource {
    const NAME: &'static str = "users";

    type Presented = UserDto;
    type CreateBody = RegisterRequest;
    type UpdateBody = ();

    fn auth(operation: Operation) -> OperationAuth {
        match operation {
            // Registration is open.
            Operation::Create => OperationAuth::anonymous(),
            Operation::Get => OperationAuth::bearer("user"),
            Operation::List | Operation::Update | Operation::Delete | Operation::ExtraList => {
                OperationAuth::bearer("admin")
            }
        }
    }

    async fn list(
        state: &AppState,
        _credentials: &Credentials,
    ) -> Result<Vec<UserDto>, ApiError> {
        let users = state.store().list_users().await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }

    /// Self-or-admin; the rule itself lives in the identity store.
    async fn get(
        state: &AppState,
        credentials: &Credentials,
        id: &str,
    ) -> Result<UserDto, ApiError> {
        let caller = credentials.user()?;
        let user = state
            .store()
            .get_user(id, &caller.id, caller.has_privilege("admin"))
            .await?;
        Ok(UserDto::from(user))
    }

    async fn create(
        state: &AppState,
        _credentials: &Credentials,
        body: RegisterRequest,
    ) -> Result<UserDto, ApiError> {
        if body.username.is_empty() {
            return Err(ApiError::validation("username is required"));
        }
        if body.password.is_empty() {
            return Err(ApiError::validation("password is required"));
        }

        let iterations = state.config.security.pbkdf2_iterations;
        let user = state
            .store()
            .create_user(&body.username, &body.password, iterations)
            .await?;

        Ok(UserDto::from(user))
    }

    async fn delete(
        state: &AppState,
        _credentials: &Credentials,
        id: &str,
    ) -> Result<(), ApiError> {
        state.store().delete_user(id).await?;
        Ok(())
    }
}

pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    crud_router::<UsersResource>(state)
        .route(
            "/users/login",
            post(login).layer(middleware::from_fn_with_state(
                route_auth(state, OperationAuth::basic("user")),
                authorize,
            )),
        )
        .route(
            "/users/logout",
            post(logout).layer(middleware::from_fn_with_state(
                route_auth(state, OperationAuth::bearer("user")),
                authorize,
            )),
        )
}

/// POST /api/users/login
/// The basic scheme already exchanged credentials for a session; present
/// the identity, bearer token included.
async fn login(
    Extension(credentials): Extension<Credentials>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let identity = credentials.user()?;
    Ok(Json(ApiResponse::success(UserDto::from(identity))))
}

/// POST /api/users/logout
/// Revoke the session behind the presented bearer token.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<Credentials>,
) -> Result<StatusCode, ApiError> {
    let identity = credentials.user()?;
    let token = identity
        .token
        .as_deref()
        .ok_or_else(|| ApiError::internal("bearer identity without a token"))?;

    state.auth().logout(token).await?;
    Ok(StatusCode::NO_CONTENT)
}
