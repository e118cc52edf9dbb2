use axum::{
    extract::{FromRef, State},
    routing::post,
    Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{jwt::JwtKeys, password::verify_password},
    error::ApiError,
    extract::Json,
    response::ApiResponse,
    state::AppState,
    users::{
        repo::StoreError,
        repo_types::{User, UserDraft},
        validation::{validate, Action},
    },
};

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserDraft>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    let payload = payload.prepared();
    validate(&payload, Action::Login).map_err(|e| {
        warn!(field = e.field(), "login rejected by validation");
        e
    })?;

    let user = match state.users.find_by_email(&payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Unauthorized("Invalid credentials"));
        }
    };

    let matches = verify_password(&payload.password, &user.password)
        .map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    if !matches {
        warn!(email = %payload.email, user_id = user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(ApiResponse::ok(LoginResponse { token, user }))
}
