use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    extract::{Json, Path},
    response::ApiResponse,
    state::AppState,
    users::{
        dto::DeleteResponse,
        repo_types::{User, UserDraft},
        validation::{validate, Action},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn check_draft(draft: &UserDraft, action: Action) -> Result<(), ApiError> {
    validate(draft, action).map_err(|e| {
        warn!(field = e.field(), action = ?action, "user rejected by validation");
        ApiError::from(e)
    })
}

/// Token subject must match the user being modified.
fn ensure_owner(caller: i64, id: i64) -> Result<(), ApiError> {
    if caller != id {
        warn!(caller, target = id, "token does not own this user");
        return Err(ApiError::Unauthorized("Unauthorized"));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserDraft>,
) -> Result<Response, ApiError> {
    // The store normalises the raw draft itself; validate what it will see.
    check_draft(&payload.clone().prepared(), Action::Create)?;

    let user = state.users.create(payload).await?;
    info!(user_id = user.id, email = %user.email, "user created");

    let location = HeaderValue::from_str(&format!("/users/{}", user.id))
        .map_err(|e| ApiError::Internal(e.into()))?;
    let mut response = ApiResponse::created(user).into_response();
    response.headers_mut().insert(header::LOCATION, location);
    Ok(response)
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<ApiResponse<Vec<User>>, ApiError> {
    let users = state.users.find_all().await?;
    Ok(ApiResponse::ok(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<User>, ApiError> {
    let user = state.users.find_by_id(id).await?;
    Ok(ApiResponse::ok(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UserDraft>,
) -> Result<ApiResponse<User>, ApiError> {
    ensure_owner(caller, id)?;

    let payload = payload.prepared();
    check_draft(&payload, Action::Update)?;

    let user = state.users.update(id, payload).await?;
    info!(user_id = user.id, "user updated");
    Ok(ApiResponse::ok(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<DeleteResponse>, ApiError> {
    ensure_owner(caller, id)?;

    let deleted = state.users.delete(id).await?;
    info!(user_id = id, deleted, "user deleted");
    Ok(ApiResponse::ok(DeleteResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, auth::jwt::JwtKeys, state::AppState};

    async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header("authorization", format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = build_app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let location = res
            .headers()
            .get("location")
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, location, json)
    }

    async fn send_raw(
        state: &AppState,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            req = req.header("content-type", ct);
        }
        let req = req.body(Body::from(body.to_string())).unwrap();

        let res = build_app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn ann() -> Value {
        json!({
            "id": 500,
            "name": "Ann",
            "email": "ann@x.com",
            "password": "pw123",
            "age": 30,
            "favorite_color": "Red",
            "favorite_operating_system": "Linux"
        })
    }

    fn token_for(state: &AppState, id: i64) -> String {
        JwtKeys::from_ref(state).sign(id).unwrap()
    }

    #[tokio::test]
    async fn create_returns_created_user_in_envelope() {
        let state = AppState::fake();
        let (status, location, body) =
            send(&state, Method::POST, "/users", Some(ann()), None).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], 201);
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["name"], "Ann");
        assert!(body["data"].get("password").is_none());
        assert!(body["data"]["created_at"].is_string());
        assert_eq!(location.as_deref(), Some("/users/1"));
    }

    #[tokio::test]
    async fn create_rejects_invalid_name() {
        let state = AppState::fake();
        let mut user = ann();
        user["name"] = json!("Ann99");
        let (status, _, body) = send(&state, Method::POST, "/users", Some(user), None).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], 422);
        assert_eq!(body["data"]["error"], "Name must only contain letters");
    }

    #[tokio::test]
    async fn create_validates_the_trimmed_form() {
        let state = AppState::fake();
        let mut user = ann();
        user["name"] = json!("  Ann  ");
        let (status, _, body) = send(&state, Method::POST, "/users", Some(user), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["name"], "Ann");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = AppState::fake();
        send(&state, Method::POST, "/users", Some(ann()), None).await;
        let (status, _, body) = send(&state, Method::POST, "/users", Some(ann()), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["data"]["error"], "Email 'ann@x.com' is already taken");
    }

    #[tokio::test]
    async fn list_and_get() {
        let state = AppState::fake();
        send(&state, Method::POST, "/users", Some(ann()), None).await;

        let (status, _, body) = send(&state, Method::GET, "/users", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _, body) = send(&state, Method::GET, "/users/1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "ann@x.com");

        let (status, _, body) = send(&state, Method::GET, "/users/2", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn update_requires_matching_token() {
        let state = AppState::fake();
        send(&state, Method::POST, "/users", Some(ann()), None).await;

        let (status, _, _) = send(&state, Method::PUT, "/users/1", Some(ann()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let other = token_for(&state, 2);
        let (status, _, body) =
            send(&state, Method::PUT, "/users/1", Some(ann()), Some(&other)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["data"]["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn update_by_owner() {
        let state = AppState::fake();
        send(&state, Method::POST, "/users", Some(ann()), None).await;
        let token = token_for(&state, 1);

        let mut changes = ann();
        changes["age"] = json!(31);
        changes["favorite_color"] = json!("");
        let (status, _, body) =
            send(&state, Method::PUT, "/users/1", Some(changes), Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["age"], 31);
        assert_eq!(body["data"]["favorite_color"], "");

        let mut bad = ann();
        bad["email"] = json!("nope");
        let (status, _, body) =
            send(&state, Method::PUT, "/users/1", Some(bad), Some(&token)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["data"]["error"], "Invalid Email");
    }

    #[tokio::test]
    async fn update_of_deleted_user_is_not_found() {
        let state = AppState::fake();
        let token = token_for(&state, 7);
        let (status, _, _) =
            send(&state, Method::PUT, "/users/7", Some(ann()), Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_reports_count() {
        let state = AppState::fake();
        send(&state, Method::POST, "/users", Some(ann()), None).await;
        let token = token_for(&state, 1);

        let (status, _, body) = send(&state, Method::DELETE, "/users/1", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], 1);

        let (status, _, body) = send(&state, Method::DELETE, "/users/1", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], 0);
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_credentials() {
        let state = AppState::fake();
        send(&state, Method::POST, "/users", Some(ann()), None).await;

        let (status, _, body) = send(
            &state,
            Method::POST,
            "/login",
            Some(json!({"email": "ann@x.com", "password": "pw123"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["id"], 1);
        let token = body["data"]["token"].as_str().unwrap();
        let claims = JwtKeys::from_ref(&state).verify(token).unwrap();
        assert_eq!(claims.sub, 1);

        let (status, _, _) = send(
            &state,
            Method::POST,
            "/login",
            Some(json!({"email": "ann@x.com", "password": "wrong"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, body) = send(
            &state,
            Method::POST,
            "/login",
            Some(json!({"email": "ann@x.com", "password": ""})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["data"]["error"], "Password is required");
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected_in_envelope() {
        let state = AppState::fake();
        let (status, _, body) = send(&state, Method::GET, "/users/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["data"]["error"].is_string());

        let token = token_for(&state, 1);
        let (status, _, body) =
            send(&state, Method::DELETE, "/users/abc", None, Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_in_envelope() {
        let state = AppState::fake();
        let json = Some("application/json");

        let (status, body) = send_raw(&state, Method::POST, "/users", json, "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["data"]["error"].is_string());

        let (status, body) =
            send_raw(&state, Method::POST, "/users", json, r#"{"age": "thirty"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], 422);

        let (status, body) = send_raw(&state, Method::POST, "/login", None, "{}").await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["status"], 415);

        let (_, listed) = send_raw(&state, Method::GET, "/users", None, "").await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn home_and_health() {
        let state = AppState::fake();
        let (status, _, body) = send(&state, Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "Welcome to the users API");

        let (status, _, body) = send(&state, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "ok");
    }
}
