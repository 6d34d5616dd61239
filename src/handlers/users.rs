use crate::{
    auth::{hash_password, verify_password, CurrentUser},
    models::{to_hex, LoginRequest, MessageResponse, RegisterRequest, UserProfile, UserRecord},
    state::AppState,
    store::StoreError,
    utils::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use rand::RngCore;
use uuid::Uuid;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn parse_body<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    request.validate()?;
    Ok(request)
}

/// Mint a session for `user_id` and render its `Set-Cookie` value
fn start_session(state: &AppState, user_id: Uuid, remember: bool) -> ApiResult<String> {
    let jwt = &state.config.jwt;
    let validity = if remember {
        jwt.remember_validity_secs
    } else {
        jwt.session_validity_secs
    };

    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);

    let token = state.codec.mint(
        &jwt.issuer,
        &jwt.audience,
        &user_id.to_string(),
        &to_hex(&nonce),
        validity,
    )?;

    Ok(session_cookie_value(state, &token, validity))
}

fn session_cookie_value(state: &AppState, token: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Strict; Max-Age={}",
        state.config.auth.session_cookie, token, max_age
    );
    if !state.config.environment.is_development() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Register a user and start their session
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = parse_body(payload)?;
    let email = request.email.trim().to_lowercase();

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let user = UserRecord {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        email,
        password_hash: hash_password(&request.password)?,
    };

    // Mint before persisting so a missing secret leaves no orphaned user.
    let cookie = start_session(&state, user.id, false)?;
    let profile = user.profile();

    state.users.insert_user(user).await.map_err(|err| match err {
        StoreError::Duplicate => ApiError::bad_request("User already exists"),
        other => other.into(),
    })?;

    Ok((StatusCode::CREATED, [(SET_COOKIE, cookie)], Json(profile)))
}

/// Handle user login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = parse_body(payload)?;
    let email = request.email.trim().to_lowercase();

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let cookie = start_session(&state, user.id, request.remember)?;

    Ok(([(SET_COOKIE, cookie)], Json(user.profile())))
}

/// Clear the session cookie
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let mut cookie = format!(
        "{}=; HttpOnly; Path=/; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        state.config.auth.session_cookie
    );
    if !state.config.environment.is_development() {
        cookie.push_str("; Secure");
    }

    (
        [(SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

/// Get current user profile
pub async fn profile(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(user)
}
