use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        claims::Role,
        dto::{LoginRequest, MessageResponse, RegisterRequest, TokenResponse, UserInfo},
        extractors::{require_auth, AuthUser},
        password::{hash_password, verify_password, MIN_PASSWORD_LEN},
        repo_types::NewUser,
        services::{is_valid_email, new_activation_link, normalize_email},
    },
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
    mail::{activation_body, ACTIVATION_SUBJECT},
    state::AppState,
};

/// Registration, login and activation; reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/activate/:activationLink", get(activate))
}

pub fn account_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/resend-activation-link", get(resend_activation_link))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Mounted under the authenticated `/api` prefix.
pub fn user_info_routes() -> Router<AppState> {
    Router::new().route("/user-info", get(user_info))
}

const INVALID_CREDENTIALS: ApiError = ApiError::Unauthorized("Invalid credentials");

async fn send_activation(state: &AppState, email: &str, link: &str) -> ApiResult<()> {
    let body = activation_body(&state.config.api_url, link);
    state
        .mailer
        .send(email, ACTIVATION_SUBJECT, &body)
        .await
        .map_err(|e| ApiError::internal("Failed to send activation email", e))
}

#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(mut body): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    body.email = normalize_email(&body.email);
    body.username = body.username.trim().to_string();

    if body.username.is_empty() {
        warn!("registration without username");
        return Err(ApiError::BadRequest("Username is required".into()));
    }
    if !is_valid_email(&body.email) {
        warn!(email = %body.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state.users.find_by_email(&body.email).await?.is_some() {
        warn!(email = %body.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }
    if state.users.find_by_username(&body.username).await?.is_some() {
        warn!(username = %body.username, "username already taken");
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    let password_hash = hash_password(&body.password)
        .map_err(|e| ApiError::internal("Failed to register user", e))?;
    let link = new_activation_link();

    let user = state
        .users
        .create(NewUser {
            username: body.username,
            email: body.email,
            password_hash,
            is_activated: false,
            activation_link: Some(link.clone()),
            role: Role::User,
        })
        .await?;
    info!(user_id = user.id, username = %user.username, "user registered");

    send_activation(&state, &user.email, &link).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User registered. Check your email to activate the account",
        )),
    ))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = normalize_email(&body.email);

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(INVALID_CREDENTIALS);
    };

    let ok = verify_password(&body.password, &user.password_hash).unwrap_or_else(|e| {
        error!(error = %e, user_id = user.id, "stored password hash unreadable");
        false
    });
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(INVALID_CREDENTIALS);
    }

    let token = state
        .jwt
        .issue(&user)
        .map_err(|e| ApiError::internal("Failed to issue token", e))?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, link))]
pub async fn activate(
    State(state): State<AppState>,
    AppPath(link): AppPath<String>,
) -> ApiResult<Json<MessageResponse>> {
    let user = state
        .users
        .activate(&link)
        .await?
        .ok_or(ApiError::NotFound("Activation link not found"))?;

    info!(user_id = user.id, "account activated");
    Ok(Json(MessageResponse::new("Account activated")))
}

#[instrument(skip(state, claims))]
pub async fn resend_activation_link(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    const USER_NOT_FOUND: ApiError = ApiError::NotFound("User not found");

    let user = state
        .users
        .find_by_id(claims.user_id)
        .await?
        .ok_or(USER_NOT_FOUND)?;

    let link = new_activation_link();
    if !state.users.set_activation_link(user.id, &link).await? {
        return Err(USER_NOT_FOUND);
    }
    send_activation(&state, &user.email, &link).await?;

    info!(user_id = user.id, "activation link resent");
    Ok(Json(MessageResponse::new("Activation link sent")))
}

pub async fn user_info(AuthUser(claims): AuthUser) -> Json<UserInfo> {
    Json(UserInfo::from(claims))
}
