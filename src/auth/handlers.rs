use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            PublicUser, RefreshRequest, SignupRequest, TokenRequest, TokenResponse,
            UpdateProfileRequest,
        },
        extractors::{load_active_user, CurrentUser},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::is_unique_violation,
        repo_types::User,
        services::{validate_credentials, validate_profile_update, validate_signup},
    },
    error::{AppError, AppResult, FieldErrors, NON_FIELD_ERRORS},
    state::AppState,
};

const EMAIL_TAKEN: &str = "user with this email already exists.";
const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create/", post(create_user))
        .route("/user/token/", post(create_token))
        .route("/user/token/refresh/", post(refresh_token))
        .route("/user/me/", get(get_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let Json(payload) = payload?;
    let new_user = validate_signup(payload)?;

    if User::find_by_email(&state.db, &new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(AppError::Validation(FieldErrors::single("email", EMAIL_TAKEN)));
    }

    let hash = hash_password(&new_user.password)?;
    let user = match User::create(&state.db, &new_user.email, &new_user.name, &hash).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %new_user.email, "email registered concurrently");
            return Err(AppError::Validation(FieldErrors::single("email", EMAIL_TAKEN)));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let creds = validate_credentials(payload)?;
    let bad_credentials =
        || AppError::Validation(FieldErrors::single(NON_FIELD_ERRORS, BAD_CREDENTIALS));

    let Some(user) = User::find_by_email(&state.db, &creds.email).await? else {
        warn!(email = %creds.email, "login unknown email");
        return Err(bad_credentials());
    };

    if !verify_password(&creds.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(bad_credentials());
    }
    if !user.is_active {
        warn!(user_id = %user.id, "login inactive user");
        return Err(bad_credentials());
    }

    let response = issue_tokens(&state, user)?;
    info!(user_id = %response.user.id, "token issued");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::unauthorized("Invalid or expired token")
    })?;

    let user = load_active_user(&state, claims.sub).await?;
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> AppResult<Json<PublicUser>> {
    Ok(Json(user.into()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Json<PublicUser>> {
    let Json(payload) = payload?;
    let changes = validate_profile_update(payload)?;
    let user_id = user.id;

    if let Some(email) = changes.email.as_deref() {
        if let Some(other) = User::find_by_email(&state.db, email).await? {
            if other.id != user_id {
                return Err(AppError::Validation(FieldErrors::single("email", EMAIL_TAKEN)));
            }
        }
    }

    let user = match User::update(&state.db, user_id, &changes).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err(AppError::unauthorized("User not found")),
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Validation(FieldErrors::single("email", EMAIL_TAKEN)));
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        user_id = %user.id,
        password_changed = changes.password_hash.is_some(),
        "profile updated"
    );
    Ok(Json(user.into()))
}

fn issue_tokens(state: &AppState, user: User) -> AppResult<TokenResponse> {
    let keys = JwtKeys::from_ref(state);
    Ok(TokenResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user: user.into(),
    })
}
