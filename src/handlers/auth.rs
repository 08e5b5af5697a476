//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use validator::Validate;

use crate::{AppState, AppError, AppResult};
use crate::middleware::auth::{generate_jwt, UserContext};
use crate::models::{
    AuthResponse, ChangePassword, LoginRequest, RegisterRequest, UpdateProfile, User, UserInfo, UserRole,
};

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .to_string())
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::InternalError("Invalid password hash".to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

async fn current_user(state: &AppState, ctx: &UserContext) -> AppResult<User> {
    User::find_by_id(&state.pool, ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Register a new teacher or admin account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    if User::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::AlreadyExists("Email already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let role = req.role.unwrap_or(UserRole::Teacher);
    let user = User::create(&state.pool, req.name.trim(), &email, &password_hash, role).await?;

    let token = generate_jwt(&user, &state.config.jwt_secret, state.config.jwt_expiration_hours)?;

    tracing::info!("New user registered: {} ({}, {})", user.email, user.id, user.role);

    Ok((StatusCode::CREATED, Json(AuthResponse {
        token,
        user: user.to_info(),
    })))
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.pool, &req.email.trim().to_lowercase())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    if !user.active {
        return Err(AppError::AccountInactive);
    }

    User::update_last_login(&state.pool, user.id).await?;

    let token = generate_jwt(&user, &state.config.jwt_secret, state.config.jwt_expiration_hours)?;

    tracing::debug!("User logged in: {}", user.id);

    Ok(Json(AuthResponse {
        token,
        user: user.to_info(),
    }))
}

/// Current user profile
pub async fn me(
    State(state): State<AppState>,
    ctx: UserContext,
) -> AppResult<Json<User>> {
    Ok(Json(current_user(&state, &ctx).await?))
}

/// Update name, email or profile picture
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: UserContext,
    Json(mut req): Json<UpdateProfile>,
) -> AppResult<Json<UserInfo>> {
    req.validate()?;

    if let Some(email) = req.email.as_mut() {
        *email = email.trim().to_lowercase();
        if User::email_taken_by_other(&state.pool, email, ctx.user_id).await? {
            return Err(AppError::AlreadyExists("Email already in use".to_string()));
        }
    }

    let user = User::update_profile(&state.pool, ctx.user_id, &req).await?;
    tracing::info!("Profile updated: {}", user.id);

    Ok(Json(user.to_info()))
}

/// Change password after verifying the current one
pub async fn change_password(
    State(state): State<AppState>,
    ctx: UserContext,
    Json(req): Json<ChangePassword>,
) -> AppResult<Json<serde_json::Value>> {
    req.validate()?;

    let user = current_user(&state, &ctx).await?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(AppError::ValidationError("Current password is incorrect".to_string()));
    }

    let password_hash = hash_password(&req.new_password)?;
    User::update_password(&state.pool, user.id, &password_hash).await?;

    tracing::info!("Password changed: {}", user.id);

    Ok(Json(serde_json::json!({ "message": "Password updated successfully" })))
}
