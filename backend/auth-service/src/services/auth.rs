//! Account and session lifecycle.

use chrono::{Duration, Utc};
use redis::AsyncCommands;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{session_repo, user_repo};
use crate::error::{AuthError, Result};
use crate::models::User;
use crate::security::{jwt, password};
use crate::AppState;

/// Claims cache entries live as long as the access token.
fn token_cache_key(token: &str) -> String {
    format!("auth:token:{}", jwt::hash_token(token))
}

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

pub async fn register(state: &AppState, email: &str, pwd: &str, nickname: &str) -> Result<User> {
    password::check_registration_input(email, pwd)?;

    if user_repo::find_by_email(&state.db, email).await?.is_some() {
        return Err(AuthError::EmailAlreadyExists);
    }

    let user_id = Uuid::new_v4().to_string();
    let hashed = password::hash_password(pwd)?;
    let nickname = if nickname.is_empty() {
        email.split('@').next().unwrap_or(email)
    } else {
        nickname
    };

    let user = user_repo::create(&state.db, &user_id, email, &hashed, nickname).await?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

pub async fn login(
    state: &AppState,
    email: &str,
    pwd: &str,
    device_info: &str,
    ip_address: &str,
) -> Result<(TokenPair, User)> {
    let user = user_repo::find_by_email(&state.db, email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !user.is_active() {
        return Err(AuthError::AccountDisabled);
    }
    if !password::verify_password(pwd, &user.password)? {
        return Err(AuthError::InvalidCredentials);
    }

    // Enforce the per-user live-session cap by evicting the oldest.
    let session_count = session_repo::count_user_sessions(&state.db, &user.id).await?;
    if session_count >= state.config.session.max_per_user {
        session_repo::delete_oldest_session(&state.db, &user.id).await?;
        info!(user_id = %user.id, "evicted oldest session at cap");
    }

    let pair = issue_tokens(state, &user, device_info, ip_address).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((pair, user))
}

async fn issue_tokens(
    state: &AppState,
    user: &User,
    device_info: &str,
    ip_address: &str,
) -> Result<TokenPair> {
    let access_token =
        jwt::generate_access_token(&state.config.jwt, &user.id, &user.email, &user.role)?;
    let refresh_token = jwt::generate_refresh_token();
    let expires_at = Utc::now() + Duration::seconds(state.config.jwt.refresh_ttl_secs);

    session_repo::create(
        &state.db,
        &user.id,
        &refresh_token,
        &jwt::hash_token(&access_token),
        device_info,
        ip_address,
        expires_at,
    )
    .await?;

    cache_claims(state, &access_token, user).await;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: state.config.jwt.access_ttl_secs,
    })
}

/// Write-through claims cache consulted by the gateway middleware and
/// the progress socket auth.
async fn cache_claims(state: &AppState, token: &str, user: &User) {
    let key = token_cache_key(token);
    let mut conn = state.redis.clone();
    let fields = [
        ("user_id", user.id.as_str()),
        ("email", user.email.as_str()),
        ("role", user.role.as_str()),
    ];
    let result: redis::RedisResult<()> = async {
        conn.hset_multiple::<_, _, _, ()>(&key, &fields).await?;
        conn.expire::<_, ()>(&key, state.config.jwt.access_ttl_secs)
            .await?;
        Ok(())
    }
    .await;

    if let Err(e) = result {
        warn!(error = %e, "failed to cache token claims");
    }
}

pub async fn verify_token(state: &AppState, token: &str) -> Result<jwt::Claims> {
    let claims = jwt::verify_access_token(&state.config.jwt, token)?;
    Ok(claims)
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<(String, i64)> {
    let session = session_repo::find_by_refresh_token(&state.db, refresh_token)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    let user = user_repo::find_by_id(&state.db, &session.user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    if !user.is_active() {
        return Err(AuthError::AccountDisabled);
    }

    let access_token =
        jwt::generate_access_token(&state.config.jwt, &user.id, &user.email, &user.role)?;
    session_repo::touch(&state.db, session.id, &jwt::hash_token(&access_token)).await?;
    cache_claims(state, &access_token, &user).await;

    Ok((access_token, state.config.jwt.access_ttl_secs))
}

pub async fn logout(state: &AppState, token: &str) -> Result<()> {
    session_repo::delete_by_token_hash(&state.db, &jwt::hash_token(token)).await?;

    let mut conn = state.redis.clone();
    let result: redis::RedisResult<()> = conn.del(token_cache_key(token)).await;
    if let Err(e) = result {
        warn!(error = %e, "failed to drop token cache entry");
    }
    Ok(())
}

pub async fn get_user(state: &AppState, user_id: &str) -> Result<User> {
    user_repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::UserNotFound)
}

pub async fn update_profile(state: &AppState, user_id: &str, nickname: &str) -> Result<User> {
    if nickname.is_empty() || nickname.len() > 64 {
        return Err(AuthError::Validation(
            "nickname must be 1-64 characters".into(),
        ));
    }
    user_repo::update_nickname(&state.db, user_id, nickname).await?;
    get_user(state, user_id).await
}

/// Change the password and revoke every live session.
pub async fn change_password(
    state: &AppState,
    user_id: &str,
    old_password: &str,
    new_password: &str,
) -> Result<()> {
    let user = get_user(state, user_id).await?;
    if !password::verify_password(old_password, &user.password)? {
        return Err(AuthError::InvalidCredentials);
    }
    if !password::validate_password(new_password) {
        return Err(AuthError::Validation(
            "password must be at least 8 characters with letters and digits".into(),
        ));
    }

    user_repo::update_password(&state.db, user_id, &password::hash_password(new_password)?).await?;
    session_repo::delete_user_sessions(&state.db, user_id).await?;
    info!(user_id = %user_id, "password changed, sessions revoked");
    Ok(())
}
