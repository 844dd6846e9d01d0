use std::collections::HashSet;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use folio_db::Database;
use folio_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::invalid("Username must be 3 to 32 characters."));
    }
    if req.password.len() < 8 {
        return Err(ApiError::invalid("Password must be at least 8 characters."));
    }

    // Admin accounts are seeded by the operator, never claimed here
    if state.admins.contains(&req.username) {
        warn!("Refused public registration of admin name {}", req.username);
        return Err(ApiError::Conflict("Username is reserved.".into()));
    }

    let username = req.username.clone();
    if state
        .blocking(move |db| db.get_user_by_username(&username))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Username is already taken.".into()));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::Store)?;

    let user_id = Uuid::new_v4();
    let username = req.username.clone();
    let created = state
        .blocking(move |db| db.create_user(&user_id.to_string(), &username, &password_hash))
        .await?;
    // Lost a race with a concurrent registration of the same name
    if !created {
        return Err(ApiError::Conflict("Username is already taken.".into()));
    }

    let token = create_token(&state.jwt_secret, user_id, &req.username, false)
        .map_err(ApiError::Store)?;

    info!("Registered {} ({})", req.username, user_id);
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let user = state
        .blocking(move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Store(anyhow::anyhow!("corrupt password hash: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Store(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let admin = state.admins.contains(&user.username);
    let token = create_token(&state.jwt_secret, user_id, &user.username, admin)
        .map_err(ApiError::Store)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        admin,
        token,
    }))
}

/// Anonymous sign-in: a fresh reader identity with no account behind it.
pub async fn anonymous(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let user_id = Uuid::new_v4();
    let username = format!("reader-{}", &user_id.simple().to_string()[..8]);
    let token = create_token(&state.jwt_secret, user_id, &username, false)
        .map_err(ApiError::Store)?;

    Ok(Json(LoginResponse {
        user_id,
        username,
        admin: false,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str, admin: bool) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        admin,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Create an account for every configured admin that has none yet.
/// Existing accounts keep their password. Blocking.
pub fn seed_admins(db: &Database, admins: &HashSet<String>, password: &str) -> anyhow::Result<usize> {
    let mut created = 0;
    for username in admins {
        if db.get_user_by_username(username)?.is_some() {
            continue;
        }
        let hash = hash_password(password)?;
        if db.create_user(&Uuid::new_v4().to_string(), username, &hash)? {
            info!("Seeded admin account {}", username);
            created += 1;
        }
    }
    Ok(created)
}
