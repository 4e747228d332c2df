use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use habitat_core::SchedulerConfig;
use habitat_db::{Database, is_constraint_violation};
use habitat_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::{internal_error, run_blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Bearer secret for `GET /notifications/schedule`; `None` leaves it open.
    pub cron_secret: Option<String>,
    pub scheduler: SchedulerConfig,
}

const TOKEN_TTL_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();
    if !is_plausible_email(&email) || name.is_empty() || name.len() > 64 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user_id = Uuid::new_v4();
    let db = state.clone();
    let (id, em, nm) = (user_id.to_string(), email.clone(), name.clone());
    run_blocking(move || {
        if db.db.get_user_by_email(&em).map_err(internal_error)?.is_some() {
            return Err(StatusCode::CONFLICT);
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .to_string();

        // A concurrent registration can still win the race to the UNIQUE index.
        db.db.create_user(&id, &em, &nm, &password_hash).map_err(|e| {
            if is_constraint_violation(&e) {
                StatusCode::CONFLICT
            } else {
                internal_error(e)
            }
        })
    })
    .await?;

    let token = create_token(&state.jwt_secret, user_id, &name).map_err(internal_error)?;
    info!(user_id = %user_id, "User registered");

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let email = req.email.trim().to_lowercase();
    let user = run_blocking(move || {
        let user = db
            .db
            .get_user_by_email(&email)
            .map_err(internal_error)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // Verify password
        let parsed_hash =
            PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        Ok(user)
    })
    .await?;

    let user_id: Uuid = user.id.parse().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let token = create_token(&state.jwt_secret, user_id, &user.name).map_err(internal_error)?;

    Ok(Json(LoginResponse {
        user_id,
        name: user.name,
        token,
    }))
}

/// GET /me: the caller's profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let user = run_blocking(move || {
        db.db
            .get_user_by_id(&user_id)
            .map_err(internal_error)?
            .ok_or(StatusCode::NOT_FOUND)?
            .into_user()
            .map_err(internal_error)
    })
    .await?;
    Ok(Json(user))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && email.len() <= 254,
        None => false,
    }
}

pub fn create_token(secret: &str, user_id: Uuid, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("nobody"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("a@localhost"));
    }
}
