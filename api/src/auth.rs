use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use entity::user;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, ApiResult, validation};

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("AUTH_SECRET").unwrap_or_else(|_| "dev-secret".into());
        let session_ttl_minutes = std::env::var("SESSION_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60);
        Self {
            jwt_secret,
            session_ttl_minutes,
        }
    }

    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum UserRole {
    Admin,
    Sales,
    Viewer,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Sales => "SALES",
            UserRole::Viewer => "VIEWER",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(UserRole::Admin),
            "SALES" => Some(UserRole::Sales),
            "VIEWER" => Some(UserRole::Viewer),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            UserRole::Admin => 3,
            UserRole::Sales => 2,
            UserRole::Viewer => 1,
        }
    }
}

impl From<user::Role> for UserRole {
    fn from(value: user::Role) -> Self {
        match value {
            user::Role::Admin => UserRole::Admin,
            user::Role::Sales => UserRole::Sales,
            user::Role::Viewer => UserRole::Viewer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role.level() >= role.level()
    }
}

pub fn require_role(current: &CurrentUser, role: UserRole) -> ApiResult<()> {
    if current.has_role(role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn issue_token(
    user_id: Uuid,
    role: UserRole,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        role: role.as_str().to_string(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("password hash failed: {}", err)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let text = value.to_str().ok()?;
    text.strip_prefix("Bearer ")
        .map(|rest| rest.trim().to_string())
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers()).ok_or(ApiError::Unauthorized)?;
    let claims = decode_token(&token, &state.auth).map_err(|_| ApiError::Unauthorized)?;
    let user = user::Entity::find_by_id(claims.sub)
        .one(state.db.as_ref())
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if !user.is_active {
        return Err(ApiError::Unauthorized);
    }
    let current = CurrentUser {
        user_id: user.id,
        role: user.role.into(),
    };
    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: user::Model,
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let normalized = normalize_email(&input.email)?;
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(normalized))
        .one(state.db.as_ref())
        .await?;
    let Some(user) = user else {
        return Err(validation("invalid credentials"));
    };
    if !user.is_active || !verify_password(&input.password, &user.password_hash) {
        return Err(validation("invalid credentials"));
    }
    let token = issue_token(user.id, user.role.into(), &state.auth)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("failed to issue token: {}", err)))?;
    Ok(Json(LoginResponse { token, user }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<user::Model>> {
    let user = user::Entity::find_by_id(current.user_id)
        .one(state.db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user))
}

pub fn normalize_email(value: &str) -> ApiResult<String> {
    let trimmed = value.trim().to_ascii_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(validation("a valid email is required"));
    }
    Ok(trimmed)
}
