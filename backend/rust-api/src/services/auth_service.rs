use bcrypt::{hash, verify, DEFAULT_COST};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics::USERS_REGISTERED_TOTAL;
use crate::middlewares::auth::JwtService;
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest, User};

pub struct AuthService {
    db: PgPool,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(db: PgPool, jwt_service: JwtService) -> Self {
        Self { db, jwt_service }
    }

    /// Hash a password using bcrypt with cost 12
    pub fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("Failed to hash password")))
    }

    /// Verify a password against a hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        verify(password, hash).map_err(|e| {
            ApiError::Internal(anyhow::Error::new(e).context("Failed to verify password"))
        })
    }

    /// Register a new user
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ApiError> {
        // Check if user already exists
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
                .bind(&req.email)
                .fetch_optional(&self.db)
                .await?;

        if existing.is_some() {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = self.hash_password(&req.password)?;

        let insert = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await;

        let user = match insert {
            Ok(user) => user,
            // A concurrent registration can slip past the pre-check; the
            // unique constraints on email/username are authoritative.
            Err(e) if is_unique_violation(&e) => {
                return Err(ApiError::Conflict(
                    "User with this email or username already exists".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        USERS_REGISTERED_TOTAL.inc();
        tracing::info!(user_id = %user.id, "User registered successfully");

        let token = self.jwt_service.issue_token(user.id, &user.email)?;

        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    /// Login user with email and password
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        // The same message is returned for an unknown email and a wrong
        // password so accounts cannot be enumerated.
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&req.email)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::Auth("Invalid email or password".to_string()))?;

        if !self.verify_password(&req.password, &user.password_hash)? {
            tracing::warn!(email = %req.email, "Failed login attempt: invalid password");
            return Err(ApiError::Auth("Invalid email or password".to_string()));
        }

        tracing::info!(user_id = %user.id, "Successful login");

        let token = self.jwt_service.issue_token(user.id, &user.email)?;

        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Validate a token and resolve its subject to an existing user
    pub async fn verify_token(&self, token: &str) -> Result<User, ApiError> {
        let claims = self.jwt_service.validate_token(token)?;
        let user_id = claims.user_id()?;

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::Auth("Invalid token - user not found".to_string()))
    }

    /// Issue a fresh token for an already-authenticated subject
    pub async fn refresh_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let user = self.get_user_by_id(user_id).await?;
        Ok(self.jwt_service.issue_token(user.id, &user.email)?)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}
