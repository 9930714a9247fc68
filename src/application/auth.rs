//! Accounts, password hashing and bearer tokens.

use crate::domain::ports::{MailerRef, UserInsert, UserStoreRef};
use crate::domain::user::{
    NewUser, PublicUser, Role, User, UserStatus, normalize_email, validate_email, validate_name,
    validate_password,
};
use crate::error::{PosError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const BCRYPT_COST: u32 = 10;
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Parses a token lifetime such as `7d`, `12h`, `30m`, `45s` or bare seconds.
/// Lifetimes beyond `MAX_TOKEN_TTL_DAYS` are rejected.
pub fn parse_expiry(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || PosError::Config(format!("Invalid token lifetime: {raw}"));
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        Some(_) => (raw, 's'),
        None => return Err(invalid()),
    };
    let n: i64 = digits.parse().map_err(|_| invalid())?;
    if n <= 0 {
        return Err(invalid());
    }
    let ttl = match unit {
        's' => Duration::try_seconds(n),
        'm' => Duration::try_minutes(n),
        'h' => Duration::try_hours(n),
        'd' => Duration::try_days(n),
        _ => None,
    }
    .ok_or_else(invalid)?;
    if ttl > Duration::days(MAX_TOKEN_TTL_DAYS) {
        return Err(invalid());
    }
    Ok(ttl)
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub frontend_url: String,
    pub hash_cost: u32,
}

impl AuthSettings {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::days(7),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            hash_cost: BCRYPT_COST,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AuthOutcome {
    pub token: String,
    pub user: PublicUser,
}

/// Owner-side account creation.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StaffInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StaffPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserStoreRef,
    mailer: MailerRef,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(users: UserStoreRef, mailer: MailerRef, settings: AuthSettings) -> Self {
        Self {
            users,
            mailer,
            settings,
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.settings.hash_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| PosError::Internal(e.to_string()))?
            .map_err(|e| PosError::Internal(e.to_string()))
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| PosError::Internal(e.to_string()))?;
        // A malformed stored hash never matches.
        Ok(verified.unwrap_or(false))
    }

    fn issue_token(&self, user: &User) -> Result<String> {
        if self.settings.jwt_secret.is_empty() {
            return Err(PosError::Config("JWT_SECRET is required".into()));
        }
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.settings.token_ttl)
            .ok_or_else(|| PosError::Config("Token lifetime is out of range".into()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
        )
        .map_err(|e| PosError::Internal(e.to_string()))
    }

    fn email_taken() -> PosError {
        PosError::Conflict("Email already registered".into())
    }

    fn registration_closed() -> PosError {
        PosError::Forbidden("Registration is closed. Owner must create staff accounts.".into())
    }

    // Early exit before paying for a hash; the store re-checks on insert.
    async fn ensure_email_free(&self, email: &str, except: Option<u64>) -> Result<()> {
        match self.users.find_by_email(email).await? {
            Some(existing) if Some(existing.id) != except => Err(Self::email_taken()),
            _ => Ok(()),
        }
    }

    /// Validates and inserts an account. With `first_owner` the insert is
    /// refused once any owner exists.
    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        status: UserStatus,
        first_owner: bool,
    ) -> Result<UserInsert> {
        validate_name(name)?;
        validate_email(email)?;
        validate_password(password)?;
        let email = normalize_email(email);
        self.ensure_email_free(&email, None).await?;

        let password_hash = self.hash_password(password).await?;
        let inserted = self
            .users
            .create_unique(
                NewUser {
                    name: name.trim().to_string(),
                    email,
                    password_hash,
                    role,
                    status,
                },
                first_owner,
            )
            .await?;
        if let UserInsert::Created(user) = &inserted {
            tracing::info!(user_id = user.id, role = ?user.role, "account created");
        }
        Ok(inserted)
    }

    async fn create_member(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        status: UserStatus,
    ) -> Result<User> {
        match self
            .create_account(name, email, password, role, status, false)
            .await?
        {
            UserInsert::Created(user) => Ok(user),
            UserInsert::EmailTaken | UserInsert::OwnerExists => Err(Self::email_taken()),
        }
    }

    /// First-run registration; creates the owner. Closed once an owner exists.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthOutcome> {
        if self.users.owner_exists().await? {
            return Err(Self::registration_closed());
        }
        let user = match self
            .create_account(name, email, password, Role::Owner, UserStatus::Active, true)
            .await?
        {
            UserInsert::Created(user) => user,
            UserInsert::EmailTaken => return Err(Self::email_taken()),
            UserInsert::OwnerExists => return Err(Self::registration_closed()),
        };
        let token = self.issue_token(&user)?;
        Ok(AuthOutcome {
            token,
            user: PublicUser::from(&user),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome> {
        let invalid = || PosError::Unauthorized("Invalid credentials".into());
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;
        if !self.verify_password(password, &user.password_hash).await? {
            tracing::warn!(user_id = user.id, "failed login");
            return Err(invalid());
        }
        if !user.is_active() {
            return Err(PosError::Forbidden("Account is inactive".into()));
        }
        let token = self.issue_token(&user)?;
        Ok(AuthOutcome {
            token,
            user: PublicUser::from(&user),
        })
    }

    /// Resolves a bearer token to an active user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let unauthorized = || PosError::Unauthorized("Not authorized, token failed".into());
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| unauthorized())?;
        let id: u64 = data.claims.sub.parse().map_err(|_| unauthorized())?;
        match self.users.get(id).await? {
            Some(user) if user.is_active() => Ok(user),
            _ => Err(unauthorized()),
        }
    }

    pub fn authorize(user: &User, roles: &[Role]) -> Result<()> {
        if roles.contains(&user.role) {
            Ok(())
        } else {
            Err(PosError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                user.role.as_str()
            )))
        }
    }

    pub async fn list_users(&self) -> Result<Vec<PublicUser>> {
        Ok(self.users.list().await?.iter().map(PublicUser::from).collect())
    }

    pub async fn create_staff_user(&self, name: &str, email: &str, password: &str) -> Result<PublicUser> {
        let user = self
            .create_member(name, email, password, Role::Staff, UserStatus::Active)
            .await?;
        Ok(PublicUser::from(&user))
    }

    pub async fn update_role(&self, id: u64, role: Role) -> Result<PublicUser> {
        let mut user = self.get_user(id).await?;
        user.role = role;
        user.updated_at = Utc::now();
        self.users.update(user.clone()).await?;
        Ok(PublicUser::from(&user))
    }

    pub async fn delete_user(&self, id: u64) -> Result<()> {
        if self.users.delete(id).await? {
            tracing::info!(user_id = id, "account deleted");
            Ok(())
        } else {
            Err(PosError::not_found("User not found"))
        }
    }

    async fn get_user(&self, id: u64) -> Result<User> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| PosError::not_found("User not found"))
    }

    pub async fn create_staff(&self, input: StaffInput) -> Result<PublicUser> {
        let user = self
            .create_member(
                &input.name,
                &input.email,
                &input.password,
                input.role.unwrap_or_default(),
                input.status.unwrap_or_default(),
            )
            .await?;
        Ok(PublicUser::from(&user))
    }

    pub async fn update_staff(&self, id: u64, patch: StaffPatch) -> Result<PublicUser> {
        let mut user = self.get_user(id).await?;
        if let Some(name) = patch.name {
            validate_name(&name)?;
            user.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            validate_email(&email)?;
            let email = normalize_email(&email);
            self.ensure_email_free(&email, Some(id)).await?;
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(status) = patch.status {
            user.status = status;
        }
        user.updated_at = Utc::now();
        if !self.users.update_unique(user.clone()).await? {
            return Err(Self::email_taken());
        }
        Ok(PublicUser::from(&user))
    }

    /// Starts a password reset. Succeeds silently for unknown emails.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        validate_email(email)?;
        let Some(mut user) = self.users.find_by_email(&normalize_email(email)).await? else {
            tracing::info!("password reset requested for unknown email");
            return Ok(());
        };

        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        user.reset_token = Some(token.clone());
        user.reset_token_expires = Some(now + Duration::hours(RESET_TOKEN_TTL_HOURS));
        user.updated_at = now;
        self.users.update(user.clone()).await?;

        let reset_url = format!(
            "{}/reset-password?token={}",
            self.settings.frontend_url.trim_end_matches('/'),
            token
        );
        self.mailer.send_password_reset(&user.email, &reset_url).await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<()> {
        validate_password(password)?;
        let invalid = || PosError::validation("Invalid or expired reset token");
        let mut user = self
            .users
            .find_by_reset_token(token)
            .await?
            .ok_or_else(invalid)?;
        let now = Utc::now();
        if !user.reset_token_valid(token, now) {
            return Err(invalid());
        }
        user.password_hash = self.hash_password(password).await?;
        user.reset_token = None;
        user.reset_token_expires = None;
        user.updated_at = now;
        self.users.update(user).await
    }

    /// Creates the owner account unless one already exists.
    pub async fn seed_owner(&self, name: &str, email: &str, password: &str) -> Result<Option<PublicUser>> {
        if self.users.owner_exists().await? {
            return Ok(None);
        }
        match self
            .create_account(name, email, password, Role::Owner, UserStatus::Active, true)
            .await?
        {
            UserInsert::Created(user) => Ok(Some(PublicUser::from(&user))),
            UserInsert::OwnerExists => Ok(None),
            UserInsert::EmailTaken => Err(Self::email_taken()),
        }
    }

    /// Sets a new password for `email` directly (operator recovery).
    pub async fn set_password(&self, email: &str, password: &str) -> Result<PublicUser> {
        validate_password(password)?;
        let mut user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| PosError::not_found("User not found"))?;
        user.password_hash = self.hash_password(password).await?;
        user.updated_at = Utc::now();
        self.users.update(user.clone()).await?;
        Ok(PublicUser::from(&user))
    }
}
