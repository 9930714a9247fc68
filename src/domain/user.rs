use crate::error::{PosError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    #[default]
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Staff => "staff",
        }
    }
}

impl FromStr for Role {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "owner" => Ok(Self::Owner),
            "staff" => Ok(Self::Staff),
            _ => Err(PosError::validation("Role must be owner or staff")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

/// A staff or owner account.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: u64,
    pub name: String,
    /// Always stored lower-cased.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user; the store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
}

/// The user as exposed over the API (no secrets).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn reset_token_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        matches!(
            (&self.reset_token, self.reset_token_expires),
            (Some(stored), Some(expires)) if stored == token && expires > now
        )
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal syntactic check: one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain.contains('.')
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(PosError::validation("Please include a valid email"))
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(PosError::validation(format!(
            "Please enter a password with {MIN_PASSWORD_LEN} or more characters"
        )))
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(PosError::validation("Name is required"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            name: "Sari".into(),
            email: "sari@example.com".into(),
            password_hash: "x".into(),
            role: Role::Staff,
            status: UserStatus::Active,
            reset_token: Some("tok".into()),
            reset_token_expires: Some(now + Duration::hours(1)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("owner@resto.id").is_ok());
        assert!(validate_email("a.b@mail.co.id").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@resto.id").is_err());
        assert!(validate_email("owner@localhost").is_err());
        assert!(validate_email("owner@resto..id").is_err());
        assert!(validate_email("own er@resto.id").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
        assert!("cashier".parse::<Role>().is_err());
    }

    #[test]
    fn test_reset_token_expiry() {
        let mut u = user();
        let now = Utc::now();
        assert!(u.reset_token_valid("tok", now));
        assert!(!u.reset_token_valid("other", now));
        u.reset_token_expires = Some(now - Duration::seconds(1));
        assert!(!u.reset_token_valid("tok", now));
    }

    #[test]
    fn test_public_user_hides_secrets() {
        let json = serde_json::to_value(PublicUser::from(&user())).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("resetToken").is_none());
        assert_eq!(json["role"], "staff");
    }
}
