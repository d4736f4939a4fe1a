//! User accounts: the authentication records behind principals.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};

use taskgate_core::text::{looks_like_email, normalize_email};
use taskgate_core::{DomainError, DomainResult, PrincipalId};

pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 255;

/// A registered user.
///
/// `password_hash` is an Argon2id PHC string; it is never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: PrincipalId,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl core::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl UserAccount {
    /// Validate registration input and hash the password.
    pub fn register(email: &str, password: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let email = parse_email(email)?;

        let len = password.chars().count();
        if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len) {
            return Err(DomainError::validation(format!(
                "password must be between {PASSWORD_MIN_CHARS} and {PASSWORD_MAX_CHARS} characters"
            )));
        }

        Ok(Self {
            id: PrincipalId::new(),
            email,
            password_hash: hash_password(password)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
            tracing::error!(principal_id = %self.id, "stored password hash is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Normalize and validate an email address.
pub fn parse_email(raw: &str) -> DomainResult<String> {
    let email = normalize_email(raw);
    if email.chars().count() > EMAIL_MAX_CHARS || !looks_like_email(&email) {
        return Err(DomainError::validation("a valid email address is required"));
    }
    Ok(email)
}

fn hash_password(password: &str) -> DomainResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::validation(format!("password could not be hashed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_normalizes_email_and_hashes_password() {
        let account = UserAccount::register("  Alice@Example.com ", "correct horse", Utc::now()).unwrap();

        assert_eq!(account.email, "alice@example.com");
        assert!(account.password_hash.starts_with("$argon2"));
        assert!(account.verify_password("correct horse"));
        assert!(!account.verify_password("battery staple"));
    }

    #[test]
    fn register_rejects_short_password_and_bad_email() {
        assert!(matches!(
            UserAccount::register("bob@example.com", "short", Utc::now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            UserAccount::register("bob-at-example", "long enough", Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn debug_redacts_hash() {
        let account = UserAccount::register("carol@example.com", "hunter2hunter2", Utc::now()).unwrap();
        let rendered = format!("{account:?}");
        assert!(!rendered.contains(&account.password_hash));
    }
}
