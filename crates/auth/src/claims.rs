use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskgate_core::PrincipalId;

use crate::AuthError;

/// Claims carried by a signed credential.
///
/// Serialized with the registered JWT names (`sub`, `iat`, `exp`) and
/// second-resolution timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// Issued-at timestamp.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// A credential is live strictly before `expires_at`.
    ///
    /// Only meaningful once the signature has been verified.
    pub fn ensure_unexpired(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        if now >= self.expires_at {
            return Err(AuthError::TokenExpired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_boundary_is_exclusive() {
        let issued = Utc::now();
        let cred = Credential {
            sub: PrincipalId::new(),
            issued_at: issued,
            expires_at: issued + Duration::seconds(60),
        };

        assert!(cred.ensure_unexpired(issued).is_ok());
        assert!(cred.ensure_unexpired(cred.expires_at - Duration::seconds(1)).is_ok());
        assert_eq!(cred.ensure_unexpired(cred.expires_at), Err(AuthError::TokenExpired));
    }

    #[test]
    fn serializes_registered_claim_names() {
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let cred = Credential {
            sub: PrincipalId::new(),
            issued_at: issued,
            expires_at: issued + Duration::hours(1),
        };

        let json = serde_json::to_value(&cred).unwrap();
        assert_eq!(json["iat"], 1_700_000_000);
        assert_eq!(json["exp"], 1_700_003_600);
        assert_eq!(json["sub"], cred.sub.to_string());
    }
}
