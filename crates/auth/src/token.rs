//! Credential issuance and verification (HS256 JWT).
//!
//! Verification is a pure function of `(raw token, keyring, now)`: the codec
//! holds no mutable state and can be shared across requests without locking.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Timelike, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use taskgate_core::PrincipalId;

use crate::{AuthError, Credential};

/// An HMAC secret together with the key id stamped into token headers.
#[derive(Clone)]
pub struct SigningKey {
    id: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn new(id: impl Into<String>, secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            id: id.into(),
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl core::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigningKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A previously active key, still accepted for verification until `accept_until`.
#[derive(Debug, Clone)]
pub struct RetiredKey {
    pub key: SigningKey,
    pub accept_until: DateTime<Utc>,
}

/// The set of keys the process signs and verifies with.
///
/// New credentials are always signed with the active key. Retired keys only
/// verify credentials whose header names them, and only until their deadline.
///
/// Rotation procedure:
/// 1. `rotate(next, now + token_ttl)`: `next` signs from now on, the old key
///    keeps verifying in-flight tokens.
/// 2. Once the deadline passes, `prune(now)` drops it (expired retired keys are
///    ignored even if never pruned).
#[derive(Debug, Clone)]
pub struct Keyring {
    active: SigningKey,
    retired: Vec<RetiredKey>,
}

impl Keyring {
    pub fn new(active: SigningKey) -> Self {
        Self {
            active,
            retired: Vec::new(),
        }
    }

    /// Register a retired key (e.g. loaded from configuration after a restart).
    ///
    /// The retired key's id must differ from the active key's, otherwise its
    /// tokens would be checked against the active secret.
    pub fn with_retired(
        mut self,
        key: SigningKey,
        accept_until: DateTime<Utc>,
    ) -> Result<Self, KeyringError> {
        if key.id == self.active.id {
            return Err(KeyringError::DuplicateKeyId(key.id));
        }
        self.retired.push(RetiredKey { key, accept_until });
        Ok(self)
    }

    /// Make `next` the active key and keep the current one until `grace_until`.
    ///
    /// `next` must carry a new key id: tokens in flight name the old one.
    pub fn rotate(self, next: SigningKey, grace_until: DateTime<Utc>) -> Result<Self, KeyringError> {
        if next.id == self.active.id {
            return Err(KeyringError::DuplicateKeyId(next.id));
        }
        let mut retired = self.retired;
        retired.retain(|r| r.key.id != next.id);
        retired.push(RetiredKey {
            key: self.active,
            accept_until: grace_until,
        });
        Ok(Self {
            active: next,
            retired,
        })
    }

    /// Drop retired keys whose grace window has closed.
    pub fn prune(mut self, now: DateTime<Utc>) -> Self {
        self.retired.retain(|r| now < r.accept_until);
        self
    }

    pub fn active(&self) -> &SigningKey {
        &self.active
    }

    pub fn retired(&self) -> &[RetiredKey] {
        &self.retired
    }

    fn verifying_key(&self, kid: Option<&str>, now: DateTime<Utc>) -> Option<&SigningKey> {
        match kid {
            None => Some(&self.active),
            Some(kid) if kid == self.active.id => Some(&self.active),
            Some(kid) => self
                .retired
                .iter()
                .find(|r| r.key.id == kid && now < r.accept_until)
                .map(|r| &r.key),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyringError {
    #[error("key id `{0}` is already the active key")]
    DuplicateKeyId(String),
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("token lifetime out of range")]
    TtlOutOfRange,

    #[error("failed to sign credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// A freshly signed credential and the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub token: String,
    pub credential: Credential,
}

/// Issues and verifies signed credentials.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    keys: Keyring,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(keys: Keyring) -> Self {
        // Expiry is checked by `Credential::ensure_unexpired` against the
        // caller-supplied clock, after the signature has been verified.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        Self { keys, validation }
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keys
    }

    /// Sign a credential for `subject` valid on `[now, now + ttl)`.
    ///
    /// A non-positive `ttl` yields a credential that is already expired.
    pub fn issue(
        &self,
        subject: PrincipalId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, IssueError> {
        let issued_at = now.with_nanosecond(0).ok_or(IssueError::TtlOutOfRange)?;
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .and_then(|t| t.with_nanosecond(0))
            .ok_or(IssueError::TtlOutOfRange)?;

        let credential = Credential {
            sub: subject,
            issued_at,
            expires_at,
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.keys.active.id.clone());
        let token = jsonwebtoken::encode(&header, &credential, &self.keys.active.encoding)?;

        Ok(IssuedCredential { token, credential })
    }

    /// Verify `raw` and return the full claim set.
    ///
    /// Order: structure, key selection, signature (constant-time HMAC
    /// comparison), payload decoding, then expiry.
    pub fn decode(&self, raw: &str, now: DateTime<Utc>) -> Result<Credential, AuthError> {
        let header = jsonwebtoken::decode_header(raw).map_err(|_| AuthError::TokenMalformed)?;
        if header.alg != Algorithm::HS256 {
            return Err(AuthError::SignatureInvalid);
        }

        let key = self
            .keys
            .verifying_key(header.kid.as_deref(), now)
            .ok_or(AuthError::SignatureInvalid)?;

        let data = jsonwebtoken::decode::<Credential>(raw, &key.decoding, &self.validation)
            .map_err(classify)?;

        data.claims.ensure_unexpired(now)?;
        Ok(data.claims)
    }

    /// Verify `raw` and return the subject.
    pub fn verify(&self, raw: &str, now: DateTime<Utc>) -> Result<PrincipalId, AuthError> {
        self.decode(raw, now).map(|c| c.sub)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
        _ => AuthError::TokenMalformed,
    }
}
