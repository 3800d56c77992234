//! API token signing and verification.
//!
//! Tokens are HS256 JWTs carrying `{"Allow": [...]}`, the same format the
//! upstream nodes issue, so existing client tooling can talk to the gateway.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{KeyInfo, Permission, JWT_SECRET_KEY_NAME, JWT_SECRET_KEY_TYPE};
use crate::domain::ports::Keystore;

/// Length in bytes of a generated signing secret.
pub const SECRET_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct JwtPayload {
    #[serde(rename = "Allow")]
    allow: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

/// HMAC signing secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecret(Vec<u8>);

impl ApiSecret {
    /// Fresh secret from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = vec![0_u8; SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn to_key_info(&self) -> KeyInfo {
        KeyInfo {
            key_type: JWT_SECRET_KEY_TYPE.to_string(),
            private_key: STANDARD.encode(&self.0),
        }
    }

    fn from_key_info(info: &KeyInfo) -> DomainResult<Self> {
        if info.key_type != JWT_SECRET_KEY_TYPE {
            return Err(DomainError::Keystore(format!(
                "unexpected key type {:?} for {JWT_SECRET_KEY_NAME}",
                info.key_type
            )));
        }
        STANDARD
            .decode(&info.private_key)
            .map(Self)
            .map_err(|e| DomainError::Keystore(format!("decoding {JWT_SECRET_KEY_NAME}: {e}")))
    }
}

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiSecret(<{} bytes>)", self.0.len())
    }
}

/// Signs and verifies permission-bearing tokens.
///
/// Deciding whether a verified permission set is enough for a method is left
/// to the caller; see [`require_permission`].
pub struct AuthGate {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl AuthGate {
    /// Gate signing and verifying with `secret`.
    pub fn new(secret: &ApiSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Node-issued tokens carry no registered claims at all.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Load the signing secret from `keystore`, generating and storing one on
    /// first use.
    ///
    /// When a secret is generated, an all-permission token signed with it is
    /// returned alongside so the caller can hand it to the operator.
    pub fn load_or_generate(keystore: &dyn Keystore) -> DomainResult<(Self, Option<String>)> {
        if let Some(info) = keystore.get(JWT_SECRET_KEY_NAME)? {
            let secret = ApiSecret::from_key_info(&info)?;
            return Ok((Self::new(&secret), None));
        }

        warn!("Generating new API secret");
        let secret = ApiSecret::generate();
        keystore.put(JWT_SECRET_KEY_NAME, &secret.to_key_info())?;

        let gate = Self::new(&secret);
        let admin_token = gate.sign(&Permission::ALL)?;
        info!("API secret stored in keystore");
        Ok((gate, Some(admin_token)))
    }

    /// Token granting `permissions`, without expiry.
    pub fn sign(&self, permissions: &[Permission]) -> DomainResult<String> {
        self.sign_payload(&JwtPayload {
            allow: permissions.to_vec(),
            exp: None,
        })
    }

    /// Sign a token that stops verifying after `ttl`.
    pub fn sign_with_expiry(
        &self,
        permissions: &[Permission],
        ttl: Duration,
    ) -> DomainResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DomainError::Authentication(e.to_string()))?;
        self.sign_payload(&JwtPayload {
            allow: permissions.to_vec(),
            exp: Some((now + ttl).as_secs()),
        })
    }

    fn sign_payload(&self, payload: &JwtPayload) -> DomainResult<String> {
        encode(&Header::new(Algorithm::HS256), payload, &self.encoding)
            .map_err(|e| DomainError::Authentication(format!("signing token: {e}")))
    }

    /// Check the signature (and expiry, if present) and return the granted permissions.
    pub fn verify(&self, token: &str) -> DomainResult<Vec<Permission>> {
        decode::<JwtPayload>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.allow)
            .map_err(|e| DomainError::Authentication(format!("JWT verification failed: {e}")))
    }
}

/// Fail with [`DomainError::PermissionDenied`] unless `granted` contains `required`.
pub fn require_permission(
    granted: &[Permission],
    method: &str,
    required: Permission,
) -> DomainResult<()> {
    if granted.contains(&required) {
        Ok(())
    } else {
        Err(DomainError::PermissionDenied {
            method: method.to_string(),
            required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MemoryKeystore;

    #[test]
    fn test_sign_verify_round_trip() {
        let gate = AuthGate::new(&ApiSecret::generate());
        let token = gate.sign(&[Permission::Admin]).unwrap();
        assert_eq!(gate.verify(&token).unwrap(), vec![Permission::Admin]);
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let token = AuthGate::new(&ApiSecret::generate())
            .sign(&[Permission::Read])
            .unwrap();
        let other = AuthGate::new(&ApiSecret::generate());
        assert!(matches!(
            other.verify(&token),
            Err(DomainError::Authentication(_))
        ));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let gate = AuthGate::new(&ApiSecret::generate());
        assert!(matches!(
            gate.verify("not-a-token"),
            Err(DomainError::Authentication(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = ApiSecret::generate();
        let gate = AuthGate::new(&secret);
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &JwtPayload {
                allow: vec![Permission::Read],
                exp: Some(1_000),
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        assert!(gate.verify(&expired).is_err());

        let fresh = gate
            .sign_with_expiry(&[Permission::Read], Duration::from_secs(60))
            .unwrap();
        assert_eq!(gate.verify(&fresh).unwrap(), vec![Permission::Read]);
    }

    #[test]
    fn test_load_or_generate_persists_secret() {
        let keystore = MemoryKeystore::default();
        let (first, admin_token) = AuthGate::load_or_generate(&keystore).unwrap();
        let admin_token = admin_token.expect("first run issues an admin token");
        assert_eq!(
            first.verify(&admin_token).unwrap(),
            Permission::ALL.to_vec()
        );

        let (second, none) = AuthGate::load_or_generate(&keystore).unwrap();
        assert!(none.is_none());
        assert_eq!(
            second.verify(&admin_token).unwrap(),
            Permission::ALL.to_vec()
        );

        let stored = keystore.get(JWT_SECRET_KEY_NAME).unwrap().unwrap();
        assert_eq!(stored.key_type, "jwt-hmac-secret");
        assert_eq!(
            STANDARD.decode(stored.private_key).unwrap().len(),
            SECRET_LEN
        );
    }

    #[test]
    fn test_require_permission() {
        assert!(require_permission(&[Permission::Read], "ChainHead", Permission::Read).is_ok());
        let err =
            require_permission(&[Permission::Read], "AuthNew", Permission::Admin).unwrap_err();
        assert_eq!(
            err,
            DomainError::PermissionDenied {
                method: "AuthNew".to_string(),
                required: Permission::Admin,
            }
        );
    }
}
