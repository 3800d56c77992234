use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Capability granted by an API token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Read chain and miner state
    Read,
    /// Send messages and change node state
    Write,
    /// Sign with wallet keys
    Sign,
    /// Manage tokens and node settings
    Admin,
}

impl Permission {
    /// Every permission, weakest first.
    pub const ALL: [Self; 4] = [Self::Read, Self::Write, Self::Sign, Self::Admin];

    /// Lowercase name as used in tokens.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Sign => "sign",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "sign" => Ok(Self::Sign),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("unknown permission: {s}")),
        }
    }
}

/// Keystore record type for the API signing secret.
pub const JWT_SECRET_KEY_TYPE: &str = "jwt-hmac-secret";

/// Keystore entry name of the API signing secret.
pub const JWT_SECRET_KEY_NAME: &str = "auth-jwt-private";

/// A keystore record. `private_key` is standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Key type such as [`JWT_SECRET_KEY_TYPE`]
    #[serde(rename = "Type")]
    pub key_type: String,
    /// Base64 key bytes
    #[serde(rename = "PrivateKey")]
    pub private_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_round_trips_through_str() {
        for perm in Permission::ALL {
            assert_eq!(perm.as_str().parse::<Permission>().unwrap(), perm);
        }
        assert!("root".parse::<Permission>().is_err());
    }

    #[test]
    fn test_permission_serializes_lowercase() {
        let json = serde_json::to_string(&vec![Permission::Read, Permission::Admin]).unwrap();
        assert_eq!(json, r#"["read","admin"]"#);
    }
}
