// 👤 User Entity - accountants, regional managers, admins

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Accountant,
    #[default]
    Manager,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Accountant => "accountant",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "accountant" => Ok(UserRole::Accountant),
            "manager" => Ok(UserRole::Manager),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,

    /// SHA-256 hex digest of the password, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub name: String,
    pub role: UserRole,

    /// Region a manager is responsible for (empty for accountants)
    pub region: String,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, password: &str, name: &str, role: UserRole, region: &str) -> Self {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            password_hash: hash_password(password),
            name: name.trim().to_string(),
            role,
            region: region.trim().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash == hash_password(password)
    }
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_hashed_and_verified() {
        let user = User::new("Boss@Example.com ", "secret", "Анна", UserRole::Accountant, "");

        assert_eq!(user.email, "boss@example.com");
        assert_ne!(user.password_hash, "secret");
        assert_eq!(user.password_hash.len(), 64);
        assert!(user.verify_password("secret"));
        assert!(!user.verify_password("Secret"));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("m@example.com", "pw", "Олег", UserRole::Manager, "Region1");
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "manager");
        assert_eq!(json["region"], "Region1");
    }

    #[test]
    fn test_role_parse_and_default() {
        assert_eq!(UserRole::default(), UserRole::Manager);
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("boss".parse::<UserRole>().is_err());
    }
}
