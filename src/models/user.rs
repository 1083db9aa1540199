use serde::Serialize;
use std::fmt;

/// Represents a user in the system.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// The unique identifier for the user. Assigned by the store.
    pub id: i64,
    /// The user's display name.
    pub name: String,
    /// The user's email address. Unique, used as the login key.
    pub email: String,
    /// The user's Argon2 password hash.
    pub password_hash: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// A user that has not been persisted yet.
#[derive(Clone)]
pub struct NewUser {
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The already-hashed password.
    pub password_hash: String,
}

/// The outward-facing view of a user. Never carries the password hash.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> User {
        User {
            id: 1,
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password_hash: "$argon2id$v=19$m=256,t=1,p=1$c2FsdA$aGFzaA".to_string(),
        }
    }

    #[test]
    fn debug_output_redacts_the_hash() {
        let rendered = format!("{:?}", ann());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("argon2id"));
    }

    #[test]
    fn profile_serializes_without_password() {
        let profile = UserProfile::from(&ann());
        let json = sonic_rs::to_string(&profile).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"Ann","email":"ann@x.com"}"#);
    }
}
