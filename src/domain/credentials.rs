use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const USERNAME_PREFIX: &str = "test_";
const USERNAME_SUFFIX_LEN: usize = 10;
const PASSWORD_LEN: usize = 12;

/// Username/password pair generated for a single iteration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// `test_` followed by ten random lowercase letters, plus a random
    /// alphanumeric password.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng>(rng: &mut R) -> Self {
        let suffix: String = (0..USERNAME_SUFFIX_LEN)
            .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
            .collect();
        let password: String = (0..PASSWORD_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();

        Self {
            username: format!("{USERNAME_PREFIX}{suffix}"),
            password,
        }
    }
}

// Passwords stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Access token obtained from login. Lives for one iteration only.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access: String,
}

impl Session {
    /// Extracts a non-empty `access` token from a login response body.
    pub fn from_login_body(body: &Value) -> Option<Self> {
        body.get("access")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(|token| Self {
                access: token.to_string(),
            })
    }

    pub fn access_token(&self) -> &str {
        &self.access
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
