//! Request identifiers correlating a job, its result, and the chat
//! session that asked for it.

use std::borrow::Borrow;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of characters in a generated request identifier.
pub const REQUEST_ID_LEN: usize = 10;

/// Short random identifier drawn from `a`-`z`.
///
/// Uniqueness is probabilistic: generation does not check for collisions
/// with identifiers already in use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh identifier of [`REQUEST_ID_LEN`] lowercase letters.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..REQUEST_ID_LEN)
            .map(|_| char::from(rng.random_range(b'a'..=b'z')))
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for RequestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
