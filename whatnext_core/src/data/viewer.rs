use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque user identifier handed out by the auth provider.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user context under which a read or write is evaluated.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub enum Viewer {
    #[default]
    Anonymous,
    Identified(UserId),
}

impl Viewer {
    pub fn identified(id: impl Into<UserId>) -> Self {
        Viewer::Identified(id.into())
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Identified(id) => Some(id),
        }
    }
}

impl fmt::Display for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Viewer::Anonymous => f.write_str("anonymous"),
            Viewer::Identified(id) => write!(f, "user {id}"),
        }
    }
}

/// The profile row kept for every user that has logged in at least once.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// A bare profile for a user the auth provider told us nothing else about.
    pub fn bare(id: UserId) -> Self {
        Self { id, email: None, username: None, avatar_url: None, created_at: Utc::now() }
    }

    /// The name to show for the user: the username, falling back to the email
    /// and then the ID.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().or(self.email.as_deref()).unwrap_or(&self.id.0)
    }
}
