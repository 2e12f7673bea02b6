use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{category::CategoryId, viewer::UserId, Entity, EntityKind};

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub u64);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something to do, filed under a category. Its visibility is governed by its
/// own `owner_id` and `is_public`, not by those of its category.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    /// A link for the activity. The empty string means there is none.
    #[serde(default)]
    pub url: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn link(&self) -> Option<&str> {
        (!self.url.is_empty()).then_some(self.url.as_str())
    }
}

impl Entity for Activity {
    const KIND: EntityKind = EntityKind::Activity;

    fn raw_id(&self) -> u64 {
        self.id.0
    }

    fn owner_id(&self) -> Option<&UserId> {
        self.owner_id.as_ref()
    }

    fn is_public(&self) -> bool {
        self.is_public
    }

    fn governing_category(&self) -> CategoryId {
        self.category_id
    }
}

/// What a viewer supplies when creating an activity. The category comes from
/// wherever the activity is being filed.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ActivityDraft {
    pub name: String,
    pub url: Option<String>,
    pub is_public: bool,
}

impl ActivityDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NewActivity {
    pub name: String,
    pub url: String,
    pub category_id: CategoryId,
    pub owner_id: Option<UserId>,
    pub is_public: bool,
}

/// The fields to change on an existing activity. `None` leaves the field as
/// it is; `Some("")` clears the url.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ActivityChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    pub is_public: Option<bool>,
}

impl ActivityChanges {
    pub fn apply_to(&self, activity: &mut Activity) {
        if let Some(name) = &self.name {
            activity.name.clone_from(name);
        }
        if let Some(url) = &self.url {
            activity.url.clone_from(url);
        }
        if let Some(is_public) = self.is_public {
            activity.is_public = is_public;
        }
    }
}
