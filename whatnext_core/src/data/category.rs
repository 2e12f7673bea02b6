use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{viewer::UserId, Entity, EntityKind};

/// A unique ID that can be used to refer to a category. IDs are assigned by
/// the data store and carry no meaning beyond identity.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// A short description of the category, e.g. "sports"
    pub name: String,
    /// The user who created the category. None means the category is shared
    /// by everyone, which makes it public regardless of `is_public`.
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;
    const OWNERLESS_IS_PUBLIC: bool = true;

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
        self.id
    }
}

/// What a viewer supplies when creating a category.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CategoryDraft {
    pub name: String,
    pub is_public: bool,
}

impl CategoryDraft {
    pub fn private(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_public: false }
    }

    pub fn public(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_public: true }
    }
}

/// A validated category with its owner stamped, ready to be inserted.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NewCategory {
    pub name: String,
    pub owner_id: Option<UserId>,
    pub is_public: bool,
}

/// The fields to change on an existing category. `None` leaves the field as
/// it is.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub is_public: Option<bool>,
}

impl CategoryChanges {
    pub fn rename(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), is_public: None }
    }

    /// Writes the changes onto the category. Does not touch `updated_at`.
    pub fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name.clone_from(name);
        }
        if let Some(is_public) = self.is_public {
            category.is_public = is_public;
        }
    }
}

/// Records that a user does not want to see a public category. The pair is
/// unique; the category itself is untouched.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Serialize, Deserialize)]
pub struct HiddenCategory {
    pub user_id: UserId,
    pub category_id: CategoryId,
}

#[cfg(test)]
mod test {
    use chrono::TimeZone as _;

    use super::*;

    fn category(owner: Option<&str>, is_public: bool) -> Category {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Category {
            id: CategoryId(1),
            name: "Sports".to_string(),
            owner_id: owner.map(UserId::from),
            is_public,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn ownerless_category_is_shared() {
        assert!(category(None, false).is_shared());
        assert!(category(Some("alice"), true).is_shared());
        assert!(!category(Some("alice"), false).is_shared());
    }

    #[test]
    fn ownership() {
        let category = category(Some("alice"), false);
        assert!(category.is_owned_by(&UserId::from("alice")));
        assert!(!category.is_owned_by(&UserId::from("bob")));
    }

    #[test]
    fn changes_only_touch_given_fields() {
        let mut category = category(Some("alice"), false);
        CategoryChanges::rename("Outdoor").apply_to(&mut category);
        assert_eq!(category.name, "Outdoor");
        assert!(!category.is_public);

        CategoryChanges { name: None, is_public: Some(true) }.apply_to(&mut category);
        assert_eq!(category.name, "Outdoor");
        assert!(category.is_public);
    }

    #[test]
    fn deserializes_with_defaults() {
        let category: Category = serde_json::from_str(r#"{"id": 7, "name": "Games"}"#).unwrap();
        assert_eq!(category.id, CategoryId(7));
        assert_eq!(category.owner_id, None);
        assert!(!category.is_public);
        assert!(category.is_shared());
    }
}
