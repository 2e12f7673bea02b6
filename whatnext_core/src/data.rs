use std::fmt;

use serde::{Deserialize, Serialize};

pub mod activity;
pub mod category;
pub mod viewer;

pub use activity::{Activity, ActivityChanges, ActivityDraft, ActivityId, NewActivity};
pub use category::{Category, CategoryChanges, CategoryDraft, CategoryId, HiddenCategory, NewCategory};
pub use viewer::{UserId, UserProfile, Viewer};

/// The kinds of rows that the data store keeps.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize, Deserialize)]
pub enum EntityKind {
    Category,
    Activity,
    HiddenCategory,
    UserProfile,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Category => "category",
            EntityKind::Activity => "activity",
            EntityKind::HiddenCategory => "hidden category",
            EntityKind::UserProfile => "user profile",
        };
        f.write_str(name)
    }
}

/// Common view over the rows whose visibility and mutation rights depend on
/// ownership and the public flag.
pub trait Entity {
    const KIND: EntityKind;

    /// Whether a row of this kind without an owner counts as public. Only
    /// categories seeded by the catalog itself are shared this way.
    const OWNERLESS_IS_PUBLIC: bool = false;

    /// The raw ID of the row, for error reporting.
    fn raw_id(&self) -> u64;

    /// The user who created the row. None for rows shared by everyone.
    fn owner_id(&self) -> Option<&UserId>;

    /// The row's own public flag.
    fn is_public(&self) -> bool;

    /// The category that governs per-viewer hiding of this row. For a
    /// category this is its own ID.
    fn governing_category(&self) -> CategoryId;

    /// Whether every viewer may see this row.
    fn is_shared(&self) -> bool {
        self.is_public() || (Self::OWNERLESS_IS_PUBLIC && self.owner_id().is_none())
    }

    fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner_id() == Some(user)
    }
}

/// Trims a required text field, rejecting it if nothing is left.
pub(crate) fn required_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn required_text_trims() {
        assert_eq!(required_text("  Chess "), Some("Chess".to_string()));
        assert_eq!(required_text("   "), None);
        assert_eq!(required_text(""), None);
    }

    #[test]
    fn entity_kind_names() {
        assert_eq!(EntityKind::HiddenCategory.to_string(), "hidden category");
        assert_eq!(EntityKind::Activity.to_string(), "activity");
    }
}
