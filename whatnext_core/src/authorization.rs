use std::fmt;

use crate::{
    data::{Entity, UserId, Viewer},
    error::CoreError,
};

/// The mutations a viewer can request.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Action {
    Create,
    Edit,
    Delete,
    Hide,
    Unhide,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Hide => "hide",
            Action::Unhide => "unhide",
        };
        f.write_str(verb)
    }
}

/// Checks whether the viewer may perform `action` on `entity`, returning the
/// acting user if so.
///
/// - `Create` only needs an identified viewer; for an activity, `entity` is
///   the category it is filed under.
/// - `Edit` and `Delete` need the viewer to own the entity.
/// - `Hide` needs a public entity that the viewer does not own. Hiding one's
///   own entity is an `InvalidOperation` rather than a permission problem.
/// - `Unhide` only needs an identified viewer; whether there is anything to
///   unhide is up to the caller to check.
pub fn authorize<'v, E: Entity>(
    viewer: &'v Viewer,
    entity: &E,
    action: Action,
) -> Result<&'v UserId, CoreError> {
    let denied = || CoreError::NotAuthorized { action, entity: E::KIND };
    let user = viewer.user_id().ok_or_else(denied)?;
    match action {
        Action::Create | Action::Unhide => Ok(user),
        Action::Edit | Action::Delete if entity.is_owned_by(user) => Ok(user),
        Action::Edit | Action::Delete => Err(denied()),
        Action::Hide if entity.is_owned_by(user) => {
            Err(CoreError::InvalidOperation("You cannot hide something you own."))
        }
        Action::Hide if entity.is_shared() => Ok(user),
        Action::Hide => Err(denied()),
    }
}

pub fn can_mutate<E: Entity>(viewer: &Viewer, entity: &E, action: Action) -> bool {
    authorize(viewer, entity, action).is_ok()
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::data::{Activity, ActivityId, Category, CategoryId, EntityKind};

    const ALL_ACTIONS: [Action; 5] =
        [Action::Create, Action::Edit, Action::Delete, Action::Hide, Action::Unhide];

    fn category(owner: Option<&str>, is_public: bool) -> Category {
        Category {
            id: CategoryId(1),
            name: "Games".to_string(),
            owner_id: owner.map(UserId::from),
            is_public,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn activity(owner: Option<&str>, is_public: bool) -> Activity {
        Activity {
            id: ActivityId(1),
            name: "Chess".to_string(),
            url: String::new(),
            category_id: CategoryId(1),
            owner_id: owner.map(UserId::from),
            is_public,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn anonymous_cannot_mutate() {
        for entity in [category(Some("alice"), true), category(None, true), category(Some("a"), false)] {
            for action in ALL_ACTIONS {
                assert!(!can_mutate(&Viewer::Anonymous, &entity, action), "{action}");
            }
        }
        let err = authorize(&Viewer::Anonymous, &activity(None, true), Action::Create).unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotAuthorized { action: Action::Create, entity: EntityKind::Activity }
        ));
    }

    #[test]
    fn owner_may_edit_and_delete_regardless_of_flag() {
        let alice = Viewer::identified("alice");
        for is_public in [true, false] {
            let entity = activity(Some("alice"), is_public);
            assert!(can_mutate(&alice, &entity, Action::Edit));
            assert!(can_mutate(&alice, &entity, Action::Delete));
        }
    }

    #[test]
    fn others_may_not_edit_or_delete() {
        let bob = Viewer::identified("bob");
        for entity in [category(Some("alice"), true), category(Some("alice"), false), category(None, true)] {
            assert!(!can_mutate(&bob, &entity, Action::Edit));
            assert!(!can_mutate(&bob, &entity, Action::Delete));
        }
    }

    #[test]
    fn cannot_hide_own_entity() {
        let alice = Viewer::identified("alice");
        for is_public in [true, false] {
            let err = authorize(&alice, &category(Some("alice"), is_public), Action::Hide).unwrap_err();
            assert!(matches!(err, CoreError::InvalidOperation(_)));
        }
    }

    #[test]
    fn hides_public_entities_of_others() {
        let bob = Viewer::identified("bob");
        assert_eq!(authorize(&bob, &category(Some("alice"), true), Action::Hide).unwrap(), &UserId::from("bob"));
        assert!(can_mutate(&bob, &category(None, false), Action::Hide));
        assert!(!can_mutate(&bob, &activity(None, false), Action::Hide));
        let err = authorize(&bob, &category(Some("alice"), false), Action::Hide).unwrap_err();
        assert!(matches!(err, CoreError::NotAuthorized { action: Action::Hide, .. }));
    }

    #[test]
    fn identified_may_create() {
        let bob = Viewer::identified("bob");
        assert!(can_mutate(&bob, &category(Some("alice"), true), Action::Create));
    }
}
