use std::{collections::BTreeSet, fmt};

use crate::data::{CategoryId, Entity, UserId, Viewer};

/// A structured filter over categories and activities. Gateways either
/// translate it into their own query language or evaluate it row by row with
/// [`Predicate::matches`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Predicate {
    /// Matches every row.
    True,
    /// The row's own public flag is set.
    IsPublic,
    /// The row has no owner.
    Ownerless,
    /// The row is owned by the given user.
    OwnedBy(UserId),
    /// The row's governing category is one of the given categories. For a
    /// category that is its own ID, for an activity the category it is filed
    /// under.
    CategoryIn(BTreeSet<CategoryId>),
    Not(Box<Predicate>),
    /// Matches when all of the inner predicates match. Empty matches
    /// everything.
    All(Vec<Predicate>),
    /// Matches when any of the inner predicates match. Empty matches nothing.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::True, other) | (other, Predicate::True) => other,
            (Predicate::All(mut left), Predicate::All(right)) => {
                left.extend(right);
                Predicate::All(left)
            }
            (Predicate::All(mut left), other) => {
                left.push(other);
                Predicate::All(left)
            }
            (this, other) => Predicate::All(vec![this, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::Any(mut left), Predicate::Any(right)) => {
                left.extend(right);
                Predicate::Any(left)
            }
            (Predicate::Any(mut left), other) => {
                left.push(other);
                Predicate::Any(left)
            }
            (this, other) => Predicate::Any(vec![this, other]),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    pub fn matches<E: Entity>(&self, row: &E) -> bool {
        match self {
            Predicate::True => true,
            Predicate::IsPublic => row.is_public(),
            Predicate::Ownerless => row.owner_id().is_none(),
            Predicate::OwnedBy(user) => row.owner_id() == Some(user),
            Predicate::CategoryIn(ids) => ids.contains(&row.governing_category()),
            Predicate::Not(inner) => !inner.matches(row),
            Predicate::All(inner) => inner.iter().all(|p| p.matches(row)),
            Predicate::Any(inner) => inner.iter().any(|p| p.matches(row)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{part}")?;
            }
            f.write_str(")")
        }

        match self {
            Predicate::True => f.write_str("TRUE"),
            Predicate::IsPublic => f.write_str("is_public"),
            Predicate::Ownerless => f.write_str("user_id IS NULL"),
            Predicate::OwnedBy(user) => write!(f, "user_id = '{user}'"),
            Predicate::CategoryIn(ids) => {
                f.write_str("category_id IN (")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{id}")?;
                }
                f.write_str(")")
            }
            Predicate::Not(inner) => write!(f, "NOT {inner}"),
            Predicate::All(parts) if parts.is_empty() => f.write_str("TRUE"),
            Predicate::Any(parts) if parts.is_empty() => f.write_str("FALSE"),
            Predicate::All(parts) => join(f, parts, " AND "),
            Predicate::Any(parts) => join(f, parts, " OR "),
        }
    }
}

/// Builds the rule deciding which rows of kind `E` a viewer may see: shared
/// rows, plus the viewer's own rows, minus rows governed by a category the
/// viewer has hidden.
pub fn visibility_predicate<E: Entity>(viewer: &Viewer, hidden: &BTreeSet<CategoryId>) -> Predicate {
    let shared = if E::OWNERLESS_IS_PUBLIC {
        Predicate::IsPublic.or(Predicate::Ownerless)
    } else {
        Predicate::IsPublic
    };
    match viewer {
        Viewer::Anonymous => shared,
        Viewer::Identified(user) => {
            let readable = shared.or(Predicate::OwnedBy(user.clone()));
            if hidden.is_empty() {
                readable
            } else {
                readable.and(Predicate::CategoryIn(hidden.clone()).negate())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::data::{Activity, ActivityId, Category};

    fn category(id: u64, owner: Option<&str>, is_public: bool) -> Category {
        Category {
            id: CategoryId(id),
            name: format!("category {id}"),
            owner_id: owner.map(UserId::from),
            is_public,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn activity(category: u64, owner: Option<&str>, is_public: bool) -> Activity {
        Activity {
            id: ActivityId(100 + category),
            name: "Chess".to_string(),
            url: String::new(),
            category_id: CategoryId(category),
            owner_id: owner.map(UserId::from),
            is_public,
            created_at: Utc::now(),
        }
    }

    fn hidden(ids: &[u64]) -> BTreeSet<CategoryId> {
        ids.iter().copied().map(CategoryId).collect()
    }

    #[test]
    fn combinators_flatten() {
        let p = Predicate::IsPublic.or(Predicate::Ownerless).or(Predicate::OwnedBy("a".into()));
        assert_eq!(
            p,
            Predicate::Any(vec![
                Predicate::IsPublic,
                Predicate::Ownerless,
                Predicate::OwnedBy("a".into())
            ])
        );
        assert_eq!(Predicate::True.and(Predicate::IsPublic), Predicate::IsPublic);
        assert_eq!(Predicate::IsPublic.negate().negate(), Predicate::IsPublic);
    }

    #[test]
    fn empty_groups() {
        let row = category(1, Some("a"), false);
        assert!(Predicate::All(vec![]).matches(&row));
        assert!(!Predicate::Any(vec![]).matches(&row));
    }

    #[test]
    fn anonymous_sees_shared_rows_only() {
        let p = visibility_predicate::<Category>(&Viewer::Anonymous, &hidden(&[]));
        assert!(p.matches(&category(1, Some("a"), true)));
        assert!(p.matches(&category(2, None, false)));
        assert!(!p.matches(&category(3, Some("a"), false)));

        let p = visibility_predicate::<Activity>(&Viewer::Anonymous, &hidden(&[]));
        assert!(p.matches(&activity(3, Some("a"), true)));
        assert!(!p.matches(&activity(1, Some("a"), false)));
    }

    #[test]
    fn ownerless_activities_are_not_implicitly_public() {
        let p = visibility_predicate::<Activity>(&Viewer::Anonymous, &hidden(&[]));
        assert!(!p.matches(&activity(1, None, false)));
        assert!(p.matches(&activity(1, None, true)));

        let p = visibility_predicate::<Activity>(&Viewer::identified("a"), &hidden(&[]));
        assert!(!p.matches(&activity(1, None, false)));
    }

    #[test]
    fn identified_sees_own_private_rows() {
        let p = visibility_predicate::<Category>(&Viewer::identified("a"), &hidden(&[]));
        assert!(p.matches(&category(3, Some("a"), false)));
        assert!(!p.matches(&category(4, Some("b"), false)));
        let p = visibility_predicate::<Activity>(&Viewer::identified("a"), &hidden(&[]));
        assert!(p.matches(&activity(4, Some("a"), false)));
    }

    #[test]
    fn hidden_categories_are_excluded() {
        let p = visibility_predicate::<Category>(&Viewer::identified("b"), &hidden(&[1]));
        assert!(!p.matches(&category(1, Some("a"), true)));
        assert!(p.matches(&category(2, Some("a"), true)));
        let p = visibility_predicate::<Activity>(&Viewer::identified("b"), &hidden(&[1]));
        assert!(!p.matches(&activity(1, Some("a"), true)));
    }

    #[test]
    fn renders_as_filter_expression() {
        let p = visibility_predicate::<Category>(&Viewer::identified("b"), &hidden(&[1, 5]));
        assert_eq!(
            p.to_string(),
            "((is_public OR user_id IS NULL OR user_id = 'b') AND NOT category_id IN (1, 5))"
        );
        assert_eq!(
            visibility_predicate::<Category>(&Viewer::Anonymous, &hidden(&[])).to_string(),
            "(is_public OR user_id IS NULL)"
        );
        assert_eq!(visibility_predicate::<Activity>(&Viewer::Anonymous, &hidden(&[])).to_string(), "is_public");
    }
}
