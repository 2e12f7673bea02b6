use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    str::FromStr,
};

use tracing::debug;

use crate::{
    data::{Activity, Category, CategoryId, Viewer},
    error::CoreError,
    gateway::DataGateway,
    query::{visibility_predicate, Predicate},
};

/// Whether hiding a category also hides the activities filed under it.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub enum HidePolicy {
    /// Only the category disappears; its visible activities are still listed.
    CategoryOnly,
    #[default]
    CascadeToActivities,
}

impl FromStr for HidePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" | "category-only" => Ok(HidePolicy::CategoryOnly),
            "cascade" | "cascade-to-activities" => Ok(HidePolicy::CascadeToActivities),
            other => Err(format!("unknown hide policy `{other}`")),
        }
    }
}

impl fmt::Display for HidePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HidePolicy::CategoryOnly => f.write_str("category-only"),
            HidePolicy::CascadeToActivities => f.write_str("cascade-to-activities"),
        }
    }
}

/// Everything one viewer may see, loaded together.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct VisibleSet {
    pub categories: Vec<Category>,
    pub activities: Vec<Activity>,
}

/// Computes the categories and activities visible to a viewer by querying the
/// gateway. Has no side effects.
pub struct VisibilityFilter<'g, G> {
    gateway: &'g G,
    policy: HidePolicy,
}

impl<'g, G: DataGateway> VisibilityFilter<'g, G> {
    pub fn new(gateway: &'g G, policy: HidePolicy) -> Self {
        Self { gateway, policy }
    }

    /// The categories the viewer has hidden. Anonymous viewers hide nothing.
    async fn hidden_for(&self, viewer: &Viewer) -> Result<BTreeSet<CategoryId>, CoreError> {
        match viewer.user_id() {
            Some(user) => Ok(self.gateway.get_hidden_categories(user).await?),
            None => Ok(BTreeSet::new()),
        }
    }

    fn activity_filter(&self, viewer: &Viewer, hidden: &BTreeSet<CategoryId>) -> Predicate {
        match self.policy {
            HidePolicy::CascadeToActivities => visibility_predicate::<Activity>(viewer, hidden),
            HidePolicy::CategoryOnly => visibility_predicate::<Activity>(viewer, &BTreeSet::new()),
        }
    }

    pub async fn visible_categories(&self, viewer: &Viewer) -> Result<Vec<Category>, CoreError> {
        let hidden = self.hidden_for(viewer).await?;
        let filter = visibility_predicate::<Category>(viewer, &hidden);
        Ok(self.gateway.get_categories(&filter).await?)
    }

    pub async fn visible_activities(&self, viewer: &Viewer) -> Result<Vec<Activity>, CoreError> {
        let hidden = self.hidden_for(viewer).await?;
        let filter = self.activity_filter(viewer, &hidden);
        Ok(self.gateway.get_activities(&filter).await?)
    }

    /// Loads both lists with a single lookup of the hidden set. Nothing is
    /// returned unless every call succeeds.
    pub async fn visible_set(&self, viewer: &Viewer) -> Result<VisibleSet, CoreError> {
        let hidden = self.hidden_for(viewer).await?;
        let categories = self.gateway.get_categories(&visibility_predicate::<Category>(viewer, &hidden)).await?;
        let activities = self.gateway.get_activities(&self.activity_filter(viewer, &hidden)).await?;
        debug!(
            %viewer,
            hidden = hidden.len(),
            categories = categories.len(),
            activities = activities.len(),
            "loaded visible set"
        );
        Ok(VisibleSet { categories, activities })
    }
}

/// Groups activities by the category they are filed under, keeping their
/// order within each category.
pub fn activities_by_category(activities: &[Activity]) -> HashMap<CategoryId, Vec<&Activity>> {
    let mut grouped: HashMap<CategoryId, Vec<&Activity>> = HashMap::new();
    for activity in activities {
        grouped.entry(activity.category_id).or_default().push(activity);
    }
    grouped
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        data::{HiddenCategory, NewActivity, NewCategory, UserId},
        gateway::{Fixture, GatewayError, MemoryGateway},
    };

    async fn category(gateway: &MemoryGateway, name: &str, owner: &str, is_public: bool) -> Category {
        let new = NewCategory { name: name.to_string(), owner_id: Some(UserId::from(owner)), is_public };
        gateway.create_category(new).await.unwrap()
    }

    async fn activity(
        gateway: &MemoryGateway,
        name: &str,
        category: &Category,
        owner: &str,
        is_public: bool,
    ) -> Activity {
        let new = NewActivity {
            name: name.to_string(),
            url: String::new(),
            category_id: category.id,
            owner_id: Some(UserId::from(owner)),
            is_public,
        };
        gateway.create_activity(new).await.unwrap()
    }

    fn names<T>(items: &[T], name: impl Fn(&T) -> String) -> Vec<String> {
        items.iter().map(name).collect()
    }

    #[tokio::test]
    async fn anonymous_sees_public_only() {
        let gateway = MemoryGateway::new();
        let games = category(&gateway, "Games", "alice", true).await;
        let diary = category(&gateway, "Diary", "alice", false).await;
        activity(&gateway, "Chess", &games, "alice", true).await;
        activity(&gateway, "Secret", &games, "alice", false).await;
        activity(&gateway, "Write", &diary, "alice", false).await;

        let filter = VisibilityFilter::new(&gateway, HidePolicy::default());
        let categories = filter.visible_categories(&Viewer::Anonymous).await.unwrap();
        let activities = filter.visible_activities(&Viewer::Anonymous).await.unwrap();
        assert_eq!(names(&categories, |c| c.name.clone()), vec!["Games"]);
        assert_eq!(names(&activities, |a| a.name.clone()), vec!["Chess"]);
    }

    #[tokio::test]
    async fn owner_sees_own_private_rows() {
        let gateway = MemoryGateway::new();
        let diary = category(&gateway, "Diary", "alice", false).await;
        activity(&gateway, "Write", &diary, "alice", false).await;
        category(&gateway, "Bob's", "bob", false).await;

        let filter = VisibilityFilter::new(&gateway, HidePolicy::default());
        let alice = Viewer::identified("alice");
        let set = filter.visible_set(&alice).await.unwrap();
        assert_eq!(names(&set.categories, |c| c.name.clone()), vec!["Diary"]);
        assert_eq!(names(&set.activities, |a| a.name.clone()), vec!["Write"]);
    }

    #[tokio::test]
    async fn hidden_category_cascades_by_default() {
        let gateway = MemoryGateway::new();
        let games = category(&gateway, "Games", "alice", true).await;
        let sports = category(&gateway, "Sports", "alice", true).await;
        activity(&gateway, "Chess", &games, "alice", true).await;
        activity(&gateway, "Tennis", &sports, "alice", true).await;
        let record = HiddenCategory { user_id: UserId::from("bob"), category_id: games.id };
        gateway.insert_hidden_category(record).await.unwrap();

        let filter = VisibilityFilter::new(&gateway, HidePolicy::CascadeToActivities);
        let set = filter.visible_set(&Viewer::identified("bob")).await.unwrap();
        assert_eq!(names(&set.categories, |c| c.name.clone()), vec!["Sports"]);
        assert_eq!(names(&set.activities, |a| a.name.clone()), vec!["Tennis"]);

        let filter = VisibilityFilter::new(&gateway, HidePolicy::CategoryOnly);
        let set = filter.visible_set(&Viewer::identified("bob")).await.unwrap();
        assert_eq!(names(&set.categories, |c| c.name.clone()), vec!["Sports"]);
        assert_eq!(names(&set.activities, |a| a.name.clone()), vec!["Chess", "Tennis"]);

        // the owner is unaffected by someone else hiding the category
        let set = filter.visible_set(&Viewer::identified("alice")).await.unwrap();
        assert_eq!(names(&set.categories, |c| c.name.clone()), vec!["Games", "Sports"]);
    }

    #[tokio::test]
    async fn ownerless_rows_from_a_fixture() {
        let json = r#"{
            "categories": [{ "id": 1, "name": "Games", "is_public": false }],
            "activities": [
                { "id": 1, "name": "Chess", "category_id": 1, "is_public": true },
                { "id": 2, "name": "Secret", "category_id": 1, "is_public": false }
            ]
        }"#;
        let fixture = Fixture::from_json(json.as_bytes()).unwrap();
        let gateway = MemoryGateway::from_fixture(fixture).unwrap();
        let filter = VisibilityFilter::new(&gateway, HidePolicy::default());

        for viewer in [Viewer::Anonymous, Viewer::identified("bob")] {
            let set = filter.visible_set(&viewer).await.unwrap();
            assert_eq!(names(&set.categories, |c| c.name.clone()), vec!["Games"]);
            assert_eq!(names(&set.activities, |a| a.name.clone()), vec!["Chess"]);
        }
    }

    #[tokio::test]
    async fn gateway_failure_is_data_access_error() {
        let gateway = MemoryGateway::new();
        gateway.fail_call(1, GatewayError::Unreachable);
        let filter = VisibilityFilter::new(&gateway, HidePolicy::default());
        let result = filter.visible_set(&Viewer::identified("bob")).await;
        assert!(matches!(result, Err(CoreError::DataAccess(GatewayError::Unreachable))));
    }

    #[test]
    fn groups_activities() {
        let make = |id, category| Activity {
            id: crate::data::ActivityId(id),
            name: format!("activity {id}"),
            url: String::new(),
            category_id: CategoryId(category),
            owner_id: None,
            is_public: true,
            created_at: chrono::Utc::now(),
        };
        let activities = vec![make(1, 1), make(2, 2), make(3, 1)];
        let grouped = activities_by_category(&activities);
        let ids: Vec<_> = grouped[&CategoryId(1)].iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(grouped[&CategoryId(2)].len(), 1);
        assert!(!grouped.contains_key(&CategoryId(3)));
    }

    #[test]
    fn parses_hide_policy() {
        assert_eq!("cascade".parse::<HidePolicy>(), Ok(HidePolicy::CascadeToActivities));
        assert_eq!("Category-Only".parse::<HidePolicy>(), Ok(HidePolicy::CategoryOnly));
        assert!("sometimes".parse::<HidePolicy>().is_err());
    }
}
