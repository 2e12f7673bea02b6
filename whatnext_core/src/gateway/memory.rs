use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet, HashMap},
    io::Read,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DataGateway, GatewayError};
use crate::{
    data::{
        Activity, ActivityChanges, ActivityId, Category, CategoryChanges, CategoryId, EntityKind,
        HiddenCategory, NewActivity, NewCategory, UserId, UserProfile,
    },
    query::Predicate,
};

/// A data store kept entirely in memory. Used by tests and by the command
/// line front end; it behaves like the remote store, including its failure
/// modes.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    store: RefCell<Store>,
    current_user: RefCell<Option<UserId>>,
    /// A failure to return from a future call, along with the number of
    /// calls to let through before it.
    pending_failure: RefCell<Option<(usize, GatewayError)>>,
}

#[derive(Debug, Default)]
struct Store {
    manifest: StoreManifest,
    categories: BTreeMap<CategoryId, Category>,
    activities: BTreeMap<ActivityId, Activity>,
    hidden_categories: BTreeSet<HiddenCategory>,
    profiles: HashMap<UserId, UserProfile>,
}

#[derive(Debug)]
struct StoreManifest {
    /// The next ID to be assigned to a category.
    next_category_id: CategoryId,
    /// The next ID to be assigned to an activity.
    next_activity_id: ActivityId,
}

impl Default for StoreManifest {
    fn default() -> Self {
        Self { next_category_id: CategoryId(1), next_activity_id: ActivityId(1) }
    }
}

/// The initial contents of a `MemoryGateway`, as read from JSON.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub hidden_categories: Vec<HiddenCategory>,
    #[serde(default)]
    pub users: Vec<UserProfile>,
}

impl Fixture {
    pub fn from_json(reader: impl Read) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}

impl Store {
    // Returns a unique `CategoryId` and marks that ID as used.
    fn gen_unique_category_id(&mut self) -> Result<CategoryId, GatewayError> {
        let id = self.manifest.next_category_id;
        let next = id.0.checked_add(1).ok_or_else(id_space_exhausted)?;
        self.manifest.next_category_id = CategoryId(next);
        Ok(id)
    }

    fn gen_unique_activity_id(&mut self) -> Result<ActivityId, GatewayError> {
        let id = self.manifest.next_activity_id;
        let next = id.0.checked_add(1).ok_or_else(id_space_exhausted)?;
        self.manifest.next_activity_id = ActivityId(next);
        Ok(id)
    }
}

fn id_space_exhausted() -> GatewayError {
    GatewayError::Rejected { reason: "ID space exhausted".to_string() }
}

impl MemoryGateway {
    pub fn new() -> Self {
        MemoryGateway::default()
    }

    /// Builds a gateway holding the fixture's rows. Fails if an activity or a
    /// hidden record refers to a category that is not in the fixture, or if
    /// two rows share an ID.
    pub fn from_fixture(fixture: Fixture) -> Result<Self, GatewayError> {
        let mut store = Store::default();
        for category in fixture.categories {
            let next = category.id.0.saturating_add(1);
            if next > store.manifest.next_category_id.0 {
                store.manifest.next_category_id = CategoryId(next);
            }
            if store.categories.insert(category.id, category).is_some() {
                return Err(GatewayError::DuplicateKey(EntityKind::Category));
            }
        }
        for activity in fixture.activities {
            if !store.categories.contains_key(&activity.category_id) {
                return Err(GatewayError::ForeignKeyViolation(EntityKind::Category));
            }
            let next = activity.id.0.saturating_add(1);
            if next > store.manifest.next_activity_id.0 {
                store.manifest.next_activity_id = ActivityId(next);
            }
            if store.activities.insert(activity.id, activity).is_some() {
                return Err(GatewayError::DuplicateKey(EntityKind::Activity));
            }
        }
        for record in fixture.hidden_categories {
            if !store.categories.contains_key(&record.category_id) {
                return Err(GatewayError::ForeignKeyViolation(EntityKind::Category));
            }
            store.hidden_categories.insert(record);
        }
        for profile in fixture.users {
            store.profiles.insert(profile.id.clone(), profile);
        }
        Ok(Self { store: RefCell::new(store), ..Default::default() })
    }

    /// Starts an auth session for the user, as the auth provider would after
    /// a successful login.
    pub fn sign_in(&self, user: UserId) {
        *self.current_user.borrow_mut() = Some(user);
    }

    pub fn sign_out(&self) {
        *self.current_user.borrow_mut() = None;
    }

    /// Makes the call after `skip` successful calls fail with `error`.
    pub fn fail_call(&self, skip: usize, error: GatewayError) {
        *self.pending_failure.borrow_mut() = Some((skip, error));
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next_call(&self, error: GatewayError) {
        self.fail_call(0, error);
    }

    pub fn profile(&self, user: &UserId) -> Option<UserProfile> {
        self.store.borrow().profiles.get(user).cloned()
    }

    pub fn category_count(&self) -> usize {
        self.store.borrow().categories.len()
    }

    pub fn activity_count(&self) -> usize {
        self.store.borrow().activities.len()
    }

    fn check_failure(&self) -> Result<(), GatewayError> {
        let mut pending = self.pending_failure.borrow_mut();
        match pending.take() {
            Some((0, error)) => Err(error),
            Some((skip, error)) => {
                *pending = Some((skip - 1, error));
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl DataGateway for MemoryGateway {
    async fn get_categories(&self, filter: &Predicate) -> Result<Vec<Category>, GatewayError> {
        self.check_failure()?;
        debug!(%filter, "selecting categories");
        let store = self.store.borrow();
        let mut categories: Vec<_> =
            store.categories.values().filter(|c| filter.matches(*c)).cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, GatewayError> {
        self.check_failure()?;
        Ok(self.store.borrow().categories.get(&id).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, GatewayError> {
        self.check_failure()?;
        let mut store = self.store.borrow_mut();
        let id = store.gen_unique_category_id()?;
        let now = Utc::now();
        let NewCategory { name, owner_id, is_public } = category;
        let category = Category { id, name, owner_id, is_public, created_at: now, updated_at: now };
        store.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Category, GatewayError> {
        self.check_failure()?;
        let mut store = self.store.borrow_mut();
        let category = store
            .categories
            .get_mut(&id)
            .ok_or(GatewayError::RowNotFound(EntityKind::Category))?;
        changes.apply_to(category);
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), GatewayError> {
        self.check_failure()?;
        let mut store = self.store.borrow_mut();
        if store.categories.remove(&id).is_none() {
            return Err(GatewayError::RowNotFound(EntityKind::Category));
        }
        store.activities.retain(|_, activity| activity.category_id != id);
        store.hidden_categories.retain(|record| record.category_id != id);
        Ok(())
    }

    async fn get_activities(&self, filter: &Predicate) -> Result<Vec<Activity>, GatewayError> {
        self.check_failure()?;
        debug!(%filter, "selecting activities");
        let store = self.store.borrow();
        let mut activities: Vec<_> =
            store.activities.values().filter(|a| filter.matches(*a)).cloned().collect();
        activities.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(activities)
    }

    async fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>, GatewayError> {
        self.check_failure()?;
        Ok(self.store.borrow().activities.get(&id).cloned())
    }

    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, GatewayError> {
        self.check_failure()?;
        let mut store = self.store.borrow_mut();
        if !store.categories.contains_key(&activity.category_id) {
            return Err(GatewayError::ForeignKeyViolation(EntityKind::Category));
        }
        let id = store.gen_unique_activity_id()?;
        let NewActivity { name, url, category_id, owner_id, is_public } = activity;
        let activity =
            Activity { id, name, url, category_id, owner_id, is_public, created_at: Utc::now() };
        store.activities.insert(id, activity.clone());
        Ok(activity)
    }

    async fn update_activity(
        &self,
        id: ActivityId,
        changes: &ActivityChanges,
    ) -> Result<Activity, GatewayError> {
        self.check_failure()?;
        let mut store = self.store.borrow_mut();
        let activity = store
            .activities
            .get_mut(&id)
            .ok_or(GatewayError::RowNotFound(EntityKind::Activity))?;
        changes.apply_to(activity);
        Ok(activity.clone())
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<(), GatewayError> {
        self.check_failure()?;
        match self.store.borrow_mut().activities.remove(&id) {
            Some(_) => Ok(()),
            None => Err(GatewayError::RowNotFound(EntityKind::Activity)),
        }
    }

    async fn get_hidden_categories(
        &self,
        user: &UserId,
    ) -> Result<BTreeSet<CategoryId>, GatewayError> {
        self.check_failure()?;
        let store = self.store.borrow();
        Ok(store
            .hidden_categories
            .iter()
            .filter(|record| &record.user_id == user)
            .map(|record| record.category_id)
            .collect())
    }

    async fn insert_hidden_category(&self, record: HiddenCategory) -> Result<(), GatewayError> {
        self.check_failure()?;
        let mut store = self.store.borrow_mut();
        if !store.categories.contains_key(&record.category_id) {
            return Err(GatewayError::ForeignKeyViolation(EntityKind::Category));
        }
        if !store.hidden_categories.insert(record) {
            return Err(GatewayError::DuplicateKey(EntityKind::HiddenCategory));
        }
        Ok(())
    }

    async fn delete_hidden_category(&self, record: &HiddenCategory) -> Result<(), GatewayError> {
        self.check_failure()?;
        if self.store.borrow_mut().hidden_categories.remove(record) {
            Ok(())
        } else {
            Err(GatewayError::RowNotFound(EntityKind::HiddenCategory))
        }
    }

    async fn get_current_user(&self) -> Result<Option<UserId>, GatewayError> {
        self.check_failure()?;
        Ok(self.current_user.borrow().clone())
    }

    async fn insert_user_profile(&self, profile: UserProfile) -> Result<(), GatewayError> {
        self.check_failure()?;
        let mut store = self.store.borrow_mut();
        if store.profiles.contains_key(&profile.id) {
            return Err(GatewayError::DuplicateKey(EntityKind::UserProfile));
        }
        store.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }
}
