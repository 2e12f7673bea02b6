use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
    data::{
        Activity, ActivityChanges, ActivityId, Category, CategoryChanges, CategoryId, EntityKind,
        HiddenCategory, NewActivity, NewCategory, UserId, UserProfile,
    },
    query::Predicate,
};

pub mod memory;

pub use memory::{Fixture, MemoryGateway};

/// Defines the calls that the core makes against the remote data store. Every
/// call may fail, and no ordering is guaranteed between separate calls.
pub trait DataGateway {
    /// Lists the categories matching the filter, ordered by name.
    async fn get_categories(&self, filter: &Predicate) -> Result<Vec<Category>, GatewayError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, GatewayError>;

    /// Inserts the category, assigning its ID and timestamps.
    async fn create_category(&self, category: NewCategory) -> Result<Category, GatewayError>;

    /// Applies the changes and refreshes `updated_at`. Fails with
    /// `RowNotFound` if the category does not exist.
    async fn update_category(
        &self,
        id: CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Category, GatewayError>;

    /// Deletes the category together with its activities and every hidden
    /// record that refers to it.
    async fn delete_category(&self, id: CategoryId) -> Result<(), GatewayError>;

    /// Lists the activities matching the filter, ordered by name.
    async fn get_activities(&self, filter: &Predicate) -> Result<Vec<Activity>, GatewayError>;

    async fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>, GatewayError>;

    /// Inserts the activity. Fails with `ForeignKeyViolation` if its category
    /// does not exist.
    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, GatewayError>;

    async fn update_activity(
        &self,
        id: ActivityId,
        changes: &ActivityChanges,
    ) -> Result<Activity, GatewayError>;

    async fn delete_activity(&self, id: ActivityId) -> Result<(), GatewayError>;

    /// Returns the IDs of the categories the user has hidden.
    async fn get_hidden_categories(
        &self,
        user: &UserId,
    ) -> Result<BTreeSet<CategoryId>, GatewayError>;

    /// Fails with `DuplicateKey` if the record already exists.
    async fn insert_hidden_category(&self, record: HiddenCategory) -> Result<(), GatewayError>;

    /// Fails with `RowNotFound` if there is no such record.
    async fn delete_hidden_category(&self, record: &HiddenCategory) -> Result<(), GatewayError>;

    /// Returns the user the auth provider currently has a session for.
    async fn get_current_user(&self) -> Result<Option<UserId>, GatewayError>;

    /// Fails with `DuplicateKey` if a profile with the same ID exists.
    async fn insert_user_profile(&self, profile: UserProfile) -> Result<(), GatewayError>;

    /// Makes sure a profile row exists for the user. Another session may
    /// create the row at any moment, so an existing row counts as success.
    async fn ensure_user_profile(&self, profile: UserProfile) -> Result<(), GatewayError> {
        match self.insert_user_profile(profile).await {
            Ok(()) | Err(GatewayError::DuplicateKey(EntityKind::UserProfile)) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Error type for calls against the data store.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum GatewayError {
    #[error("Unable to communicate with the data store.")]
    Unreachable,
    #[error("The data store rejected the call: {reason}")]
    Rejected { reason: String },
    #[error("A {0} with the same key already exists.")]
    DuplicateKey(EntityKind),
    #[error("The referenced {0} does not exist.")]
    ForeignKeyViolation(EntityKind),
    #[error("No {0} matched the call.")]
    RowNotFound(EntityKind),
}
