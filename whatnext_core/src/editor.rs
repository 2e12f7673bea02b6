use tracing::{info, warn};

use crate::{
    authorization::{authorize, Action},
    data::{
        required_text, Activity, ActivityChanges, ActivityDraft, ActivityId, Category,
        CategoryChanges, CategoryDraft, CategoryId, EntityKind, HiddenCategory, NewActivity,
        NewCategory, UserProfile, Viewer,
    },
    error::CoreError,
    gateway::{DataGateway, GatewayError},
    query::visibility_predicate,
};

/// The mutation entry points. Every call validates its input, looks up the
/// target row, checks authorization and only then reaches the gateway.
pub struct CatalogEditor<'g, G> {
    gateway: &'g G,
}

impl<'g, G: DataGateway> CatalogEditor<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    async fn existing_category(&self, id: CategoryId) -> Result<Category, CoreError> {
        self.gateway
            .get_category(id)
            .await?
            .ok_or(CoreError::NotFound { entity: EntityKind::Category, id: id.0 })
    }

    async fn existing_activity(&self, id: ActivityId) -> Result<Activity, CoreError> {
        self.gateway
            .get_activity(id)
            .await?
            .ok_or(CoreError::NotFound { entity: EntityKind::Activity, id: id.0 })
    }

    pub async fn create_category(
        &self,
        viewer: &Viewer,
        draft: CategoryDraft,
    ) -> Result<Category, CoreError> {
        let name = required_text(&draft.name).ok_or(CoreError::Validation { field: "name" })?;
        let owner = viewer.user_id().ok_or(CoreError::NotAuthorized {
            action: Action::Create,
            entity: EntityKind::Category,
        })?;
        let new = NewCategory { name, owner_id: Some(owner.clone()), is_public: draft.is_public };
        let category = self.gateway.create_category(new).await?;
        info!(id = %category.id, %viewer, "created category");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        viewer: &Viewer,
        id: CategoryId,
        mut changes: CategoryChanges,
    ) -> Result<Category, CoreError> {
        if let Some(name) = changes.name.take() {
            changes.name = Some(required_text(&name).ok_or(CoreError::Validation { field: "name" })?);
        }
        let category = self.existing_category(id).await?;
        authorize(viewer, &category, Action::Edit)?;
        let updated = self
            .gateway
            .update_category(id, &changes)
            .await
            .map_err(|err| CoreError::for_row(err, EntityKind::Category, id.0))?;
        info!(%id, %viewer, "updated category");
        Ok(updated)
    }

    /// Deletes the category along with its activities.
    pub async fn delete_category(&self, viewer: &Viewer, id: CategoryId) -> Result<(), CoreError> {
        let category = self.existing_category(id).await?;
        authorize(viewer, &category, Action::Delete)?;
        self.gateway
            .delete_category(id)
            .await
            .map_err(|err| CoreError::for_row(err, EntityKind::Category, id.0))?;
        info!(%id, %viewer, "deleted category");
        Ok(())
    }

    /// Files a new activity under the category. The category must be one the
    /// viewer can see, so neither someone else's private category nor one the
    /// viewer has hidden.
    pub async fn create_activity(
        &self,
        viewer: &Viewer,
        category_id: CategoryId,
        draft: ActivityDraft,
    ) -> Result<Activity, CoreError> {
        let name = required_text(&draft.name).ok_or(CoreError::Validation { field: "name" })?;
        let url = draft.url.as_deref().map(str::trim).unwrap_or_default().to_string();
        let category = self.existing_category(category_id).await?;
        let owner = authorize(viewer, &category, Action::Create)
            .map_err(|_| CoreError::NotAuthorized { action: Action::Create, entity: EntityKind::Activity })?;
        let hidden = self.gateway.get_hidden_categories(owner).await?;
        if !visibility_predicate::<Category>(viewer, &hidden).matches(&category) {
            return Err(CoreError::NotFound { entity: EntityKind::Category, id: category_id.0 });
        }
        let new = NewActivity {
            name,
            url,
            category_id,
            owner_id: Some(owner.clone()),
            is_public: draft.is_public,
        };
        let activity = self
            .gateway
            .create_activity(new)
            .await
            .map_err(|err| CoreError::for_row(err, EntityKind::Category, category_id.0))?;
        info!(id = %activity.id, category = %category_id, %viewer, "created activity");
        Ok(activity)
    }

    pub async fn update_activity(
        &self,
        viewer: &Viewer,
        id: ActivityId,
        mut changes: ActivityChanges,
    ) -> Result<Activity, CoreError> {
        if let Some(name) = changes.name.take() {
            changes.name = Some(required_text(&name).ok_or(CoreError::Validation { field: "name" })?);
        }
        if let Some(url) = changes.url.take() {
            changes.url = Some(url.trim().to_string());
        }
        let activity = self.existing_activity(id).await?;
        authorize(viewer, &activity, Action::Edit)?;
        let updated = self
            .gateway
            .update_activity(id, &changes)
            .await
            .map_err(|err| CoreError::for_row(err, EntityKind::Activity, id.0))?;
        info!(%id, %viewer, "updated activity");
        Ok(updated)
    }

    pub async fn delete_activity(&self, viewer: &Viewer, id: ActivityId) -> Result<(), CoreError> {
        let activity = self.existing_activity(id).await?;
        authorize(viewer, &activity, Action::Delete)?;
        self.gateway
            .delete_activity(id)
            .await
            .map_err(|err| CoreError::for_row(err, EntityKind::Activity, id.0))?;
        info!(%id, %viewer, "deleted activity");
        Ok(())
    }

    /// Hides a public category from the viewer. Hiding an already hidden
    /// category does nothing.
    pub async fn hide_category(&self, viewer: &Viewer, id: CategoryId) -> Result<(), CoreError> {
        let category = self.existing_category(id).await?;
        let user = authorize(viewer, &category, Action::Hide)?;
        let record = HiddenCategory { user_id: user.clone(), category_id: id };
        match self.gateway.insert_hidden_category(record).await {
            Ok(()) | Err(GatewayError::DuplicateKey(_)) => {}
            Err(err) => return Err(CoreError::for_row(err, EntityKind::Category, id.0)),
        }
        info!(%id, %viewer, "hid category");
        Ok(())
    }

    /// Undoes `hide_category`. Fails with `InvalidOperation` if the viewer has
    /// not hidden the category.
    pub async fn unhide_category(&self, viewer: &Viewer, id: CategoryId) -> Result<(), CoreError> {
        let category = self.existing_category(id).await?;
        let user = authorize(viewer, &category, Action::Unhide)?;
        let not_hidden = CoreError::InvalidOperation("That category is not hidden.");
        if !self.gateway.get_hidden_categories(user).await?.contains(&id) {
            return Err(not_hidden);
        }
        let record = HiddenCategory { user_id: user.clone(), category_id: id };
        match self.gateway.delete_hidden_category(&record).await {
            Ok(()) => {}
            Err(GatewayError::RowNotFound(_)) => return Err(not_hidden),
            Err(err) => return Err(err.into()),
        }
        info!(%id, %viewer, "unhid category");
        Ok(())
    }

    /// Makes sure the logged in user has a profile row. A failure here does
    /// not stop the login, so it is only logged.
    pub async fn ensure_profile(&self, profile: UserProfile) {
        let id = profile.id.clone();
        if let Err(err) = self.gateway.ensure_user_profile(profile).await {
            warn!(user = %id, %err, "could not create user profile");
        }
    }
}
