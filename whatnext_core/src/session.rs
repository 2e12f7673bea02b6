use rand::{rngs::StdRng, Rng};
use tracing::info;

use crate::{
    data::{
        Activity, ActivityChanges, ActivityDraft, ActivityId, Category, CategoryChanges,
        CategoryDraft, CategoryId, EntityKind, UserId, UserProfile, Viewer,
    },
    editor::CatalogEditor,
    error::CoreError,
    gateway::DataGateway,
    picker::{Pick, RandomPicker},
    visibility::{activities_by_category, HidePolicy, VisibilityFilter, VisibleSet},
};

/// The state of one user's interaction with the catalog: who is looking, what
/// they can see, which category is selected and what was picked last.
///
/// Changes reach the in-memory lists only after the gateway has confirmed
/// them. When a call fails the session is left exactly as it was.
pub struct Session<G, R = StdRng> {
    gateway: G,
    hide_policy: HidePolicy,
    viewer: Viewer,
    visible: VisibleSet,
    selected_category: Option<CategoryId>,
    picker: RandomPicker<R>,
    /// The result of the latest pick, by ID.
    last_pick: Option<(CategoryId, Option<ActivityId>)>,
}

impl<G: DataGateway, R: Rng> Session<G, R> {
    /// Creates an anonymous session with nothing loaded. Call `refresh` to
    /// load the visible data.
    pub fn new(gateway: G, hide_policy: HidePolicy, picker: RandomPicker<R>) -> Self {
        Self {
            gateway,
            hide_policy,
            viewer: Viewer::Anonymous,
            visible: VisibleSet::default(),
            selected_category: None,
            picker,
            last_pick: None,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn categories(&self) -> &[Category] {
        &self.visible.categories
    }

    pub fn activities(&self) -> &[Activity] {
        &self.visible.activities
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.visible.categories.iter().find(|c| c.id == id)
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.selected_category.and_then(|id| self.category(id))
    }

    /// The activities of the selected category, or every visible activity if
    /// no category is selected.
    pub fn listed_activities(&self) -> impl Iterator<Item = &Activity> {
        let selected = self.selected_category;
        self.visible
            .activities
            .iter()
            .filter(move |a| selected.map_or(true, |id| a.category_id == id))
    }

    /// The latest pick, if its category is still visible.
    pub fn current_pick(&self) -> Option<Pick<'_>> {
        let (category_id, activity_id) = self.last_pick?;
        let category = self.category(category_id)?;
        let activity =
            activity_id.and_then(|id| self.visible.activities.iter().find(|a| a.id == id));
        Some(Pick { category, activity })
    }

    fn editor(&self) -> CatalogEditor<'_, G> {
        CatalogEditor::new(&self.gateway)
    }

    async fn load(&self, viewer: &Viewer) -> Result<VisibleSet, CoreError> {
        VisibilityFilter::new(&self.gateway, self.hide_policy).visible_set(viewer).await
    }

    /// Swaps in a freshly loaded visible set, dropping the selection and the
    /// pick if they are no longer visible.
    fn install(&mut self, visible: VisibleSet) {
        self.visible = visible;
        if self.selected_category().is_none() {
            self.selected_category = None;
        }
        if self.current_pick().is_none() {
            self.last_pick = None;
        }
    }

    /// Reloads everything the viewer can see.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        let visible = self.load(&self.viewer).await?;
        self.install(visible);
        Ok(())
    }

    /// Adopts whoever the auth provider says is logged in, making sure they
    /// have a profile, and reloads the data for them. Returns the user, or
    /// None if nobody is logged in.
    pub async fn log_in(&mut self) -> Result<Option<UserId>, CoreError> {
        let Some(user) = self.gateway.get_current_user().await? else {
            return Ok(None);
        };
        self.editor().ensure_profile(UserProfile::bare(user.clone())).await;
        let viewer = Viewer::Identified(user.clone());
        let visible = self.load(&viewer).await?;
        self.switch_viewer(viewer, visible);
        info!(%user, "logged in");
        Ok(Some(user))
    }

    /// Goes back to browsing anonymously.
    pub async fn log_out(&mut self) -> Result<(), CoreError> {
        let visible = self.load(&Viewer::Anonymous).await?;
        self.switch_viewer(Viewer::Anonymous, visible);
        info!("logged out");
        Ok(())
    }

    fn switch_viewer(&mut self, viewer: Viewer, visible: VisibleSet) {
        self.viewer = viewer;
        self.picker.forget();
        self.last_pick = None;
        self.install(visible);
    }

    pub fn select_category(&mut self, id: CategoryId) -> Result<&Category, CoreError> {
        if self.category(id).is_none() {
            return Err(CoreError::NotFound { entity: EntityKind::Category, id: id.0 });
        }
        self.selected_category = Some(id);
        self.category(id).ok_or(CoreError::NotFound { entity: EntityKind::Category, id: id.0 })
    }

    pub fn clear_selection(&mut self) {
        self.selected_category = None;
    }

    /// Picks a random category and activity from the visible set and selects
    /// the picked category. Returns None if nothing is visible.
    pub fn pick_next(&mut self) -> Option<Pick<'_>> {
        let grouped = activities_by_category(&self.visible.activities);
        let pick = self.picker.pick_next(&self.visible.categories, &grouped)?;
        let ids = (pick.category.id, pick.activity.map(|a| a.id));
        self.last_pick = Some(ids);
        self.selected_category = Some(ids.0);
        self.current_pick()
    }

    pub async fn create_category(&mut self, draft: CategoryDraft) -> Result<&Category, CoreError> {
        let category = self.editor().create_category(&self.viewer, draft).await?;
        let id = category.id;
        self.visible.categories.push(category);
        sort_by_name(&mut self.visible.categories, |c| (&c.name, c.id.0));
        self.category(id).ok_or(CoreError::NotFound { entity: EntityKind::Category, id: id.0 })
    }

    pub async fn update_category(
        &mut self,
        id: CategoryId,
        changes: CategoryChanges,
    ) -> Result<(), CoreError> {
        let updated = self.editor().update_category(&self.viewer, id, changes).await?;
        if let Some(slot) = self.visible.categories.iter_mut().find(|c| c.id == id) {
            *slot = updated;
        }
        sort_by_name(&mut self.visible.categories, |c| (&c.name, c.id.0));
        Ok(())
    }

    /// Deletes the category; its activities go with it.
    pub async fn delete_category(&mut self, id: CategoryId) -> Result<(), CoreError> {
        self.editor().delete_category(&self.viewer, id).await?;
        self.drop_category(id, true);
        Ok(())
    }

    /// Hides the category from the viewer.
    pub async fn hide_category(&mut self, id: CategoryId) -> Result<(), CoreError> {
        self.editor().hide_category(&self.viewer, id).await?;
        let cascade = self.hide_policy == HidePolicy::CascadeToActivities;
        self.drop_category(id, cascade);
        Ok(())
    }

    /// Unhides the category and reloads, since the category and its
    /// activities are not in memory.
    pub async fn unhide_category(&mut self, id: CategoryId) -> Result<(), CoreError> {
        self.editor().unhide_category(&self.viewer, id).await?;
        self.refresh().await
    }

    fn drop_category(&mut self, id: CategoryId, with_activities: bool) {
        self.visible.categories.retain(|c| c.id != id);
        if with_activities {
            self.visible.activities.retain(|a| a.category_id != id);
        }
        if self.selected_category == Some(id) {
            self.selected_category = None;
        }
        if self.current_pick().is_none() {
            self.last_pick = None;
        }
    }

    /// Files a new activity under the selected category.
    pub async fn create_activity(&mut self, draft: ActivityDraft) -> Result<&Activity, CoreError> {
        let category_id =
            self.selected_category.ok_or(CoreError::Validation { field: "category" })?;
        let activity = self.editor().create_activity(&self.viewer, category_id, draft).await?;
        let id = activity.id;
        self.visible.activities.push(activity);
        sort_by_name(&mut self.visible.activities, |a| (&a.name, a.id.0));
        self.activity(id).ok_or(CoreError::NotFound { entity: EntityKind::Activity, id: id.0 })
    }

    pub fn activity(&self, id: ActivityId) -> Option<&Activity> {
        self.visible.activities.iter().find(|a| a.id == id)
    }

    pub async fn update_activity(
        &mut self,
        id: ActivityId,
        changes: ActivityChanges,
    ) -> Result<(), CoreError> {
        let updated = self.editor().update_activity(&self.viewer, id, changes).await?;
        if let Some(slot) = self.visible.activities.iter_mut().find(|a| a.id == id) {
            *slot = updated;
        }
        sort_by_name(&mut self.visible.activities, |a| (&a.name, a.id.0));
        Ok(())
    }

    pub async fn delete_activity(&mut self, id: ActivityId) -> Result<(), CoreError> {
        self.editor().delete_activity(&self.viewer, id).await?;
        self.visible.activities.retain(|a| a.id != id);
        if let Some((_, activity)) = &mut self.last_pick {
            if *activity == Some(id) {
                *activity = None;
            }
        }
        Ok(())
    }
}

fn sort_by_name<T>(items: &mut [T], key: impl Fn(&T) -> (&String, u64)) {
    items.sort_by(|a, b| key(a).cmp(&key(b)));
}
