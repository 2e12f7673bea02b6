use std::collections::HashMap;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::debug;

use crate::data::{Activity, Category, CategoryId};

/// The result of a pick: a category, and an activity from it if it has any.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Pick<'a> {
    pub category: &'a Category,
    pub activity: Option<&'a Activity>,
}

/// Picks a random category and a random activity within it, steering away
/// from picking the same category twice in a row.
#[derive(Debug)]
pub struct RandomPicker<R = StdRng> {
    rng: R,
    /// The category returned by the previous pick, if any.
    last_picked: Option<CategoryId>,
}

impl RandomPicker<StdRng> {
    /// A picker whose sequence of picks is fully determined by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomPicker<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, last_picked: None }
    }

    pub fn last_picked(&self) -> Option<CategoryId> {
        self.last_picked
    }

    /// Drops the memory of the previous pick, e.g. when the viewer changes.
    pub fn forget(&mut self) {
        self.last_picked = None;
    }

    /// Picks the next category and activity. With more than one category, the
    /// previously picked category is never picked again; with exactly one, it
    /// is picked every time. Returns None if there are no categories.
    pub fn pick_next<'a>(
        &mut self,
        categories: &'a [Category],
        activities_by_category: &HashMap<CategoryId, Vec<&'a Activity>>,
    ) -> Option<Pick<'a>> {
        let category = match categories {
            [] => return None,
            [only] => only,
            _ => {
                let last = self.last_picked;
                let candidates: Vec<&Category> =
                    categories.iter().filter(|c| Some(c.id) != last).collect();
                match candidates.choose(&mut self.rng) {
                    Some(category) => *category,
                    // every listed category is the last pick; nothing to
                    // steer away to
                    None => categories.choose(&mut self.rng)?,
                }
            }
        };
        self.last_picked = Some(category.id);

        let activity = activities_by_category
            .get(&category.id)
            .and_then(|activities| activities.choose(&mut self.rng))
            .copied();
        debug!(
            category = %category.id,
            activity = ?activity.map(|a| a.id),
            "picked next"
        );
        Some(Pick { category, activity })
    }
}
