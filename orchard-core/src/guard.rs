//! Ownership checks for item mutation.

use std::sync::Arc;

use orchard_types::{ItemId, SubjectId};
use tracing::debug;

use crate::error::AccessError;
use crate::store::ItemStore;

/// Single decision point for "may this subject change this item?".
///
/// Only the item's owner may update or delete it. The decision looks at the
/// stored owner alone, never at the request payload.
#[derive(Clone)]
pub struct OwnershipGuard {
    store: Arc<dyn ItemStore>,
}

impl OwnershipGuard {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Succeeds only when `subject` owns item `id`.
    ///
    /// A missing item is reported as [`AccessError::NotFound`], not folded
    /// into `Unauthorized`.
    pub async fn authorize_mutation(
        &self,
        id: ItemId,
        subject: &SubjectId,
    ) -> Result<(), AccessError> {
        let owner = self.store.get_owner(id).await?;
        if &owner != subject {
            debug!(%id, %owner, %subject, "mutation denied: not the owner");
            return Err(AccessError::Unauthorized(id));
        }
        Ok(())
    }
}
