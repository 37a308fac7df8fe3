//! Request handling for item operations.
//!
//! `ItemHandler` validates request shape, resolves the caller through the
//! injected [`IdentityResolver`], consults the [`OwnershipGuard`], calls the
//! [`ItemStore`], and turns every outcome into either a value or a
//! [`Rejection`]. It is transport agnostic; the HTTP server maps rejections
//! to status codes.

use std::sync::Arc;

use orchard_types::{Item, ItemId, ItemPayload, SubjectId};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::{AccessError, StoreError};
use crate::guard::OwnershipGuard;
use crate::identity::IdentityResolver;
use crate::store::ItemStore;

/// Terminal failure states of a request.
#[derive(Debug, Error)]
pub enum Rejection {
    /// Missing or malformed payload or id. The store was not touched.
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("no resolved identity")]
    Unauthenticated,

    /// Authenticated, but not the item's owner
    #[error("only the user who added the item may change it")]
    Forbidden(ItemId),

    #[error("item {0} not found")]
    NotFound(ItemId),

    /// Unexpected backend failure. Details are logged, never returned.
    #[error("internal failure")]
    Internal,
}

/// Orchestrates validation, identity, ownership, and persistence.
///
/// Holds no per-request state; clone it freely.
#[derive(Clone)]
pub struct ItemHandler {
    store: Arc<dyn ItemStore>,
    guard: OwnershipGuard,
    identity: Arc<dyn IdentityResolver>,
}

impl ItemHandler {
    pub fn new(store: Arc<dyn ItemStore>, identity: Arc<dyn IdentityResolver>) -> Self {
        let guard = OwnershipGuard::new(store.clone());
        Self {
            store,
            guard,
            identity,
        }
    }

    /// Full collection. No identity required.
    pub async fn list(&self) -> Result<Vec<Item>, Rejection> {
        self.store
            .list_items()
            .await
            .map_err(|err| store_failure("list", err))
    }

    /// Create an item owned by the resolved caller.
    pub async fn create(
        &self,
        payload: Option<ItemPayload>,
        credential: Option<&str>,
    ) -> Result<Item, Rejection> {
        let payload = validate_payload(payload)?;
        let subject = self.resolve(credential)?;

        let item = self
            .store
            .create_item(payload, subject)
            .await
            .map_err(|err| store_failure("create", err))?;

        info!(id = %item.id, owner = %item.owner_id, "item created");
        Ok(item)
    }

    /// Replace the payload of an item the caller owns.
    pub async fn update(
        &self,
        raw_id: &str,
        payload: Option<ItemPayload>,
        credential: Option<&str>,
    ) -> Result<Item, Rejection> {
        let payload = validate_payload(payload)?;
        let id = parse_id(raw_id)?;
        let subject = self.resolve(credential)?;
        self.authorize(id, &subject).await?;

        let item = self
            .store
            .update_item(id, payload)
            .await
            .map_err(|err| store_failure("update", err))?;

        info!(%id, %subject, "item updated");
        Ok(item)
    }

    /// Remove an item the caller owns.
    pub async fn delete(&self, raw_id: &str, credential: Option<&str>) -> Result<(), Rejection> {
        let id = parse_id(raw_id)?;
        let subject = self.resolve(credential)?;
        self.authorize(id, &subject).await?;

        self.store
            .delete_item(id)
            .await
            .map_err(|err| store_failure("delete", err))?;

        info!(%id, %subject, "item deleted");
        Ok(())
    }

    fn resolve(&self, credential: Option<&str>) -> Result<SubjectId, Rejection> {
        self.identity.resolve(credential).ok_or_else(|| {
            warn!("request has no resolved identity");
            Rejection::Unauthenticated
        })
    }

    async fn authorize(&self, id: ItemId, subject: &SubjectId) -> Result<(), Rejection> {
        self.guard
            .authorize_mutation(id, subject)
            .await
            .map_err(|err| match err {
                AccessError::Unauthorized(id) => {
                    warn!(%id, %subject, "mutation by non-owner rejected");
                    Rejection::Forbidden(id)
                }
                AccessError::NotFound(id) => {
                    warn!(%id, "mutation of missing item rejected");
                    Rejection::NotFound(id)
                }
                AccessError::Storage(err) => store_failure("authorize", err),
            })
    }
}

fn validate_payload(payload: Option<ItemPayload>) -> Result<ItemPayload, Rejection> {
    match payload {
        Some(payload) if payload.is_well_formed() => Ok(payload),
        Some(_) => {
            warn!("item payload is malformed");
            Err(Rejection::BadRequest("item needs a name and may not set id or ownerId"))
        }
        None => {
            warn!("request has no item payload");
            Err(Rejection::BadRequest("missing item payload"))
        }
    }
}

fn parse_id(raw: &str) -> Result<ItemId, Rejection> {
    raw.parse::<ItemId>().map_err(|err| {
        warn!(%err, "rejecting malformed item id");
        Rejection::BadRequest("item id must be a positive integer")
    })
}

/// The item may vanish between the ownership check and the write, in which
/// case the store reports `NotFound` directly.
fn store_failure(op: &'static str, err: StoreError) -> Rejection {
    match err {
        StoreError::NotFound(id) => {
            warn!(op, %id, "item disappeared during request");
            Rejection::NotFound(id)
        }
        StoreError::Storage(msg) => {
            error!(op, %msg, "item store failure");
            Rejection::Internal
        }
    }
}
