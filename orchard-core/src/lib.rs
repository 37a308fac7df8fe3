//! # orchard-core
//!
//! Ownership-checked item management, independent of any transport.
//!
//! The pieces, leaves first:
//! - [`store`]: the `ItemStore` persistence trait and its backends
//! - [`guard`]: the ownership decision for updates and deletes
//! - [`identity`]: the seam through which callers are identified
//! - [`handler`]: request orchestration and outcome mapping

pub mod error;
pub mod guard;
pub mod handler;
pub mod identity;
pub mod store;

pub use error::{AccessError, StoreError, StoreResult};
pub use guard::OwnershipGuard;
pub use handler::{ItemHandler, Rejection};
pub use identity::IdentityResolver;
pub use store::{ItemStore, JsonFileStore, MemoryStore};

pub use orchard_types::{Item, ItemId, ItemPayload, SubjectId};
