//! Identity resolution seam.
//!
//! The core never inspects credentials itself. Whatever verifies them (JWT,
//! session cookie, test double) implements [`IdentityResolver`].

use orchard_types::SubjectId;

/// Maps an inbound credential to the subject it identifies.
///
/// Implementations must be deterministic and free of side effects visible to
/// the core. `None` means the caller is unauthenticated.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: Option<&str>) -> Option<SubjectId>;
}

impl<F> IdentityResolver for F
where
    F: Fn(Option<&str>) -> Option<SubjectId> + Send + Sync,
{
    fn resolve(&self, credential: Option<&str>) -> Option<SubjectId> {
        self(credential)
    }
}
