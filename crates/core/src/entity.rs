//! Owned resources: records with a single, creation-time owner.

use crate::PrincipalId;

/// A record owned exclusively by the principal that created it.
///
/// # Invariants
/// - `owner_id` is assigned exactly once, when the store creates the record,
///   from the authenticated principal (never from caller input).
/// - Implementations expose no way to reassign the owner.
pub trait OwnedResource {
    /// Strongly-typed resource identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync;

    /// Returns the resource identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the owning principal.
    fn owner_id(&self) -> PrincipalId;

    /// Whether `principal` owns this resource.
    fn is_owned_by(&self, principal: PrincipalId) -> bool {
        self.owner_id() == principal
    }
}
