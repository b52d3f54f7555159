//! The user-supplied resource lifecycle capability set
use std::future::Future;

/// Capability set a pool consumer implements to create, validate, and
/// destroy the resources it wants pooled.
///
/// Grounded on the teacher's `Resource` trait (`create`/`is_valid`/
/// `cleanup`): `validate` keeps the same "defaults to always valid"
/// behavior so implementers only pay for the health check they actually
/// want. `destroy` must be idempotent against an already-destroyed input —
/// the pool may call it on a record it has already given up on.
pub trait Factory: Send + Sync + 'static {
    /// The resource value this factory produces and the pool holds.
    type Resource: Send + 'static;
    /// The error type `create`/`validate`/`destroy` may fail with.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Produce a fresh resource.
    fn create(&self) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send;

    /// Release a resource. Must be idempotent against an already-destroyed
    /// input. May fail; the pool's factory adapter (see `pool.rs`) logs
    /// and swallows any error rather than letting it unwind — the record
    /// is removed from the pool regardless, since retaining a doomed
    /// record would violate the pool's bounds (spec.md §4.6).
    fn destroy(&self, resource: Self::Resource) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Cheap health check run before handing a resource to a borrower
    /// (`test_on_borrow`) or before returning one to `available`
    /// (`test_on_return`). Absent implementations are always valid.
    fn validate(&self, _resource: &Self::Resource) -> impl Future<Output = bool> + Send {
        async { true }
    }
}

/// Call `factory.destroy`, logging and swallowing any failure.
///
/// This is the "factory adapter" of spec.md §4.3: it is the only place in
/// the crate that invokes a fallible `destroy`, and it never lets the
/// failure propagate — the record is gone from the pool's bookkeeping
/// either way, so surfacing the error to a caller would have nothing
/// actionable to do with it.
pub(crate) async fn destroy_quiet<F: Factory>(factory: &F, resource: F::Resource) {
    if let Err(_err) = factory.destroy(resource).await {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "factory destroy failed; record removed regardless");
    }
}
