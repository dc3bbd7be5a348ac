use thiserror::Error;

/// Failure outcomes of a consolidation run.
///
/// Running out of container space is deliberately not represented here: a
/// full container ends the run early with a partial moved count, which is a
/// normal result, not a failure.
#[derive(Debug, Error)]
pub enum StackError {
    /// The owner already has a stacking run in flight. Nothing was changed;
    /// the caller may retry once the active run finishes.
    #[error("a potion stacking run is already in progress for this owner")]
    AlreadyBusy,

    /// The scan/compute phase unwound. The busy entry was still released, so
    /// the owner can run again; the container may have been partially
    /// rewritten.
    #[error("potion stacking failed unexpectedly: {0}")]
    Unexpected(String),
}
