use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("invalid cache capacity: {0}")]
    InvalidCapacity(usize),

    /// Negative-cache marker: a previous resolution found nothing in the
    /// local network. Not a fault; callers use it to skip another local
    /// lookup for a while.
    #[error("no local replies")]
    NoLocalReplies,
}
