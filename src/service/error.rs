use crate::listing::error::ListingError;
use crate::repository::error::DatabaseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("ListingError: {0}")]
    ListingError(#[from] ListingError),

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),
}
