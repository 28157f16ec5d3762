//! Error types for the menu widgets

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised while building or displaying a menu.
#[derive(Debug, Error)]
pub enum MenuError {
    /// A paginator was built without items.
    #[error("a paginator requires at least one item")]
    NoItems,

    /// A slideshow was built without image urls.
    #[error("a slideshow requires at least one image url")]
    NoUrls,

    /// An ordered menu was built with an unusable number of choices.
    #[error("an ordered menu requires between 1 and 10 choices, got {0}")]
    ChoiceCount(usize),

    /// Paginator column count outside the renderable range.
    #[error("columns must be between 1 and 3, got {0}")]
    Columns(usize),

    /// Paginator page size of zero.
    #[error("items per page must be at least 1")]
    ItemsPerPage,

    /// The menu cannot take reactions and typed input is disabled, so nobody
    /// could ever interact with it.
    #[error("cannot add reactions here and typed input is disabled")]
    ReactionsUnavailable,

    /// The platform rejected a request the menu cannot proceed without.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for menu operations.
pub type MenuResult<T> = Result<T, MenuError>;
