use thiserror::Error;

/// Rejected query parameters. Input validation upstream should make these
/// unreachable at runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryBuildError {
    #[error("radius must be a finite, non-negative number of meters (got {0})")]
    InvalidRadius(f64),
    #[error("at least one land-use category is required")]
    EmptyCategories,
    #[error("query center is not a valid WGS84 position")]
    InvalidCenter,
}

/// The data source could not deliver a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("data source returned HTTP {status}")]
    Status { status: u16 },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("data source reported: {0}")]
    Remote(String),
}

/// One element could not be turned into a parcel. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("{element}: ring has {distinct} distinct points, at least 3 are required")]
    TooFewPoints { element: String, distinct: usize },
    #[error("{element}: missing geometry for a referenced node")]
    MissingNode { element: String, node: Option<u64> },
    #[error("{element}: ring is not closed")]
    OpenRing { element: String },
    #[error("{element}: relation has no outer ring")]
    NoOuterRing { element: String },
    #[error("{element}: no landuse tag")]
    MissingCategory { element: String },
    #[error("{element}: unsupported landuse {tag:?}")]
    UnknownCategory { element: String, tag: String },
}

impl ConversionError {
    /// Label of the offending element, e.g. `way/42`.
    pub fn element(&self) -> &str {
        match self {
            ConversionError::TooFewPoints { element, .. }
            | ConversionError::MissingNode { element, .. }
            | ConversionError::OpenRing { element }
            | ConversionError::NoOuterRing { element }
            | ConversionError::MissingCategory { element }
            | ConversionError::UnknownCategory { element, .. } => element,
        }
    }
}
