use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;
use crate::protocol::OverpassResponse;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can evaluate an Overpass query.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait SpatialSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Evaluates `query` and decodes the response body.
    fn fetch<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<OverpassResponse, FetchError>>;
}
