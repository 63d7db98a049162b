//! Remote church-directory seam
//!
//! The controller never performs I/O itself: it hands a [`DirectoryQuery`]
//! to the application, which runs [`ChurchDirectory::fetch`] on a background
//! task and feeds the outcome back on the UI thread.

use crate::church::Church;
use crate::filter::ConfessionFilter;
use crate::Result;
use geo::Point;

/// Context sent along with a directory fetch
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryQuery {
    /// Query anchor: the user's position, or the fallback coordinate when
    /// location permission was denied
    pub near: Point<f64>,
    /// Confessions enabled at the time the fetch was triggered
    pub filter: ConfessionFilter,
}

/// Remote fetch of the church directory
///
/// Implementations block until the request finishes; callers are expected to
/// run them off the UI thread. A single attempt per trigger; retry policy
/// is not a concern of this seam.
pub trait ChurchDirectory: Send + Sync {
    fn fetch(&self, query: &DirectoryQuery) -> Result<Vec<Church>>;
}

impl<T: ChurchDirectory + ?Sized> ChurchDirectory for std::sync::Arc<T> {
    fn fetch(&self, query: &DirectoryQuery) -> Result<Vec<Church>> {
        (**self).fetch(query)
    }
}
