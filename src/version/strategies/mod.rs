//! Concrete version resolution strategies
//!
//! Priority order: release API, changelog page, blog feed, homepage. The
//! chain is assembled by [`create_default_strategies`].

mod blog;
mod changelog;
mod homepage;
mod releases;

pub use blog::BlogFeedStrategy;
pub use changelog::ChangelogStrategy;
pub use homepage::HomepageStrategy;
pub use releases::ReleaseApiStrategy;

use std::sync::Arc;

use crate::version::resolver::VersionStrategy;

/// HTTP user agent sent by every strategy.
pub(crate) const USER_AGENT: &str = "toolradar";

/// Create the default strategy chain in priority order.
pub fn create_default_strategies() -> Vec<Arc<dyn VersionStrategy>> {
    vec![
        Arc::new(ReleaseApiStrategy::default()),
        Arc::new(ChangelogStrategy::new()),
        Arc::new(BlogFeedStrategy::new()),
        Arc::new(HomepageStrategy::new()),
    ]
}
