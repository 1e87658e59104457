//! Surfacing of non-fatal issues to whoever is watching.
//!
//! Components that can continue after a problem (a failed embedding, an
//! index status that never settled) report it through this capability
//! instead of hard-depending on a presentation channel.

use tracing::{info, warn};

/// Sink for non-fatal notices.
pub trait Reporter: Send + Sync {
    /// Progress/status worth showing.
    fn info(&self, message: &str);
    /// A problem that did not stop the operation.
    fn warn(&self, message: &str);
}

/// Default reporter: forwards to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }
}
