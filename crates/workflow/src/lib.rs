//! Batch workflows: bulk inference over pending documents, owner
//! notifications, and cron-scheduled runs.
//!
//! ```text
//! DocumentStore::fetch_pending → for each item:
//!     Gateway::invoke (timed) → TimingSession::insert → Notifier::notify
//! ```

pub mod batch;
pub mod mail;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::{BatchError, BatchRunner, BatchSummary, FailureKind, ItemFailure};
pub use rxpilot_core::cron::CronExpr;
pub use mail::{LogNotifier, SmtpNotifier};
pub use scheduler::BatchScheduler;

use rxpilot_config::MailConfig;
use rxpilot_core::notify::Notifier;
use std::sync::Arc;
use tracing::warn;

/// SMTP when mail credentials are configured, log-only otherwise.
pub fn notifier_from_config(config: &MailConfig) -> Arc<dyn Notifier> {
    if !config.is_configured() {
        warn!("Mail credentials not set; notifications will only be logged");
        return Arc::new(LogNotifier);
    }
    match SmtpNotifier::from_config(config) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            warn!(error = %e, "SMTP notifier unavailable; notifications will only be logged");
            Arc::new(LogNotifier)
        }
    }
}
