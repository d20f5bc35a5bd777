//! Login redirect adapter.

use parking_lot::Mutex;
use tracing::warn;

use crate::ports::Navigator;

/// Navigator for hosts without a browser: logs the redirect and remembers
/// every target so the host can act on it (e.g. prompt for a new login).
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent navigation target.
    pub fn last(&self) -> Option<String> {
        self.visits.lock().last().cloned()
    }

    /// All targets, oldest first.
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        warn!(target_url = url, "session ended, redirecting to login");
        self.visits.lock().push(url.to_string());
    }
}
