// ── Backend availability probe ──
//
// One cheap read (at most one item) before every hybrid operation. The
// result is never cached: connectivity on a patrol tablet changes between
// two taps.

use std::sync::Arc;

use rollcall_api::RemoteGateway;
use tracing::{debug, warn};

/// Lowercased substrings that mark a failure as plan/quota related.
pub const QUOTA_KEYWORDS: [&str; 9] = [
    "payment",
    "limit",
    "quota",
    "billing",
    "subscription",
    "exceeded",
    "upgrade",
    "resource limit",
    "higher plans",
];

/// Why a probe failed. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The backend refused on plan or quota grounds.
    Quota,
    /// Anything else: network, DNS, server error.
    Connectivity,
}

impl ProbeFailure {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if QUOTA_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Self::Quota
        } else {
            Self::Connectivity
        }
    }
}

/// Decides whether the remote backend is usable right now.
pub struct AvailabilityProber {
    gateway: Arc<dyn RemoteGateway>,
    collection: String,
}

impl AvailabilityProber {
    pub fn new(gateway: Arc<dyn RemoteGateway>, collection: impl Into<String>) -> Self {
        Self {
            gateway,
            collection: collection.into(),
        }
    }

    /// `true` only if a limited read of the probe collection succeeds.
    pub async fn is_available(&self) -> bool {
        match self.gateway.get_items_limited(&self.collection, 1).await {
            Ok(_) => {
                debug!(collection = %self.collection, "backend reachable");
                true
            }
            Err(e) => {
                let message = e.to_string();
                match ProbeFailure::classify(&message) {
                    ProbeFailure::Quota => {
                        warn!(error = %message, "backend refused: plan or quota limit");
                    }
                    ProbeFailure::Connectivity => {
                        debug!(error = %message, "backend unreachable, working offline");
                    }
                }
                false
            }
        }
    }
}
