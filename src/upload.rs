//! Simulated photo upload.
//!
//! There is no real upload backend — the original UI faked one with a
//! timer. Modeled here as a spawned tokio task so a caller can abort it
//! mid-flight; the engine never sees the upload, only the finished list of
//! references handed to it afterwards.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Per-photo simulated latency.
const UPLOAD_DELAY: Duration = Duration::from_millis(400);

/// Start "uploading" the given sources. Resolves to one stable reference
/// per source once the whole batch completes; abort the handle to cancel —
/// no partial batch is ever observable.
pub fn start_upload(sources: Vec<String>) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let delay = UPLOAD_DELAY * sources.len() as u32;
        tokio::time::sleep(delay).await;
        let refs: Vec<String> = sources
            .into_iter()
            .map(|source| format!("photo://{source}"))
            .collect();
        debug!(count = refs.len(), "photo upload finished");
        refs
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
