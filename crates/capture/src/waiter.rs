//! Waiting for a page lifecycle milestone.

use std::time::Duration;

use {
    futures::{Stream, StreamExt},
    tracing::{debug, trace},
};

use crate::{error::CaptureError, types::LifecycleEvent};

/// Milestone signalling that no further network activity is pending.
pub const NETWORK_IDLE: &str = "networkIdle";

/// Block until `events` yields an event named `milestone`, or until
/// `deadline` elapses.
///
/// Non-matching events are ignored, never reported. The first match wins:
/// the waiter returns and anything still in the stream is inert. A stream
/// that ends without a match keeps the wait pending until the deadline,
/// which surfaces as [`CaptureError::Cancelled`]. The subscription itself
/// is dropped by the caller on both exit paths.
pub async fn await_milestone<S>(
    events: &mut S,
    milestone: &str,
    deadline: Duration,
) -> Result<(), CaptureError>
where
    S: Stream<Item = LifecycleEvent> + Unpin,
{
    let matched = async {
        while let Some(event) = events.next().await {
            if event.name == milestone {
                debug!(milestone, "lifecycle milestone reached");
                return;
            }
            trace!(name = %event.name, "ignoring lifecycle event");
        }
        // Subscription ended without a match; hold the wait until the
        // deadline resolves it.
        futures::future::pending::<()>().await
    };

    tokio::time::timeout(deadline, matched).await.map_err(|_| {
        CaptureError::Cancelled(format!(
            "page did not reach \"{milestone}\" within {}ms",
            deadline.as_millis()
        ))
    })
}
