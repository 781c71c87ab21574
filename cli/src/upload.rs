use std::time::Duration;

use mofutree_core::{PushEvent, SubmitOutcome, TreeApi, TreeClient};
use url::Url;

use crate::push::{next_update, wait_until_open, PushRunner};

/// How long an upload waits for the push handshake before submitting anyway.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitedUpload {
    pub outcome: SubmitOutcome,
    /// A composite announcement arrived after the upload was accepted.
    pub announced: bool,
}

/// Submits the selected file over an already open push channel and waits for
/// the composite announcement that follows. Announcements carry no upload id,
/// so the first one received after submitting is taken as this upload's.
pub async fn submit_and_wait<A: TreeApi>(
    client: &TreeClient<A>,
    push: Url,
    wait_for: Duration,
) -> WaitedUpload {
    let (runner, mut signals) = PushRunner::spawn(push);
    if !wait_until_open(&mut signals, HANDSHAKE_TIMEOUT).await {
        tracing::warn!(
            timeout_secs = HANDSHAKE_TIMEOUT.as_secs(),
            "push channel not open, submitting anyway"
        );
    }

    let outcome = client.submit_upload().await;
    let mut announced = false;
    if outcome == SubmitOutcome::Succeeded {
        announced = next_update(&mut signals, wait_for).await;
        if announced {
            client.handle_push_event(PushEvent::CompositeUpdated);
        }
    }
    runner.stop().await;
    WaitedUpload { outcome, announced }
}
