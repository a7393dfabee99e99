use crate::client::part::CompletedParts;
use crate::client::request::AbortRequest;
use crate::client::{SendRequest, UploadClient, UploadData};

use std::fmt::{self, Display, Formatter};
use std::time::Instant;

/// Where a multipart upload is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The store assigned an upload id.
    Initiated,
    /// Parts are being read and uploaded.
    PartsInFlight,
    /// Every part was uploaded.
    PartsComplete,
    /// At least one part could not be uploaded, or the file could not be read.
    PartsFailed,
    /// The store assembled the object.
    Completed,
    /// The upload will not produce an object.
    Failed,
}

impl Phase {
    fn can_move_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Initiated, PartsInFlight)
                | (PartsInFlight, PartsComplete | PartsFailed)
                | (PartsComplete, Completed | Failed)
                | (PartsFailed, Failed)
        )
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiated => write!(f, "initiated"),
            Self::PartsInFlight => write!(f, "parts_in_flight"),
            Self::PartsComplete => write!(f, "parts_complete"),
            Self::PartsFailed => write!(f, "parts_failed"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// An active multipart upload.
///
/// With an abort client set, a session dropped before it reached `Completed`
/// or `Failed` spawns an abort request, e.g. when the upload future is
/// cancelled by a timeout.
#[derive(Debug)]
pub(crate) struct UploadSession {
    pub(crate) data: UploadData,
    pub(crate) parts: CompletedParts,
    phase: Phase,
    started: Instant,
    abort_on_drop: Option<UploadClient>,
}

impl UploadSession {
    pub(crate) fn new(
        data: UploadData,
        started: Instant,
        abort_on_drop: Option<UploadClient>,
    ) -> Self {
        debug!(id = %data.id, uri = %data.uri, phase = %Phase::Initiated, "upload session");
        Self {
            data,
            parts: CompletedParts::default(),
            phase: Phase::Initiated,
            started,
            abort_on_drop,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to the next phase.
    ///
    /// A move the lifecycle does not allow is ignored and leaves the current
    /// phase in place.
    pub(crate) fn transition(&mut self, next: Phase) {
        if !self.phase.can_move_to(next) {
            warn!(id = %self.data.id, from = %self.phase, to = %next, "invalid phase transition");
            return;
        }
        debug!(
            id = %self.data.id,
            uri = %self.data.uri,
            from = %self.phase,
            to = %next,
            elapsed_ms = self.elapsed_ms(),
            "upload session",
        );
        self.phase = next;
    }

    pub(crate) fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        if matches!(self.phase, Phase::Completed | Phase::Failed) {
            return;
        }
        let Some(client) = self.abort_on_drop.take() else {
            return;
        };
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            warn!(id = %self.data.id, "upload dropped outside of a runtime, not aborting");
            return;
        };

        warn!(
            id = %self.data.id,
            uri = %self.data.uri,
            phase = %self.phase,
            elapsed_ms = self.elapsed_ms(),
            "upload dropped before finishing, aborting",
        );
        let req = AbortRequest::new(&self.data);
        rt.spawn(async move {
            if let Err(e) = client.send_abort_upload_request(req).await {
                warn!(error = %e, "abort of dropped upload failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryClient;
    use crate::client::request::CreateRequest;
    use crate::uri::ObjectUri;

    fn session() -> UploadSession {
        let data = UploadData::new("upload-1", ObjectUri::from(("bucket", "key")));
        UploadSession::new(data, Instant::now(), None)
    }

    #[test]
    fn happy_path_ends_completed() {
        let mut s = session();
        for next in [Phase::PartsInFlight, Phase::PartsComplete, Phase::Completed] {
            s.transition(next);
            assert_eq!(s.phase(), next);
        }
    }

    #[test]
    fn failed_parts_cannot_complete() {
        let mut s = session();
        s.transition(Phase::PartsInFlight);
        s.transition(Phase::PartsFailed);
        s.transition(Phase::Completed);
        assert_eq!(s.phase(), Phase::PartsFailed);
        s.transition(Phase::Failed);
        assert_eq!(s.phase(), Phase::Failed);
    }

    async fn started_session(client: &MemoryClient) -> UploadSession {
        let uri = ObjectUri::from(("bucket", "key"));
        let data = client
            .send_create_upload_request(CreateRequest::new(uri))
            .await
            .unwrap();
        let abort = Some(UploadClient::new(client.clone()));
        UploadSession::new(data, Instant::now(), abort)
    }

    async fn settle_spawned() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn dropped_unfinished_session_is_aborted() {
        let client = MemoryClient::new();
        let mut s = started_session(&client).await;
        s.transition(Phase::PartsInFlight);
        drop(s);
        settle_spawned().await;

        assert_eq!(client.active_uploads(), 0);
    }

    #[tokio::test]
    async fn dropped_finished_session_is_left_alone() {
        let client = MemoryClient::new();
        let mut s = started_session(&client).await;
        for next in [Phase::PartsInFlight, Phase::PartsComplete, Phase::Completed] {
            s.transition(next);
        }
        drop(s);
        settle_spawned().await;

        assert_eq!(client.active_uploads(), 1);
    }
}
