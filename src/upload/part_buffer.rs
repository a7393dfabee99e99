use crate::client::part::{CompletedPart, CompletedParts, FailedPart, FailedParts};
use crate::client::request::SendUploadPart;
use crate::error::{Error as UploadError, Result};

use futures::stream::FuturesUnordered;
use futures::{Stream, ready};
use multipart_write::MultipartWrite;
use std::fmt::{self, Debug, Formatter};
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Utility `MultipartWrite` for buffering part upload request futures.
///
/// Writing pushes a part upload onto the buffer. The writer is not ready while
/// `capacity` part uploads are unsettled, which is what bounds the number of
/// parts in flight. A failed part does not stop the others: completing the
/// writer waits for every part and returns successes and failures together.
#[must_use = "futures do nothing unless polled"]
#[pin_project::pin_project]
pub(crate) struct PartBuffer {
    #[pin]
    pending: FuturesUnordered<SendUploadPart>,
    settled: SettledParts,
    capacity: Option<NonZeroUsize>,
}

impl PartBuffer {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self {
            pending: FuturesUnordered::new(),
            settled: SettledParts::default(),
            capacity: capacity.and_then(NonZeroUsize::new),
        }
    }

    /// Number of part uploads that have not settled yet.
    pub(crate) fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

impl MultipartWrite<SendUploadPart> for PartBuffer {
    type Ret = ();
    type Output = SettledParts;
    type Error = UploadError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let mut this = self.project();
        // Poke the pending uploads to see if any are ready.
        while let Poll::Ready(Some(res)) = this.pending.as_mut().poll_next(cx) {
            this.settled.record(res);
        }
        if this.capacity.is_none_or(|n| this.pending.len() < n.get()) {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    }

    fn start_send(self: Pin<&mut Self>, part: SendUploadPart) -> Result<Self::Ret> {
        trace!(part = %part.part_number(), "buffered part upload");
        self.project().pending.push(part);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let mut this = self.project();
        while !this.pending.is_empty() {
            match ready!(this.pending.as_mut().poll_next(cx)) {
                Some(res) => this.settled.record(res),
                // The stream stopped producing, i.e., the collection is empty.
                None => break,
            }
        }
        Poll::Ready(Ok(()))
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Self::Output>> {
        ready!(self.as_mut().poll_flush(cx))?;
        Poll::Ready(Ok(std::mem::take(self.project().settled)))
    }
}

impl Debug for PartBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartBuffer")
            .field("pending", &self.pending)
            .field("settled", &self.settled)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// The outcomes of every part upload pushed to a [`PartBuffer`].
#[derive(Debug, Default)]
pub(crate) struct SettledParts {
    pub(crate) completed: CompletedParts,
    pub(crate) failed: FailedParts,
}

impl SettledParts {
    fn record(&mut self, res: Result<CompletedPart, FailedPart>) {
        match res {
            Ok(v) => {
                info!(
                    id = %v.id,
                    etag = %v.etag,
                    part = %v.part_number,
                    bytes = v.part_size,
                    "uploaded part",
                );
                self.completed.push(v);
            }
            Err(e) => {
                warn!(part = %e.part_number, error = %e.error, "part upload failed");
                self.failed.push(e);
            }
        }
    }

    /// The completion manifest in ascending part number order when every part
    /// succeeded, otherwise the failures.
    pub(crate) fn into_manifest(self) -> Result<CompletedParts, FailedParts> {
        if !self.failed.is_empty() {
            return Err(self.failed);
        }
        let mut completed = self.completed;
        // Parts settle in any order; the store requires ascending part numbers.
        completed.sort_ascending();
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::part::{EntityTag, PartNumber};
    use crate::client::UploadId;
    use crate::error::ErrorKind;

    fn completed(n: i32) -> Result<CompletedPart, FailedPart> {
        let etag = EntityTag::from(format!("etag-{n}"));
        Ok(CompletedPart::new(UploadId::from("id"), etag, PartNumber::new(n), 1))
    }

    fn failed(n: i32) -> Result<CompletedPart, FailedPart> {
        let e = UploadError::from_kind(ErrorKind::Unknown, "connection reset");
        Err(FailedPart::new(PartNumber::new(n), e))
    }

    #[test]
    fn manifest_is_sorted_regardless_of_settle_order() {
        let mut settled = SettledParts::default();
        for res in [completed(3), completed(1), completed(2)] {
            settled.record(res);
        }
        let manifest = settled.into_manifest().unwrap();
        let numbers = manifest.iter().map(|p| *p.part_number).collect::<Vec<_>>();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn any_failure_discards_the_manifest() {
        let mut settled = SettledParts::default();
        for res in [completed(1), failed(2), completed(3)] {
            settled.record(res);
        }
        let failed = settled.into_manifest().unwrap_err();
        assert_eq!(failed.part_numbers(), vec![PartNumber::new(2)]);
    }
}
