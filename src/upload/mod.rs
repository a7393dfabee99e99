//! Uploading local files.
//!
//! [`FileUploader`] stores a file as one object either with a single put
//! request or as a multipart upload whose parts are sent concurrently.
use self::part_buffer::{PartBuffer, SettledParts};
use self::reader::PartReader;
use self::session::UploadSession;
use crate::client::request::*;
use crate::client::{SendRequest, UploadClient};
use crate::error::{Error, ErrorRepr, Result};
use crate::uri::{Bucket, KeyPrefix, ObjectUri};

use futures::future::poll_fn;
use multipart_write::MultipartWrite;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::time::Instant;
use tokio::io::AsyncRead;

mod part_buffer;
mod reader;

mod session;
pub use session::Phase;

/// Uploads local files to the configured bucket and key prefix.
///
/// Build one with [`UploadBuilder`].
///
/// [`UploadBuilder`]: crate::UploadBuilder
#[derive(Debug, Clone)]
pub struct FileUploader {
    pub(crate) client: UploadClient,
    pub(crate) bucket: Bucket,
    pub(crate) prefix: KeyPrefix,
    pub(crate) part_size: usize,
    pub(crate) max_active_tasks: Option<usize>,
    pub(crate) abort_on_failure: bool,
}

impl FileUploader {
    /// The object URI a file at `path` is uploaded to: the configured bucket,
    /// and the key prefix joined with the file name.
    pub fn object_uri(&self, path: &Path) -> Result<ObjectUri> {
        let name = path
            .file_name()
            .and_then(|v| v.to_str())
            .ok_or(ErrorRepr::Missing("path", "utf-8 file name"))?;
        Ok(ObjectUri::new(self.bucket.clone(), self.prefix.to_key(name)))
    }

    /// Size in bytes of every part of a multipart upload except the last.
    pub fn part_size(&self) -> usize {
        self.part_size
    }

    /// The limit on part uploads in flight, if any.
    pub fn max_active_tasks(&self) -> Option<usize> {
        self.max_active_tasks
    }

    /// Upload the file at `path` with a single put request.
    pub async fn simple_upload(&self, path: impl AsRef<Path>) -> Result<CompletedUpload> {
        let path = path.as_ref();
        let uri = self.object_uri(path)?;
        self.simple_upload_to(path, uri).await
    }

    /// Upload the file at `path` to `uri` with a single put request.
    ///
    /// Nothing is retried. Uploading the same file again overwrites the
    /// object with the same content.
    pub async fn simple_upload_to(
        &self,
        path: impl AsRef<Path>,
        uri: ObjectUri,
    ) -> Result<CompletedUpload> {
        let path = path.as_ref();
        let started = Instant::now();
        info!(path = %path.display(), uri = %uri, "starting simple upload");

        let res = self.put_file(path, uri.clone()).await;
        let elapsed_ms = started.elapsed().as_millis();
        match &res {
            Ok(v) => info!(uri = %v.uri, etag = %v.etag, elapsed_ms, "simple upload completed"),
            Err(e) => error!(uri = %uri, error = %e, elapsed_ms, "simple upload failed"),
        }

        res
    }

    async fn put_file(&self, path: &Path, uri: ObjectUri) -> Result<CompletedUpload> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(ErrorRepr::from_io_err(path))?;
        if !meta.is_file() {
            let e = io::Error::new(io::ErrorKind::InvalidInput, "not a regular file");
            return Err(ErrorRepr::from_io_err(path)(e).into());
        }
        debug!(uri = %uri, bytes = meta.len(), "sending put object request");
        let req = PutRequest::new(uri, path);
        self.client.send_put_object_request(req).await
    }

    /// Upload the file at `path` as a multipart upload.
    pub async fn multipart_upload(&self, path: impl AsRef<Path>) -> Result<CompletedUpload> {
        let path = path.as_ref();
        let uri = self.object_uri(path)?;
        self.multipart_upload_to(path, uri).await
    }

    /// Upload the file at `path` to `uri` as a multipart upload.
    ///
    /// The file is read sequentially in parts of the configured size and each
    /// part upload is dispatched as its own task as soon as it is read. Part
    /// failures do not cancel the other parts. When any part fails the
    /// upload is not completed and the error carries every failed part.
    ///
    /// An empty file is uploaded as a single empty part rather than with no
    /// parts at all, since a store rejects completing an upload that has none.
    /// Every other file is sent in `ceil(len / part_size)` parts.
    ///
    /// If the returned future is dropped before it finishes, e.g. by a
    /// timeout, the part uploads in flight are cancelled and, unless
    /// `abort_on_failure` is off, an abort request for the upload is spawned.
    pub async fn multipart_upload_to(
        &self,
        path: impl AsRef<Path>,
        uri: ObjectUri,
    ) -> Result<CompletedUpload> {
        let path = path.as_ref();
        let started = Instant::now();
        info!(
            path = %path.display(),
            uri = %uri,
            part_size = self.part_size,
            max_active_tasks = ?self.max_active_tasks,
            "starting multipart upload",
        );

        let res = self.try_multipart_upload(path, uri.clone(), started).await;
        let elapsed_ms = started.elapsed().as_millis();
        match &res {
            Ok(v) => info!(uri = %v.uri, etag = %v.etag, elapsed_ms, "multipart upload completed"),
            Err(e) => error!(uri = %uri, error = %e, elapsed_ms, "multipart upload failed"),
        }

        res
    }

    async fn try_multipart_upload(
        &self,
        path: &Path,
        uri: ObjectUri,
        started: Instant,
    ) -> Result<CompletedUpload> {
        // Open first so that a missing file never starts an upload.
        let reader = PartReader::open(path, self.part_size).await?;
        self.upload_parts_from(reader, uri, started).await
    }

    async fn upload_parts_from<R: AsyncRead + Unpin>(
        &self,
        mut reader: PartReader<R>,
        uri: ObjectUri,
        started: Instant,
    ) -> Result<CompletedUpload> {
        let data = self
            .client
            .send_create_upload_request(CreateRequest::new(uri))
            .await?;
        let abort_on_drop = self.abort_on_failure.then(|| self.client.clone());
        let mut session = UploadSession::new(data, started, abort_on_drop);
        session.transition(Phase::PartsInFlight);

        let (settled, interrupted) = match self.dispatch_parts(&session.data, &mut reader).await {
            Ok(v) => v,
            Err(e) => (SettledParts::default(), Some(e)),
        };
        if let Some(e) = interrupted {
            session.transition(Phase::PartsFailed);
            self.fail(&mut session).await;
            return Err(e);
        }

        session.parts = match settled.into_manifest() {
            Ok(parts) => parts,
            Err(failed) => {
                session.transition(Phase::PartsFailed);
                self.fail(&mut session).await;
                let id = session.data.get_id();
                let uri = session.data.get_uri();
                return Err(ErrorRepr::PartsFailed { id, uri, failed }.into());
            }
        };
        session.transition(Phase::PartsComplete);
        debug!(
            id = %session.data.id,
            parts = session.parts.count(),
            bytes = reader.bytes_read(),
            "sending complete upload request",
        );

        let req = CompleteRequest::new(&session.data, session.parts.clone());
        match self.client.send_complete_upload_request(req).await {
            Ok(completed) => {
                session.transition(Phase::Completed);
                Ok(completed)
            }
            Err(e) => {
                self.fail(&mut session).await;
                Err(e)
            }
        }
    }

    /// Read parts and dispatch their uploads until the file is exhausted,
    /// then wait for every dispatched part to settle.
    ///
    /// A read error stops dispatching. The parts already in flight are still
    /// waited for, and the read error is returned next to their outcomes.
    async fn dispatch_parts<R: AsyncRead + Unpin>(
        &self,
        data: &UploadData,
        reader: &mut PartReader<R>,
    ) -> Result<(SettledParts, Option<Error>)> {
        let mut buf = PartBuffer::new(self.max_active_tasks);
        let mut interrupted = None;

        loop {
            poll_fn(|cx| Pin::new(&mut buf).poll_ready(cx)).await?;
            let (part_number, body) = match reader.next_part().await {
                Ok(Some(part)) => part,
                Ok(None) => break,
                Err(e) => {
                    warn!(id = %data.id, error = %e, "reading part failed");
                    interrupted = Some(e);
                    break;
                }
            };
            trace!(
                id = %data.id,
                part = %part_number,
                bytes = body.size(),
                in_flight = buf.in_flight(),
                "dispatching part",
            );
            let req = UploadPartRequest::new(data, body, part_number);
            Pin::new(&mut buf).start_send(SendUploadPart::new(&self.client, req))?;
        }

        let settled = poll_fn(|cx| Pin::new(&mut buf).poll_complete(cx)).await?;
        Ok((settled, interrupted))
    }

    async fn fail(&self, session: &mut UploadSession) {
        let failed_in = session.phase();
        session.transition(Phase::Failed);
        if !self.abort_on_failure {
            info!(id = %session.data.id, phase = %failed_in, "leaving failed upload unaborted");
            return;
        }
        if let Err(e) = self.abort(&session.data).await {
            warn!(id = %session.data.id, error = %e, "abort failed after upload failure");
        }
    }

    /// Abort a multipart upload, discarding any parts uploaded to it.
    pub async fn abort(&self, data: &UploadData) -> Result<()> {
        info!(id = %data.id, uri = %data.uri, "aborting multipart upload");
        self.client
            .send_abort_upload_request(AbortRequest::new(data))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::reader::FailingRead;
    use super::*;
    use crate::client::MemoryClient;
    use crate::client::memory::StoreCall;
    use crate::error::ErrorKind;
    use crate::{ByteSize, UploadBuilder};

    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn read_error_drains_parts_and_aborts() {
        let client = MemoryClient::new()
            .delay_part(1, Duration::from_millis(50))
            .delay_part(2, Duration::from_millis(50));
        let uploader = UploadBuilder::new(client.clone())
            .bucket("bucket")
            .part_size(ByteSize::b(5))
            .build();

        // Two full parts, then the read fails.
        let path = Path::new("broken.json");
        let reader = PartReader::new(path, FailingRead::new(b"0123456789"), 5);
        let uri = uploader.object_uri(path).unwrap();
        let err = uploader
            .upload_parts_from(reader, uri, Instant::now())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(client.stored_parts(), 2);
        let calls = client.calls();
        let aborts = calls
            .iter()
            .filter(|c| matches!(c, StoreCall::Abort(_)))
            .count();
        assert_eq!(aborts, 1);
        assert!(!calls.iter().any(|c| matches!(c, StoreCall::Complete(_))));
        assert_eq!(client.active_uploads(), 0);
    }
}
