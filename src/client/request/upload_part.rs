use super::UploadPartRequestBuilder;
use crate::client::part::{CompletedPart, FailedPart, PartBody, PartNumber};
use crate::client::{UploadClient, UploadData, UploadId};
use crate::error::{Error, ErrorRepr, Result};
use crate::uri::ObjectUri;

use futures::ready;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Sending a request to add a part to an existing multipart upload.
///
/// The request runs as its own task from the moment this value is created,
/// whether or not it is polled. Polling only collects the outcome, which on
/// failure keeps the part number alongside the cause. Dropping the value
/// cancels the task if it has not finished.
pub struct SendUploadPart {
    part: PartNumber,
    handle: JoinHandle<Result<CompletedPart>>,
}

impl SendUploadPart {
    /// Create a new `SendUploadPart`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(client: &UploadClient, req: UploadPartRequest) -> Self {
        let part = req.part_number();
        let cli = client.clone();
        let handle = tokio::spawn(async move { cli.inner.send_upload_part(req).await });
        Self { part, handle }
    }

    /// The part number being uploaded.
    pub fn part_number(&self) -> PartNumber {
        self.part
    }
}

impl Future for SendUploadPart {
    type Output = Result<CompletedPart, FailedPart>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let part = self.part;
        let out = match ready!(Pin::new(&mut self.handle).poll(cx)) {
            Ok(Ok(completed)) => Ok(completed),
            Ok(Err(e)) => Err(FailedPart::new(part, e)),
            Err(join) => Err(FailedPart::new(part, Error::from_dyn(join))),
        };
        Poll::Ready(out)
    }
}

impl Drop for SendUploadPart {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl Debug for SendUploadPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendUploadPart")
            .field("part", &self.part)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Request object for uploading a new part.
#[derive(Debug, Clone)]
pub struct UploadPartRequest {
    pub(crate) id: UploadId,
    pub(crate) uri: ObjectUri,
    pub(crate) body: PartBody,
    pub(crate) part_number: PartNumber,
}

impl UploadPartRequest {
    /// Create a new `UploadPartRequest` from the minimum required.
    pub fn new(data: &UploadData, body: PartBody, part_number: PartNumber) -> Self {
        Self {
            id: data.get_id(),
            uri: data.get_uri(),
            body,
            part_number,
        }
    }

    /// Set the required properties on the SDK request builder for the operation.
    ///
    /// This moves the body into the SDK request.
    pub fn with_builder(&mut self, builder: UploadPartRequestBuilder) -> UploadPartRequestBuilder {
        builder
            .upload_id(&*self.id)
            .bucket(&*self.uri.bucket)
            .key(&*self.uri.key)
            .part_number(*self.part_number)
            .body(self.body.as_sdk_body())
    }

    /// Returns a reference to the assigned `UploadId` for this request.
    pub fn id(&self) -> &UploadId {
        &self.id
    }

    /// Returns a reference to the `ObjectUri` for this request.
    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    /// Returns a reference to the `PartBody` for this request.
    pub fn body(&self) -> &PartBody {
        &self.body
    }

    /// Returns the `PartNumber` for this request.
    pub fn part_number(&self) -> PartNumber {
        self.part_number
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.uri.is_empty() {
            return Err(
                ErrorRepr::Missing("UploadPartRequest", "empty upload id and/or uri").into(),
            );
        }
        Ok(())
    }
}
