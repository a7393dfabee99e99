use super::part::CompletedPart;
use super::request::*;
use super::{CompletedUpload, SendRequest, UploadData};
use crate::error::Result;

use futures::future::BoxFuture;

/// Object-safe `SendRequest`.
pub(crate) trait BoxedSendRequest: Send + Sync + 'static {
    /// Put a whole object.
    fn send_put_object(&self, req: PutRequest) -> BoxFuture<'_, Result<CompletedUpload>>;

    /// Create a new upload.
    fn send_create_upload(&self, req: CreateRequest) -> BoxFuture<'_, Result<UploadData>>;

    /// Upload a new part.
    fn send_upload_part(&self, req: UploadPartRequest) -> BoxFuture<'_, Result<CompletedPart>>;

    /// Complete the upload.
    fn send_complete_upload(&self, req: CompleteRequest)
    -> BoxFuture<'_, Result<CompletedUpload>>;

    /// Abort the upload.
    fn send_abort_upload(&self, req: AbortRequest) -> BoxFuture<'_, Result<()>>;
}

/// Implements `BoxedSendRequest` for the public `SendRequest`.
pub(super) struct SendRequestInner<T>(T);

impl<T: SendRequest> SendRequestInner<T> {
    pub(super) fn new(inner: T) -> Self {
        Self(inner)
    }
}

impl<T: SendRequest + 'static> BoxedSendRequest for SendRequestInner<T> {
    fn send_put_object(&self, req: PutRequest) -> BoxFuture<'_, Result<CompletedUpload>> {
        Box::pin(self.0.send_put_object_request(req))
    }

    fn send_create_upload(&self, req: CreateRequest) -> BoxFuture<'_, Result<UploadData>> {
        Box::pin(self.0.send_create_upload_request(req))
    }

    fn send_upload_part(&self, req: UploadPartRequest) -> BoxFuture<'_, Result<CompletedPart>> {
        Box::pin(self.0.send_new_part_upload_request(req))
    }

    fn send_complete_upload(
        &self,
        req: CompleteRequest,
    ) -> BoxFuture<'_, Result<CompletedUpload>> {
        Box::pin(self.0.send_complete_upload_request(req))
    }

    fn send_abort_upload(&self, req: AbortRequest) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.0.send_abort_upload_request(req))
    }
}
