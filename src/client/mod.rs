//! This module contains `SendRequest`, which defines the operations an object
//! store has to support for the uploads in this crate.
use self::inner::{BoxedSendRequest, SendRequestInner};
use self::part::{CompletedPart, EntityTag};
use self::request::*;
use crate::error::Result;
use crate::uri::ObjectUri;

use std::borrow::Cow;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

mod inner;

pub mod memory;
pub use memory::MemoryClient;

pub mod part;
pub mod request;

mod sdk;
pub use sdk::{SdkClient, StoreConfig};

/// `SendRequest` represents the atomic operations against an object store.
///
/// Any S3-compatible store can implement it; the upload logic in this crate
/// only ever talks to the store through these calls.
pub trait SendRequest: Send + Sync {
    /// Send a request to store the contents of a local file as one object.
    fn send_put_object_request(
        &self,
        req: PutRequest,
    ) -> impl Future<Output = Result<CompletedUpload>> + Send;

    /// Send a request to create a new multipart upload, returning an
    /// [`UploadData`] having the upload ID assignment.
    fn send_create_upload_request(
        &self,
        req: CreateRequest,
    ) -> impl Future<Output = Result<UploadData>> + Send;

    /// Send a request to upload a part to a multipart upload, returning the
    /// [`CompletedPart`] containing entity tag and part number, which are required
    /// in the subsequent complete upload request.
    fn send_new_part_upload_request(
        &self,
        req: UploadPartRequest,
    ) -> impl Future<Output = Result<CompletedPart>> + Send;

    /// Send a request to complete a multipart upload, returning a
    /// [`CompletedUpload`], which has the entity tag of the object as well
    /// as the object URI.
    fn send_complete_upload_request(
        &self,
        req: CompleteRequest,
    ) -> impl Future<Output = Result<CompletedUpload>> + Send;

    /// Send a request to abort a multipart upload, discarding the parts that
    /// were uploaded to it.
    fn send_abort_upload_request(&self, req: AbortRequest) -> impl Future<Output = Result<()>> + Send;
}

impl<D, T> SendRequest for T
where
    D: SendRequest,
    T: Deref<Target = D> + Send + Sync,
{
    async fn send_put_object_request(&self, req: PutRequest) -> Result<CompletedUpload> {
        self.deref().send_put_object_request(req).await
    }

    async fn send_create_upload_request(&self, req: CreateRequest) -> Result<UploadData> {
        self.deref().send_create_upload_request(req).await
    }

    async fn send_new_part_upload_request(&self, req: UploadPartRequest) -> Result<CompletedPart> {
        self.deref().send_new_part_upload_request(req).await
    }

    async fn send_complete_upload_request(&self, req: CompleteRequest) -> Result<CompletedUpload> {
        self.deref().send_complete_upload_request(req).await
    }

    async fn send_abort_upload_request(&self, req: AbortRequest) -> Result<()> {
        self.deref().send_abort_upload_request(req).await
    }
}

/// `UploadClient` holds a type that can implement the interface of
/// [`SendRequest`].
///
/// It is cheap to clone, and every part upload task holds its own clone.
#[derive(Clone)]
pub struct UploadClient {
    pub(crate) inner: Arc<dyn BoxedSendRequest + Send + Sync>,
}

impl UploadClient {
    /// Create a new `UploadClient` from any `SendRequest`.
    pub fn new<C>(client: C) -> Self
    where
        C: SendRequest + 'static,
    {
        let inner = SendRequestInner::new(client);
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl SendRequest for UploadClient {
    async fn send_put_object_request(&self, req: PutRequest) -> Result<CompletedUpload> {
        self.inner.send_put_object(req).await
    }

    async fn send_create_upload_request(&self, req: CreateRequest) -> Result<UploadData> {
        self.inner.send_create_upload(req).await
    }

    async fn send_new_part_upload_request(&self, req: UploadPartRequest) -> Result<CompletedPart> {
        self.inner.send_upload_part(req).await
    }

    async fn send_complete_upload_request(&self, req: CompleteRequest) -> Result<CompletedUpload> {
        self.inner.send_complete_upload(req).await
    }

    async fn send_abort_upload_request(&self, req: AbortRequest) -> Result<()> {
        self.inner.send_abort_upload(req).await
    }
}

impl Debug for UploadClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadClient")
            .field("inner", &"SendRequest")
            .finish()
    }
}

/// ID assigned by the store for a multipart upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UploadId(Cow<'static, str>);

impl UploadId {
    /// Create a new `UploadId`.
    pub fn new<T: Into<Cow<'static, str>>>(id: T) -> Self {
        Self(id.into())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for UploadId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Display for UploadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<&str> for UploadId {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for UploadId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// `UploadData` is an active `UploadId` with the bucket and object key that
/// it was created with.
#[derive(Debug, Clone, Default)]
pub struct UploadData {
    /// The ID for the upload assigned by the store.
    pub id: UploadId,
    /// The URI of the object being uploaded.
    pub uri: ObjectUri,
}

impl UploadData {
    /// Create a new value from an upload ID and object URI.
    pub fn new<T: Into<UploadId>>(id: T, uri: ObjectUri) -> Self {
        Self { id: id.into(), uri }
    }

    /// Get an owned upload ID.
    pub fn get_id(&self) -> UploadId {
        self.id.clone()
    }

    /// Get an owned object URI.
    pub fn get_uri(&self) -> ObjectUri {
        self.uri.clone()
    }
}

/// The value for a successful upload, by either a single put or a completed
/// multipart upload.
#[derive(Debug, Clone, Default)]
pub struct CompletedUpload {
    /// The URI of the created object.
    pub uri: ObjectUri,
    /// The entity tag of the created object.
    pub etag: EntityTag,
}

impl CompletedUpload {
    /// Create a new value from object URI and entity tag.
    pub fn new(uri: ObjectUri, etag: EntityTag) -> Self {
        Self { uri, etag }
    }
}
