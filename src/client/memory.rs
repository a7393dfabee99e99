//! An in-memory object store.
//!
//! [`MemoryClient`] implements [`SendRequest`] with the same validation an
//! S3-compatible store applies when completing a multipart upload: parts in
//! ascending order, every part present with a matching entity tag, and every
//! part but the last at least the minimum part size. It can be told to fail
//! any operation or to delay individual parts, and it records every call it
//! receives. It is useful for tests and dry runs.
use super::part::{CompletedPart, EntityTag, PartNumber};
use super::request::*;
use super::{CompletedUpload, SendRequest, UploadData, UploadId};
use crate::error::{ErrorRepr, Result};
use crate::uri::ObjectUri;

use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Errors raised by the [`MemoryClient`] store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum MemoryStoreError {
    /// A failure requested with one of the `fail_*` methods.
    #[error("injected failure: {0}")]
    Injected(&'static str),
    /// The upload ID is unknown, or the upload was completed or aborted.
    #[error("no such upload: {0}")]
    NoSuchUpload(UploadId),
    /// The completion manifest has no parts.
    #[error("completion manifest has no parts")]
    EmptyManifest,
    /// The completion manifest is not sorted ascending by part number.
    #[error("parts in completion manifest are not in ascending order")]
    InvalidPartOrder,
    /// A part in the manifest was never uploaded or has another entity tag.
    #[error("{0} was not uploaded or its entity tag does not match")]
    InvalidPart(PartNumber),
    /// A part other than the last is smaller than the minimum part size.
    #[error("{0} is smaller than the minimum part size")]
    EntityTooSmall(PartNumber),
}

/// A request received by a [`MemoryClient`], in the order they arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `PutObject`.
    Put(ObjectUri),
    /// `CreateMultipartUpload`.
    Create(ObjectUri),
    /// `UploadPart`.
    UploadPart(PartNumber),
    /// `CompleteMultipartUpload`, with the manifest's part numbers as sent.
    Complete(Vec<PartNumber>),
    /// `AbortMultipartUpload`.
    Abort(UploadId),
}

#[derive(Debug, Default)]
struct Faults {
    put: bool,
    create: bool,
    parts: HashSet<PartNumber>,
    complete: bool,
    abort: bool,
}

#[derive(Debug)]
struct StoredPart {
    etag: EntityTag,
    bytes: Bytes,
}

#[derive(Debug)]
struct ActiveUpload {
    uri: ObjectUri,
    parts: BTreeMap<PartNumber, StoredPart>,
}

#[derive(Debug, Default)]
struct Store {
    objects: HashMap<ObjectUri, Bytes>,
    uploads: HashMap<UploadId, ActiveUpload>,
    faults: Faults,
    delays: HashMap<PartNumber, Duration>,
    min_part_size: usize,
    calls: Vec<StoreCall>,
    in_flight: usize,
    max_in_flight: usize,
    stored_parts: usize,
}

/// A [`SendRequest`] backed by an in-memory map of objects.
///
/// Clones share the same store, so a test can keep one clone to inspect what
/// the uploader did with the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    store: Arc<Mutex<Store>>,
}

impl MemoryClient {
    /// Create an empty store that accepts every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `PutObject` fail.
    pub fn fail_put(self) -> Self {
        self.lock().faults.put = true;
        self
    }

    /// Make `CreateMultipartUpload` fail.
    pub fn fail_create(self) -> Self {
        self.lock().faults.create = true;
        self
    }

    /// Make the upload of part `n` fail.
    pub fn fail_part(self, n: i32) -> Self {
        self.lock().faults.parts.insert(PartNumber::new(n));
        self
    }

    /// Make `CompleteMultipartUpload` fail.
    pub fn fail_complete(self) -> Self {
        self.lock().faults.complete = true;
        self
    }

    /// Make `AbortMultipartUpload` fail.
    pub fn fail_abort(self) -> Self {
        self.lock().faults.abort = true;
        self
    }

    /// Hold the upload of part `n` for `delay` before it is stored.
    pub fn delay_part(self, n: i32, delay: Duration) -> Self {
        self.lock().delays.insert(PartNumber::new(n), delay);
        self
    }

    /// Reject completion when a part other than the last is smaller than
    /// `bytes`.
    pub fn min_part_size(self, bytes: usize) -> Self {
        self.lock().min_part_size = bytes;
        self
    }

    /// The stored object at `uri`.
    pub fn object(&self, uri: &ObjectUri) -> Option<Bytes> {
        self.lock().objects.get(uri).cloned()
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// The number of multipart uploads that were created and neither completed
    /// nor aborted.
    pub fn active_uploads(&self) -> usize {
        self.lock().uploads.len()
    }

    /// The largest number of part uploads that were in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    /// The number of parts that were stored by a part upload.
    pub fn stored_parts(&self) -> usize {
        self.lock().stored_parts
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn content_tag(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl Store {
    fn create(&mut self, uri: &ObjectUri) -> Result<UploadId, MemoryStoreError> {
        if self.faults.create {
            return Err(MemoryStoreError::Injected("create multipart upload"));
        }
        let id = UploadId::from(uuid::Uuid::now_v7().to_string());
        let upload = ActiveUpload {
            uri: uri.clone(),
            parts: BTreeMap::new(),
        };
        self.uploads.insert(id.clone(), upload);
        Ok(id)
    }

    fn upload_part(
        &mut self,
        id: &UploadId,
        part: PartNumber,
        bytes: Bytes,
    ) -> Result<EntityTag, MemoryStoreError> {
        if self.faults.parts.contains(&part) {
            return Err(MemoryStoreError::Injected("upload part"));
        }
        let upload = self
            .uploads
            .get_mut(id)
            .ok_or_else(|| MemoryStoreError::NoSuchUpload(id.clone()))?;
        let etag = EntityTag::from(content_tag(&bytes));
        let stored = StoredPart {
            etag: etag.clone(),
            bytes,
        };
        upload.parts.insert(part, stored);
        self.stored_parts += 1;
        Ok(etag)
    }

    fn complete(&mut self, req: &CompleteRequest) -> Result<EntityTag, MemoryStoreError> {
        if self.faults.complete {
            return Err(MemoryStoreError::Injected("complete multipart upload"));
        }
        let upload = self
            .uploads
            .get(req.id())
            .ok_or_else(|| MemoryStoreError::NoSuchUpload(req.id().clone()))?;
        let manifest = req.completed_parts();
        if manifest.is_empty() {
            return Err(MemoryStoreError::EmptyManifest);
        }
        if !manifest.is_strictly_ascending() {
            return Err(MemoryStoreError::InvalidPartOrder);
        }

        let mut object = BytesMut::new();
        for (i, part) in manifest.iter().enumerate() {
            let stored = upload
                .parts
                .get(&part.part_number)
                .filter(|stored| stored.etag == part.etag)
                .ok_or(MemoryStoreError::InvalidPart(part.part_number))?;
            let is_last = i + 1 == manifest.len();
            if !is_last && stored.bytes.len() < self.min_part_size {
                return Err(MemoryStoreError::EntityTooSmall(part.part_number));
            }
            object.extend_from_slice(&stored.bytes);
        }

        let object = object.freeze();
        let etag = EntityTag::from(format!("{}-{}", content_tag(&object), manifest.len()));
        let uri = upload.uri.clone();
        self.uploads.remove(req.id());
        self.objects.insert(uri, object);
        Ok(etag)
    }

    fn abort(&mut self, id: &UploadId) -> Result<(), MemoryStoreError> {
        if self.faults.abort {
            return Err(MemoryStoreError::Injected("abort multipart upload"));
        }
        self.uploads
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MemoryStoreError::NoSuchUpload(id.clone()))
    }
}

impl SendRequest for MemoryClient {
    async fn send_put_object_request(&self, req: PutRequest) -> Result<CompletedUpload> {
        req.validate()?;
        self.lock().calls.push(StoreCall::Put(req.uri().clone()));
        let bytes = tokio::fs::read(req.path())
            .await
            .map_err(ErrorRepr::from_put_err(req.uri()))?;

        let mut store = self.lock();
        if store.faults.put {
            let e = MemoryStoreError::Injected("put object");
            return Err(ErrorRepr::from_put_err(req.uri())(e).into());
        }
        let etag = EntityTag::from(content_tag(&bytes));
        store.objects.insert(req.uri().clone(), Bytes::from(bytes));

        Ok(CompletedUpload::new(req.uri().clone(), etag))
    }

    async fn send_create_upload_request(&self, req: CreateRequest) -> Result<UploadData> {
        req.validate()?;
        let mut store = self.lock();
        store.calls.push(StoreCall::Create(req.uri().clone()));
        let id = store
            .create(req.uri())
            .map_err(ErrorRepr::from_create_err(req.uri()))?;

        Ok(UploadData::new(id, req.uri().clone()))
    }

    async fn send_new_part_upload_request(&self, req: UploadPartRequest) -> Result<CompletedPart> {
        req.validate()?;
        let part = req.part_number();
        let delay = {
            let mut store = self.lock();
            store.calls.push(StoreCall::UploadPart(part));
            store.in_flight += 1;
            store.max_in_flight = store.max_in_flight.max(store.in_flight);
            store.delays.get(&part).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let bytes = Bytes::copy_from_slice(req.body());
        let part_size = bytes.len();
        let mut store = self.lock();
        store.in_flight -= 1;
        let etag = store
            .upload_part(req.id(), part, bytes)
            .map_err(ErrorRepr::from_upload_err(req.id(), req.uri(), part))?;

        Ok(CompletedPart::new(req.id().clone(), etag, part, part_size))
    }

    async fn send_complete_upload_request(&self, req: CompleteRequest) -> Result<CompletedUpload> {
        req.validate()?;
        let mut store = self.lock();
        let numbers = req.completed_parts().part_numbers();
        store.calls.push(StoreCall::Complete(numbers));
        let etag = store.complete(&req).map_err(ErrorRepr::from_complete_err(
            req.id(),
            req.uri(),
            req.completed_parts(),
        ))?;

        Ok(CompletedUpload::new(req.uri().clone(), etag))
    }

    async fn send_abort_upload_request(&self, req: AbortRequest) -> Result<()> {
        req.validate()?;
        let mut store = self.lock();
        store.calls.push(StoreCall::Abort(req.id().clone()));
        store
            .abort(req.id())
            .map_err(ErrorRepr::from_abort_err(req.id(), req.uri()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::part::{CompletedParts, PartBody};
    use crate::error::ErrorKind;

    fn uri() -> ObjectUri {
        ObjectUri::from(("bucket", "key"))
    }

    async fn upload_parts(
        client: &MemoryClient,
        data: &UploadData,
        parts: &[&[u8]],
    ) -> CompletedParts {
        let mut completed = CompletedParts::default();
        for (i, bytes) in parts.iter().enumerate() {
            let n = PartNumber::new(i as i32 + 1);
            let req = UploadPartRequest::new(data, PartBody::from(*bytes), n);
            completed.push(client.send_new_part_upload_request(req).await.unwrap());
        }
        completed
    }

    #[tokio::test]
    async fn completes_parts_in_manifest_order() {
        let client = MemoryClient::new();
        let data = client
            .send_create_upload_request(CreateRequest::new(uri()))
            .await
            .unwrap();
        let parts = upload_parts(&client, &data, &[&b"hello "[..], &b"world"[..]]).await;

        let done = client
            .send_complete_upload_request(CompleteRequest::new(&data, parts))
            .await
            .unwrap();
        assert_eq!(done.uri, uri());
        assert_eq!(client.object(&uri()).as_deref(), Some(&b"hello world"[..]));
        assert_eq!(client.active_uploads(), 0);
    }

    #[tokio::test]
    async fn rejects_small_parts_before_the_last() {
        let client = MemoryClient::new().min_part_size(6);
        let data = client
            .send_create_upload_request(CreateRequest::new(uri()))
            .await
            .unwrap();
        let parts = upload_parts(&client, &data, &[&b"tiny"[..], &b"tail"[..]]).await;

        let err = client
            .send_complete_upload_request(CompleteRequest::new(&data, parts))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Completion);
        assert!(err.to_string().contains("part_1"));
    }

    #[tokio::test]
    async fn rejects_unknown_entity_tags() {
        let client = MemoryClient::new();
        let data = client
            .send_create_upload_request(CreateRequest::new(uri()))
            .await
            .unwrap();
        let mut parts = upload_parts(&client, &data, &[&b"one"[..]]).await;
        parts.push(CompletedPart::new(
            data.get_id(),
            EntityTag::from("bogus"),
            PartNumber::new(2),
            3,
        ));

        let err = client
            .send_complete_upload_request(CompleteRequest::new(&data, parts))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Completion);
        assert!(client.object(&uri()).is_none());
    }

    #[tokio::test]
    async fn abort_discards_the_upload() {
        let client = MemoryClient::new();
        let data = client
            .send_create_upload_request(CreateRequest::new(uri()))
            .await
            .unwrap();
        assert_eq!(client.active_uploads(), 1);

        client
            .send_abort_upload_request(AbortRequest::new(&data))
            .await
            .unwrap();
        assert_eq!(client.active_uploads(), 0);

        let err = client
            .send_abort_upload_request(AbortRequest::new(&data))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Abort);
    }

    #[tokio::test]
    async fn invalid_manifest_is_rejected_before_it_reaches_the_store() {
        let client = MemoryClient::new();
        let data = client
            .send_create_upload_request(CreateRequest::new(uri()))
            .await
            .unwrap();

        let err = client
            .send_complete_upload_request(CompleteRequest::new(&data, CompletedParts::default()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Completion);
        assert!(!client.calls().iter().any(|c| matches!(c, StoreCall::Complete(_))));
        assert_eq!(client.active_uploads(), 1);
    }
}
