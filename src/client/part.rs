use super::UploadId;
use crate::error::{Error, ErrorRepr, Result};
use crate::uri::ObjectUri;

use aws_sdk_s3::operation::complete_multipart_upload::CompleteMultipartUploadOutput as CompleteResponse;
use aws_sdk_s3::operation::put_object::PutObjectOutput as PutResponse;
use aws_sdk_s3::operation::upload_part::UploadPartOutput as UploadResponse;
use aws_sdk_s3::primitives::ByteStream;
use bytes::{Bytes, BytesMut};
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::{Deref, DerefMut};

/// Body of a part upload request.
///
/// This type dereferences to [`BytesMut`], so the file reader can fill it
/// directly through [`BufMut`].
///
/// [`BufMut`]: bytes::BufMut
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PartBody(BytesMut);

impl PartBody {
    /// Construct a body from [`BytesMut`].
    pub fn new(bytes: BytesMut) -> Self {
        Self(bytes)
    }

    /// Returns an empty `PartBody` to write to that has pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let bytes = BytesMut::with_capacity(capacity);
        Self(bytes)
    }

    /// Current size in bytes of the `PartBody`.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Convert this type into a [`ByteStream`], which is the type required by
    /// the SDK in the request to add a part to a multipart upload.
    ///
    /// This conversion only does a ref-count increment on the inner buffer,
    /// and leaves this body empty.
    pub fn as_sdk_body(&mut self) -> ByteStream {
        self.take_bytes().into()
    }

    /// Take the bytes out of this body, leaving it empty.
    pub fn take_bytes(&mut self) -> Bytes {
        self.split().freeze()
    }
}

impl From<BytesMut> for PartBody {
    fn from(value: BytesMut) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for PartBody {
    fn from(value: &[u8]) -> Self {
        Self(BytesMut::from(value))
    }
}

impl Deref for PartBody {
    type Target = BytesMut;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PartBody {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[u8]> for PartBody {
    fn as_ref(&self) -> &[u8] {
        self.deref().as_ref()
    }
}

/// Number we assign to a part when uploading.
///
/// This, along with the entity tag found in the response, is required in the
/// request to complete a multipart upload because it identifies where the
/// part goes when assembling the full object. Part numbers of one upload
/// start at 1 and have no gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartNumber(i32);

impl Default for PartNumber {
    fn default() -> Self {
        Self(1)
    }
}

impl PartNumber {
    /// Create a new `PartNumber` from a plain integer.
    ///
    /// Note that new uploads are required to start with a part number of 1,
    /// which is how `PartNumber: Default`.
    pub fn new(n: i32) -> Self {
        Self(n)
    }

    /// Increment the `PartNumber` by 1, returning the previous part number.
    pub fn increment(&mut self) -> PartNumber {
        self.0 += 1;
        PartNumber(self.0 - 1)
    }
}

impl Deref for PartNumber {
    type Target = i32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for PartNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "part_{}", self.0)
    }
}

/// Entity tag.
///
/// This value is an opaque integrity tag. It is assigned to an uploaded part
/// and returned in the response from a part upload request.
///
/// It is also assigned to a stored object and found in a successful put or
/// complete upload response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EntityTag(Cow<'static, str>);

impl EntityTag {
    /// Create a new `EntityTag`.
    pub fn new<T: Into<Cow<'static, str>>>(etag: T) -> Self {
        Self(etag.into())
    }

    pub(crate) fn try_from_upload_resp(
        id: &UploadId,
        uri: &ObjectUri,
        part: PartNumber,
    ) -> impl FnOnce(UploadResponse) -> Result<Self, ErrorRepr> {
        move |value| {
            value.e_tag.map(Self::from).ok_or_else(|| {
                let e = ErrorRepr::Missing("UploadResponse", "e_tag");
                ErrorRepr::from_upload_err(id, uri, part)(e)
            })
        }
    }

    pub(crate) fn try_from_complete_resp(
        id: &UploadId,
        uri: &ObjectUri,
        parts: &CompletedParts,
    ) -> impl FnOnce(CompleteResponse) -> Result<Self, ErrorRepr> {
        move |value| {
            value.e_tag.map(Self::from).ok_or_else(|| {
                let e = ErrorRepr::Missing("CompleteResponse", "e_tag");
                ErrorRepr::from_complete_err(id, uri, parts)(e)
            })
        }
    }

    pub(crate) fn try_from_put_resp(
        uri: &ObjectUri,
    ) -> impl FnOnce(PutResponse) -> Result<Self, ErrorRepr> {
        move |value| {
            value.e_tag.map(Self::from).ok_or_else(|| {
                let e = ErrorRepr::Missing("PutResponse", "e_tag");
                ErrorRepr::from_put_err(uri)(e)
            })
        }
    }
}

impl Deref for EntityTag {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.deref()
    }
}

impl AsRef<str> for EntityTag {
    fn as_ref(&self) -> &str {
        self.deref()
    }
}

impl Display for EntityTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<&str> for EntityTag {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for EntityTag {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// The value for a successful part upload request.
///
/// All `CompletedPart`s need to be retained in order to construct a valid
/// complete upload request.
#[derive(Debug, Clone)]
pub struct CompletedPart {
    /// The ID of the upload this part was added to.
    pub id: UploadId,
    /// The entity tag the store assigned to the uploaded part.
    pub etag: EntityTag,
    /// The incrementing integer starting with 1 that identifies this part in the
    /// part upload.
    pub part_number: PartNumber,
    /// The size of this part in bytes.
    pub part_size: usize,
}

impl CompletedPart {
    /// Create a new value from entity tag and part number used in the upload.
    pub fn new(id: UploadId, etag: EntityTag, part_number: PartNumber, part_size: usize) -> Self {
        Self {
            id,
            etag,
            part_number,
            part_size,
        }
    }
}

/// All completed part uploads for a multipart upload.
///
/// Sorted ascending by part number this is the completion manifest.
#[derive(Debug, Clone, Default)]
pub struct CompletedParts(Vec<CompletedPart>);

impl CompletedParts {
    /// Add a new [`CompletedPart`] to this collection.
    pub fn push(&mut self, part: CompletedPart) {
        self.0.push(part);
    }

    /// Returns the number of parts that have been successfully uploaded.
    pub fn count(&self) -> usize {
        self.0.len()
    }

    /// Returns the current size in bytes of this upload.
    pub fn size(&self) -> usize {
        self.0.iter().map(|p| p.part_size).sum()
    }

    /// The part numbers in their current order.
    pub fn part_numbers(&self) -> Vec<PartNumber> {
        self.0.iter().map(|p| p.part_number).collect()
    }

    /// Sort the `CompletedPart`s in increasing order by part number.
    ///
    /// It is an error to make a complete request where the parts are not in
    /// order.
    pub fn sort_ascending(&mut self) {
        self.0.sort_by_key(|part| part.part_number);
    }

    /// Whether part numbers are strictly increasing, so in particular there are
    /// no duplicates.
    pub fn is_strictly_ascending(&self) -> bool {
        self.0
            .windows(2)
            .all(|w| w[0].part_number < w[1].part_number)
    }
}

impl Deref for CompletedParts {
    type Target = [CompletedPart];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<CompletedPart> for CompletedParts {
    fn from_iter<I: IntoIterator<Item = CompletedPart>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<&CompletedParts> for aws_sdk_s3::types::CompletedMultipartUpload {
    fn from(value: &CompletedParts) -> Self {
        let completed_parts = value
            .0
            .iter()
            .map(|v| {
                aws_sdk_s3::types::CompletedPart::builder()
                    .e_tag(v.etag.to_string())
                    .part_number(*v.part_number)
                    .build()
            })
            .collect();

        aws_sdk_s3::types::CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build()
    }
}

/// A part upload that did not succeed.
#[derive(Debug)]
pub struct FailedPart {
    /// The number of the part that failed.
    pub part_number: PartNumber,
    /// Why it failed.
    pub error: Error,
}

impl FailedPart {
    /// Create a new value from the part number and the cause.
    pub fn new(part_number: PartNumber, error: Error) -> Self {
        Self { part_number, error }
    }
}

/// All failed part uploads for a multipart upload.
#[derive(Debug, Default)]
pub struct FailedParts(Vec<FailedPart>);

impl FailedParts {
    /// Add a new [`FailedPart`] to this collection.
    pub fn push(&mut self, part: FailedPart) {
        self.0.push(part);
        self.0.sort_by_key(|p| p.part_number);
    }

    /// Sorted numbers of the parts that failed.
    pub fn part_numbers(&self) -> Vec<PartNumber> {
        self.0.iter().map(|p| p.part_number).collect()
    }
}

impl Deref for FailedParts {
    type Target = [FailedPart];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for FailedParts {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let numbers = self
            .0
            .iter()
            .map(|p| p.part_number.0.to_string())
            .collect::<Vec<_>>();
        write!(f, "[{}]", numbers.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(n: i32) -> CompletedPart {
        CompletedPart::new(
            UploadId::from("id"),
            EntityTag::from(format!("etag-{n}")),
            PartNumber::new(n),
            5,
        )
    }

    #[test]
    fn increment_returns_previous() {
        let mut n = PartNumber::default();
        assert_eq!(n.increment(), PartNumber::new(1));
        assert_eq!(n.increment(), PartNumber::new(2));
        assert_eq!(n, PartNumber::new(3));
    }

    #[test]
    fn sort_ascending_orders_manifest() {
        let mut parts: CompletedParts = [3, 1, 2].into_iter().map(part).collect();
        assert!(!parts.is_strictly_ascending());

        parts.sort_ascending();
        assert!(parts.is_strictly_ascending());
        assert_eq!(
            parts.part_numbers(),
            vec![PartNumber::new(1), PartNumber::new(2), PartNumber::new(3)]
        );
        assert_eq!(parts.size(), 15);
    }

    #[test]
    fn duplicates_are_not_strictly_ascending() {
        let parts: CompletedParts = [1, 2, 2].into_iter().map(part).collect();
        assert!(!parts.is_strictly_ascending());
    }

    #[test]
    fn sdk_manifest_keeps_order_and_tags() {
        let parts: CompletedParts = [1, 2].into_iter().map(part).collect();
        let upload = aws_sdk_s3::types::CompletedMultipartUpload::from(&parts);
        let sdk_parts = upload.parts.unwrap_or_default();
        let pairs = sdk_parts
            .iter()
            .map(|p| (p.part_number, p.e_tag.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs,
            vec![
                (Some(1), Some("etag-1".to_string())),
                (Some(2), Some("etag-2".to_string())),
            ]
        );
    }

    #[test]
    fn failed_parts_display_sorted_numbers() {
        let mut failed = FailedParts::default();
        for n in [3, 2] {
            let e = Error::from_kind(crate::error::ErrorKind::Unknown, "timeout");
            failed.push(FailedPart::new(PartNumber::new(n), e));
        }
        assert_eq!(failed.to_string(), "[2, 3]");
    }
}
