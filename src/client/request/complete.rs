use super::CompleteRequestBuilder;
use crate::client::part::CompletedParts;
use crate::client::{UploadData, UploadId};
use crate::error::{ErrorRepr, Result};
use crate::uri::ObjectUri;

use aws_sdk_s3::types::CompletedMultipartUpload;

/// Request object for completing a multipart upload.
#[derive(Debug, Clone)]
pub struct CompleteRequest {
    pub(crate) id: UploadId,
    pub(crate) uri: ObjectUri,
    pub(crate) completed_parts: CompletedParts,
}

impl CompleteRequest {
    /// Create a new `CompleteRequest` from the minimum required.
    ///
    /// `completed_parts` has to be sorted ascending by part number already;
    /// the request is rejected before it is sent otherwise.
    pub fn new(data: &UploadData, completed_parts: CompletedParts) -> Self {
        Self {
            id: data.get_id(),
            uri: data.get_uri(),
            completed_parts,
        }
    }

    /// Set the required properties on the SDK request builder for the operation.
    pub fn with_builder(&self, builder: CompleteRequestBuilder) -> CompleteRequestBuilder {
        let parts = CompletedMultipartUpload::from(&self.completed_parts);

        builder
            .upload_id(&*self.id)
            .bucket(&*self.uri.bucket)
            .key(&*self.uri.key)
            .multipart_upload(parts)
    }

    /// Returns a reference to the assigned `UploadId` for this request.
    pub fn id(&self) -> &UploadId {
        &self.id
    }

    /// Returns a reference to the `ObjectUri` for this request.
    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    /// Returns a reference to the `CompletedParts` for this request.
    pub fn completed_parts(&self) -> &CompletedParts {
        &self.completed_parts
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.uri.is_empty() {
            return Err(
                ErrorRepr::Missing("CompleteRequest", "empty upload id and/or uri").into(),
            );
        }
        if self.completed_parts.is_empty() {
            return Err(ErrorRepr::InvalidManifest("no completed parts").into());
        }
        if !self.completed_parts.is_strictly_ascending() {
            return Err(ErrorRepr::InvalidManifest("parts not in ascending order").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::part::{CompletedPart, EntityTag, PartNumber};
    use crate::error::ErrorKind;

    fn request(numbers: &[i32]) -> CompleteRequest {
        let data = UploadData::new("upload-1", ObjectUri::from(("bucket", "key")));
        let parts = numbers
            .iter()
            .map(|&n| {
                let etag = EntityTag::from(format!("etag-{n}"));
                CompletedPart::new(data.get_id(), etag, PartNumber::new(n), 1)
            })
            .collect();
        CompleteRequest::new(&data, parts)
    }

    #[test]
    fn ascending_manifest_is_valid() {
        assert!(request(&[1, 2, 3]).validate().is_ok());
    }

    #[test]
    fn unordered_manifest_is_rejected() {
        let err = request(&[2, 1, 3]).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Completion);
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let err = request(&[]).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Completion);
    }
}
