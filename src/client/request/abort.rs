use super::AbortRequestBuilder;
use crate::client::{UploadData, UploadId};
use crate::error::{ErrorRepr, Result};
use crate::uri::ObjectUri;

/// Request object for aborting a multipart upload.
#[derive(Debug, Clone)]
pub struct AbortRequest {
    pub(crate) id: UploadId,
    pub(crate) uri: ObjectUri,
}

impl AbortRequest {
    /// Create a new `AbortRequest` from the minimum required.
    pub fn new(data: &UploadData) -> Self {
        Self {
            id: data.get_id(),
            uri: data.get_uri(),
        }
    }

    /// Set the required properties on the SDK request builder for the operation.
    pub fn with_builder(&self, builder: AbortRequestBuilder) -> AbortRequestBuilder {
        builder
            .bucket(&*self.uri.bucket)
            .key(&*self.uri.key)
            .upload_id(&*self.id)
    }

    /// Returns a reference to the assigned `UploadId` for this request.
    pub fn id(&self) -> &UploadId {
        &self.id
    }

    /// Returns a reference to the `ObjectUri` for this request.
    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.uri.is_empty() {
            return Err(ErrorRepr::Missing("AbortRequest", "empty upload id and/or uri").into());
        }
        Ok(())
    }
}
