use super::CreateRequestBuilder;
use crate::error::{ErrorRepr, Result};
use crate::uri::ObjectUri;

/// Request object for creating a new multipart upload.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub(crate) uri: ObjectUri,
}

impl CreateRequest {
    /// Create a new `CreateRequest` from the minimum required.
    pub fn new(uri: ObjectUri) -> Self {
        Self { uri }
    }

    /// Set the required properties on the SDK request builder for the operation.
    pub fn with_builder(&self, builder: CreateRequestBuilder) -> CreateRequestBuilder {
        builder.bucket(&*self.uri.bucket).key(&*self.uri.key)
    }

    /// Returns a reference to the `ObjectUri` for this request.
    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(ErrorRepr::Missing("CreateRequest", "empty object uri").into());
        }
        Ok(())
    }
}
