use super::PutRequestBuilder;
use crate::error::{ErrorRepr, Result};
use crate::uri::ObjectUri;

use std::path::{Path, PathBuf};

/// Request object for storing a local file as a single object.
///
/// The body is not part of the request object: the client streams it from
/// `path` when the request is sent.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub(crate) uri: ObjectUri,
    pub(crate) path: PathBuf,
}

impl PutRequest {
    /// Create a new `PutRequest` from the minimum required.
    pub fn new<P: Into<PathBuf>>(uri: ObjectUri, path: P) -> Self {
        Self {
            uri,
            path: path.into(),
        }
    }

    /// Set the required properties on the SDK request builder for the operation.
    pub fn with_builder(&self, builder: PutRequestBuilder) -> PutRequestBuilder {
        builder.bucket(&*self.uri.bucket).key(&*self.uri.key)
    }

    /// Returns a reference to the `ObjectUri` for this request.
    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    /// Returns the path of the file to upload.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(ErrorRepr::Missing("PutRequest", "empty object uri").into());
        }
        Ok(())
    }
}
