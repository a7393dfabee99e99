//! Errors this crate can emit.
use crate::client::part::{CompletedParts, FailedParts, PartNumber};
use crate::client::UploadId;
use crate::uri::ObjectUri;

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The value returned in this crate when an error occurs.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(pub(crate) ErrorRepr);

impl Error {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self.0 {
            ErrorRepr::NotFound { .. } => ErrorKind::NotFound,
            ErrorRepr::Create { .. } => ErrorKind::Initiation,
            ErrorRepr::UploadPart { .. } | ErrorRepr::PartsFailed { .. } => ErrorKind::PartUpload,
            ErrorRepr::Complete { .. } | ErrorRepr::InvalidManifest(_) => ErrorKind::Completion,
            ErrorRepr::Put { .. } => ErrorKind::Store,
            ErrorRepr::Abort { .. } => ErrorKind::Abort,
            ErrorRepr::Missing(_, _) => ErrorKind::Config,
            ErrorRepr::StdDyn(_) => ErrorKind::Unknown,
            ErrorRepr::Any { kind, .. } => kind,
        }
    }

    /// The parts that could not be uploaded, if this is an error of kind
    /// [`ErrorKind::PartUpload`] raised for a whole multipart upload.
    pub fn failed_parts(&self) -> Option<&FailedParts> {
        match &self.0 {
            ErrorRepr::PartsFailed { failed, .. } => Some(failed),
            _ => None,
        }
    }

    /// Wrap an arbitrary error.
    pub fn from_dyn<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(ErrorRepr::StdDyn(Box::new(e)))
    }

    /// Create an error of the given kind with a static message.
    pub fn from_kind(kind: ErrorKind, msg: &'static str) -> Self {
        Self(ErrorRepr::Any { kind, msg })
    }
}

impl From<ErrorRepr> for Error {
    fn from(value: ErrorRepr) -> Self {
        Self(value)
    }
}

/// The category of the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The local file does not exist or could not be read.
    NotFound,
    /// The store refused to start a multipart upload.
    Initiation,
    /// One or more parts of a multipart upload failed.
    PartUpload,
    /// The store refused to complete a multipart upload.
    Completion,
    /// A single-request upload failed.
    Store,
    /// Aborting a multipart upload failed.
    Abort,
    /// Invalid or missing configuration.
    Config,
    /// Anything else.
    Unknown,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Initiation => write!(f, "initiation"),
            Self::PartUpload => write!(f, "part upload"),
            Self::Completion => write!(f, "completion"),
            Self::Store => write!(f, "store"),
            Self::Abort => write!(f, "abort"),
            Self::Config => write!(f, "config"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Internal error type that we are free to change at will.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ErrorRepr {
    #[error("{0} missing required field: {1}")]
    Missing(&'static str, &'static str),
    #[error("cannot read {}: {source}", path.display())]
    NotFound { path: PathBuf, source: io::Error },
    #[error("creating multipart upload for {uri} failed: {source}")]
    Create { uri: ObjectUri, source: BoxError },
    #[error("uploading {part} to upload {id} failed: {source}")]
    UploadPart {
        id: UploadId,
        uri: ObjectUri,
        part: PartNumber,
        source: BoxError,
    },
    #[error("uploading parts {failed} to upload {id} for {uri} failed")]
    PartsFailed {
        id: UploadId,
        uri: ObjectUri,
        failed: FailedParts,
    },
    #[error("invalid completion manifest: {0}")]
    InvalidManifest(&'static str),
    #[error("completing upload {id} failed: {source}")]
    Complete {
        id: UploadId,
        uri: ObjectUri,
        parts: CompletedParts,
        source: BoxError,
    },
    #[error("putting object {uri} failed: {source}")]
    Put { uri: ObjectUri, source: BoxError },
    #[error("aborting upload {id} for {uri} failed: {source}")]
    Abort {
        id: UploadId,
        uri: ObjectUri,
        source: BoxError,
    },
    #[error("{kind} error: {msg}")]
    Any { kind: ErrorKind, msg: &'static str },
    #[error(transparent)]
    StdDyn(BoxError),
}

impl ErrorRepr {
    pub(crate) fn from_io_err(path: &Path) -> impl FnMut(io::Error) -> Self {
        move |e| Self::NotFound {
            path: path.to_path_buf(),
            source: e,
        }
    }

    pub(crate) fn from_create_err<E>(uri: &ObjectUri) -> impl FnMut(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |e| Self::Create {
            uri: uri.clone(),
            source: Box::new(e),
        }
    }

    pub(crate) fn from_upload_err<E>(
        id: &UploadId,
        uri: &ObjectUri,
        part: PartNumber,
    ) -> impl FnMut(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |e| Self::UploadPart {
            id: id.clone(),
            uri: uri.clone(),
            part,
            source: Box::new(e),
        }
    }

    pub(crate) fn from_complete_err<E>(
        id: &UploadId,
        uri: &ObjectUri,
        parts: &CompletedParts,
    ) -> impl FnMut(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |e| Self::Complete {
            id: id.clone(),
            uri: uri.clone(),
            parts: parts.clone(),
            source: Box::new(e),
        }
    }

    pub(crate) fn from_put_err<E>(uri: &ObjectUri) -> impl FnMut(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |e| Self::Put {
            uri: uri.clone(),
            source: Box::new(e),
        }
    }

    pub(crate) fn from_abort_err<E>(id: &UploadId, uri: &ObjectUri) -> impl FnMut(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |e| Self::Abort {
            id: id.clone(),
            uri: uri.clone(),
            source: Box::new(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::part::FailedPart;

    #[test]
    fn kinds_follow_the_failed_operation() {
        let uri = ObjectUri::from(("bucket", "key"));
        let id = UploadId::from("upload-1");
        let io = || io::Error::other("boom");

        let err: Error = ErrorRepr::from_create_err(&uri)(io()).into();
        assert_eq!(err.kind(), ErrorKind::Initiation);

        let err: Error = ErrorRepr::from_put_err(&uri)(io()).into();
        assert_eq!(err.kind(), ErrorKind::Store);

        let parts = CompletedParts::default();
        let err: Error = ErrorRepr::from_complete_err(&id, &uri, &parts)(io()).into();
        assert_eq!(err.kind(), ErrorKind::Completion);

        let err: Error = ErrorRepr::from_io_err(Path::new("missing.json"))(io()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.failed_parts().is_none());
    }

    #[test]
    fn parts_failed_lists_part_numbers() {
        let uri = ObjectUri::from(("bucket", "key"));
        let id = UploadId::from("upload-1");
        let mut failed = FailedParts::default();
        let cause = Error::from_kind(ErrorKind::Unknown, "connection reset");
        failed.push(FailedPart::new(PartNumber::new(2), cause));

        let err: Error = ErrorRepr::PartsFailed { id, uri, failed }.into();
        assert_eq!(err.kind(), ErrorKind::PartUpload);
        assert_eq!(
            err.to_string(),
            "uploading parts [2] to upload upload-1 for s3://bucket/key failed"
        );
        let numbers = err.failed_parts().map(FailedParts::part_numbers);
        assert_eq!(numbers, Some(vec![PartNumber::new(2)]));
    }
}
