//! Request objects for the operations of [`SendRequest`].
//!
//! Each request type holds the minimum needed for its operation and knows how
//! to set those properties on the matching SDK fluent builder. Further
//! customization of the SDK requests goes through [`RequestBuilder`].
//!
//! [`SendRequest`]: super::SendRequest
use aws_sdk_s3::operation::abort_multipart_upload::builders::AbortMultipartUploadFluentBuilder;
use aws_sdk_s3::operation::complete_multipart_upload::builders::CompleteMultipartUploadFluentBuilder;
use aws_sdk_s3::operation::create_multipart_upload::builders::CreateMultipartUploadFluentBuilder;
use aws_sdk_s3::operation::put_object::builders::PutObjectFluentBuilder;
use aws_sdk_s3::operation::upload_part::builders::UploadPartFluentBuilder;

pub use super::{CompletedUpload, UploadData, UploadId};

/// SDK builder for the `AbortMultipartUpload` operation.
pub type AbortRequestBuilder = AbortMultipartUploadFluentBuilder;
/// SDK builder for the `CompleteMultipartUpload` operation.
pub type CompleteRequestBuilder = CompleteMultipartUploadFluentBuilder;
/// SDK builder for the `CreateMultipartUpload` operation.
pub type CreateRequestBuilder = CreateMultipartUploadFluentBuilder;
/// SDK builder for the `PutObject` operation.
pub type PutRequestBuilder = PutObjectFluentBuilder;
/// SDK builder for the `UploadPart` operation.
pub type UploadPartRequestBuilder = UploadPartFluentBuilder;

mod abort;
pub use abort::AbortRequest;

mod complete;
pub use complete::CompleteRequest;

mod create;
pub use create::CreateRequest;

mod put;
pub use put::PutRequest;

mod upload_part;
pub use upload_part::{SendUploadPart, UploadPartRequest};

/// Add additional properties to the request objects being sent.
pub trait RequestBuilder: Send + Sync {
    /// Set additional properties on [`PutRequestBuilder`] beyond what
    /// [`PutRequest`] provides.
    fn with_put_builder(&self, builder: PutRequestBuilder) -> PutRequestBuilder {
        builder
    }

    /// Set additional properties on [`CreateRequestBuilder`] beyond what
    /// [`CreateRequest`] provides.
    fn with_create_builder(&self, builder: CreateRequestBuilder) -> CreateRequestBuilder {
        builder
    }

    /// Set additional properties on [`UploadPartRequestBuilder`] beyond what
    /// [`UploadPartRequest`] provides.
    fn with_upload_part_builder(
        &self,
        builder: UploadPartRequestBuilder,
    ) -> UploadPartRequestBuilder {
        builder
    }

    /// Set additional properties on [`CompleteRequestBuilder`] beyond what
    /// [`CompleteRequest`] provides.
    fn with_complete_builder(&self, builder: CompleteRequestBuilder) -> CompleteRequestBuilder {
        builder
    }

    /// Set additional properties on [`AbortRequestBuilder`] beyond what
    /// [`AbortRequest`] provides.
    fn with_abort_builder(&self, builder: AbortRequestBuilder) -> AbortRequestBuilder {
        builder
    }
}

/// Default implementation of [`RequestBuilder`] that doesn't modify the request
/// object at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRequestBuilder;
impl RequestBuilder for DefaultRequestBuilder {}
