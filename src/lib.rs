#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

//! # Description
//!
//! Upload local files to AWS S3 or any S3-compatible object store, such as
//! MinIO, using the official [SDK] for Rust.
//!
//! A file goes up either with one put request or as a multipart upload. A
//! multipart upload reads the file in parts of a fixed size and sends every
//! part as its own task as soon as it has been read, with a limit on how many
//! are in flight. When all parts have settled the upload is completed with
//! the parts in ascending order, or aborted if any of them failed.
//!
//! # Examples
//!
//! ```rust
//! use s3_file_upload::{ByteSize, MemoryClient, UploadBuilder};
//! # use std::io::Write;
//!
//! # async fn f() -> s3_file_upload::error::Result<()> {
//! # let mut file = tempfile::NamedTempFile::new().unwrap();
//! # file.write_all(&[0u8; 1024]).unwrap();
//! # let path = file.path();
//! // `SdkClient` talks to a real store, `MemoryClient` keeps objects in memory.
//! let client = MemoryClient::new();
//!
//! let uploader = UploadBuilder::new(client)
//!     .bucket("a-bucket")
//!     .key_prefix("simulator/data")
//!     .part_size(ByteSize::kib(256))
//!     .max_active_tasks(4)
//!     .build();
//!
//! let completed = uploader.multipart_upload(path).await?;
//! println!("created {} with entity tag {}", completed.uri, completed.etag);
//! #     Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(f()).unwrap();
//! ```
//!
//! [SDK]: https://awslabs.github.io/aws-sdk-rust/
#[doc(hidden)]
pub extern crate aws_config;
#[doc(hidden)]
pub extern crate aws_sdk_s3 as aws_sdk;

pub use bytesize::ByteSize;

#[macro_use]
mod trace;

mod client;
pub use client::{MemoryClient, SdkClient, SendRequest, StoreConfig, UploadClient};

pub mod memory {
    //! Types for inspecting a [`MemoryClient`].
    //!
    //! [`MemoryClient`]: crate::MemoryClient
    pub use super::client::memory::{MemoryStoreError, StoreCall};
}

pub mod error;

pub mod request {
    //! Request interface of the object store API.
    //!
    //! This module contains the trait [`RequestBuilder`] for customizing the
    //! request object sent for an upload operation, the request objects, and
    //! types appearing in request or response objects.
    pub use super::client::part::*;
    pub use super::client::request::*;
}

mod upload;
pub use upload::{FileUploader, Phase};

pub mod uri;
#[doc(inline)]
pub use uri::{KeyPrefix, ObjectUri};

// https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html
const AWS_MAX_PART_SIZE: ByteSize = ByteSize::gib(5);
const DEFAULT_PART_SIZE: ByteSize = ByteSize::mib(5);
const DEFAULT_MAX_TASKS: usize = 10;

/// Configures and builds a [`FileUploader`].
#[derive(Debug)]
#[non_exhaustive]
pub struct UploadBuilder {
    client: UploadClient,
    bucket: uri::Bucket,
    prefix: KeyPrefix,
    part_bytes: ByteSize,
    max_tasks: Option<usize>,
    abort_on_failure: bool,
}

impl UploadBuilder {
    /// Create an `UploadBuilder` from a [`SendRequest`] client.
    pub fn new<C>(client: C) -> Self
    where
        C: SendRequest + 'static,
    {
        Self {
            client: UploadClient::new(client),
            bucket: uri::Bucket::default(),
            prefix: KeyPrefix::default(),
            part_bytes: DEFAULT_PART_SIZE,
            max_tasks: Some(DEFAULT_MAX_TASKS),
            abort_on_failure: true,
        }
    }

    /// Set the destination bucket.
    pub fn bucket<T: Into<uri::Bucket>>(self, bucket: T) -> Self {
        Self {
            bucket: bucket.into(),
            ..self
        }
    }

    /// Set the prefix of the object keys. The key of an uploaded file is this
    /// prefix followed by the file name.
    pub fn key_prefix<T: Into<KeyPrefix>>(self, prefix: T) -> Self {
        Self {
            prefix: prefix.into(),
            ..self
        }
    }

    /// Set the size of a part. Defaults to 5 MiB.
    ///
    /// Only the last part of an upload may be smaller. Stores usually reject
    /// smaller parts, S3 with 5 MiB as the minimum, but this is left for the
    /// store to enforce.
    pub fn part_size(self, limit: ByteSize) -> Self {
        Self {
            // Clamp to 1 <= part_bytes <= min(AWS_MAX, usize::MAX).
            part_bytes: limit
                .max(ByteSize::b(1))
                .min(AWS_MAX_PART_SIZE)
                .min(ByteSize::b(usize::MAX as u64)),
            ..self
        }
    }

    /// Set the maximum number of part uploads in flight at one time.
    ///
    /// Defaults to 10. A limit of 0 is treated as no limit.
    pub fn max_active_tasks(self, limit: usize) -> Self {
        Self {
            max_tasks: Some(limit),
            ..self
        }
    }

    /// Remove the limit on part uploads in flight.
    pub fn unbounded(self) -> Self {
        Self {
            max_tasks: None,
            ..self
        }
    }

    /// Whether to abort a multipart upload that cannot be completed.
    ///
    /// Defaults to `true`. Without aborting, the parts that were uploaded stay
    /// in the store until it expires them.
    pub fn abort_on_failure(self, abort: bool) -> Self {
        Self {
            abort_on_failure: abort,
            ..self
        }
    }

    /// Build a [`FileUploader`] from this configuration.
    pub fn build(self) -> FileUploader {
        FileUploader {
            client: self.client,
            bucket: self.bucket,
            prefix: self.prefix,
            part_size: self.part_bytes.as_u64() as usize,
            max_active_tasks: self.max_tasks,
            abort_on_failure: self.abort_on_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_size_is_clamped() {
        let client = MemoryClient::new();
        let uploader = UploadBuilder::new(client.clone())
            .part_size(ByteSize::b(0))
            .build();
        assert_eq!(uploader.part_size(), 1);

        let uploader = UploadBuilder::new(client.clone())
            .part_size(ByteSize::tib(1))
            .build();
        assert_eq!(uploader.part_size() as u64, AWS_MAX_PART_SIZE.as_u64());

        let uploader = UploadBuilder::new(client).build();
        assert_eq!(uploader.part_size(), 5 * 1024 * 1024);
        assert_eq!(uploader.max_active_tasks(), Some(10));
    }

    #[test]
    fn object_uri_joins_prefix_and_file_name() {
        let uploader = UploadBuilder::new(MemoryClient::new())
            .bucket("bucket")
            .key_prefix("/simulator/data/")
            .build();
        let uri = uploader
            .object_uri(std::path::Path::new("/tmp/files/25mb.json"))
            .unwrap();
        assert_eq!(uri.to_string(), "s3://bucket/simulator/data/25mb.json");
    }
}
