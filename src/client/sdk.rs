use super::part::{CompletedPart, EntityTag};
use super::request::*;
use super::{CompletedUpload, SendRequest, UploadData, UploadId};
use crate::error::{ErrorRepr, Result};
use crate::uri::ObjectUri;

use aws_config::{BehaviorVersion, ConfigLoader, SdkConfig};
use aws_sdk_s3 as s3;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::operation::create_multipart_upload::CreateMultipartUploadOutput as CreateResponse;
use aws_sdk_s3::primitives::ByteStream;

/// Where an S3-compatible store lives and how to authenticate with it.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Endpoint URL, e.g. `http://127.0.0.1:9000` for a local MinIO.
    pub endpoint: String,
    /// Signing region. MinIO does not use regions but the SDK requires one.
    pub region: String,
    /// Static access key.
    pub access_key: String,
    /// Static secret key.
    pub secret_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".into(),
            region: "us-east-1".into(),
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

impl StoreConfig {
    /// Returns a `ConfigLoader` with the endpoint, region and static
    /// credentials of this configuration.
    pub fn loader(&self) -> ConfigLoader {
        let credentials = Credentials::new(
            self.access_key.clone(),
            self.secret_key.clone(),
            None,
            None,
            "s3-file-upload",
        );
        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .endpoint_url(&self.endpoint)
            .credentials_provider(credentials)
    }
}

/// S3 [`Client`] type from the AWS SDK.
///
/// [`Client`]: aws_sdk_s3::Client
#[derive(Debug, Clone)]
pub struct SdkClient<B = DefaultRequestBuilder>(s3::Client, B);

impl SdkClient {
    /// Create a new `SdkClient` from an existing SDK `Client`.
    ///
    /// [`Client`]: aws_sdk_s3::Client
    pub fn new(client: s3::Client) -> Self {
        SdkClient(client, DefaultRequestBuilder)
    }

    /// Create a new `SdkClient` from an [`SdkConfig`].
    ///
    /// [`SdkConfig`]: aws_config::SdkConfig
    pub fn from_sdk_config(config: SdkConfig) -> Self {
        let client = s3::Client::new(&config);
        Self::new(client)
    }

    /// Create a new `SdkClient` by loading a [`ConfigLoader`].
    ///
    /// [`ConfigLoader`]: aws_config::ConfigLoader
    pub async fn from_config(loader: ConfigLoader) -> Self {
        let config = loader.load().await;
        Self::from_sdk_config(config)
    }

    /// Create a new `SdkClient` for an S3-compatible store such as MinIO.
    ///
    /// Path-style addressing is forced, since such stores generally do not
    /// serve virtual-hosted buckets.
    pub async fn from_store_config(store: &StoreConfig) -> Self {
        let config = store.loader().load().await;
        let s3_config = s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();
        Self::new(s3::Client::from_conf(s3_config))
    }

    /// Set a request builder for this S3 client.
    pub fn request_builder<B: RequestBuilder>(self, builder: B) -> SdkClient<B> {
        SdkClient(self.0, builder)
    }
}

impl<B: RequestBuilder> SdkClient<B> {
    fn new_put_builder(&self) -> PutRequestBuilder {
        self.0.put_object()
    }

    fn new_create_builder(&self) -> CreateRequestBuilder {
        self.0.create_multipart_upload()
    }

    fn new_part_builder(&self) -> UploadPartRequestBuilder {
        self.0.upload_part()
    }

    fn new_complete_builder(&self) -> CompleteRequestBuilder {
        self.0.complete_multipart_upload()
    }

    fn new_abort_builder(&self) -> AbortRequestBuilder {
        self.0.abort_multipart_upload()
    }
}

impl<B: RequestBuilder> SendRequest for SdkClient<B> {
    async fn send_put_object_request(&self, req: PutRequest) -> Result<CompletedUpload> {
        req.validate()?;
        let body = ByteStream::from_path(req.path())
            .await
            .map_err(ErrorRepr::from_put_err(req.uri()))?;
        let base = self.new_put_builder();
        let builder = req.with_builder(base).body(body);
        let request = self.1.with_put_builder(builder);

        let uri = req.uri();
        let etag = request
            .send()
            .await
            .map_err(ErrorRepr::from_put_err(uri))
            .and_then(EntityTag::try_from_put_resp(uri))?;

        Ok(CompletedUpload::new(uri.clone(), etag))
    }

    async fn send_create_upload_request(&self, req: CreateRequest) -> Result<UploadData> {
        req.validate()?;
        let base = self.new_create_builder();
        let builder = req.with_builder(base);
        let request = self.1.with_create_builder(builder);

        let uri = req.uri();
        let id = request
            .send()
            .await
            .map_err(ErrorRepr::from_create_err(uri))
            .and_then(upload_id_from_resp(uri))?;

        Ok(UploadData::new(id, uri.clone()))
    }

    async fn send_new_part_upload_request(
        &self,
        mut req: UploadPartRequest,
    ) -> Result<CompletedPart> {
        req.validate()?;
        let part_size = req.body.size();

        let base = self.new_part_builder();
        let builder = req.with_builder(base);
        let request = self.1.with_upload_part_builder(builder);

        let id = req.id();
        let uri = req.uri();
        let part = req.part_number();
        let etag = request
            .send()
            .await
            .map_err(ErrorRepr::from_upload_err(id, uri, part))
            .and_then(EntityTag::try_from_upload_resp(id, uri, part))?;

        Ok(CompletedPart::new(id.clone(), etag, part, part_size))
    }

    async fn send_complete_upload_request(&self, req: CompleteRequest) -> Result<CompletedUpload> {
        req.validate()?;
        let base = self.new_complete_builder();
        let builder = req.with_builder(base);
        let request = self.1.with_complete_builder(builder);

        let id = req.id();
        let uri = req.uri();
        let parts = req.completed_parts();
        let etag = request
            .send()
            .await
            .map_err(ErrorRepr::from_complete_err(id, uri, parts))
            .and_then(EntityTag::try_from_complete_resp(id, uri, parts))?;

        Ok(CompletedUpload::new(uri.clone(), etag))
    }

    async fn send_abort_upload_request(&self, req: AbortRequest) -> Result<()> {
        req.validate()?;
        let base = self.new_abort_builder();
        let builder = req.with_builder(base);
        let request = self.1.with_abort_builder(builder);

        request
            .send()
            .await
            .map_err(ErrorRepr::from_abort_err(req.id(), req.uri()))?;

        Ok(())
    }
}

fn upload_id_from_resp(
    uri: &ObjectUri,
) -> impl FnOnce(CreateResponse) -> Result<UploadId, ErrorRepr> {
    move |value| {
        value.upload_id.map(UploadId::from).ok_or_else(|| {
            let e = ErrorRepr::Missing("CreateResponse", "upload_id");
            ErrorRepr::from_create_err(uri)(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::part::{PartBody, PartNumber};
    use crate::error::{Error, ErrorKind};

    fn offline_client() -> s3::Client {
        let config = s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        s3::Client::from_conf(config)
    }

    fn data() -> UploadData {
        UploadData::new("upload-1", ObjectUri::from(("bucket", "data/25mb.json")))
    }

    #[test]
    fn create_request_sets_bucket_and_key() {
        let client = offline_client();
        let req = CreateRequest::new(data().uri);
        let builder = req.with_builder(client.create_multipart_upload());
        assert_eq!(builder.get_bucket().as_deref(), Some("bucket"));
        assert_eq!(builder.get_key().as_deref(), Some("data/25mb.json"));
    }

    #[test]
    fn part_request_sets_upload_id_and_number() {
        let client = offline_client();
        let body = PartBody::from(&b"some part"[..]);
        let mut req = UploadPartRequest::new(&data(), body, PartNumber::new(3));
        let builder = req.with_builder(client.upload_part());
        assert_eq!(builder.get_upload_id().as_deref(), Some("upload-1"));
        assert_eq!(*builder.get_part_number(), Some(3));
        assert_eq!(builder.get_bucket().as_deref(), Some("bucket"));
    }

    #[test]
    fn abort_request_sets_upload_id() {
        let client = offline_client();
        let req = AbortRequest::new(&data());
        let builder = req.with_builder(client.abort_multipart_upload());
        assert_eq!(builder.get_upload_id().as_deref(), Some("upload-1"));
        assert_eq!(builder.get_key().as_deref(), Some("data/25mb.json"));
    }

    #[test]
    fn missing_response_fields_keep_the_operation_kind() {
        let data = data();

        let resp = CreateResponse::builder().build();
        let err: Error = upload_id_from_resp(&data.uri)(resp).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Initiation);

        let resp = s3::operation::put_object::PutObjectOutput::builder().build();
        let err: Error = EntityTag::try_from_put_resp(&data.uri)(resp)
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Store);

        let parts = crate::client::part::CompletedParts::default();
        let resp = s3::operation::complete_multipart_upload::CompleteMultipartUploadOutput::builder()
            .build();
        let err: Error = EntityTag::try_from_complete_resp(&data.id, &data.uri, &parts)(resp)
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Completion);

        let resp = s3::operation::upload_part::UploadPartOutput::builder().build();
        let part = PartNumber::new(2);
        let err: Error = EntityTag::try_from_upload_resp(&data.id, &data.uri, part)(resp)
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::PartUpload);
    }
}
