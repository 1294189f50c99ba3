use anyhow::Context;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{self as s3, config::Region, primitives::ByteStream};
use serde::Deserialize;
use url::Url;

use super::{BlobStore, BLOCK_EXTENSION};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct S3BackingSettings {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub create_bucket: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Object-store backing. One bucket holds all queues; keys are the broker's
/// `name/YYYY/MM/DD/serial` layout with the canonical extension appended.
pub struct S3Backing {
    client: s3::Client,
    bucket: String,
    endpoint: String,
}

impl S3Backing {
    pub async fn new(settings: S3BackingSettings) -> Result<Self, anyhow::Error> {
        let endpoint: Url = settings
            .endpoint
            .parse()
            .context("parsing endpoint into url failed")?;
        let credentials = Credentials::from_keys(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
        );
        let config = s3::Config::builder()
            .endpoint_url(endpoint.as_str())
            .credentials_provider(credentials)
            .region(Some(Region::new(settings.region.clone())))
            .force_path_style(true)
            .build();
        let client = s3::Client::from_conf(config);

        if settings.create_bucket {
            Self::create_bucket_if_not_exists(&client, &settings.bucket)
                .await
                .context("bucket initialization failed")?;
        }

        Ok(Self {
            client,
            bucket: settings.bucket,
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn object_key(key: &str) -> String {
        format!("{key}.{BLOCK_EXTENSION}")
    }

    async fn create_bucket_if_not_exists(
        client: &s3::Client,
        bucket: &str,
    ) -> Result<(), anyhow::Error> {
        match client.create_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_bucket_already_owned_by_you() {
                    Ok(())
                } else {
                    Err(service_error.into())
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for S3Backing {
    async fn write_lines(&self, key: &str, lines: &[String]) -> Result<(), anyhow::Error> {
        let object_key = Self::object_key(key);
        let mut content = lines.join("\n");
        content.push('\n');
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(content.into_bytes()))
            .send()
            .await
            .with_context(|| format!("put object {object_key} failed"))?;
        Ok(())
    }

    async fn read_lines(&self, key: &str) -> Result<Vec<String>, anyhow::Error> {
        let object_key = Self::object_key(key);
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .with_context(|| format!("get object {object_key} failed"))?;
        let bytes = response
            .body
            .collect()
            .await
            .context("download object content")?
            .into_bytes();
        let content = String::from_utf8(bytes.to_vec()).context("object is not valid utf-8")?;
        Ok(content
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.bucket,
            Self::object_key(key)
        )
    }
}
