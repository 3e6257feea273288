use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Client,
};

use crate::{error::RemoteError, media::SourceFile, settings::ControllerSettings};

/// Multipart field name the removal service reads the upload from.
pub const FILE_FIELD: &str = "file";

/// The remote background-removal computation, opaque to the controller.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Submit one file and return the raw response body of a 2xx reply.
    async fn remove_background(&self, file: &SourceFile) -> Result<Bytes, RemoteError>;
}

/// `BackgroundRemover` backed by the HTTP service.
#[derive(Debug, Clone)]
pub struct HttpRemover {
    client: Client,
    removal_url: String,
    health_url: String,
}

impl HttpRemover {
    pub fn new(settings: &ControllerSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            removal_url: settings.removal_url(),
            health_url: settings.health_url(),
        })
    }

    pub fn removal_url(&self) -> &str {
        &self.removal_url
    }

    /// Probe the service's `/healthz` route.
    pub async fn health_check(&self) -> Result<bool, RemoteError> {
        let response = self.client.get(&self.health_url).send().await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl BackgroundRemover for HttpRemover {
    async fn remove_background(&self, file: &SourceFile) -> Result<Bytes, RemoteError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.media_type)?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(&self.removal_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        Ok(response.bytes().await?)
    }
}
