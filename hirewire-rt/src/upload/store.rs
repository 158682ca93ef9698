//! Remote block storage

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::block::UploadBlock;
use crate::recorder::{container_format, mime_essence};
use crate::error::{Error, Result};

/// Commit body for the finalize endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub session_id: Uuid,
    /// Uploaded blocks in capture order
    pub block_ids: Vec<String>,
    /// Seconds
    pub duration: f64,
    pub file_size: u64,
    pub format: String,
    pub resolution: String,
    pub frame_rate: u32,
}

#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn put_block(&self, session_id: Uuid, block: &UploadBlock) -> Result<()>;

    async fn commit(&self, request: &FinalizeRequest) -> Result<()>;
}

/// Multipart chunk upload plus JSON commit over HTTP
pub struct HttpBlockStore {
    http_client: reqwest::Client,
    chunk_endpoint: String,
    finalize_endpoint: String,
}

impl HttpBlockStore {
    pub fn new(
        chunk_endpoint: impl Into<String>,
        finalize_endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            chunk_endpoint: chunk_endpoint.into(),
            finalize_endpoint: finalize_endpoint.into(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Upload {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl BlockStore for HttpBlockStore {
    async fn put_block(&self, session_id: Uuid, block: &UploadBlock) -> Result<()> {
        let chunk = Part::bytes(block.data.clone())
            .file_name(format!(
                "chunk-{:06}.{}",
                block.sequence_index,
                container_format(&block.mime_type)
            ))
            .mime_str(mime_essence(&block.mime_type))?;
        let form = Form::new()
            .text("sessionId", session_id.to_string())
            .text("blockId", block.block_id.clone())
            .part("chunk", chunk);

        let response = self
            .http_client
            .post(&self.chunk_endpoint)
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await?;
        debug!(session_id = %session_id, block_id = %block.block_id, "Block stored");
        Ok(())
    }

    async fn commit(&self, request: &FinalizeRequest) -> Result<()> {
        let response = self
            .http_client
            .post(&self.finalize_endpoint)
            .json(request)
            .send()
            .await?;
        Self::check(response).await
    }
}
