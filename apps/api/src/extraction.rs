//! Resume text extraction: fetches the uploaded resume from object storage and
//! turns it into plain text. PDFs go through `pdf-extract`; anything else is
//! decoded as UTF-8.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

/// Yields resume text for a stored resume URL.
#[async_trait]
pub trait ResumeTextSource: Send + Sync {
    async fn extract_text(&self, resume_url: &str) -> Result<String>;
}

/// S3 / MinIO backed extractor.
#[derive(Clone)]
pub struct S3ResumeExtractor {
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ResumeExtractor {
    pub fn new(s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { s3, bucket }
    }
}

#[async_trait]
impl ResumeTextSource for S3ResumeExtractor {
    async fn extract_text(&self, resume_url: &str) -> Result<String> {
        let key = object_key(resume_url, &self.bucket);
        debug!("Fetching resume s3://{}/{}", self.bucket, key);

        let object = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 download of '{key}' failed: {e}"))?;

        let content_type = object.content_type().map(str::to_string);
        let body: Bytes = object
            .body
            .collect()
            .await
            .context("Failed to read resume body")?
            .into_bytes();

        let text = if is_pdf(&key, content_type.as_deref(), &body) {
            // pdf-extract is CPU-bound; keep it off the async workers.
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&body))
                .await
                .context("PDF extraction task panicked")?
                .map_err(|e| anyhow::anyhow!("PDF text extraction failed: {e}"))?
        } else {
            String::from_utf8_lossy(&body).into_owned()
        };

        let text = normalize_whitespace(&text);
        info!("Extracted {} characters from resume '{}'", text.len(), key);
        Ok(text)
    }
}

/// Resolves a stored resume URL to an object key inside `bucket`.
///
/// Accepts `s3://bucket/key`, path-style `https://host/bucket/key`, or a bare key.
fn object_key(resume_url: &str, bucket: &str) -> String {
    let url = resume_url.trim();

    if let Some(rest) = url.strip_prefix("s3://") {
        return match rest.split_once('/') {
            Some((_, key)) => key.to_string(),
            None => rest.to_string(),
        };
    }

    if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        let path = rest.split_once('/').map(|(_, p)| p).unwrap_or("");
        let path = path.split(['?', '#']).next().unwrap_or("");
        return path
            .strip_prefix(bucket)
            .and_then(|p| p.strip_prefix('/'))
            .unwrap_or(path)
            .to_string();
    }

    url.trim_start_matches('/').to_string()
}

fn is_pdf(key: &str, content_type: Option<&str>, body: &[u8]) -> bool {
    content_type.is_some_and(|ct| ct.contains("pdf"))
        || key.to_lowercase().ends_with(".pdf")
        || body.starts_with(b"%PDF")
}

/// Collapses runs of blank lines and trailing spaces left behind by PDF extraction.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
