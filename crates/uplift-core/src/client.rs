use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{header, Client};
use tracing::{debug, info};

use crate::error::{PlaygroundError, Result};
use crate::input::SlotId;
use crate::policy::RemoteFetchPolicy;
use crate::submit::{SlotPayload, SubmissionRequest, UpliftOutput};

const REMOTE_FETCH_PATH: &str = "/remote-fetch";
const JSON_UPLIFT_PATH: &str = "/json-uplift";

/// HTTP client for the uplift backend
#[derive(Clone)]
pub struct UpliftClient {
    client: Client,
    base_url: String,
}

impl UpliftClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_policy(&self) -> Result<RemoteFetchPolicy> {
        let url = format!("{}{}", self.base_url, REMOTE_FETCH_PATH);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::Backend { status, body });
        }

        let body = response.text().await?;
        RemoteFetchPolicy::from_json(&body)
    }

    pub async fn uplift(&self, request: SubmissionRequest) -> Result<UpliftOutput> {
        let url = format!("{}{}", self.base_url, JSON_UPLIFT_PATH);

        info!(
            context = request.context.field(SlotId::Context),
            json = request.json.field(SlotId::Json),
            output = %request.output,
            "Submitting uplift request"
        );

        let response = self
            .client
            .post(&url)
            .multipart(build_form(request)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?.to_vec();

        debug!(content_type = %content_type, bytes = body.len(), "Uplift succeeded");
        Ok(UpliftOutput::from_body(&content_type, body))
    }
}

fn build_form(request: SubmissionRequest) -> Result<Form> {
    let form = Form::new();
    let form = add_slot(form, SlotId::Context, request.context)?;
    let form = add_slot(form, SlotId::Json, request.json)?;

    Ok(form
        .text("output", request.output.as_str())
        .text("base", request.base)
        .text("provenance", request.provenance.to_string()))
}

fn add_slot(form: Form, slot: SlotId, payload: SlotPayload) -> Result<Form> {
    let field = payload.field(slot);
    Ok(match payload {
        SlotPayload::Text(text) => form.text(field, text),
        SlotPayload::Url(url) => form.text(field, url),
        SlotPayload::File(file) => {
            let part = Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str("application/octet-stream")?;
            form.part(field, part)
        }
    })
}
