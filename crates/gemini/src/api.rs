//! REST client for the Gemini `generateContent` endpoint.
//!
//! Sends a text prompt (plus an optional inline image) and returns the
//! first candidate's parts as a [`Synthesis`].

use async_trait::async_trait;
use muralist_core::synthesis::{ImagePart, ImageSynthesizer, Synthesis, SynthesisError};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::messages::{GenerateContentRequest, GenerateContentResponse};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default image-capable Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for Gemini image generation.
pub struct GeminiApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiApi {
    pub const PROVIDER: &'static str = "gemini";

    /// Create a client for `model` at `base_url`.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key, model)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    /// Full URL of the `generateContent` endpoint for this model.
    pub fn endpoint(&self) -> String {
        model_endpoint(&self.base_url, &self.model, "generateContent")
    }

    /// Send one `generateContent` request.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, SynthesisError> {
        post_json(
            &self.client,
            &self.endpoint(),
            &self.api_key,
            request,
            Self::PROVIDER,
        )
        .await
    }
}

#[async_trait]
impl ImageSynthesizer for GeminiApi {
    fn name(&self) -> &'static str {
        Self::PROVIDER
    }

    async fn synthesize(
        &self,
        prompt: &str,
        input: Option<&ImagePart>,
    ) -> Result<Synthesis, SynthesisError> {
        let request = GenerateContentRequest::new(prompt, input);
        let response = self.generate_content(&request).await?;

        if let Some(reason) = response.block_reason() {
            tracing::warn!(model = %self.model, reason, "Gemini blocked the prompt");
        }

        let synthesis = response
            .into_synthesis()
            .map_err(|e| SynthesisError::MalformedResponse {
                provider: Self::PROVIDER,
                message: format!("invalid inline image data: {e}"),
            })?;

        tracing::debug!(
            model = %self.model,
            text_parts = synthesis.text_parts.len(),
            images = synthesis.images.len(),
            "Gemini response received",
        );
        Ok(synthesis)
    }
}

// ---- shared helpers ----

/// `{base}/v1beta/models/{model}:{method}`, tolerating a trailing slash.
pub(crate) fn model_endpoint(base_url: &str, model: &str, method: &str) -> String {
    format!(
        "{}/v1beta/models/{model}:{method}",
        base_url.trim_end_matches('/')
    )
}

/// POST a JSON body with the API key header and decode a JSON response.
pub(crate) async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &Req,
    provider: &'static str,
) -> Result<Resp, SynthesisError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let response = client
        .post(url)
        .header(API_KEY_HEADER, api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| SynthesisError::Transport {
            provider,
            message: e.to_string(),
        })?;

    let response = ensure_success(response, provider).await?;
    response
        .json::<Resp>()
        .await
        .map_err(|e| SynthesisError::MalformedResponse {
            provider,
            message: e.to_string(),
        })
}

/// Return the response unchanged on 2xx, or an [`SynthesisError::Api`]
/// carrying the status and body text.
async fn ensure_success(
    response: reqwest::Response,
    provider: &'static str,
) -> Result<reqwest::Response, SynthesisError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(SynthesisError::Api {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
