//! The image synthesis capability.
//!
//! Every remote provider is exposed through [`ImageSynthesizer`]: a prompt
//! and an optional input image in, text and image parts out. Which provider
//! backs the service is a configuration choice.

use std::time::Duration;

use async_trait::async_trait;

use crate::crop::sniff_mime;

/// An encoded image sent to or received from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePart {
    /// Wrap encoded bytes, sniffing the MIME type from their header.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            mime_type: sniff_mime(&data).to_string(),
            data,
        }
    }
}

/// Parsed provider response.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    pub text_parts: Vec<String>,
    pub images: Vec<ImagePart>,
}

impl Synthesis {
    /// Take the first image part, if any.
    pub fn into_first_image(self) -> Option<ImagePart> {
        self.images.into_iter().next()
    }

    /// All text parts joined with newlines, or `None` if there were none.
    pub fn text(&self) -> Option<String> {
        if self.text_parts.is_empty() {
            None
        } else {
            Some(self.text_parts.join("\n"))
        }
    }
}

/// Errors from a remote synthesis call.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The request never produced an HTTP response (network, DNS, TLS).
    #[error("Request to {provider} failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    /// The provider answered with a non-2xx status.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be interpreted.
    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    /// The provider cannot perform the requested operation.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },

    /// The call exceeded its time budget.
    #[error("Request to {provider} timed out after {}s", .after.as_secs())]
    Timeout {
        provider: &'static str,
        after: Duration,
    },
}

/// A remote generative-image backend.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Short provider name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Generate from `prompt`, optionally conditioning on `input`.
    async fn synthesize(
        &self,
        prompt: &str,
        input: Option<&ImagePart>,
    ) -> Result<Synthesis, SynthesisError>;
}
