//! Provider selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use muralist_core::synthesis::ImageSynthesizer;

use crate::{api, imagen, GeminiApi, ImagenApi};

/// Which remote backend generates images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Imagen,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown image provider '{0}' (expected 'gemini' or 'imagen')")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "imagen" => Ok(Self::Imagen),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Self::Gemini => GeminiApi::PROVIDER,
            Self::Imagen => ImagenApi::PROVIDER,
        }
    }

    /// Whether the backend accepts an input image (needed for refinement).
    pub fn supports_image_input(self) -> bool {
        matches!(self, Self::Gemini)
    }
}

/// Everything needed to construct a synthesizer.
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub gemini_model: String,
    pub imagen_model: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("gemini_model", &self.gemini_model)
            .field("imagen_model", &self.imagen_model)
            .finish()
    }
}

impl ProviderConfig {
    /// Gemini with the default host and models.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            provider: Provider::Gemini,
            api_key: api_key.into(),
            base_url: api::DEFAULT_BASE_URL.to_string(),
            gemini_model: api::DEFAULT_MODEL.to_string(),
            imagen_model: imagen::DEFAULT_MODEL.to_string(),
        }
    }

    /// Build the configured synthesizer.
    pub fn build(&self) -> Arc<dyn ImageSynthesizer> {
        match self.provider {
            Provider::Gemini => Arc::new(GeminiApi::new(
                self.base_url.clone(),
                self.api_key.clone(),
                self.gemini_model.clone(),
            )),
            Provider::Imagen => Arc::new(ImagenApi::new(
                self.base_url.clone(),
                self.api_key.clone(),
                self.imagen_model.clone(),
            )),
        }
    }
}
