//! REST client for Imagen text-to-image (`predict`).
//!
//! Imagen renders directly at a requested aspect ratio but cannot take an
//! input image, so refinement calls are rejected.

use async_trait::async_trait;
use muralist_core::prompt::ASPECT_RATIO;
use muralist_core::synthesis::{ImagePart, ImageSynthesizer, Synthesis, SynthesisError};

use crate::api::{model_endpoint, post_json};
use crate::messages::{PredictRequest, PredictResponse};

/// Default Imagen model.
pub const DEFAULT_MODEL: &str = "imagen-4.0-generate-001";

/// HTTP client for Imagen.
pub struct ImagenApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ImagenApi {
    pub const PROVIDER: &'static str = "imagen";

    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    pub fn endpoint(&self) -> String {
        model_endpoint(&self.base_url, &self.model, "predict")
    }
}

#[async_trait]
impl ImageSynthesizer for ImagenApi {
    fn name(&self) -> &'static str {
        Self::PROVIDER
    }

    async fn synthesize(
        &self,
        prompt: &str,
        input: Option<&ImagePart>,
    ) -> Result<Synthesis, SynthesisError> {
        if input.is_some() {
            return Err(SynthesisError::Unsupported {
                provider: Self::PROVIDER,
                operation: "image input",
            });
        }

        let request = PredictRequest::new(prompt, ASPECT_RATIO);
        let response: PredictResponse = post_json(
            &self.client,
            &self.endpoint(),
            &self.api_key,
            &request,
            Self::PROVIDER,
        )
        .await?;

        response
            .into_synthesis()
            .map_err(|e| SynthesisError::MalformedResponse {
                provider: Self::PROVIDER,
                message: format!("invalid prediction bytes: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> ImagenApi {
        ImagenApi::new(
            "http://127.0.0.1:9".to_string(),
            "key".to_string(),
            DEFAULT_MODEL.to_string(),
        )
    }

    #[test]
    fn endpoint_uses_predict() {
        assert_eq!(
            api().endpoint(),
            "http://127.0.0.1:9/v1beta/models/imagen-4.0-generate-001:predict"
        );
    }

    #[tokio::test]
    async fn image_input_is_unsupported() {
        let input = ImagePart {
            mime_type: "image/png".into(),
            data: vec![0],
        };
        let err = api().synthesize("refine", Some(&input)).await.unwrap_err();
        assert!(matches!(
            err,
            SynthesisError::Unsupported {
                provider: "imagen",
                operation: "image input"
            }
        ));
        assert_eq!(err.to_string(), "imagen does not support image input");
    }
}
