//! Wire types for the `generateContent` and `predict` endpoints.
//!
//! Requests are serialized with snake_case field names. The service
//! answers in camelCase, so response fields accept both spellings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use muralist_core::synthesis::{ImagePart, Synthesis};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// generateContent
// ---------------------------------------------------------------------------

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// Output modalities requested from the model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

/// A turn of conversation: an ordered list of parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a turn. Exactly one of the fields is normally set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "inlineData")]
    pub inline_data: Option<Blob>,
}

/// Base64-encoded binary payload with its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    #[serde(alias = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, alias = "promptFeedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, alias = "finishReason")]
    pub finish_reason: Option<String>,
}

/// Present when the prompt itself was blocked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptFeedback {
    #[serde(default, alias = "blockReason")]
    pub block_reason: Option<String>,
}

impl GenerateContentRequest {
    /// Build a single-turn request with a text part and an optional image.
    pub fn new(prompt: &str, input: Option<&ImagePart>) -> Self {
        let mut parts = vec![Part {
            text: Some(prompt.to_string()),
            inline_data: None,
        }];
        if let Some(image) = input {
            parts.push(Part {
                text: None,
                inline_data: Some(Blob {
                    mime_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.data),
                }),
            });
        }
        Self {
            contents: vec![Content { role: None, parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        }
    }
}

impl GenerateContentResponse {
    /// Collect the text and image parts of the first candidate.
    ///
    /// A response with no candidates (e.g. a blocked prompt) yields an
    /// empty [`Synthesis`]; the caller decides whether that is an error.
    pub fn into_synthesis(self) -> Result<Synthesis, base64::DecodeError> {
        let mut synthesis = Synthesis::default();
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        for part in parts {
            if let Some(text) = part.text {
                synthesis.text_parts.push(text);
            }
            if let Some(blob) = part.inline_data {
                synthesis.images.push(ImagePart {
                    mime_type: blob.mime_type,
                    data: STANDARD.decode(blob.data.as_bytes())?,
                });
            }
        }
        Ok(synthesis)
    }

    /// Block reason reported by the service, if the prompt was rejected.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

// ---------------------------------------------------------------------------
// predict (Imagen)
// ---------------------------------------------------------------------------

/// Request body for `models/{model}:predict`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub sample_count: u32,
    pub aspect_ratio: String,
}

/// Response body of `predict`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl PredictRequest {
    pub fn new(prompt: &str, aspect_ratio: &str) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: aspect_ratio.to_string(),
            },
        }
    }
}

impl PredictResponse {
    /// Decode every prediction that carries image bytes.
    pub fn into_synthesis(self) -> Result<Synthesis, base64::DecodeError> {
        let mut synthesis = Synthesis::default();
        for prediction in self.predictions {
            let Some(encoded) = prediction.bytes_base64_encoded else {
                continue;
            };
            let data = STANDARD.decode(encoded.as_bytes())?;
            synthesis.images.push(match prediction.mime_type {
                Some(mime_type) => ImagePart { mime_type, data },
                None => ImagePart::from_bytes(data),
            });
        }
        Ok(synthesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- GenerateContentRequest --

    #[test]
    fn text_only_request_shape() {
        let body = serde_json::to_value(GenerateContentRequest::new("a red barn", None)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "parts": [{ "text": "a red barn" }] }],
                "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] }
            })
        );
    }

    #[test]
    fn image_input_is_base64_inline_data() {
        let image = ImagePart {
            mime_type: "image/png".into(),
            data: vec![1, 2, 3],
        };
        let body = serde_json::to_value(GenerateContentRequest::new("refine", Some(&image))).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "refine");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "AQID");
    }

    // -- GenerateContentResponse --

    #[test]
    fn response_parts_are_split_into_text_and_images() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Here is your wallpaper" },
                        { "inlineData": { "mimeType": "image/png", "data": "AQID" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let synthesis = response.into_synthesis().unwrap();
        assert_eq!(synthesis.text_parts, vec!["Here is your wallpaper"]);
        assert_eq!(synthesis.images.len(), 1);
        assert_eq!(synthesis.images[0].mime_type, "image/png");
        assert_eq!(synthesis.images[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn only_first_candidate_is_used() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "first" }] } },
                { "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": "AQID" } }] } }
            ]
        }))
        .unwrap();
        let synthesis = response.into_synthesis().unwrap();
        assert_eq!(synthesis.text_parts, vec!["first"]);
        assert!(synthesis.images.is_empty());
    }

    #[test]
    fn blocked_prompt_yields_empty_synthesis() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert_eq!(response.block_reason(), Some("SAFETY"));
        let synthesis = response.into_synthesis().unwrap();
        assert!(synthesis.images.is_empty());
        assert!(synthesis.text_parts.is_empty());
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "not base64!" } }
            ] } }]
        }))
        .unwrap();
        assert!(response.into_synthesis().is_err());
    }

    // -- Predict --

    #[test]
    fn predict_request_shape() {
        let body = serde_json::to_value(PredictRequest::new("a red barn", "9:16")).unwrap();
        assert_eq!(
            body,
            json!({
                "instances": [{ "prompt": "a red barn" }],
                "parameters": { "sampleCount": 1, "aspectRatio": "9:16" }
            })
        );
    }

    #[test]
    fn predictions_without_bytes_are_skipped() {
        let response: PredictResponse = serde_json::from_value(json!({
            "predictions": [
                { "raiFilteredReason": "filtered" },
                { "bytesBase64Encoded": "AQID", "mimeType": "image/png" }
            ]
        }))
        .unwrap();
        let synthesis = response.into_synthesis().unwrap();
        assert_eq!(synthesis.images.len(), 1);
        assert_eq!(synthesis.images[0].data, vec![1, 2, 3]);
    }
}
