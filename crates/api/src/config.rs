use std::path::PathBuf;
use std::time::Duration;

use muralist_gemini::provider::{Provider, ProviderConfig};
use muralist_gemini::{api, imagen};
use muralist_pipeline::PipelineMode;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight jobs to stop (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:8081`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:8081".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
        }
    }
}

/// Image generation settings.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Remote backend and credentials.
    pub provider: ProviderConfig,
    /// Single call or generate/crop/refine.
    pub mode: PipelineMode,
    /// Time budget for each remote call.
    pub call_timeout: Duration,
    /// Root directory of the local artifact store.
    pub artifact_dir: PathBuf,
}

impl GenerationConfig {
    /// Load generation settings from environment variables.
    ///
    /// | Env Var                   | Default                                      |
    /// |---------------------------|----------------------------------------------|
    /// | `IMAGE_PROVIDER`          | `gemini` (or `imagen`)                       |
    /// | `GEMINI_API_KEY`          | required                                     |
    /// | `GEMINI_BASE_URL`         | `https://generativelanguage.googleapis.com`  |
    /// | `GEMINI_IMAGE_MODEL`      | `gemini-2.0-flash-preview-image-generation`  |
    /// | `IMAGEN_MODEL`            | `imagen-4.0-generate-001`                    |
    /// | `PIPELINE_MODE`           | `refine` (or `single`)                       |
    /// | `GENERATION_TIMEOUT_SECS` | `300`                                        |
    /// | `ARTIFACT_DIR`            | `generated_images`                           |
    ///
    /// Panics on invalid values, including `refine` with a provider that
    /// cannot take an input image.
    pub fn from_env() -> Self {
        let provider: Provider = std::env::var("IMAGE_PROVIDER")
            .unwrap_or_else(|_| "gemini".into())
            .parse()
            .unwrap_or_else(|e| panic!("IMAGE_PROVIDER: {e}"));

        let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");

        let mode: PipelineMode = std::env::var("PIPELINE_MODE")
            .unwrap_or_else(|_| "refine".into())
            .parse()
            .unwrap_or_else(|e| panic!("PIPELINE_MODE: {e}"));

        let timeout_secs: u64 = std::env::var("GENERATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("GENERATION_TIMEOUT_SECS must be a valid u64");

        let config = Self {
            provider: ProviderConfig {
                provider,
                api_key,
                base_url: std::env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| api::DEFAULT_BASE_URL.into()),
                gemini_model: std::env::var("GEMINI_IMAGE_MODEL")
                    .unwrap_or_else(|_| api::DEFAULT_MODEL.into()),
                imagen_model: std::env::var("IMAGEN_MODEL")
                    .unwrap_or_else(|_| imagen::DEFAULT_MODEL.into()),
            },
            mode,
            call_timeout: Duration::from_secs(timeout_secs),
            artifact_dir: std::env::var("ARTIFACT_DIR")
                .unwrap_or_else(|_| "generated_images".into())
                .into(),
        };

        if let Err(e) = config.check() {
            panic!("{e}");
        }
        config
    }

    /// Reject combinations the pipeline cannot run.
    pub fn check(&self) -> Result<(), String> {
        if self.mode == PipelineMode::Refine && !self.provider.provider.supports_image_input() {
            return Err(format!(
                "PIPELINE_MODE=refine needs a provider that accepts an input image; \
                 '{}' does not (use PIPELINE_MODE=single)",
                self.provider.provider.name()
            ));
        }
        if self.call_timeout.is_zero() {
            return Err("GENERATION_TIMEOUT_SECS must be greater than 0".into());
        }
        Ok(())
    }
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation(provider: Provider, mode: PipelineMode) -> GenerationConfig {
        let mut provider_config = ProviderConfig::gemini("key");
        provider_config.provider = provider;
        GenerationConfig {
            provider: provider_config,
            mode,
            call_timeout: Duration::from_secs(300),
            artifact_dir: "generated_images".into(),
        }
    }

    #[test]
    fn cors_list_drops_blanks() {
        assert_eq!(
            parse_list("http://a, ,http://b,"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }

    #[test]
    fn refine_requires_image_input_provider() {
        assert!(generation(Provider::Gemini, PipelineMode::Refine).check().is_ok());
        assert!(generation(Provider::Imagen, PipelineMode::Single).check().is_ok());
        let err = generation(Provider::Imagen, PipelineMode::Refine)
            .check()
            .unwrap_err();
        assert!(err.contains("imagen"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = generation(Provider::Gemini, PipelineMode::Single);
        config.call_timeout = Duration::ZERO;
        assert!(config.check().is_err());
    }
}
