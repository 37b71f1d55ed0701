//! The generation pipeline itself.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use muralist_core::crop::{crop_to_portrait, to_png, CropError};
use muralist_core::prompt::{build_generation_prompt, REFINEMENT_INSTRUCTION};
use muralist_core::request::GenerationRequest;
use muralist_core::storage::{ArtifactKind, ArtifactRef, ArtifactStore};
use muralist_core::synthesis::{ImagePart, ImageSynthesizer, SynthesisError};
use muralist_core::types::JobId;

use crate::error::{PipelineError, Stage};
use crate::progress::{self, ProgressSink};

/// Default per-call time budget.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// How many synthesis calls a job makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Generate, crop to 9:16, then refine the crop.
    #[default]
    Refine,
    /// One call; its image is the final artifact.
    Single,
}

impl PipelineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refine => "refine",
            Self::Single => "single",
        }
    }
}

impl FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "refine" => Ok(Self::Refine),
            "single" => Ok(Self::Single),
            other => Err(format!(
                "unknown pipeline mode '{other}' (expected 'refine' or 'single')"
            )),
        }
    }
}

/// Runs one job's synthesis calls and stores the resulting artifacts.
///
/// Stateless between runs; one instance is shared by every job task.
pub struct GenerationPipeline {
    synthesizer: Arc<dyn ImageSynthesizer>,
    store: Arc<dyn ArtifactStore>,
    mode: PipelineMode,
    call_timeout: Duration,
}

impl GenerationPipeline {
    pub fn new(
        synthesizer: Arc<dyn ImageSynthesizer>,
        store: Arc<dyn ArtifactStore>,
        mode: PipelineMode,
    ) -> Self {
        Self {
            synthesizer,
            store,
            mode,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Produce and store the final artifact for `job_id`.
    ///
    /// Reports checkpoints 10, 45, (65,) 90 to `sink`; never 100. On error
    /// nothing is stored under [`ArtifactKind::Final`], but intermediate
    /// artifacts already written stay in the store.
    pub async fn run(
        &self,
        job_id: JobId,
        request: &GenerationRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ArtifactRef, PipelineError> {
        checkpoint(sink, progress::STARTED).await;

        let prompt = build_generation_prompt(request);
        let generated = self.call(Stage::Generation, &prompt, None).await?;
        let generated = off_runtime(move || to_png(&generated.data)).await?;

        match self.mode {
            PipelineMode::Single => {
                let final_ref = self.store.put(job_id, ArtifactKind::Final, &generated).await?;
                checkpoint(sink, progress::FINAL_STORED).await;
                Ok(final_ref)
            }
            PipelineMode::Refine => {
                self.store.put(job_id, ArtifactKind::Initial, &generated).await?;
                checkpoint(sink, progress::INITIAL_STORED).await;

                let cropped = off_runtime(move || crop_to_portrait(&generated)).await?;
                if let Some(window) = cropped.window {
                    tracing::debug!(
                        job_id = %job_id,
                        left = window.left,
                        width = window.width,
                        height = window.height,
                        "Cropped initial image",
                    );
                }
                self.store.put(job_id, ArtifactKind::Cropped, &cropped.bytes).await?;
                checkpoint(sink, progress::CROPPED).await;

                let input = ImagePart {
                    mime_type: "image/png".to_string(),
                    data: cropped.bytes,
                };
                let refined = self
                    .call(Stage::Refinement, REFINEMENT_INSTRUCTION, Some(&input))
                    .await?;
                let refined = off_runtime(move || to_png(&refined.data)).await?;

                let final_ref = self.store.put(job_id, ArtifactKind::Final, &refined).await?;
                checkpoint(sink, progress::FINAL_STORED).await;
                Ok(final_ref)
            }
        }
    }

    /// One bounded synthesis call, reduced to its first image part.
    async fn call(
        &self,
        stage: Stage,
        prompt: &str,
        input: Option<&ImagePart>,
    ) -> Result<ImagePart, PipelineError> {
        let provider = self.synthesizer.name();
        let synthesis = tokio::time::timeout(
            self.call_timeout,
            self.synthesizer.synthesize(prompt, input),
        )
        .await
        .map_err(|_| SynthesisError::Timeout {
            provider,
            after: self.call_timeout,
        })
        .and_then(|result| result)
        .map_err(|source| PipelineError::RemoteCall { stage, source })?;

        if let Some(text) = synthesis.text() {
            tracing::debug!(provider, stage = %stage, text = %text, "Model text response");
        }

        if synthesis.images.len() > 1 {
            tracing::warn!(
                provider,
                stage = %stage,
                images = synthesis.images.len(),
                "Expected one image part, using the first",
            );
        }

        synthesis
            .into_first_image()
            .ok_or(PipelineError::NoImageReturned { provider, stage })
    }
}

/// Run CPU-bound image work on the blocking pool.
async fn off_runtime<T, F>(work: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> Result<T, CropError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

async fn checkpoint(sink: &dyn ProgressSink, percent: u8) {
    sink.report(progress::clamp(percent)).await;
}
