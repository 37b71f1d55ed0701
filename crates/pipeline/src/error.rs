//! Pipeline failure taxonomy.
//!
//! The `Display` text of a [`PipelineError`] becomes the failed job's
//! `error_message`, so messages are written for end users.

use std::fmt;

use muralist_core::crop::CropError;
use muralist_core::storage::StorageError;
use muralist_core::synthesis::SynthesisError;

/// Which synthesis call a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The first (or only) call, from the text prompt.
    Generation,
    /// The second call, refining the cropped image.
    Refinement,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Refinement => "refinement",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The remote call failed, returned an error status, or timed out.
    #[error("{source} ({stage})")]
    RemoteCall {
        stage: Stage,
        #[source]
        source: SynthesisError,
    },

    /// The call succeeded but its response carried no image part.
    #[error("No image was generated by {provider} ({stage})")]
    NoImageReturned {
        provider: &'static str,
        stage: Stage,
    },

    /// The generated image could not be decoded, cropped, or re-encoded.
    #[error("Image processing failed: {0}")]
    Image(#[from] CropError),

    /// The blocking image task panicked or was aborted.
    #[error("Image processing task failed: {0}")]
    ImageTask(#[from] tokio::task::JoinError),

    /// Writing an artifact failed.
    #[error("Failed to store artifact: {0}")]
    Persistence(#[from] StorageError),
}
