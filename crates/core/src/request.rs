//! Wallpaper generation request and its intake validation.

use serde::{Deserialize, Serialize};

use crate::catalog::{validate_art_style, validate_genre};
use crate::error::CoreError;

/// Maximum accepted description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Request fields captured at intake. Immutable once the job exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Missing is treated like empty, so it fails validation rather than
    /// deserialization.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub art_style: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl GenerationRequest {
    /// Validate and normalize the request.
    ///
    /// - `description` is trimmed and must be non-empty and at most
    ///   [`MAX_DESCRIPTION_CHARS`] characters.
    /// - `genre` and `art_style`, when present, must be members of their
    ///   closed sets.
    /// - Blank optional fields are treated as absent.
    pub fn validate(self) -> Result<Self, CoreError> {
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(CoreError::Validation(
                "Description must not be empty".into(),
            ));
        }
        let chars = description.chars().count();
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(CoreError::Validation(format!(
                "Description is {chars} characters, maximum is {MAX_DESCRIPTION_CHARS}"
            )));
        }

        let genre = non_blank(self.genre);
        if let Some(g) = &genre {
            validate_genre(g)?;
        }

        let art_style = non_blank(self.art_style);
        if let Some(s) = &art_style {
            validate_art_style(s)?;
        }

        Ok(Self {
            description,
            genre,
            art_style,
            user_id: non_blank(self.user_id),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
