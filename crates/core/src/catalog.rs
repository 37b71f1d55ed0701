//! Closed vocabularies for wallpaper genre and art style.
//!
//! Each value maps to a fixed descriptive phrase used as a prompt hint.
//! The labels are the exact strings clients send and the ledger stores.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Genre
// ---------------------------------------------------------------------------

/// Wallpaper subject genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Genre {
    Nature,
    Infrastructure,
    StillLife,
    Sports,
    Cars,
}

/// All genres, in the order they are presented to clients.
pub const ALL_GENRES: [Genre; 5] = [
    Genre::Nature,
    Genre::Infrastructure,
    Genre::StillLife,
    Genre::Sports,
    Genre::Cars,
];

impl Genre {
    /// Parse from the wire/database label. Labels are case-sensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        ALL_GENRES.into_iter().find(|g| g.label() == label)
    }

    /// Label as sent by clients and stored in the `genre` column.
    pub fn label(self) -> &'static str {
        match self {
            Self::Nature => "Nature",
            Self::Infrastructure => "Infrastructure",
            Self::StillLife => "Still life",
            Self::Sports => "Sports",
            Self::Cars => "Cars",
        }
    }

    /// Descriptive phrase appended to the prompt.
    pub fn hint(self) -> &'static str {
        match self {
            Self::Nature => "natural landscape, outdoor scenery, organic elements",
            Self::Infrastructure => "architectural, urban environment, buildings and structures",
            Self::StillLife => "still life composition, objects arrangement, indoor setting",
            Self::Sports => "dynamic sports scene, athletic activity, motion and energy",
            Self::Cars => "automotive, vehicles, transportation, sleek design",
        }
    }
}

/// Validate that `label` names one of the five genres.
pub fn validate_genre(label: &str) -> Result<Genre, CoreError> {
    Genre::from_label(label).ok_or_else(|| {
        let valid: Vec<&str> = ALL_GENRES.iter().map(|g| g.label()).collect();
        CoreError::Validation(format!(
            "Invalid genre '{label}'. Must be one of: {valid:?}"
        ))
    })
}

// ---------------------------------------------------------------------------
// Art style
// ---------------------------------------------------------------------------

/// Rendering style of the wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtStyle {
    Comics,
    Anime,
    Realistic,
    Hazy,
    Pencil,
}

/// All art styles, in the order they are presented to clients.
pub const ALL_ART_STYLES: [ArtStyle; 5] = [
    ArtStyle::Comics,
    ArtStyle::Anime,
    ArtStyle::Realistic,
    ArtStyle::Hazy,
    ArtStyle::Pencil,
];

/// Style used in the prompt when the request carries none.
pub const DEFAULT_ART_STYLE: ArtStyle = ArtStyle::Realistic;

impl ArtStyle {
    /// Parse from the wire/database label. Labels are case-sensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        ALL_ART_STYLES.into_iter().find(|s| s.label() == label)
    }

    /// Label as sent by clients and stored in the `art_style` column.
    pub fn label(self) -> &'static str {
        match self {
            Self::Comics => "Comics",
            Self::Anime => "Anime",
            Self::Realistic => "Realistic",
            Self::Hazy => "Hazy",
            Self::Pencil => "Pencil",
        }
    }

    /// Descriptive phrase appended to the prompt.
    pub fn hint(self) -> &'static str {
        match self {
            Self::Comics => "comic book style, bold lines, vibrant colors, graphic novel aesthetic",
            Self::Anime => "anime art style, manga influence, cel-shading, Japanese animation",
            Self::Realistic => "photorealistic, high detail, natural lighting, lifelike",
            Self::Hazy => "soft focus, dreamy atmosphere, muted colors, ethereal mood",
            Self::Pencil => "pencil drawing, sketch style, grayscale, hand-drawn aesthetic",
        }
    }
}

/// Validate that `label` names one of the five art styles.
pub fn validate_art_style(label: &str) -> Result<ArtStyle, CoreError> {
    ArtStyle::from_label(label).ok_or_else(|| {
        let valid: Vec<&str> = ALL_ART_STYLES.iter().map(|s| s.label()).collect();
        CoreError::Validation(format!(
            "Invalid art style '{label}'. Must be one of: {valid:?}"
        ))
    })
}
