//! Prompt construction for the generation and refinement calls.
//!
//! Pure functions of the request fields and the fixed vocabularies in
//! [`crate::catalog`]. Unrecognized genre/style labels fall back to the
//! defaults here; rejecting them is intake validation's job.

use crate::catalog::{ArtStyle, Genre, DEFAULT_ART_STYLE};
use crate::request::GenerationRequest;

/// Target aspect ratio, as written into prompts.
pub const ASPECT_RATIO: &str = "9:16";

/// Genre line value when the request carries no recognized genre.
pub const ANY_GENRE: &str = "Any";

const PREAMBLE: &str = "You're an AI wallpaper generator, which generates wallpaper images \
based on the values of 2 parameters, and a description field.\n\n\
The 2 parameters -\n\n\
Genre - Nature | Infrastructure | Still life | Sports | Cars\n\n\
Art style - Comics | Anime | Realistic | Hazy | Pencil\n\n";

const CONSTRAINTS: &str = "You MUST follow these guidelines while creating the image. \
1. The image must ALWAYS be in 9:16 aspect ratio, because it is to be used as a smartphone wallpaper. \
2. Never include text in your image.\n\n";

/// Instruction sent with the cropped image in the refinement call.
pub const REFINEMENT_INSTRUCTION: &str = "Refine this smartphone wallpaper. \
Adjust the composition so the main subject fits fully inside the frame and nothing important is cut off at the edges. \
Do NOT alter the aspect ratio: the output must stay 9:16 portrait, exactly like the input. \
Keep the genre, art style and colors of the input. Never include text in the image.";

/// Build the prompt for the first (or only) synthesis call.
pub fn build_generation_prompt(request: &GenerationRequest) -> String {
    let genre_line = match request.genre.as_deref().and_then(Genre::from_label) {
        Some(genre) => format!("{} ({})", genre.label(), genre.hint()),
        None => ANY_GENRE.to_string(),
    };

    let style = request
        .art_style
        .as_deref()
        .and_then(ArtStyle::from_label)
        .unwrap_or(DEFAULT_ART_STYLE);

    format!(
        "{PREAMBLE}{CONSTRAINTS}Here is the image you need to generate -\n\n\
         Genre - {genre_line}\n\
         Art style - {} ({})\n\
         Description - {}",
        style.label(),
        style.hint(),
        request.description,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(genre: Option<&str>, art_style: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            description: "a red barn".into(),
            genre: genre.map(String::from),
            art_style: art_style.map(String::from),
            user_id: None,
        }
    }

    #[test]
    fn prompt_contains_description_and_hints() {
        let prompt = build_generation_prompt(&request(Some("Nature"), Some("Realistic")));
        assert!(prompt.contains("Description - a red barn"));
        assert!(prompt.contains("Genre - Nature (natural landscape"));
        assert!(prompt.contains("Art style - Realistic (photorealistic"));
    }

    #[test]
    fn prompt_carries_technical_constraints() {
        let prompt = build_generation_prompt(&request(None, None));
        assert!(prompt.contains(ASPECT_RATIO));
        assert!(prompt.contains("Never include text"));
    }

    #[test]
    fn missing_genre_and_style_use_defaults() {
        let prompt = build_generation_prompt(&request(None, None));
        assert!(prompt.contains("Genre - Any\n"));
        assert!(prompt.contains("Art style - Realistic"));
    }

    #[test]
    fn unrecognized_labels_fall_back_instead_of_failing() {
        let prompt = build_generation_prompt(&request(Some("Space"), Some("Cubism")));
        assert!(prompt.contains("Genre - Any\n"));
        assert!(prompt.contains("Art style - Realistic"));
        assert!(!prompt.contains("Space"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let req = request(Some("Cars"), Some("Pencil"));
        assert_eq!(build_generation_prompt(&req), build_generation_prompt(&req));
    }

    #[test]
    fn refinement_instruction_pins_aspect_ratio() {
        assert!(REFINEMENT_INSTRUCTION.contains("9:16"));
        assert!(REFINEMENT_INSTRUCTION.contains("fits fully inside the frame"));
        assert!(REFINEMENT_INSTRUCTION.contains("smartphone wallpaper"));
    }
}
