//! Remote image synthesis clients for Google's generative APIs.
//!
//! Two backends implement [`muralist_core::synthesis::ImageSynthesizer`]:
//! [`GeminiApi`] (`generateContent`, accepts an input image) and
//! [`ImagenApi`] (`predict`, text-to-image only). [`Provider`] selects one
//! from configuration.

pub mod api;
pub mod imagen;
pub mod messages;
pub mod provider;

pub use api::GeminiApi;
pub use imagen::ImagenApi;
pub use provider::{Provider, ProviderConfig};
