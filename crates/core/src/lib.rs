//! Domain building blocks for the wallpaper generation service.
//!
//! Everything here is free of database and HTTP concerns: the closed
//! genre/style vocabularies, request validation, prompt construction, the
//! 9:16 crop, the artifact store abstraction and the image synthesis
//! capability implemented by the remote provider adapters.

pub mod catalog;
pub mod crop;
pub mod error;
pub mod prompt;
pub mod request;
pub mod storage;
pub mod synthesis;
pub mod types;
