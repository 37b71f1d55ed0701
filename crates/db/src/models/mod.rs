//! Row models and DTOs.

pub mod job;
pub mod status;
