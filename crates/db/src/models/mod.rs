//! Row models and DTOs, one module per table family.

pub mod bib_number;
pub mod credit;
pub mod event;
pub mod photo;
pub mod photo_face;
pub mod user;
