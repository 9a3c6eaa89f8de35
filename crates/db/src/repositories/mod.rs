//! Repositories, one per table family. All are stateless unit structs.

pub mod bib_number_repo;
pub mod credit_repo;
pub mod event_repo;
pub mod photo_face_repo;
pub mod photo_repo;
pub mod user_repo;

pub use bib_number_repo::BibNumberRepo;
pub use credit_repo::{CreditRepo, DeductOutcome, RefundOutcome};
pub use event_repo::EventRepo;
pub use photo_face_repo::PhotoFaceRepo;
pub use photo_repo::PhotoRepo;
pub use user_repo::UserRepo;
