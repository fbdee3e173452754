#![forbid(unsafe_code)]

pub mod json;
pub mod repository;

pub use json::{JsonBankRepository, LoadReport, parse_bank};
pub use repository::{InMemoryRepository, QuestionBankRepository, StorageError};
