pub mod json_record_repository;
pub mod paths;
pub mod secret_service;
pub mod storage;

pub use crate::json_record_repository::{JsonPersonaRecordRepository, subject_id_from_name};
pub use crate::paths::MimicPaths;
pub use crate::secret_service::SecretServiceImpl;
pub use crate::storage::ConfigStorage;
