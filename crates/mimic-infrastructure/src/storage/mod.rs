pub mod atomic;
pub mod config_storage;

pub use atomic::{write_atomic, write_atomic_async};
pub use config_storage::ConfigStorage;
