pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod notify;
pub mod session;
pub mod store;
pub mod upload;

pub use engine::TaskEngine;
pub use error::{EngineError, StoreError};
