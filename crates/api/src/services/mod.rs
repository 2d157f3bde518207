pub mod course;
pub mod error;
pub mod upload;

pub use error::ServiceError;
