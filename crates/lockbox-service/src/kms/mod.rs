//! KMS record administration.

pub mod service;

pub use service::{CreateKmsRequest, KmsService, UpdateKmsRequest};
