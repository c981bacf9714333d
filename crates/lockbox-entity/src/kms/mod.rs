//! KMS records and encryption envelopes.

pub mod envelope;
pub mod model;

pub use envelope::{Algorithm, Envelope};
pub use model::{KmsRecord, KmsType, LEGACY_KMS_ID};
