//! Hard failures surfaced to callers.
//!
//! Input anomalies (types missing from the index, malformed constraint values, argument-count
//! mismatches) are recovered where they occur and reported through `tracing`; they never show up
//! here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// A registry lookup for a type that was never registered.
    #[error("no schema registered for type `{ty}`")]
    NotRegistered { ty: String },

    #[error("invalid type signature `{signature}`: {reason}")]
    Signature { signature: String, reason: String },

    #[error("at JSON path {path} → {message}")]
    Decode { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

impl SchemaError {
    pub fn signature<S: ToString, R: ToString>(signature: S, reason: R) -> Self {
        SchemaError::Signature { signature: signature.to_string(), reason: reason.to_string() }
    }

    pub fn not_registered<T: ToString>(ty: T) -> Self {
        SchemaError::NotRegistered { ty: ty.to_string() }
    }
}
