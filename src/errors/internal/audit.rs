use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to write audit entry: {0}")]
    WriteFailed(String),

    #[error("Failed to serialize audit detail: {0}")]
    SerializationFailed(String),
}
