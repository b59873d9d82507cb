// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Cannot parse current_batch value: {0:?}")]
    InvalidBatchPointer(String),

    #[error("Image id {0:#x} cannot be advanced")]
    ImageIdOverflow(u32),
}

pub type Result<T> = std::result::Result<T, DomainError>;
