use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListError {
    #[error("List file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ListError>;
