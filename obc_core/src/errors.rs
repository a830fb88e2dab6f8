// thiserror-based error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcsError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("agenda is full")]
    AgendaFull,
    #[error("replay rejected: ts_sent already seen")]
    ReplayRejected,
    #[error("hardware contract error: {0}")]
    Hardware(String),
    #[error("filesystem error: {0}")]
    FileSystem(String),
    #[error("other: {0}")]
    Other(String),
}
