use thiserror::Error;

/// Every way a call into the file system core can fail.
///
/// All of these collapse to `-1` at the `-1`/non-negative API surface (see
/// [`crate::mount::api`]); the typed form exists for callers that want to
/// distinguish failure modes (and for the diagnostic log line emitted for
/// each one).
#[derive(Error, Debug)]
pub enum FsError {
    #[error("no disk is open")]
    NoDisk,

    #[error("superblock is corrupt: {0}")]
    CorruptSuperblock(String),

    #[error("no file system is mounted")]
    NotMounted,

    #[error("operation would conflict with an open descriptor")]
    Busy,

    #[error("invalid file name")]
    InvalidName,

    #[error("file already exists")]
    Exists,

    #[error("file not found")]
    NotFound,

    #[error("root directory is full")]
    DirFull,

    #[error("no free file descriptor")]
    FdExhausted,

    #[error("bad file descriptor")]
    BadFd,

    #[error("offset out of bounds")]
    OutOfBounds,

    #[error("no free block available")]
    NoSpace,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
