use thiserror::Error;

#[derive(Error, Debug)]
pub enum BranchboardError {
    #[error("config error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("github error: {0}")]
    GitHub(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for BranchboardError {
    fn from(e: octocrab::Error) -> Self {
        BranchboardError::GitHub(e.to_string())
    }
}

impl BranchboardError {
    /// Exit status used when the error reaches the process boundary.
    pub fn exit_code(&self) -> u8 {
        match self {
            BranchboardError::Config(_) => 2,
            BranchboardError::Auth(_) => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, BranchboardError>;
