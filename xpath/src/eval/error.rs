#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a node-set: {0}")]
    NotNodeSet(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("invalid argument count: {0}")]
    InvalidArgumentCount(String),
    #[error("unknown variable: ${0}")]
    UnknownVariable(String),
    #[error("node-set too large: {0}")]
    TooLarge(String),
}

pub type Result<T> = std::result::Result<T, Error>;
