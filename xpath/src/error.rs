use crate::eval;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot parse `{expr}`, unreduced stack: {stack}")]
    Parse { expr: String, stack: String },
    #[error("grammar error: {0}")]
    Grammar(String),
    #[error(transparent)]
    Eval(#[from] eval::error::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
