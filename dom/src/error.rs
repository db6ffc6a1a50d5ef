#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("dom exception: {0:?}")]
    Dom(DomException),
    #[error("xml parse error: {0}")]
    Parse(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DomException {
    HierarchyRequestErr,
    NotFoundErr,
    InvalidNodeTypeErr,
    InuseErr,
}

impl From<DomException> for Error {
    fn from(value: DomException) -> Self {
        Error::Dom(value)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(value: roxmltree::Error) -> Self {
        Error::Parse(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
