use xml_xpath::eval;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    XPath(#[from] xml_xpath::error::Error),
    #[error("invalid sort data-type: {0}")]
    InvalidDataType(String),
    #[error("invalid sort order: {0}")]
    InvalidOrder(String),
}

impl From<eval::error::Error> for Error {
    fn from(value: eval::error::Error) -> Self {
        Error::XPath(value.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
