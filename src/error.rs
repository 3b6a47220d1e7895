use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("no route to the destination transport")]
    ErrNoRoute,
    #[error("packet exceeds the path MTU and the route cannot segment")]
    ErrGsoUnsupported,
    #[error("AUTH chunk and following chunk cannot fit within the path MTU")]
    ErrAuthChunkTooBig,
    #[error("authentication key rejected by the MAC primitive")]
    ErrAuthKeyInvalid,
    #[error("chunk value is too long for the chunk length field")]
    ErrChunkValueTooLong,
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        io::Error::new(io::ErrorKind::Other, error.to_string())
    }
}
