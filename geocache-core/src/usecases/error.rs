use crate::{entities::InvalidCoordinate, repositories};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinate),
    #[error(transparent)]
    Repo(#[from] repositories::Error),
}
