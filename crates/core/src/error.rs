use thiserror::Error;

use crate::model::{CourseError, GateOptionsError};

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Options(#[from] GateOptionsError),
}
