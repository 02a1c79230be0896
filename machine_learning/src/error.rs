use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    EmptyDataset,
    InvalidSplit {
        test_fraction: f64,
        len: usize,
    },
    NonFinite {
        column: String,
    },
    NotFitted {
        what: &'static str,
    },
    NoCandidates,
    Malformed {
        what: &'static str,
        reason: String,
    },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::EmptyDataset => write!(f, "Cannot fit on an empty dataset"),
            MlErr::InvalidSplit { test_fraction, len } => write!(
                f,
                "A test fraction of {test_fraction} leaves an empty side when splitting {len} rows"
            ),
            MlErr::NonFinite { column } => {
                write!(f, "Column {column} holds a value that is not a finite number")
            }
            MlErr::NotFitted { what } => write!(f, "The {what} was used before being fitted"),
            MlErr::NoCandidates => write!(f, "There are no candidate models to train"),
            MlErr::Malformed { what, reason } => write!(f, "The {what} is malformed: {reason}"),
        }
    }
}

impl Error for MlErr {}
