use std::{error::Error, fmt};

use machine_learning::MlErr;

/// The service's result type.
pub type Result<T> = std::result::Result<T, ServiceErr>;

/// Failures surfaced to the callers of the service.
#[derive(Debug)]
pub enum ServiceErr {
    /// The request lacks some of the required fields.
    Validation { missing: Vec<String> },
    /// A required field holds a value of the wrong type.
    InvalidValue { field: &'static str, reason: String },
    /// The model hasn't been loaded or trained yet.
    NotReady,
    /// The model failed to produce a prediction.
    Prediction(MlErr),
    /// The model couldn't be trained.
    Training(MlErr),
}

impl fmt::Display for ServiceErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { missing } => {
                let quoted: Vec<String> = missing.iter().map(|m| format!("'{m}'")).collect();
                write!(f, "Missing required fields: [{}]", quoted.join(", "))
            }
            Self::InvalidValue { field, reason } => write!(f, "Invalid value for {field}: {reason}"),
            Self::NotReady => write!(f, "Model is not loaded"),
            Self::Prediction(e) => write!(f, "Prediction failed: {e}"),
            Self::Training(e) => write!(f, "Training failed: {e}"),
        }
    }
}

impl Error for ServiceErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Prediction(e) | Self::Training(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_the_fields() {
        let err = ServiceErr::Validation {
            missing: vec!["Area".into(), "PH".into()],
        };
        assert_eq!(err.to_string(), "Missing required fields: ['Area', 'PH']");
    }
}
