use thiserror::Error;

pub type WcsResult<T> = Result<T, WcsError>;

#[derive(Debug, Error)]
pub enum WcsError {
    #[error("Missing required WCS keyword: {keyword}")]
    MissingKeyword { keyword: String },

    #[error("Invalid WCS keyword '{keyword}': {message}")]
    InvalidKeyword { keyword: String, message: String },

    #[error("Unsupported projection: {code}")]
    UnsupportedProjection { code: String },

    #[error("Singularity in transformation: {message}")]
    Singularity { message: String },

    #[error("Coordinate out of bounds: {message}")]
    OutOfBounds { message: String },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Non-invertible matrix (determinant = {determinant})")]
    NonInvertibleMatrix { determinant: f64 },

    #[error("Non-finite result in {operation}")]
    NonFinite { operation: &'static str },

    #[error("Malformed header: {message}")]
    MalformedHeader { message: String },

    #[error("Header JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl WcsError {
    pub fn missing_keyword(keyword: impl Into<String>) -> Self {
        Self::MissingKeyword {
            keyword: keyword.into(),
        }
    }

    pub fn invalid_keyword(keyword: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKeyword {
            keyword: keyword.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_projection(code: impl Into<String>) -> Self {
        Self::UnsupportedProjection { code: code.into() }
    }

    pub fn singularity(message: impl Into<String>) -> Self {
        Self::Singularity {
            message: message.into(),
        }
    }

    pub fn out_of_bounds(message: impl Into<String>) -> Self {
        Self::OutOfBounds {
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn non_invertible_matrix(determinant: f64) -> Self {
        Self::NonInvertibleMatrix { determinant }
    }

    pub fn non_finite(operation: &'static str) -> Self {
        Self::NonFinite { operation }
    }

    pub fn malformed_header(message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keyword() {
        let err = WcsError::missing_keyword("CRPIX1");
        assert!(err.to_string().contains("CRPIX1"));
    }

    #[test]
    fn test_invalid_keyword() {
        let err = WcsError::invalid_keyword("CTYPE1", "no projection code");
        assert!(err.to_string().contains("CTYPE1"));
        assert!(err.to_string().contains("no projection code"));
    }

    #[test]
    fn test_unsupported_projection() {
        let err = WcsError::unsupported_projection("AIT");
        assert!(err.to_string().contains("AIT"));
    }

    #[test]
    fn test_out_of_bounds() {
        let err = WcsError::out_of_bounds("outside SIN disk");
        assert!(err.to_string().contains("outside SIN disk"));
    }

    #[test]
    fn test_non_finite() {
        let err = WcsError::non_finite("TAN deprojection");
        assert!(err.to_string().contains("TAN deprojection"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: WcsError = parse.unwrap_err().into();
        assert!(matches!(err, WcsError::Json { .. }));
    }
}
