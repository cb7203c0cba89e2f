use super::{CaptureError, ReplayError, ValidationError};

impl From<&'static str> for ValidationError {
    fn from(message: &'static str) -> Self {
        ValidationError::TestExpectation { message }
    }
}

impl From<String> for ValidationError {
    fn from(value: String) -> Self {
        ValidationError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for CaptureError {
    fn from(message: &'static str) -> Self {
        CaptureError::TestExpectation { message }
    }
}

impl From<String> for CaptureError {
    fn from(value: String) -> Self {
        CaptureError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for ReplayError {
    fn from(message: &'static str) -> Self {
        ReplayError::TestExpectation { message }
    }
}

impl From<String> for ReplayError {
    fn from(value: String) -> Self {
        ReplayError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}
