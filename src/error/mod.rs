mod app;
mod capture;
mod replay;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use capture::CaptureError;
pub use replay::{ReplayError, ReplayFailure};
pub use validation::ValidationError;
