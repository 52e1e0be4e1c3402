use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Required configuration fields are absent. Carries every missing field
    /// name so the consuming layer can render them in one message.
    MissingConfig { missing: Vec<&'static str> },
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::MissingConfig { .. } => "firebase/missing-config",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingConfig { missing } => {
                write!(
                    f,
                    "Missing Firebase configuration values: {} ({})",
                    missing.join(", "),
                    self.code_str()
                )
            }
        }
    }
}

impl std::error::Error for AppError {}
