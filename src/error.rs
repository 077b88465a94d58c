pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse stack file: {0}")]
    ParseStack(#[source] serde_yaml::Error),

    #[error("failed to serialize manifest: {0}")]
    SerializeManifest(#[source] serde_yaml::Error),

    #[error("invalid stack:\n{}", format_problems(.0))]
    InvalidStack(Vec<Problem>),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("refusing to overwrite existing file: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One validation finding, pointing at the offending declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Service name, or empty for stack-level problems.
    pub service: String,
    /// Field path such as `tls.email` or `basic_auth`.
    pub field: String,
    pub message: String,
}

impl Problem {
    #[must_use]
    pub fn stack(field: &str, message: impl Into<String>) -> Self {
        Self {
            service: String::new(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn service(service: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            service: service.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.service.is_empty() {
            write!(f, "{}: {}", self.field, self.message)
        } else {
            write!(
                f,
                "service '{}': {}: {}",
                self.service, self.field, self.message
            )
        }
    }
}

fn format_problems(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(|p| format!(" - {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}
