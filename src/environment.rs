//! Environment classification: every routing and hardening decision
//! downstream keys off this single value.

use crate::stack::Stack;

/// Deployment environment of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    /// Classify a stack. The explicit `environment` field wins
    /// (case-insensitive); otherwise the domain shape decides:
    /// `localhost`, an empty domain, or a `.local`/`.localhost`
    /// suffix mean local development. Total over all inputs.
    #[must_use]
    pub fn resolve(stack: &Stack) -> Self {
        if let Some(explicit) = &stack.environment {
            match explicit.to_ascii_lowercase().as_str() {
                "local" | "development" | "dev" => return Self::Local,
                "production" | "prod" => return Self::Production,
                _ => {}
            }
        }

        let domain = stack.domain.as_str();
        if domain.is_empty()
            || domain == "localhost"
            || domain.ends_with(".local")
            || domain.ends_with(".localhost")
        {
            Self::Local
        } else {
            Self::Production
        }
    }

    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Local)
    }

    /// Default router entry point for this environment.
    #[must_use]
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::Local => "web",
            Self::Production => "websecure",
        }
    }
}
