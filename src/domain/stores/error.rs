use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    /// A reference must stay inside the referencing row's repository.
    SameScope,
    Acyclic,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintKind::Unique => write!(f, "Unique"),
            ConstraintKind::ForeignKey => write!(f, "Foreign key"),
            ConstraintKind::SameScope => write!(f, "Same-repository"),
            ConstraintKind::Acyclic => write!(f, "Acyclic"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{kind} constraint `{constraint}` failed: {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        constraint: String,
        message: String,
    },
    #[error("{model} not found: {detail}")]
    NotFound { model: &'static str, detail: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Initialization error: {0}")]
    Initialization(String),
    #[error("Transaction error: {0}")]
    Transaction(String),
    #[error("Unknown request error: {0}")]
    Unknown(String),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    pub fn constraint(
        kind: ConstraintKind,
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StoreError::ConstraintViolation {
            kind,
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Name of the violated constraint, if this is a constraint violation.
    pub fn violated_constraint(&self) -> Option<(ConstraintKind, &str)> {
        match self {
            StoreError::ConstraintViolation {
                kind, constraint, ..
            } => Some((*kind, constraint.as_str())),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
