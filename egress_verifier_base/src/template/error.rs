// src/template/error.rs

/// Template validation and expansion errors
///
/// All of these are fatal for a verification run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("Required template variable '{variable}' was not supplied")]
    MissingRequiredVariable { variable: String },

    #[error("Template variable '{variable}' is reserved and cannot be supplied by the caller")]
    ReservedVariableSupplied { variable: String },

    #[error("Template variable '{variable}' has invalid duration '{value}': {reason}")]
    InvalidDuration {
        variable: String,
        value: String,
        reason: String,
    },

    #[error("Template variable '{variable}' has invalid count '{value}': {reason}")]
    InvalidCount {
        variable: String,
        value: String,
        reason: String,
    },

    #[error("Malformed template directive: {reason}")]
    MalformedDirective { reason: String },
}

impl TemplateError {
    /// Name of the variable the error refers to, if any
    pub fn variable(&self) -> Option<&str> {
        match self {
            TemplateError::MissingRequiredVariable { variable }
            | TemplateError::ReservedVariableSupplied { variable }
            | TemplateError::InvalidDuration { variable, .. }
            | TemplateError::InvalidCount { variable, .. } => Some(variable),
            TemplateError::MalformedDirective { .. } => None,
        }
    }
}
