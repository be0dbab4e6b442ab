use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid identifier {0:?}. Only ASCII letters, digits and '_' are allowed")]
    InvalidIdentifier(String),
}

pub fn validate_required(name: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingParameter(name.to_string()));
    }
    Ok(())
}

/// Table and column names are spliced into SQL text, so only plain
/// identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');

    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidIdentifier(name.to_string()));
    }

    Ok(())
}
