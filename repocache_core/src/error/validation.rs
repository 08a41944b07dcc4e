//! Validation related error types

use thiserror::Error;

/// Caller contract violations and configuration errors
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Invalid input parameter
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Two registered methods resolve to the same accessor name
    #[error(
        "Conflict: the method \"{method}\" is already registered for {owner}. \
         Overloaded methods need a distinct alias, e.g. alias(\"{method}_2\")"
    )]
    DuplicateMethod { owner: String, method: String },

    /// Two registered methods derive the same cache identity
    #[error(
        "Conflict: the cache identity \"{identity}\" of {owner}::{method} is already taken. \
         Give one of the methods an alias"
    )]
    DuplicateIdentity {
        owner: String,
        method: String,
        identity: String,
    },

    /// Lookup of a method that was never registered
    #[error("No cached method \"{method}\" registered for {owner}")]
    UnknownMethod { owner: String, method: String },
}

impl ValidationError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: &str) -> Self {
        Self::InvalidConfiguration {
            message: message.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, reason: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }

    /// Create a duplicate accessor error
    pub fn duplicate_method(owner: &str, method: &str) -> Self {
        Self::DuplicateMethod {
            owner: owner.to_string(),
            method: method.to_string(),
        }
    }

    /// Create a duplicate identity error
    pub fn duplicate_identity(owner: &str, method: &str, identity: &str) -> Self {
        Self::DuplicateIdentity {
            owner: owner.to_string(),
            method: method.to_string(),
            identity: identity.to_string(),
        }
    }

    /// Create an unknown method error
    pub fn unknown_method(owner: &str, method: &str) -> Self {
        Self::UnknownMethod {
            owner: owner.to_string(),
            method: method.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_error() {
        let error = ValidationError::invalid_configuration("worker_threads must be at least 1");
        assert!(error.to_string().contains("Invalid configuration"));
        assert!(error.to_string().contains("worker_threads"));
    }

    #[test]
    fn test_invalid_parameter_error() {
        let error = ValidationError::invalid_parameter("base_name", "must not be empty");
        assert!(error.to_string().contains("Invalid parameter"));
        assert!(error.to_string().contains("base_name"));
        assert!(error.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_duplicate_identity_error() {
        let error = ValidationError::duplicate_identity("Test", "getFoo", "Test_getFoo");
        assert!(error.to_string().contains("Test_getFoo"));
        assert!(error.to_string().contains("alias"));
    }

    #[test]
    fn test_unknown_method_error() {
        let error = ValidationError::unknown_method("Test", "getBaz");
        assert!(error.to_string().contains("getBaz"));
        assert!(error.to_string().contains("Test"));
    }
}
