//! Errors raised when a field is assigned or parsed with a value the
//! blueprint format (or the entity's prototype) does not accept.

use crate::kind::EntityKind;

/// Errors from entity, signal, and condition validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DraftError {
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("unknown item '{0}'")]
    UnknownItem(String),

    #[error("unknown fluid '{0}'")]
    UnknownFluid(String),

    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),

    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("'{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("index {index} out of bounds for '{field}' (capacity {capacity})")]
    IndexOutOfBounds {
        field: String,
        index: usize,
        capacity: usize,
    },

    /// The entity kind has no such field group.
    #[error("{kind} entities do not support '{field}'")]
    Unsupported { kind: EntityKind, field: String },

    #[error("direction {direction} is not valid for {kind} entities")]
    InvalidDirection { kind: EntityKind, direction: u8 },

    #[error("recipe '{recipe}' cannot be crafted in '{entity}'")]
    RecipeNotAllowed { recipe: String, entity: String },

    /// A pure virtual signal used where the game forbids it.
    #[error("signal '{signal}' cannot be used as {position}")]
    InvalidSignalUse {
        signal: String,
        position: &'static str,
    },
}

impl DraftError {
    /// Shorthand for [`DraftError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DraftError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`DraftError::WrongType`].
    pub fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        DraftError::WrongType {
            field: field.into(),
            expected,
        }
    }

    /// Shorthand for [`DraftError::Unsupported`].
    pub fn unsupported(kind: EntityKind, field: impl Into<String>) -> Self {
        DraftError::Unsupported {
            kind,
            field: field.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        let err = DraftError::invalid("bar", "exceeds inventory size 48");
        assert_eq!(
            err.to_string(),
            "invalid value for 'bar': exceeds inventory size 48"
        );

        let err = DraftError::unsupported(EntityKind::Pipe, "circuit_condition");
        assert_eq!(
            err.to_string(),
            "pipe entities do not support 'circuit_condition'"
        );
    }

    #[test]
    fn out_of_bounds_message() {
        let err = DraftError::IndexOutOfBounds {
            field: "filters".into(),
            index: 5,
            capacity: 5,
        };
        assert!(err.to_string().contains("capacity 5"));
    }
}
