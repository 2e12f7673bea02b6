use thiserror::Error;

use crate::{authorization::Action, data::EntityKind, gateway::GatewayError};

/// Failures surfaced by the core to its caller. None of them are retried; the
/// caller decides what to show and keeps its previous state.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Data access failed: {0}")]
    DataAccess(#[from] GatewayError),
    #[error("Not authorized to {action} this {entity}.")]
    NotAuthorized { action: Action, entity: EntityKind },
    #[error("The {entity} with ID {id} does not exist.")]
    NotFound { entity: EntityKind, id: u64 },
    #[error("The {field} field is required.")]
    Validation { field: &'static str },
    #[error("{0}")]
    InvalidOperation(&'static str),
}

impl CoreError {
    /// Converts a gateway failure for a specific row, reporting a missing row
    /// or a dangling reference as `NotFound`.
    pub(crate) fn for_row(err: GatewayError, entity: EntityKind, id: u64) -> Self {
        match err {
            GatewayError::RowNotFound(_) => CoreError::NotFound { entity, id },
            GatewayError::ForeignKeyViolation(kind) => CoreError::NotFound { entity: kind, id },
            other => CoreError::DataAccess(other),
        }
    }

    /// A short message fit for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::DataAccess(_) => "Failed to reach the server. Please try again.".to_string(),
            CoreError::NotAuthorized { action, entity } => {
                format!("You are not allowed to {action} this {entity}.")
            }
            CoreError::NotFound { entity, .. } => format!("That {entity} no longer exists."),
            CoreError::Validation { field } => format!("Please fill in the {field}."),
            CoreError::InvalidOperation(reason) => reason.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn row_errors_become_not_found() {
        let err = CoreError::for_row(GatewayError::RowNotFound(EntityKind::Activity), EntityKind::Activity, 4);
        assert!(matches!(err, CoreError::NotFound { entity: EntityKind::Activity, id: 4 }));

        let err = CoreError::for_row(
            GatewayError::ForeignKeyViolation(EntityKind::Category),
            EntityKind::Activity,
            9,
        );
        assert!(matches!(err, CoreError::NotFound { entity: EntityKind::Category, id: 9 }));

        let err = CoreError::for_row(GatewayError::Unreachable, EntityKind::Activity, 4);
        assert!(matches!(err, CoreError::DataAccess(GatewayError::Unreachable)));
    }

    #[test]
    fn user_messages() {
        let err = CoreError::NotAuthorized { action: Action::Delete, entity: EntityKind::Category };
        assert_eq!(err.user_message(), "You are not allowed to delete this category.");
        assert_eq!(CoreError::Validation { field: "name" }.user_message(), "Please fill in the name.");
    }
}
