use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::domain::stores::{ConstraintKind, StoreError};

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                let constraint = info.constraint_name().unwrap_or("unknown").to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => {
                        StoreError::constraint(ConstraintKind::Unique, constraint, message)
                    }
                    DatabaseErrorKind::ForeignKeyViolation => {
                        StoreError::constraint(ConstraintKind::ForeignKey, constraint, message)
                    }
                    DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
                        StoreError::Validation(message)
                    }
                    DatabaseErrorKind::SerializationFailure
                    | DatabaseErrorKind::ReadOnlyTransaction => StoreError::Transaction(message),
                    DatabaseErrorKind::ClosedConnection
                    | DatabaseErrorKind::UnableToSendCommand => StoreError::Connection(message),
                    _ if message.contains("statement timeout") => StoreError::Transaction(message),
                    _ => StoreError::Unknown(message),
                }
            }
            DieselError::AlreadyInTransaction
            | DieselError::NotInTransaction
            | DieselError::RollbackTransaction
            | DieselError::BrokenTransactionManager => StoreError::Transaction(err.to_string()),
            other => StoreError::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Info {
        message: &'static str,
        constraint: Option<&'static str>,
    }

    impl diesel::result::DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            self.message
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn database_error(kind: DatabaseErrorKind, message: &'static str, constraint: Option<&'static str>) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(Info { message, constraint }))
    }

    #[test]
    fn test_unique_violation_keeps_constraint_name() {
        let err = StoreError::from(database_error(
            DatabaseErrorKind::UniqueViolation,
            "duplicate key value violates unique constraint",
            Some("accounts_provider_provider_account_id_key"),
        ));
        assert_eq!(
            err.violated_constraint(),
            Some((ConstraintKind::Unique, "accounts_provider_provider_account_id_key"))
        );
    }

    #[test]
    fn test_foreign_key_violation() {
        let err = StoreError::from(database_error(
            DatabaseErrorKind::ForeignKeyViolation,
            "insert or update on table \"files\" violates foreign key constraint",
            Some("files_repository_id_fkey"),
        ));
        assert_eq!(
            err.violated_constraint(),
            Some((ConstraintKind::ForeignKey, "files_repository_id_fkey"))
        );
    }

    #[test]
    fn test_check_and_timeout_mapping() {
        let err = StoreError::from(database_error(
            DatabaseErrorKind::CheckViolation,
            "new row violates check constraint \"repositories_status_check\"",
            Some("repositories_status_check"),
        ));
        assert!(matches!(err, StoreError::Validation(_)));

        let err = StoreError::from(database_error(
            DatabaseErrorKind::Unknown,
            "canceling statement due to statement timeout",
            None,
        ));
        assert!(matches!(err, StoreError::Transaction(_)));

        let err = StoreError::from(database_error(
            DatabaseErrorKind::SerializationFailure,
            "could not serialize access",
            None,
        ));
        assert!(matches!(err, StoreError::Transaction(_)));
    }

    #[test]
    fn test_other_errors_are_unknown() {
        assert!(matches!(
            StoreError::from(DieselError::NotFound),
            StoreError::Unknown(_)
        ));
    }
}
