//! Database access for accounts, session tokens, and child records.
//!
//! Stores are thin service objects around a `PgPool`; every statement is
//! parameterized and runs inside a `db.query` span.

pub mod account;
pub mod child;
pub mod token;

pub use self::account::{AccountRef, AccountStore, CreateOutcome, NewAccount};
pub use self::child::{
    AllergyEntry, ChildProfile, ChildStore, GrowthSnapshot, NewChild, NewGrowth, VaccinationEntry,
};
pub use self::token::TokenStore;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Name of the violated constraint, when the driver reports one.
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
            constraint: None,
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
            constraint: None,
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn violated_constraint_reports_name() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
            constraint: Some("account_email_key"),
        }));
        assert_eq!(
            violated_constraint(&err).as_deref(),
            Some("account_email_key")
        );
        assert_eq!(violated_constraint(&sqlx::Error::RowNotFound), None);
    }
}
