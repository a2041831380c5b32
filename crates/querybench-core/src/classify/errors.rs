use serde::{Deserialize, Serialize};
use std::fmt;

/// Taxonomy for database error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Deadlock,
    LockTimeout,
    ForeignKeyConstraint,
    DuplicateEntry,
    DataTruncation,
    TypeConversion,
    QueryTimeout,
    Other,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Deadlock => "Deadlock",
            ErrorKind::LockTimeout => "Lock timeout",
            ErrorKind::ForeignKeyConstraint => "Foreign key constraint",
            ErrorKind::DuplicateEntry => "Duplicate entry",
            ErrorKind::DataTruncation => "Data truncation/range",
            ErrorKind::TypeConversion => "Type conversion",
            ErrorKind::QueryTimeout => "Query timeout",
            ErrorKind::Other => "Other error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered rules; the first rule with a matching needle wins.
/// `lock wait timeout` must stay ahead of the generic `timeout` rule.
const RULES: &[(ErrorKind, &[&str])] = &[
    (ErrorKind::Deadlock, &["deadlock"]),
    (ErrorKind::LockTimeout, &["lock wait timeout"]),
    (ErrorKind::ForeignKeyConstraint, &["foreign key constraint"]),
    (ErrorKind::DuplicateEntry, &["duplicate entry"]),
    (ErrorKind::DataTruncation, &["truncated", "out of range"]),
    (ErrorKind::TypeConversion, &["convert", "illegal mix"]),
    (ErrorKind::QueryTimeout, &["context deadline", "timeout"]),
];

pub fn classify_error(message: &str) -> ErrorKind {
    let message = message.to_lowercase();
    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| message.contains(n)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_rule() {
        let cases = [
            ("Error 1213: Deadlock found when trying to get lock", ErrorKind::Deadlock),
            ("Error 1205: Lock wait timeout exceeded", ErrorKind::LockTimeout),
            ("Cannot add or update a child row: a foreign key constraint fails", ErrorKind::ForeignKeyConstraint),
            ("Duplicate entry '1' for key 'PRIMARY'", ErrorKind::DuplicateEntry),
            ("Data truncated for column 'x'", ErrorKind::DataTruncation),
            ("Out of range value for column 'y'", ErrorKind::DataTruncation),
            ("Cannot convert string to int", ErrorKind::TypeConversion),
            ("Illegal mix of collations", ErrorKind::TypeConversion),
            ("context deadline exceeded", ErrorKind::QueryTimeout),
            ("timeout: query exceeded 30s", ErrorKind::QueryTimeout),
            ("no such table: missing", ErrorKind::Other),
            ("", ErrorKind::Other),
        ];
        for (msg, want) in cases {
            assert_eq!(classify_error(msg), want, "message: {msg}");
        }
    }

    #[test]
    fn test_precedence_on_overlapping_messages() {
        // matches both deadlock and timeout
        assert_eq!(
            classify_error("deadlock detected, lock wait timeout"),
            ErrorKind::Deadlock
        );
        // lock wait timeout also contains "timeout"
        assert_eq!(classify_error("LOCK WAIT TIMEOUT"), ErrorKind::LockTimeout);
        // truncation wins over conversion
        assert_eq!(
            classify_error("value truncated while trying to convert"),
            ErrorKind::DataTruncation
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(ErrorKind::DataTruncation.label(), "Data truncation/range");
        assert_eq!(ErrorKind::Other.to_string(), "Other error");
    }
}
