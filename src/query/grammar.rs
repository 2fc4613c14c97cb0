//! Per-backend SQL dialect rendering
//!
//! The builder emits dialect-neutral fragments (backtick-quoted identifiers, `?`
//! placeholders) and asks a [`Grammar`] for the handful of pieces that differ between
//! backends.

/// Portion of a date extracted by `where_year` / `where_month` / `where_day`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// Pessimistic lock mode appended to a select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    Shared,
    Update,
}

/// SQL dialect used when compiling a [`QueryBuilder`](super::QueryBuilder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grammar {
    /// MySQL / MariaDB
    #[default]
    MySql,
    /// SQLite 3
    Sqlite,
}

impl Grammar {
    /// Expression used by `in_random_order`
    pub fn random_function(self) -> &'static str {
        match self {
            Grammar::MySql => "rand()",
            Grammar::Sqlite => "random()",
        }
    }

    /// Trailing lock clause; empty where the backend has no row locks
    pub fn lock_clause(self, lock: Lock) -> &'static str {
        match (self, lock) {
            (Grammar::MySql, Lock::Shared) => "lock in share mode",
            (Grammar::MySql, Lock::Update) => "for update",
            (Grammar::Sqlite, _) => "",
        }
    }

    /// Expression extracting `part` from the (already quoted) `column`
    pub fn date_part(self, part: DatePart, column: &str) -> String {
        match self {
            Grammar::MySql => {
                let function = match part {
                    DatePart::Year => "year",
                    DatePart::Month => "month",
                    DatePart::Day => "day",
                };
                format!("{function}({column})")
            }
            Grammar::Sqlite => {
                let format = match part {
                    DatePart::Year => "%Y",
                    DatePart::Month => "%m",
                    DatePart::Day => "%d",
                };
                format!("cast(strftime('{format}', {column}) as integer)")
            }
        }
    }

    /// LIMIT / OFFSET tail
    ///
    /// SQLite rejects a bare OFFSET, so an offset without a limit is rendered with
    /// `limit -1`.
    pub fn limit_offset(self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut parts = Vec::with_capacity(2);
        match (self, limit, offset) {
            (_, Some(limit), _) => parts.push(format!("limit {limit}")),
            (Grammar::Sqlite, None, Some(_)) => parts.push("limit -1".to_string()),
            _ => {}
        }
        if let Some(offset) = offset {
            parts.push(format!("offset {offset}"));
        }
        parts.join(" ")
    }

    /// Combine two compiled selects
    pub fn union(self, main: &str, other: &str) -> String {
        match self {
            Grammar::MySql => format!("( {main} ) union ( {other} )"),
            Grammar::Sqlite => {
                format!("select * from ( {main} ) union select * from ( {other} )")
            }
        }
    }

    /// Statement emptying `table`
    pub fn truncate(self, table: &str) -> String {
        match self {
            Grammar::MySql => format!("truncate table `{table}`"),
            Grammar::Sqlite => format!("delete from `{table}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset_rendering() {
        assert_eq!(Grammar::MySql.limit_offset(Some(10), None), "limit 10");
        assert_eq!(Grammar::MySql.limit_offset(Some(10), Some(5)), "limit 10 offset 5");
        assert_eq!(Grammar::MySql.limit_offset(None, None), "");
        // EDGE CASE: SQLite needs a limit before an offset
        assert_eq!(Grammar::Sqlite.limit_offset(None, Some(5)), "limit -1 offset 5");
        assert_eq!(Grammar::MySql.limit_offset(None, Some(5)), "offset 5");
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(Grammar::MySql.date_part(DatePart::Year, "`born`"), "year(`born`)");
        assert_eq!(
            Grammar::Sqlite.date_part(DatePart::Month, "`born`"),
            "cast(strftime('%m', `born`) as integer)"
        );
    }

    #[test]
    fn test_dialect_specifics() {
        assert_eq!(Grammar::default(), Grammar::MySql);
        assert_eq!(Grammar::Sqlite.random_function(), "random()");
        assert_eq!(Grammar::MySql.lock_clause(Lock::Update), "for update");
        assert_eq!(Grammar::Sqlite.lock_clause(Lock::Shared), "");
        assert_eq!(Grammar::MySql.union("a", "b"), "( a ) union ( b )");
        assert_eq!(Grammar::Sqlite.truncate("users"), "delete from `users`");
        assert_eq!(Grammar::MySql.truncate("users"), "truncate table `users`");
    }
}
