//! Typed filter predicates rendered as bound SQL parameters
//!
//! Column expressions are fixed by the query that owns them; only values
//! ever come from callers, and they are always bound.

use chrono::NaiveDateTime;
use sqlx::{Postgres, QueryBuilder};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Timestamp(NaiveDateTime),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(&'static str, SqlValue),
    In(&'static str, Vec<String>),
    AtLeast(&'static str, SqlValue),
}

impl Predicate {
    pub fn eq(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Predicate::Eq(column, value.into())
    }

    pub fn at_least(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Predicate::AtLeast(column, value.into())
    }

    pub fn is_in(column: &'static str, values: impl IntoIterator<Item = String>) -> Self {
        Predicate::In(column, values.into_iter().collect())
    }
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: &SqlValue) {
    match value {
        SqlValue::Text(text) => builder.push_bind(text.clone()),
        SqlValue::Timestamp(at) => builder.push_bind(*at),
    };
}

/// Append ` WHERE p1 AND p2 ...`; nothing when `predicates` is empty
pub fn push_where(builder: &mut QueryBuilder<'static, Postgres>, predicates: &[Predicate]) {
    for (idx, predicate) in predicates.iter().enumerate() {
        builder.push(if idx == 0 { " WHERE " } else { " AND " });
        match predicate {
            Predicate::Eq(column, value) => {
                builder.push(*column).push(" = ");
                push_value(builder, value);
            }
            Predicate::AtLeast(column, value) => {
                builder.push(*column).push(" >= ");
                push_value(builder, value);
            }
            Predicate::In(_, values) if values.is_empty() => {
                builder.push("FALSE");
            }
            Predicate::In(column, values) => {
                builder.push(*column).push(" IN (");
                let mut separated = builder.separated(", ");
                for value in values {
                    separated.push_bind(value.clone());
                }
                separated.push_unseparated(")");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(predicates: &[Predicate]) -> String {
        let mut builder = QueryBuilder::new("SELECT 1 FROM t");
        push_where(&mut builder, predicates);
        builder.sql().to_string()
    }

    #[test]
    fn no_predicates_no_where() {
        assert_eq!(render(&[]), "SELECT 1 FROM t");
    }

    #[test]
    fn predicates_render_bound_parameters() {
        let at = NaiveDateTime::parse_from_str("2024-03-04 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let sql = render(&[
            Predicate::eq("lj.status", "completed"),
            Predicate::is_in("qs.x_id", vec!["a'; DROP".to_string(), "b".to_string()]),
            Predicate::at_least("lpd.updated_at", at),
        ]);
        assert_eq!(
            sql,
            "SELECT 1 FROM t WHERE lj.status = $1 AND qs.x_id IN ($2, $3) AND lpd.updated_at >= $4"
        );
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        assert_eq!(
            render(&[Predicate::is_in("qs.x_id", Vec::new())]),
            "SELECT 1 FROM t WHERE FALSE"
        );
    }
}
