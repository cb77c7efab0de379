//! Row mapper: turns record shapes into parameterised SQL statements.
//!
//! Tables are described by a [`TableDef`]; each record shape lists its field
//! names through [`Shape`]. Before a statement is produced every field is
//! checked (case-insensitively) against the table's real columns, so a shape
//! that drifted from the schema fails with [`MapperError::InvalidColumn`]
//! instead of reaching the database.
//!
//! Predicates are built from `Option` fields: `None` is "not part of the
//! filter", which keeps zero values (uid 0, empty strings) filterable.
//! NULLs carry the SQL type of the column they are written to, Postgres
//! refuses a text NULL in a timestamp column.

use chrono::NaiveDateTime;
use sqlx::encode::IsNull;
use sqlx::postgres::{PgArgumentBuffer, PgRow, PgTypeInfo};
use sqlx::{Encode, FromRow, Postgres, Type};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapperError {
    #[error("invalid column: {column} for table {table}")]
    InvalidColumn { table: &'static str, column: String },

    #[error("refusing to {operation} every row of {table}: empty predicate")]
    EmptyPredicate {
        table: &'static str,
        operation: &'static str,
    },

    #[error("nothing to write into {0}")]
    EmptyAssignment(&'static str),
}

/// Static description of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl TableDef {
    fn column(&self, field: &str) -> Result<&'static str, MapperError> {
        self.columns
            .iter()
            .find(|c| c.eq_ignore_ascii_case(field))
            .copied()
            .ok_or_else(|| MapperError::InvalidColumn {
                table: self.name,
                column: field.to_string(),
            })
    }
}

/// A record shape that can be read from a table
pub trait Shape: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const FIELDS: &'static [&'static str];
}

/// Column/value pairs written by INSERT and UPDATE ... SET
pub trait Assign: Sync {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)>;
}

/// Column/value pairs AND-ed together into a WHERE clause
pub trait Predicate: Sync {
    fn conditions(&self) -> Vec<(&'static str, SqlValue)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int,
    Text,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null(SqlType),
    Int(i64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    pub fn sql_type(&self) -> SqlType {
        match self {
            SqlValue::Null(t) => *t,
            SqlValue::Int(_) => SqlType::Int,
            SqlValue::Text(_) => SqlType::Text,
            SqlValue::Timestamp(_) => SqlType::Timestamp,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Postgres type the value is bound as
    pub fn pg_type(&self) -> PgTypeInfo {
        match self.sql_type() {
            SqlType::Int => <i64 as Type<Postgres>>::type_info(),
            SqlType::Text => <String as Type<Postgres>>::type_info(),
            SqlType::Timestamp => <NaiveDateTime as Type<Postgres>>::type_info(),
        }
    }
}

impl Type<Postgres> for SqlValue {
    // only a fallback, every value reports its own type through `produces`
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}

impl<'q> Encode<'q, Postgres> for SqlValue {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
        match self {
            SqlValue::Null(_) => IsNull::Yes,
            SqlValue::Int(v) => <i64 as Encode<Postgres>>::encode_by_ref(v, buf),
            SqlValue::Text(v) => <String as Encode<Postgres>>::encode_by_ref(v, buf),
            SqlValue::Timestamp(v) => <NaiveDateTime as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.pg_type())
    }
}

/// Rust types with a fixed column type, so that `None` still knows it
pub trait Typed: Into<SqlValue> {
    const SQL_TYPE: SqlType;
}

impl Typed for i64 {
    const SQL_TYPE: SqlType = SqlType::Int;
}

impl Typed for &str {
    const SQL_TYPE: SqlType = SqlType::Text;
}

impl Typed for String {
    const SQL_TYPE: SqlType = SqlType::Text;
}

impl Typed for NaiveDateTime {
    const SQL_TYPE: SqlType = SqlType::Timestamp;
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl<T: Typed> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null(T::SQL_TYPE))
    }
}

/// Which rows a SELECT reads
#[derive(Debug, Clone)]
pub enum Filter<'a> {
    All,
    /// Fixed WHERE predicate without parameters, e.g. `reservation IS NULL`
    Static(&'static str),
    Matching(&'a dyn Predicate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl std::fmt::Debug for dyn Predicate + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.conditions()).finish()
    }
}

struct Placeholders {
    params: Vec<SqlValue>,
}

impl Placeholders {
    fn new() -> Self {
        Self { params: Vec::new() }
    }

    fn push(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

fn where_clause(
    table: &TableDef,
    conditions: Vec<(&'static str, SqlValue)>,
    placeholders: &mut Placeholders,
) -> Result<String, MapperError> {
    let mut parts = Vec::with_capacity(conditions.len());
    for (field, value) in conditions {
        let column = table.column(field)?;
        if value.is_null() {
            parts.push(format!("{} IS NULL", column));
        } else {
            parts.push(format!("{} = {}", column, placeholders.push(value)));
        }
    }
    Ok(parts.join(" AND "))
}

/// SELECT the fields of `S` from `table`, optionally sorted by one column
pub fn select<S: Shape>(
    table: &TableDef,
    filter: Filter<'_>,
    order_by: Option<&str>,
    limit: Option<i64>,
) -> Result<Statement, MapperError> {
    let columns = S::FIELDS
        .iter()
        .map(|field| table.column(field))
        .collect::<Result<Vec<_>, _>>()?;

    let mut placeholders = Placeholders::new();
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table.name);

    match filter {
        Filter::All => {}
        Filter::Static(predicate) => {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        Filter::Matching(predicate) => {
            let clause = where_clause(table, predicate.conditions(), &mut placeholders)?;
            if !clause.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clause);
            }
        }
    }

    if let Some(field) = order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(table.column(field)?);
    }

    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", placeholders.push(SqlValue::Int(limit))));
    }

    Ok(Statement {
        sql,
        params: placeholders.params,
    })
}

pub fn insert(table: &TableDef, values: &dyn Assign) -> Result<Statement, MapperError> {
    let assignments = values.assignments();
    if assignments.is_empty() {
        return Err(MapperError::EmptyAssignment(table.name));
    }

    let mut placeholders = Placeholders::new();
    let mut columns = Vec::with_capacity(assignments.len());
    let mut slots = Vec::with_capacity(assignments.len());
    for (field, value) in assignments {
        columns.push(table.column(field)?);
        slots.push(placeholders.push(value));
    }

    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name,
            columns.join(", "),
            slots.join(", ")
        ),
        params: placeholders.params,
    })
}

pub fn update(
    table: &TableDef,
    set: &dyn Assign,
    predicate: &dyn Predicate,
) -> Result<Statement, MapperError> {
    let assignments = set.assignments();
    if assignments.is_empty() {
        return Err(MapperError::EmptyAssignment(table.name));
    }

    let mut placeholders = Placeholders::new();
    let mut sets = Vec::with_capacity(assignments.len());
    for (field, value) in assignments {
        let column = table.column(field)?;
        sets.push(format!("{} = {}", column, placeholders.push(value)));
    }

    let clause = where_clause(table, predicate.conditions(), &mut placeholders)?;
    if clause.is_empty() {
        return Err(MapperError::EmptyPredicate {
            table: table.name,
            operation: "update",
        });
    }

    Ok(Statement {
        sql: format!("UPDATE {} SET {} WHERE {}", table.name, sets.join(", "), clause),
        params: placeholders.params,
    })
}

pub fn delete(table: &TableDef, predicate: &dyn Predicate) -> Result<Statement, MapperError> {
    let mut placeholders = Placeholders::new();
    let clause = where_clause(table, predicate.conditions(), &mut placeholders)?;
    if clause.is_empty() {
        return Err(MapperError::EmptyPredicate {
            table: table.name,
            operation: "delete",
        });
    }

    Ok(Statement {
        sql: format!("DELETE FROM {} WHERE {}", table.name, clause),
        params: placeholders.params,
    })
}

/// DELETE every row whose `field` is one of `values`
pub fn delete_in(
    table: &TableDef,
    field: &str,
    values: Vec<SqlValue>,
) -> Result<Statement, MapperError> {
    let column = table.column(field)?;
    if values.is_empty() {
        return Err(MapperError::EmptyPredicate {
            table: table.name,
            operation: "delete",
        });
    }

    let mut placeholders = Placeholders::new();
    let slots: Vec<String> = values.into_iter().map(|v| placeholders.push(v)).collect();

    Ok(Statement {
        sql: format!(
            "DELETE FROM {} WHERE {} IN ({})",
            table.name,
            column,
            slots.join(", ")
        ),
        params: placeholders.params,
    })
}
