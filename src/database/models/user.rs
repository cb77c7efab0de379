use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::mapper::{Assign, Predicate, Shape, SqlValue, TableDef};

pub const USERS: TableDef = TableDef {
    name: "users",
    columns: &["uid", "name", "password", "tid"],
};

/// Full user row, including the password hash and token version
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub uid: i64,
    pub name: String,
    pub password: String,
    pub tid: i64,
}

impl Shape for User {
    const FIELDS: &'static [&'static str] = &["uid", "name", "password", "tid"];
}

/// Public projection returned by the user listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub uid: i64,
    pub name: String,
}

impl Shape for UserSummary {
    const FIELDS: &'static [&'static str] = &["uid", "name"];
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub password: String,
}

impl Assign for NewUser {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("name", self.name.as_str().into()),
            ("password", self.password.as_str().into()),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub uid: Option<i64>,
    pub name: Option<String>,
}

impl UserFilter {
    pub fn uid(uid: i64) -> Self {
        Self {
            uid: Some(uid),
            ..Default::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

impl Predicate for UserFilter {
    fn conditions(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Vec::new();
        if let Some(uid) = self.uid {
            out.push(("uid", uid.into()));
        }
        if let Some(name) = &self.name {
            out.push(("name", name.as_str().into()));
        }
        out
    }
}
