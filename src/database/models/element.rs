use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::mapper::{Assign, Predicate, Shape, SqlValue, TableDef};

pub const ELEMENTS: TableDef = TableDef {
    name: "elements",
    columns: &["mid", "name", "reservation", "mail"],
};

/// An element row. `reservation` is set while the sponsorship is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Element {
    pub mid: String,
    pub name: String,
    pub reservation: Option<NaiveDateTime>,
    pub mail: Option<String>,
}

impl Shape for Element {
    const FIELDS: &'static [&'static str] = &["mid", "name", "reservation", "mail"];
}

impl Element {
    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }
}

impl Assign for Element {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("mid", self.mid.as_str().into()),
            ("name", self.name.as_str().into()),
            ("reservation", self.reservation.into()),
            ("mail", self.mail.clone().into()),
        ]
    }
}

/// A confirmed sponsorship as listed to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Sponsorship {
    pub mid: String,
    pub name: String,
    pub mail: Option<String>,
}

impl Shape for Sponsorship {
    const FIELDS: &'static [&'static str] = &["mid", "name", "mail"];
}

#[derive(Debug, Clone)]
pub struct Rename {
    pub name: String,
}

impl Assign for Rename {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        vec![("name", self.name.as_str().into())]
    }
}

/// Clears the pending reservation and the contact address in one write
#[derive(Debug, Clone, Copy)]
pub struct Confirm;

impl Assign for Confirm {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("reservation", None::<NaiveDateTime>.into()),
            ("mail", None::<String>.into()),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElementFilter {
    pub mid: Option<String>,
}

impl ElementFilter {
    pub fn mid(mid: impl Into<String>) -> Self {
        Self {
            mid: Some(mid.into()),
        }
    }
}

impl Predicate for ElementFilter {
    fn conditions(&self) -> Vec<(&'static str, SqlValue)> {
        self.mid
            .iter()
            .map(|mid| ("mid", mid.as_str().into()))
            .collect()
    }
}
