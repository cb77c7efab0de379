use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::database::manager::DatabaseError;
use crate::database::mapper::{self, Filter, Shape, SqlValue, Statement, TableDef};
use crate::database::models::{
    Confirm, Element, ElementFilter, NewUser, Rename, Sponsorship, User, UserFilter, UserSummary,
    ELEMENTS, USERS,
};

/// Persistence operations used by the request handlers
#[async_trait]
pub trait Store: Send + Sync {
    async fn user_by_id(&self, uid: i64) -> Result<Option<User>, DatabaseError>;
    async fn user_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError>;
    async fn list_users(&self) -> Result<Vec<UserSummary>, DatabaseError>;
    async fn insert_user(&self, user: &NewUser) -> Result<(), DatabaseError>;
    /// Stores the new hash and increments the token version in one write
    async fn change_password(&self, uid: i64, password_hash: &str) -> Result<u64, DatabaseError>;
    async fn delete_user(&self, uid: i64) -> Result<u64, DatabaseError>;

    async fn list_elements(&self) -> Result<Vec<Element>, DatabaseError>;
    async fn element(&self, mid: &str) -> Result<Option<Element>, DatabaseError>;
    async fn reserved_elements(&self) -> Result<Vec<Element>, DatabaseError>;
    async fn sponsored_elements(&self) -> Result<Vec<Sponsorship>, DatabaseError>;
    async fn insert_element(&self, element: &Element) -> Result<(), DatabaseError>;
    async fn rename_element(&self, mid: &str, name: &str) -> Result<u64, DatabaseError>;
    /// Clears reservation timestamp and contact mail of a reserved element
    async fn confirm_element(&self, mid: &str) -> Result<u64, DatabaseError>;
    async fn delete_element(&self, mid: &str) -> Result<u64, DatabaseError>;
    async fn delete_elements(&self, mids: &[String]) -> Result<u64, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// PostgreSQL implementation of [`Store`] built on the row mapper
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch<S: Shape>(
        &self,
        table: &TableDef,
        filter: Filter<'_>,
        order_by: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<S>, DatabaseError> {
        let Statement { sql, params } = mapper::select::<S>(table, filter, order_by, limit)?;
        debug!(%sql, "select");

        let mut q = sqlx::query_as::<_, S>(&sql);
        for p in params {
            q = q.bind(p);
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn fetch_first<S: Shape>(
        &self,
        table: &TableDef,
        filter: Filter<'_>,
    ) -> Result<Option<S>, DatabaseError> {
        Ok(self.fetch::<S>(table, filter, None, Some(1)).await?.into_iter().next())
    }

    async fn execute(&self, statement: Statement) -> Result<u64, DatabaseError> {
        let Statement { sql, params } = statement;
        debug!(%sql, "execute");

        let mut q = sqlx::query(&sql);
        for p in params {
            q = q.bind(p);
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn user_by_id(&self, uid: i64) -> Result<Option<User>, DatabaseError> {
        self.fetch_first(&USERS, Filter::Matching(&UserFilter::uid(uid)))
            .await
    }

    async fn user_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        self.fetch_first(&USERS, Filter::Matching(&UserFilter::name(name)))
            .await
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, DatabaseError> {
        self.fetch(&USERS, Filter::All, Some("uid"), None).await
    }

    async fn insert_user(&self, user: &NewUser) -> Result<(), DatabaseError> {
        self.execute(mapper::insert(&USERS, user)?).await?;
        Ok(())
    }

    async fn change_password(&self, uid: i64, password_hash: &str) -> Result<u64, DatabaseError> {
        // the version bump is relative to the stored value, which the mapper can't express
        let affected = sqlx::query("UPDATE users SET password = $1, tid = tid + 1 WHERE uid = $2")
            .bind(password_hash)
            .bind(uid)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }

    async fn delete_user(&self, uid: i64) -> Result<u64, DatabaseError> {
        self.execute(mapper::delete(&USERS, &UserFilter::uid(uid))?)
            .await
    }

    async fn list_elements(&self) -> Result<Vec<Element>, DatabaseError> {
        self.fetch(&ELEMENTS, Filter::All, Some("mid"), None).await
    }

    async fn element(&self, mid: &str) -> Result<Option<Element>, DatabaseError> {
        self.fetch_first(&ELEMENTS, Filter::Matching(&ElementFilter::mid(mid)))
            .await
    }

    async fn reserved_elements(&self) -> Result<Vec<Element>, DatabaseError> {
        self.fetch(&ELEMENTS, Filter::Static("reservation IS NOT NULL"), Some("mid"), None)
            .await
    }

    async fn sponsored_elements(&self) -> Result<Vec<Sponsorship>, DatabaseError> {
        self.fetch(&ELEMENTS, Filter::Static("reservation IS NULL"), Some("mid"), None)
            .await
    }

    async fn insert_element(&self, element: &Element) -> Result<(), DatabaseError> {
        self.execute(mapper::insert(&ELEMENTS, element)?).await?;
        Ok(())
    }

    async fn rename_element(&self, mid: &str, name: &str) -> Result<u64, DatabaseError> {
        let rename = Rename {
            name: name.to_string(),
        };
        self.execute(mapper::update(&ELEMENTS, &rename, &ElementFilter::mid(mid))?)
            .await
    }

    async fn confirm_element(&self, mid: &str) -> Result<u64, DatabaseError> {
        self.execute(mapper::update(&ELEMENTS, &Confirm, &ElementFilter::mid(mid))?)
            .await
    }

    async fn delete_element(&self, mid: &str) -> Result<u64, DatabaseError> {
        self.execute(mapper::delete(&ELEMENTS, &ElementFilter::mid(mid))?)
            .await
    }

    async fn delete_elements(&self, mids: &[String]) -> Result<u64, DatabaseError> {
        if mids.is_empty() {
            return Ok(0);
        }
        let values = mids.iter().map(|m| SqlValue::from(m.as_str())).collect();
        self.execute(mapper::delete_in(&ELEMENTS, "mid", values)?)
            .await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
