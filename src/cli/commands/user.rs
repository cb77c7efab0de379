use anyhow::{bail, Context};
use tracing::info;

use crate::auth::{hash_password_async, validate_password};
use crate::config::AppConfig;
use crate::database::models::NewUser;
use crate::database::{DatabaseManager, PgStore, Store};

pub async fn create(config: &AppConfig, name: &str, password: &str) -> anyhow::Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("name must not be empty");
    }
    validate_password(password)?;

    let db = DatabaseManager::connect(&config.database_url()?, 1)
        .await
        .context("can't connect to the database")?;
    db.ensure_schema().await?;
    let store = PgStore::new(db.pool().clone());

    if store.user_by_name(name).await?.is_some() {
        db.close().await;
        bail!("user {:?} already exists", name);
    }

    store
        .insert_user(&NewUser {
            name: name.to_string(),
            password: hash_password_async(password).await?,
        })
        .await?;
    info!(%name, "created user");

    db.close().await;
    Ok(())
}
