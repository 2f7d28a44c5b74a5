use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

use crate::config::AppConfig;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Pool sized from the configuration. Workflow transitions hold a row lock
/// for the length of one short transaction, so a small pool is enough.
pub fn init_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    let pool = Pool::builder()
        .max_size(config.database_max_pool_size.max(1))
        .connection_timeout(Duration::from_secs(10))
        .build(manager)?;
    Ok(pool)
}
