mod users;
mod sessions;
mod user_flats;
mod ads;
mod ad_history;
mod analytics;
mod map;

#[cfg(test)]
pub(crate) mod test;

use anyhow::anyhow;
use sqlx::{Pool, Postgres};
use sqlx::postgres::PgQueryResult;
pub use users::*;
pub use sessions::*;
pub use user_flats::*;
pub use ads::*;
pub use ad_history::*;
pub use analytics::*;
pub use map::*;
use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct Repositories {
    pub users: Users,
    pub sessions: Sessions,
    pub user_flats: UserFlats,
    pub ads: Ads,
    pub ad_history: AdHistory,
    pub analytics: Analytics,
    pub map: Map,
}

impl Repositories {
    pub fn new(db_conn: &Pool<Postgres>) -> Self {
        Self {
            users: Users::new(db_conn.clone()),
            sessions: Sessions::new(db_conn.clone()),
            user_flats: UserFlats::new(db_conn.clone()),
            ads: Ads::new(db_conn.clone()),
            ad_history: AdHistory::new(db_conn.clone()),
            analytics: Analytics::new(db_conn.clone()),
            map: Map::new(db_conn.clone()),
        }
    }
}

pub async fn establish_database_connection(config: &DatabaseConfig) -> Result<Pool<Postgres>, anyhow::Error> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.url.as_str()).await?;
    sqlx::migrate!().run(&pool).await?;
    Ok(pool)
}


#[macro_export]
macro_rules! repository {
    ($name:ident, $($methods:item),*) => {
        #[derive(Clone)]
        pub struct $name {
            pool: sqlx::Pool<sqlx::Postgres>,
        }

        impl $name {
            pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
                Self { pool }
            }

            $($methods)*
        }
    };
}

fn ensure_only_one_row_updated(res: PgQueryResult) -> Result<PgQueryResult, anyhow::Error> {
    match res.rows_affected() {
        1 => Ok(res),
        x => Err(anyhow!("not only one row was updated but {x}"))
    }
}
