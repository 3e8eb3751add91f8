use crate::{posts::PostRepository, users::UserRepository};
use plauder_common::model::{ModelValidationError, user::Username};
use sqlx::{
    Sqlite, SqlitePool,
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("The username {0} is already taken")]
    UsernameTaken(Username),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// Turns a unique-constraint failure on `users.username` into
    /// [`DbError::UsernameTaken`]. Everything else stays a storage fault.
    pub(crate) fn from_username_write(error: sqlx::Error, username: &Username) -> Self {
        match error.as_database_error() {
            Some(db_error) if db_error.is_unique_violation() => {
                DbError::UsernameTaken(username.clone())
            }
            _ => DbError::Sqlx(error),
        }
    }
}

// Reply and repost references are declared but never enforced: the pool
// turns foreign key checks off, so deleting a post leaves dangling ids in
// the rows that point at it.
const SCHEMA: &[&str] = &[
    "
    CREATE TABLE IF NOT EXISTS users (
        id              INTEGER     PRIMARY KEY AUTOINCREMENT,
        username        TEXT        NOT NULL UNIQUE,
        password_hash   TEXT        NOT NULL,
        biography       TEXT        NOT NULL DEFAULT '',
        avatar          TEXT        NOT NULL DEFAULT '',
        created_at      DATETIME    NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    )
    ",
    "
    CREATE TABLE IF NOT EXISTS posts (
        id              INTEGER     PRIMARY KEY AUTOINCREMENT,
        user_id         INTEGER     NOT NULL REFERENCES users (id),
        content         TEXT        NOT NULL,
        reply_to_id     INTEGER     DEFAULT NULL REFERENCES posts (id),
        repost_of_id    INTEGER     DEFAULT NULL REFERENCES posts (id),
        created_at      DATETIME    NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    )
    ",
    "CREATE INDEX IF NOT EXISTS posts_user_id_idx ON posts (user_id)",
    "CREATE INDEX IF NOT EXISTS posts_reply_to_id_idx ON posts (reply_to_id)",
    "CREATE INDEX IF NOT EXISTS posts_repost_of_id_idx ON posts (repost_of_id)",
    "CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at)",
];

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// A migrated database that lives as long as the returned client.
    ///
    /// Every SQLite connection to `:memory:` opens its own database, so the
    /// pool is pinned to a single connection that is never recycled.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let client = Self::new(pool);
        client.migrate().await?;
        Ok(client)
    }

    /// Creates missing tables and indexes. Safe to run on every start.
    pub async fn migrate(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *conn).await?;
        }

        info!("Database schema is up to date");
        Ok(())
    }

    /// Checks a connection out of the pool for one request. It goes back to
    /// the pool when the returned value is dropped, on every exit path.
    pub async fn acquire(&self) -> Result<DbConnection> {
        let conn = self.pool.acquire().await?;
        Ok(DbConnection { conn })
    }
}

pub struct DbConnection {
    conn: PoolConnection<Sqlite>,
}

impl DbConnection {
    pub fn users(&mut self) -> UserRepository<'_> {
        UserRepository::new(&mut self.conn)
    }

    pub fn posts(&mut self) -> PostRepository<'_> {
        PostRepository::new(&mut self.conn)
    }
}
