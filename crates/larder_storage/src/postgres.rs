//! PostgreSQL blob-column content backend.
//!
//! Contents live in the `stored_contents` table alongside a SHA-256 digest
//! that is verified on every read.

use crate::ContentBackend;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use larder_error::{
    DatabaseError, DatabaseErrorKind, LarderResult, StorageError, StorageErrorKind,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Diesel schema for the content table.
pub mod schema {
    diesel::table! {
        stored_contents (id) {
            id -> Uuid,
            contents -> Bytea,
            content_hash -> Text,
            size_bytes -> Int8,
            created_at -> Timestamp,
        }
    }
}

use schema::stored_contents;

/// Pooled PostgreSQL connections.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Create a connection pool for the PostgreSQL database.
///
/// Uses `database_url` when given, otherwise the `DATABASE_URL` environment
/// variable. One connection is checked out and released so a bad URL fails
/// here rather than on the first request.
///
/// # Errors
///
/// Returns an error if:
/// - No URL is given and `DATABASE_URL` is not set
/// - The pool cannot open a connection
pub fn create_pool(database_url: Option<&str>, max_size: u32) -> LarderResult<PgPool> {
    let database_url = match database_url {
        Some(url) => url.to_string(),
        None => std::env::var("DATABASE_URL").map_err(|_| {
            DatabaseError::new(DatabaseErrorKind::Connection(
                "DATABASE_URL environment variable not set".to_string(),
            ))
        })?,
    };

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::Connection(format!(
                "Failed to create connection pool: {}",
                e
            )))
        })?;

    Ok(pool)
}

/// Run pending migrations.
pub fn run_migrations(conn: &mut PgConnection) -> LarderResult<()> {
    use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())).into())
}

#[derive(Insertable)]
#[diesel(table_name = stored_contents)]
struct NewStoredContent<'a> {
    id: Uuid,
    contents: &'a [u8],
    content_hash: String,
    size_bytes: i64,
}

/// PostgreSQL content backend.
///
/// Every operation checks a connection out of the pool and runs its single
/// statement on the blocking thread pool.
#[derive(Clone)]
pub struct PostgresContent {
    pool: PgPool,
}

impl PostgresContent {
    /// Create a backend over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pool, apply pending migrations and return the backend.
    #[tracing::instrument(skip(database_url))]
    pub fn connect(database_url: Option<&str>, pool_size: u32) -> LarderResult<Self> {
        let pool = create_pool(database_url, pool_size)?;
        {
            let mut conn = pool.get().map_err(|e| {
                DatabaseError::new(DatabaseErrorKind::Connection(e.to_string()))
            })?;
            run_migrations(&mut conn)?;
        }
        tracing::info!(pool_size, "Connected postgres content backend");
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn with_connection<T, F>(&self, f: F) -> LarderResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> LarderResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| {
                DatabaseError::new(DatabaseErrorKind::Connection(e.to_string()))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Query(e.to_string())))?
    }

    fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    fn parse_id(id: &str) -> LarderResult<Uuid> {
        Uuid::parse_str(id).map_err(|e| {
            StorageError::new(StorageErrorKind::InvalidPath(format!(
                "malformed content id '{}': {}",
                id, e
            )))
            .into()
        })
    }
}

#[async_trait::async_trait]
impl ContentBackend for PostgresContent {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[tracing::instrument(skip(self, contents), fields(size = contents.len()))]
    async fn write_contents(&self, contents: &[u8]) -> LarderResult<String> {
        let id = Uuid::new_v4();
        let contents = contents.to_vec();
        let content_hash = Self::compute_hash(&contents);
        let hash = content_hash.clone();

        self.with_connection(move |conn| {
            let row = NewStoredContent {
                id,
                contents: &contents,
                content_hash,
                size_bytes: contents.len() as i64,
            };
            diesel::insert_into(stored_contents::table)
                .values(&row)
                .execute(conn)
                .map_err(DatabaseError::from)?;
            Ok(())
        })
        .await?;

        tracing::debug!(id = %id, hash = %hash, "Inserted contents");
        Ok(id.simple().to_string())
    }

    #[tracing::instrument(skip(self))]
    async fn read_contents(&self, id: &str) -> LarderResult<Option<Vec<u8>>> {
        let uuid = Self::parse_id(id)?;

        let row: Option<(Vec<u8>, String)> = self
            .with_connection(move |conn| {
                Ok(stored_contents::table
                    .find(uuid)
                    .select((stored_contents::contents, stored_contents::content_hash))
                    .first(conn)
                    .optional()
                    .map_err(DatabaseError::from)?)
            })
            .await?;

        let Some((contents, expected_hash)) = row else {
            return Ok(None);
        };

        let actual_hash = Self::compute_hash(&contents);
        if actual_hash != expected_hash {
            return Err(StorageError::new(StorageErrorKind::Integrity(format!(
                "content {}: expected {}, got {}",
                id, expected_hash, actual_hash
            )))
            .into());
        }

        Ok(Some(contents))
    }

    #[tracing::instrument(skip(self))]
    async fn remove_contents(&self, id: &str) -> LarderResult<()> {
        let uuid = Self::parse_id(id)?;

        let deleted = self
            .with_connection(move |conn| {
                Ok(diesel::delete(stored_contents::table.find(uuid))
                    .execute(conn)
                    .map_err(DatabaseError::from)?)
            })
            .await?;

        tracing::debug!(id, deleted, "Removed contents");
        Ok(())
    }
}
