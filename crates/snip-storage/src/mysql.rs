use async_trait::async_trait;
use snip_core::error::Result;
use snip_core::{
    Clock, MappingStore, MappingUpdate, ShortCode, StorageError, SystemClock, UpdateOp, UrlMapping,
};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::{debug, trace};

/// DDL for the `url_mappings` table.
pub const SCHEMA: &str = include_str!("../ddl/mysql/url_mappings.sql");

/// MySQL implementation of the store contract.
///
/// The primary key on `short_code` provides the conditional create. Counter
/// and TTL changes are a single `UPDATE` statement, so concurrent clicks are
/// serialized by InnoDB row locks. Rows past `expires_at` are invisible to
/// reads and are replaced by the next create of the same code.
#[derive(Debug, Clone)]
pub struct MySqlStore<C = SystemClock> {
    pool: MySqlPool,
    clock: C,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self::with_clock(pool, SystemClock)
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }
}

impl<C: Clock> MySqlStore<C> {
    pub fn with_clock(pool: MySqlPool, clock: C) -> Self {
        Self { pool, clock }
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Creates the `url_mappings` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("url_mappings schema is in place");
        Ok(())
    }

    fn now(&self) -> i64 {
        self.clock.now().as_second()
    }
}

/// Classifies a sqlx failure. Pool and transport failures are retryable.
fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let classify: fn(String) -> StorageError = match &err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout,
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable,
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData,
        _ => StorageError::Query,
    };
    classify(err.to_string())
}

/// Maps a failed `INSERT` of `code`. A duplicate primary key means another
/// live mapping owns the code.
fn map_insert_error(err: sqlx::Error, code: &ShortCode) -> StorageError {
    let duplicate = err
        .as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation);

    if duplicate {
        StorageError::Conflict(code.to_string())
    } else {
        map_sqlx_error(err)
    }
}

fn mapping_from_row(code: &ShortCode, row: &MySqlRow) -> Result<UrlMapping> {
    Ok(UrlMapping {
        short_code: code.clone(),
        long_url: row.try_get("long_url").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        last_accessed: row.try_get("last_accessed").map_err(map_sqlx_error)?,
        expires_at: row.try_get("expires_at").map_err(map_sqlx_error)?,
        num_clicks: row.try_get("num_clicks").map_err(map_sqlx_error)?,
    })
}

/// Renders the `SET` clause for an update, one placeholder per operation.
fn update_sql(update: &MappingUpdate) -> String {
    let assignments: Vec<String> = update
        .ops()
        .iter()
        .map(|(field, op)| {
            let column = field.column();
            match op {
                UpdateOp::Set(_) => format!("{column} = ?"),
                UpdateOp::Increment(_) => format!("{column} = COALESCE({column}, 0) + ?"),
                UpdateOp::AtLeast(_) => format!("{column} = GREATEST({column}, ?)"),
            }
        })
        .collect();

    format!(
        "UPDATE url_mappings SET {} WHERE short_code = ? AND expires_at > ?",
        assignments.join(", ")
    )
}

#[async_trait]
impl<C: Clock> MappingStore for MySqlStore<C> {
    async fn create(&self, mapping: UrlMapping) -> Result<()> {
        let now = self.now();

        // Reclaim the code if its previous owner has expired. A racing creator
        // that loses the insert below still sees a unique violation.
        let reclaimed = sqlx::query(
            r#"
            DELETE FROM url_mappings
            WHERE short_code = ?
              AND expires_at <= ?
            "#,
        )
        .bind(mapping.short_code.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if reclaimed.rows_affected() > 0 {
            trace!(code = %mapping.short_code, "reclaimed expired mapping");
        }

        sqlx::query(
            r#"
            INSERT INTO url_mappings
                (short_code, long_url, created_at, last_accessed, expires_at, num_clicks)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(mapping.short_code.as_str())
        .bind(mapping.long_url.as_str())
        .bind(mapping.created_at)
        .bind(mapping.last_accessed)
        .bind(mapping.expires_at)
        .bind(mapping.num_clicks)
        .execute(&self.pool)
        .await
        .map_err(|err| map_insert_error(err, &mapping.short_code))?;

        trace!(code = %mapping.short_code, "inserted mapping");
        Ok(())
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        let row = sqlx::query(
            r#"
            SELECT long_url, created_at, last_accessed, expires_at, num_clicks
            FROM url_mappings
            WHERE short_code = ?
              AND expires_at > ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| mapping_from_row(code, &row)).transpose()
    }

    async fn get_long_url(&self, code: &ShortCode) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT long_url
            FROM url_mappings
            WHERE short_code = ?
              AND expires_at > ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| row.try_get::<String, _>("long_url").map_err(map_sqlx_error))
            .transpose()
    }

    async fn atomic_update(&self, code: &ShortCode, update: MappingUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(self.get(code).await?.is_some());
        }

        let sql = update_sql(&update);
        let mut query = sqlx::query(&sql);
        for (_, op) in update.ops() {
            query = query.bind(op.value());
        }

        let result = query
            .bind(code.as_str())
            .bind(self.now())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snip_core::MetricField;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;
    use std::fmt;

    /// Server-side error that is either a duplicate key or something else.
    #[derive(Debug)]
    struct ServerError {
        duplicate_key: bool,
    }

    impl fmt::Display for ServerError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "server error (duplicate key: {})", self.duplicate_key)
        }
    }

    impl StdError for ServerError {}

    impl DatabaseError for ServerError {
        fn message(&self) -> &str {
            "server error"
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.duplicate_key {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    fn server_error(duplicate_key: bool) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ServerError { duplicate_key }))
    }

    #[test]
    fn update_sql_renders_each_operation() {
        let update = MappingUpdate::new()
            .set(MetricField::LastAccessed, 10)
            .increment(MetricField::NumClicks, 1)
            .at_least(MetricField::ExpiresAt, 20);

        assert_eq!(
            update_sql(&update),
            "UPDATE url_mappings SET last_accessed = ?, \
             num_clicks = COALESCE(num_clicks, 0) + ?, expires_at = GREATEST(expires_at, ?) \
             WHERE short_code = ? AND expires_at > ?"
        );
    }

    #[test]
    fn duplicate_key_on_insert_is_a_conflict() {
        let code = ShortCode::new_unchecked("abc123");

        assert_eq!(
            map_insert_error(server_error(true), &code),
            StorageError::Conflict("abc123".to_string())
        );
        assert!(matches!(
            map_insert_error(server_error(false), &code),
            StorageError::Query(_)
        ));
        assert!(matches!(
            map_insert_error(sqlx::Error::PoolTimedOut, &code),
            StorageError::Timeout(_)
        ));
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
    }

    #[test]
    fn schema_keys_on_short_code() {
        assert!(SCHEMA.contains("PRIMARY KEY (short_code)"));
        assert!(SCHEMA.contains("ascii_bin"));
    }
}
