use crate::models::NameRecord;
use sqlx::postgres::PgConnection;
use sqlx::Connection;

/// The fixed statements run against the `names` table. Every method borrows a
/// connection the caller already holds; none of them acquires or releases one.
pub struct NamesRepository;

impl NamesRepository {
    pub async fn server_version(conn: &mut PgConnection) -> Result<String, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT version()")
            .fetch_one(&mut *conn)
            .await
    }

    /// All names in insertion order.
    pub async fn list_names(conn: &mut PgConnection) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT name FROM names ORDER BY id")
            .fetch_all(&mut *conn)
            .await
    }

    /// Insert one name and commit before returning.
    pub async fn insert_name(conn: &mut PgConnection, name: &str) -> Result<NameRecord, sqlx::Error> {
        let mut tx = conn.begin().await?;
        let record = sqlx::query_as::<_, NameRecord>(
            "INSERT INTO names (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn count(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM names")
            .fetch_one(&mut *conn)
            .await
    }
}
