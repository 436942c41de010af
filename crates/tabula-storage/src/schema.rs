use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_blobs (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );
        "#,
    )
}
