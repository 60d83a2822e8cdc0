use crate::models::backup_log_record::{BackupLogRecord, BackupStatus};
use crate::models::error::StorageError;
use crate::service::history::HistoryRecorder;
use chrono::{DateTime, Local};
use log::{debug, info};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::fs;
use std::path::Path;

type DbPool = Pool<SqliteConnectionManager>;

const SELECT_COLUMNS: &str = "backup_id, user_id, backup_type, ticket_number, start_time, end_time, duration,
     source_path, destination_path, total_size, total_files, copied_files, status";

/// Backup history kept in the `backup_logs` table of a SQLite database.
pub struct SqliteHistory {
    pool: DbPool,
}

impl SqliteHistory {
    /// Open (or create) the database and make sure the schema is current.
    pub fn open(db_file: &str) -> Result<Self, StorageError> {
        if db_file.is_empty() {
            return Err(StorageError::EmptyPath);
        }

        info!("Initializing database connection pool: {}", db_file);

        let is_in_memory = db_file == ":memory:" || db_file.starts_with("file::memory:");
        let use_wal = !is_in_memory;

        if !is_in_memory {
            if let Some(parent) = Path::new(db_file).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|cause| StorageError::CreateDirectory {
                        path: parent.to_path_buf(),
                        cause,
                    })?;
                }
            }
        }

        let manager = SqliteConnectionManager::file(db_file).with_init(move |conn| {
            let mut pragmas = String::from(
                "PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            );

            if use_wal {
                pragmas.push_str(" PRAGMA journal_mode = WAL;");
            }

            conn.execute_batch(&pragmas)
        });

        // Every connection to ":memory:" is a separate database, so keep exactly one
        let pool_size = if is_in_memory {
            1
        } else {
            num_cpus::get_physical() as u32 + 1
        };
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|cause| StorageError::Pool {
                path: db_file.to_string(),
                cause,
            })?;

        info!("Database pool created with {} connections", pool_size);

        let history = Self { pool };
        history.setup_database()?;
        Ok(history)
    }

    fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        Ok(self.pool.get()?)
    }

    fn setup_database(&self) -> Result<(), StorageError> {
        info!("Initializing database schema");
        let setup_queries = "BEGIN;

        CREATE TABLE IF NOT EXISTS backup_logs(
            backup_id        integer not null
                constraint backup_logs_pk
                    primary key autoincrement,
            user_id          integer not null,
            backup_type      TEXT    not null,
            ticket_number    TEXT,
            start_time       TEXT    not null,
            end_time         TEXT,
            duration         REAL,
            source_path      TEXT,
            destination_path TEXT,
            total_size       integer,
            total_files      integer,
            copied_files     integer,
            status           TEXT    not null default 'Em progresso');

        CREATE INDEX IF NOT EXISTS backup_logs_user_id_index
                on backup_logs (user_id);

        COMMIT;";

        let conn = self.get_connection()?;
        conn.execute_batch(setup_queries)
            .map_err(|cause| StorageError::Query {
                operation: "create tables".to_string(),
                cause,
            })?;
        add_missing_ticket_column(&conn)?;
        info!("Database schema initialized successfully");
        Ok(())
    }
}

/// Databases created before tickets were tracked lack the `ticket_number` column.
fn add_missing_ticket_column(conn: &Connection) -> Result<(), StorageError> {
    let query_error = |cause| StorageError::Query {
        operation: "inspect backup_logs columns".to_string(),
        cause,
    };

    let mut stmt = conn
        .prepare("PRAGMA table_info(backup_logs)")
        .map_err(query_error)?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(query_error)?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(query_error)?;

    if columns.iter().any(|column| column == "ticket_number") {
        return Ok(());
    }

    info!("Adding ticket_number column to backup_logs");
    conn.execute("ALTER TABLE backup_logs ADD COLUMN ticket_number TEXT", [])
        .map_err(|cause| StorageError::Query {
            operation: "add ticket_number column".to_string(),
            cause,
        })?;
    Ok(())
}

fn parse_time(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|time| time.with_timezone(&Local))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_record(row: &Row) -> rusqlite::Result<BackupLogRecord> {
    let end_time = match row.get::<_, Option<String>>(5)? {
        Some(_) => Some(parse_time(row, 5)?),
        None => None,
    };
    let status: String = row.get(12)?;
    let status = status
        .parse::<BackupStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, e.into()))?;

    Ok(BackupLogRecord {
        backup_id: row.get(0)?,
        user_id: row.get(1)?,
        backup_type: row.get(2)?,
        ticket_number: row.get(3)?,
        start_time: parse_time(row, 4)?,
        end_time,
        duration: row.get(6)?,
        source_path: row.get(7)?,
        destination_path: row.get(8)?,
        total_size: row.get(9)?,
        total_files: row.get(10)?,
        copied_files: row.get(11)?,
        status,
    })
}

impl HistoryRecorder for SqliteHistory {
    fn record(&self, entry: &BackupLogRecord) -> Result<i64, StorageError> {
        let conn = self.get_connection()?;
        let backup_id: i64 = conn
            .query_row(
                "INSERT INTO backup_logs (user_id, backup_type, ticket_number, start_time, end_time,
                     duration, source_path, destination_path, total_size, total_files, copied_files, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 RETURNING backup_id",
                rusqlite::params![
                    entry.user_id,
                    &entry.backup_type,
                    &entry.ticket_number,
                    entry.start_time.to_rfc3339(),
                    entry.end_time.map(|time| time.to_rfc3339()),
                    entry.duration,
                    &entry.source_path,
                    &entry.destination_path,
                    entry.total_size,
                    entry.total_files,
                    entry.copied_files,
                    entry.status.label(),
                ],
                |row| row.get(0),
            )
            .map_err(|cause| StorageError::Insert {
                table: "backup_logs".to_string(),
                cause,
            })?;

        debug!("Inserted backup log record {}", backup_id);
        Ok(backup_id)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<BackupLogRecord>, StorageError> {
        let conn = self.get_connection()?;
        let query_error = |cause| StorageError::Query {
            operation: "list recent backups".to_string(),
            cause,
        };

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM backup_logs ORDER BY backup_id DESC LIMIT ?1",
                SELECT_COLUMNS
            ))
            .map_err(query_error)?;

        let rows = stmt
            .query_map([limit as i64], map_record)
            .map_err(query_error)?;

        rows.collect::<rusqlite::Result<Vec<BackupLogRecord>>>()
            .map_err(query_error)
    }
}
