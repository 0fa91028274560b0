//! SQLite persistence for participants and chat logs.
//!
//! Participants live in one wide table whose answer columns are
//! generated from the shared field allow-list, so the schema can never
//! drift from what the API accepts. Timestamps are INTEGER epoch
//! milliseconds.

use crate::error::ApiError;
use rusqlite::{Connection, params};
use scribe_core::fields;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn unix_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn is_likert_field(name: &str) -> bool {
    !fields::RECORD_FIELDS.contains(&name)
}

fn column_type(name: &str) -> &'static str {
    match name {
        "sentence_count" | "word_count" | "task_page_elapsed_ms" | "follow_up_consent" => "INTEGER",
        f if is_likert_field(f) => "INTEGER",
        _ => "TEXT",
    }
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(&path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        let answer_columns: String = fields::allowed_fields()
            .iter()
            .map(|f| format!(",\n                {} {}", f, column_type(f)))
            .collect();

        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS participants (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                completed_at INTEGER,
                duration_seconds INTEGER{answer_columns}
            );

            CREATE TABLE IF NOT EXISTS chat_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                participant_id TEXT NOT NULL REFERENCES participants(id),
                turn_index INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_logs_participant
                ON chat_logs(participant_id, turn_index);
            "#
        ))?;
        Ok(())
    }

    /// Insert a new participant and return its id.
    pub fn create_participant(&self) -> Result<String, ApiError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO participants (id, created_at) VALUES (?1, ?2)",
            params![id, unix_millis()],
        )?;
        Ok(id)
    }

    pub fn participant_exists(&self, id: &str) -> Result<bool, ApiError> {
        let conn = self.conn.lock().unwrap();
        let exists = conn
            .prepare("SELECT 1 FROM participants WHERE id = ?1")?
            .exists(params![id])?;
        Ok(exists)
    }

    /// Merge answer fields into a participant row. Columns absent from
    /// the payload keep their current values. If the row vanished (for
    /// example the database was rotated mid-session), it is recreated so
    /// no answers are lost.
    pub fn update_fields(&self, id: &str, values: &Map<String, JsonValue>) -> Result<(), ApiError> {
        if values.is_empty() {
            return Err(ApiError::Validation("no persistable fields".to_string()));
        }

        let mut columns = Vec::with_capacity(values.len());
        let mut sql_values: Vec<rusqlite::types::Value> = Vec::with_capacity(values.len());
        for (name, value) in values {
            columns.push(name.as_str());
            sql_values.push(to_sql_value(name, value)?);
        }

        let conn = self.conn.lock().unwrap();

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c, i + 1))
            .collect();
        let update_sql = format!(
            "UPDATE participants SET {} WHERE id = ?{}",
            assignments.join(", "),
            columns.len() + 1
        );

        let mut update_params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(columns.len() + 1);
        for v in &sql_values {
            update_params.push(v);
        }
        update_params.push(&id);

        let changed = conn.execute(&update_sql, update_params.as_slice())?;
        if changed > 0 {
            return Ok(());
        }

        let created_at = unix_millis();
        let placeholders: Vec<String> = (1..=columns.len() + 2).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO participants (id, created_at, {}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut insert_params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(columns.len() + 2);
        insert_params.push(&id);
        insert_params.push(&created_at);
        for v in &sql_values {
            insert_params.push(v);
        }
        conn.execute(&insert_sql, insert_params.as_slice())?;
        Ok(())
    }

    /// Mark a participant completed. Idempotent: a second call returns
    /// the originally recorded duration.
    pub fn complete_participant(&self, id: &str) -> Result<u64, ApiError> {
        self.complete_participant_at(id, unix_millis())
    }

    fn complete_participant_at(&self, id: &str, now: i64) -> Result<u64, ApiError> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(i64, Option<i64>, Option<i64>)> = conn
            .query_row(
                "SELECT created_at, completed_at, duration_seconds FROM participants WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;

        let Some((created_at, completed_at, duration)) = row else {
            return Err(ApiError::NotFound);
        };

        if completed_at.is_some() {
            return Ok(duration.unwrap_or(0).max(0) as u64);
        }

        let seconds = ((now - created_at) / 1000).max(0);
        conn.execute(
            "UPDATE participants SET completed_at = ?1, duration_seconds = ?2 WHERE id = ?3",
            params![now, seconds, id],
        )?;
        Ok(seconds as u64)
    }

    pub fn append_chat_log(
        &self,
        participant_id: &str,
        turn_index: i64,
        role: &str,
        content: &str,
    ) -> Result<(), ApiError> {
        let conn = self.conn.lock().unwrap();
        let exists = conn
            .prepare("SELECT 1 FROM participants WHERE id = ?1")?
            .exists(params![participant_id])?;
        if !exists {
            return Err(ApiError::Validation("unknown participant_id".to_string()));
        }
        conn.execute(
            "INSERT INTO chat_logs (participant_id, turn_index, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![participant_id, turn_index, role, content, unix_millis()],
        )?;
        Ok(())
    }

    /// Read back one answer column as text (columns are trusted: callers
    /// pass allow-listed names only).
    pub fn field_text(&self, id: &str, column: &str) -> Result<Option<String>, ApiError> {
        if !fields::is_allowed(column) {
            return Err(ApiError::Validation(format!("unknown field {}", column)));
        }
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                &format!("SELECT CAST({} AS TEXT) FROM participants WHERE id = ?1", column),
                params![id],
                |row| row.get::<_, Option<String>>(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;
        Ok(value)
    }

    pub fn chat_log_count(&self, participant_id: &str) -> Result<usize, ApiError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_logs WHERE participant_id = ?1",
            params![participant_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn to_sql_value(name: &str, value: &JsonValue) -> Result<rusqlite::types::Value, ApiError> {
    use rusqlite::types::Value;

    if is_likert_field(name) {
        let Some(n) = value.as_i64() else {
            return Err(ApiError::Validation(format!(
                "field {} must be an integer",
                name
            )));
        };
        if !(1..=7).contains(&n) {
            return Err(ApiError::Validation(format!(
                "field {} must be between 1 and 7",
                name
            )));
        }
        return Ok(Value::Integer(n));
    }

    match value {
        JsonValue::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Real))
            .ok_or_else(|| ApiError::Validation(format!("field {} is not a number", name))),
        JsonValue::String(s) => Ok(Value::Text(s.clone())),
        _ => Err(ApiError::Validation(format!(
            "field {} has an unsupported type",
            name
        ))),
    }
}

#[cfg(test)]
impl Database {
    fn created_at(&self, id: &str) -> i64 {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT created_at FROM participants WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .unwrap()
    }
}
