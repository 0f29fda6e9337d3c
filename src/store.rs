use crate::config::StoreConfig;
use crate::db;
use crate::model::{Course, NewStudent, Student};
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("student {0} already exists")]
    DuplicateKey(String),
    #[error("student {0} not found")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    ConnectionFailure(#[source] rusqlite::Error),
    #[error("stored document for {student_id} is malformed: {source}")]
    Corrupt {
        student_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("store query failed: {0}")]
    Query(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        let unreachable = matches!(
            e.sqlite_error_code(),
            Some(
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::NotADatabase
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::ReadOnly
            )
        );
        if unreachable {
            StoreError::ConnectionFailure(e)
        } else {
            StoreError::Query(e)
        }
    }
}

/// Statements for one collection, built once since the table name is not bindable.
#[derive(Debug)]
struct CollectionSql {
    find: String,
    list: String,
    insert: String,
    append: String,
}

impl CollectionSql {
    fn new(collection: &str) -> Self {
        Self {
            find: format!("SELECT doc FROM {} WHERE student_id = ?1", collection),
            list: format!("SELECT student_id, doc FROM {} ORDER BY rowid", collection),
            insert: format!(
                "INSERT INTO {}(student_id, doc) VALUES(?1, ?2)",
                collection
            ),
            // Single-statement array append: concurrent writers serialize on
            // SQLite's write lock and each sees the other's element.
            append: format!(
                "UPDATE {} SET doc = json_insert(doc, '$.courses[#]', json(?2)) WHERE student_id = ?1",
                collection
            ),
        }
    }
}

/// Student documents keyed by `student_id`, one JSON document per row.
pub struct GradeStore {
    conn: Connection,
    collection: String,
    sql: CollectionSql,
}

fn parse_doc(student_id: &str, doc: &str) -> Result<Student, StoreError> {
    serde_json::from_str(doc).map_err(|source| StoreError::Corrupt {
        student_id: student_id.to_string(),
        source,
    })
}

impl GradeStore {
    pub fn open(workspace: &Path, config: &StoreConfig) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace, config)?;
        Ok(Self::with_connection(conn, &config.collection))
    }

    /// Wraps a connection whose collection table already exists.
    pub fn with_connection(conn: Connection, collection: &str) -> Self {
        Self {
            conn,
            collection: collection.to_string(),
            sql: CollectionSql::new(collection),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn find(&self, student_id: &str) -> Result<Option<Student>, StoreError> {
        let doc: Option<String> = self
            .conn
            .prepare_cached(&self.sql.find)?
            .query_row([student_id], |r| r.get(0))
            .optional()?;
        doc.map(|d| parse_doc(student_id, &d)).transpose()
    }

    pub fn list_all(&self) -> Result<Vec<Student>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&self.sql.list)?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|(id, doc)| parse_doc(id, doc))
            .collect()
    }

    /// Uniqueness is enforced by the primary key, so a concurrent insert of
    /// the same id from another process also surfaces as `DuplicateKey`.
    pub fn insert(&self, student: NewStudent) -> Result<Student, StoreError> {
        let student = Student::from(student);
        let doc = serde_json::to_string(&student).map_err(StoreError::Encode)?;
        match self
            .conn
            .prepare_cached(&self.sql.insert)?
            .execute((&student.student_id, &doc))
        {
            Ok(_) => Ok(student),
            Err(e) if is_primary_key_violation(&e) => {
                Err(StoreError::DuplicateKey(student.student_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn append_course(&self, student_id: &str, course: &Course) -> Result<(), StoreError> {
        let item = serde_json::to_string(course).map_err(StoreError::Encode)?;
        let changed = self
            .conn
            .prepare_cached(&self.sql.append)?
            .execute((student_id, &item))?;
        if changed == 0 {
            return Err(StoreError::NotFound(student_id.to_string()));
        }
        Ok(())
    }

    /// Writes a consistent copy of the whole database (WAL included) to `out`.
    pub fn snapshot_to(&self, out: &Path) -> Result<(), StoreError> {
        self.conn
            .execute("VACUUM INTO ?1", [out.to_string_lossy().to_string()])?;
        Ok(())
    }

    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::from(e))
    }
}

fn is_primary_key_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(f, _) => {
            f.code == ErrorCode::ConstraintViolation
                && (f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}
