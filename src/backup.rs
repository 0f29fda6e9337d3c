use crate::config::StoreConfig;
use crate::db;
use crate::model::Student;
use crate::repo::Repository;
use crate::store::GradeStore;
use anyhow::{anyhow, Context};
use rusqlite::Connection;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/store.sqlite3";
const STUDENTS_ENTRY: &str = "export/students.json";
pub const BUNDLE_FORMAT_V1: &str = "gradebook-workspace-v1";
pub const LEGACY_SQLITE_FORMAT: &str = "legacy-sqlite3";

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub student_count: usize,
    pub db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub collection: Option<String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

/// Zip bundle: manifest, a consistent database snapshot and every student
/// document in its stored shape.
pub fn export_workspace_bundle(repo: &Repository, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let snapshot_path = out_path.with_extension("snapshot.tmp");
    if snapshot_path.exists() {
        let _ = std::fs::remove_file(&snapshot_path);
    }
    repo.store()
        .snapshot_to(&snapshot_path)
        .context("failed to snapshot database")?;
    let snapshot = read_snapshot(&snapshot_path, repo.store().collection());
    let _ = std::fs::remove_file(&snapshot_path);
    let (db_bytes, students) = snapshot?;
    let db_sha256 = sha256_hex(&db_bytes);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "collection": repo.store().collection(),
        "studentCount": students.len(),
        "dbSha256": db_sha256,
    });

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DB_ENTRY, opts)
        .context("failed to start database entry")?;
    zip.write_all(&db_bytes)
        .context("failed to write database entry")?;

    zip.start_file(STUDENTS_ENTRY, opts)
        .context("failed to start students entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&students)
            .context("failed to serialize students")?
            .as_bytes(),
    )
    .context("failed to write students entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 3,
        student_count: students.len(),
        db_sha256,
    })
}

/// Lists documents from the snapshot itself so `students.json` and the
/// database entry describe the same state.
fn read_snapshot(path: &Path, collection: &str) -> anyhow::Result<(Vec<u8>, Vec<Student>)> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open snapshot {}", path.to_string_lossy()))?;
    let store = GradeStore::with_connection(conn, collection);
    let students = store
        .list_all()
        .context("failed to list students in snapshot")?;
    store.close().context("failed to close snapshot")?;
    let bytes = std::fs::read(path).context("failed to read database snapshot")?;
    Ok((bytes, students))
}

/// Replaces the workspace database. The caller must have closed its store
/// connection first.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
    store: &StoreConfig,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;

    let (db_bytes, summary) = match read_signature(in_path)? {
        sig if sig.starts_with(&[0x50, 0x4B, 0x03, 0x04]) => read_bundle(in_path)?,
        sig if sig == *SQLITE_HEADER => {
            let bytes = std::fs::read(in_path).with_context(|| {
                format!("failed to read sqlite backup {}", in_path.to_string_lossy())
            })?;
            (
                bytes,
                ImportSummary {
                    bundle_format_detected: LEGACY_SQLITE_FORMAT.to_string(),
                    collection: None,
                },
            )
        }
        _ => {
            return Err(anyhow!(
                "not a workspace bundle or sqlite database: {}",
                in_path.to_string_lossy()
            ))
        }
    };

    if let Some(c) = summary.collection.as_deref() {
        if c != store.collection {
            return Err(anyhow!(
                "bundle holds collection {}, workspace is configured for {}",
                c,
                store.collection
            ));
        }
    }

    let dst = db::db_path(workspace_path, store);
    let tmp_dst = dst.with_extension("importing");
    std::fs::write(&tmp_dst, &db_bytes).with_context(|| {
        format!(
            "failed to write temp database {}",
            tmp_dst.to_string_lossy()
        )
    })?;
    if let Err(e) = check_incoming(&tmp_dst, &store.collection) {
        let _ = std::fs::remove_file(&tmp_dst);
        return Err(e);
    }

    // Journal files of the replaced database must not be replayed onto the new one.
    for suffix in ["-wal", "-shm"] {
        let side = dst.with_file_name(format!("{}{}", store.database_file, suffix));
        if side.exists() {
            std::fs::remove_file(&side)
                .with_context(|| format!("failed to remove {}", side.to_string_lossy()))?;
        }
    }
    std::fs::rename(&tmp_dst, &dst).with_context(|| {
        format!(
            "failed to move imported database to {}",
            dst.to_string_lossy()
        )
    })?;

    Ok(summary)
}

/// The existing database is only replaced by one that holds the configured collection.
fn check_incoming(path: &Path, collection: &str) -> anyhow::Result<()> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open incoming database {}", path.to_string_lossy()))?;
    let found = db::has_collection(&conn, collection);
    conn.close()
        .map_err(|(_, e)| e)
        .context("failed to close incoming database")?;
    if !found.context("incoming file is not a readable database")? {
        return Err(anyhow!(
            "incoming database has no collection {}",
            collection
        ));
    }
    Ok(())
}

fn read_signature(path: &Path) -> anyhow::Result<[u8; 16]> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 16];
    let mut filled = 0;
    while filled < sig.len() {
        let n = f
            .read(&mut sig[filled..])
            .context("failed to read file signature")?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(sig)
}

fn read_bundle(in_path: &Path) -> anyhow::Result<(Vec<u8>, ImportSummary)> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut db_bytes = Vec::new();
    archive
        .by_name(DB_ENTRY)
        .with_context(|| format!("bundle missing {}", DB_ENTRY))?
        .read_to_end(&mut db_bytes)
        .context("failed to extract database entry")?;

    if let Some(expected) = manifest.get("dbSha256").and_then(|v| v.as_str()) {
        let actual = sha256_hex(&db_bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(anyhow!(
                "database checksum mismatch: manifest {}, bundle {}",
                expected,
                actual
            ));
        }
    }

    Ok((
        db_bytes,
        ImportSummary {
            bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
            collection: manifest
                .get("collection")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewStudent;

    fn seeded_repo(workspace: &Path) -> Repository {
        let repo = Repository::open(workspace, &StoreConfig::default()).expect("open repo");
        repo.add_student(NewStudent {
            student_id: "S1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555".into(),
            department: "CS".into(),
            year: "2".into(),
        })
        .expect("add");
        repo.add_course("S1", "Math", 88.0).expect("course");
        repo
    }

    #[test]
    fn bundle_roundtrip_restores_documents() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let bundle = tmp.path().join("out").join("grades.gbbackup.zip");

        let repo = seeded_repo(&src);
        let export = export_workspace_bundle(&repo, &bundle).expect("export");
        assert_eq!(export.bundle_format, BUNDLE_FORMAT_V1);
        assert_eq!(export.entry_count, 3);
        assert_eq!(export.student_count, 1);
        assert_eq!(export.db_sha256.len(), 64);

        let mut archive = ZipArchive::new(File::open(&bundle).expect("open")).expect("zip");
        let mut students = String::new();
        archive
            .by_name(STUDENTS_ENTRY)
            .expect("students entry")
            .read_to_string(&mut students)
            .expect("read students");
        let docs: serde_json::Value = serde_json::from_str(&students).expect("json");
        assert_eq!(docs[0]["student_id"], "S1");
        assert_eq!(docs[0]["courses"][0]["name"], "Math");

        let import = import_workspace_bundle(&bundle, &dst, &StoreConfig::default())
            .expect("import");
        assert_eq!(import.bundle_format_detected, BUNDLE_FORMAT_V1);
        assert_eq!(import.collection.as_deref(), Some("grades"));

        let restored = Repository::open(&dst, &StoreConfig::default()).expect("reopen");
        let s = restored.get_student("S1").expect("get").expect("present");
        assert_eq!(s.courses.len(), 1);
        assert_eq!(s.courses[0].grade, 88.0);
    }

    #[test]
    fn plain_sqlite_file_imports_as_legacy() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let repo = seeded_repo(&src);
        let copy = tmp.path().join("plain.sqlite3");
        repo.store().snapshot_to(&copy).expect("snapshot");

        let dst = tmp.path().join("dst");
        let import =
            import_workspace_bundle(&copy, &dst, &StoreConfig::default()).expect("import");
        assert_eq!(import.bundle_format_detected, LEGACY_SQLITE_FORMAT);
        let restored = Repository::open(&dst, &StoreConfig::default()).expect("reopen");
        assert!(restored.get_student("S1").expect("get").is_some());
    }

    #[test]
    fn bundle_from_other_collection_leaves_workspace_untouched() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bundle = tmp.path().join("grades.zip");
        let repo = seeded_repo(&tmp.path().join("src"));
        export_workspace_bundle(&repo, &bundle).expect("export");

        let spring = StoreConfig {
            collection: "spring".into(),
            ..StoreConfig::default()
        };
        let dst = tmp.path().join("dst");
        let existing = Repository::open(&dst, &spring).expect("open dst");
        existing
            .add_student(NewStudent {
                student_id: "KEEP".into(),
                name: "Kept".into(),
                email: "k@example.com".into(),
                phone: "1".into(),
                department: "Art".into(),
                year: "3".into(),
            })
            .expect("add");
        existing.close().expect("close");

        let e = import_workspace_bundle(&bundle, &dst, &spring).expect_err("mismatch");
        assert!(format!("{e:#}").contains("spring"));

        let after = Repository::open(&dst, &spring).expect("reopen");
        let ids: Vec<String> = after
            .get_all_students()
            .expect("list")
            .into_iter()
            .map(|s| s.student_id)
            .collect();
        assert_eq!(ids, vec!["KEEP"]);
        assert!(!db::db_path(&dst, &spring).with_extension("importing").exists());
    }

    #[test]
    fn legacy_file_without_collection_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let other = tmp.path().join("other.sqlite3");
        let conn = Connection::open(&other).expect("open");
        conn.execute("CREATE TABLE notes(body TEXT)", [])
            .expect("create table");
        drop(conn);

        let dst = tmp.path().join("dst");
        seeded_repo(&dst).close().expect("close");

        assert!(import_workspace_bundle(&other, &dst, &StoreConfig::default()).is_err());
        let after = Repository::open(&dst, &StoreConfig::default()).expect("reopen");
        assert!(after.get_student("S1").expect("get").is_some());
    }

    #[test]
    fn export_counts_match_snapshot() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let repo = seeded_repo(&tmp.path().join("src"));
        let bundle = tmp.path().join("b.zip");
        let export = export_workspace_bundle(&repo, &bundle).expect("export");
        assert_eq!(export.student_count, 1);
        assert!(!bundle.with_extension("snapshot.tmp").exists());
    }

    #[test]
    fn rejects_unknown_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let junk = tmp.path().join("junk.bin");
        std::fs::write(&junk, b"not a backup").expect("write");
        assert!(import_workspace_bundle(&junk, tmp.path(), &StoreConfig::default()).is_err());
    }
}
