//! Read-only access to the video catalog.
//!
//! The catalog lives in a SQLite table that some other process fills:
//!
//! ```sql
//! CREATE TABLE videos (file_name TEXT NOT NULL, cloudinary_url TEXT NOT NULL);
//! ```
//!
//! This crate never writes to it. Every lookup opens its own read-only
//! connection, runs one statement per token and drops the connection before
//! returning, so concurrent requests share nothing but the file.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, functions::FunctionFlags};
use serde::Serialize;
use thiserror::Error;

use crate::query;

/// One row of the `videos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    pub file_name: String,
    pub url: String,
}

/// Outcome of looking up every token of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    /// Matches for each token, concatenated in token order.
    pub videos: Vec<VideoRecord>,
    /// Tokens (spaces restored) that matched nothing.
    pub unmatched: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog database {path} is unavailable")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("catalog query failed")]
    Query(#[from] rusqlite::Error),
}

impl CatalogError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// SQLite's own `lower()` and `LIKE` only fold ASCII.
const LOWER_FN: &str = "lower_unicode";

const MATCH_BY_NAME: &str = r#"
    SELECT file_name, cloudinary_url
    FROM videos
    WHERE lower_unicode(file_name) LIKE ?1
"#;

/// Cloneable handle that opens a short-lived connection for each lookup.
#[derive(Debug, Clone)]
pub struct CatalogReader {
    db_path: PathBuf,
}

impl CatalogReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            db_path: path.as_ref().to_path_buf(),
        }
    }

    /// Builds a reader from a `DATABASE_URL` style string: a plain path,
    /// `sqlite://path` or `sqlite:path`.
    pub fn from_url(url: &str) -> Self {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        Self::new(path)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&Connection) -> Result<T, CatalogError>,
    {
        // Read-only and never created: a missing file is an unavailable
        // store, not an empty one.
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| self.unavailable(source))?;
        // Opening is lazy; the first read is what rejects a file that is not
        // a database.
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|source| self.unavailable(source))?;
        conn.create_scalar_function(
            LOWER_FN,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|value| value.to_lowercase())),
        )?;
        f(&conn)
    }

    fn unavailable(&self, source: rusqlite::Error) -> CatalogError {
        CatalogError::Unavailable {
            path: self.db_path.clone(),
            source,
        }
    }

    /// Runs one case-insensitive substring match per token.
    ///
    /// Rows for a token come back in the table's scan order; runs are
    /// concatenated in token order. The first failing statement aborts the
    /// whole lookup.
    pub fn lookup(&self, tokens: &[String]) -> Result<Lookup, CatalogError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(MATCH_BY_NAME)?;
            let mut lookup = Lookup::default();

            for token in tokens {
                let pattern = format!("%{token}%");
                let mut rows = stmt.query([pattern.as_str()])?;
                let before = lookup.videos.len();
                while let Some(row) = rows.next()? {
                    lookup.videos.push(VideoRecord {
                        file_name: row.get(0)?,
                        url: row.get(1)?,
                    });
                }
                if lookup.videos.len() == before {
                    lookup.unmatched.push(query::restore_spaces(token));
                }
            }

            Ok(lookup)
        })
    }
}

/// Creates a catalog file holding `rows`, in insertion order.
#[cfg(test)]
pub(crate) fn seed_catalog(path: &Path, rows: &[(&str, &str)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE videos (file_name TEXT NOT NULL, cloudinary_url TEXT NOT NULL);",
    )
    .unwrap();
    for (name, url) in rows {
        conn.execute(
            "INSERT INTO videos (file_name, cloudinary_url) VALUES (?1, ?2)",
            [name, url],
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn sample_catalog() -> (tempfile::TempDir, CatalogReader) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("videos.db");
        seed_catalog(
            &path,
            &[
                ("Dog_Park", "https://cdn.example/dog_park.mp4"),
                ("cat_nap", "https://cdn.example/cat_nap.mp4"),
                ("hot_dog_stand", "https://cdn.example/hot_dog.mp4"),
                ("Big_Cat", "https://cdn.example/big_cat.mp4"),
            ],
        );
        (dir, CatalogReader::new(path))
    }

    #[test]
    fn from_url_strips_sqlite_scheme() {
        assert_eq!(
            CatalogReader::from_url("sqlite:///srv/videos.db").db_path(),
            Path::new("/srv/videos.db")
        );
        assert_eq!(
            CatalogReader::from_url("sqlite:videos.db").db_path(),
            Path::new("videos.db")
        );
        assert_eq!(
            CatalogReader::from_url("/srv/videos.db").db_path(),
            Path::new("/srv/videos.db")
        );
    }

    #[test]
    fn lookup_matches_substrings_case_insensitively() {
        let (_dir, reader) = sample_catalog();
        let lookup = reader.lookup(&tokens(&["cat"])).unwrap();
        let names: Vec<_> = lookup.videos.iter().map(|v| v.file_name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"cat_nap"));
        assert!(names.contains(&"Big_Cat"));
        assert!(lookup.unmatched.is_empty());
    }

    #[test]
    fn lookup_keeps_token_order() {
        let (_dir, reader) = sample_catalog();
        let lookup = reader.lookup(&tokens(&["cat", "dog"])).unwrap();
        assert_eq!(lookup.videos.len(), 4);
        let (cats, dogs) = lookup.videos.split_at(2);
        assert!(cats.iter().all(|v| v.file_name.to_lowercase().contains("cat")));
        assert!(dogs.iter().all(|v| v.file_name.to_lowercase().contains("dog")));
    }

    #[test]
    fn lookup_counts_overlapping_matches_per_token() {
        let (_dir, reader) = sample_catalog();
        let lookup = reader.lookup(&tokens(&["dog", "_"])).unwrap();
        assert_eq!(lookup.videos.len(), 2 + 4);
    }

    #[test]
    fn lookup_reports_unmatched_tokens_with_spaces() {
        let (_dir, reader) = sample_catalog();
        let lookup = reader
            .lookup(&tokens(&["zebra", "cat", "red_panda"]))
            .unwrap();
        assert_eq!(lookup.videos.len(), 2);
        assert_eq!(lookup.unmatched, vec!["zebra", "red panda"]);
    }

    #[test]
    fn lookup_with_no_tokens_is_empty() {
        let (_dir, reader) = sample_catalog();
        assert_eq!(reader.lookup(&[]).unwrap(), Lookup::default());
    }

    #[test]
    fn missing_database_is_unavailable() {
        let dir = tempdir().unwrap();
        let reader = CatalogReader::new(dir.path().join("absent.db"));
        let err = reader.lookup(&tokens(&["cat"])).unwrap_err();
        assert!(err.is_unavailable());
        assert!(!dir.path().join("absent.db").exists());
    }

    #[test]
    fn lookup_folds_non_ascii_case() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("videos.db");
        seed_catalog(
            &path,
            &[
                ("École_tour", "https://cdn.example/ecole.mp4"),
                ("ÜBER_cats", "https://cdn.example/uber.mp4"),
                ("ecole_plain", "https://cdn.example/plain.mp4"),
            ],
        );
        let lookup = CatalogReader::new(path)
            .lookup(&query::tokenize("École über"))
            .unwrap();
        let names: Vec<_> = lookup.videos.iter().map(|v| v.file_name.as_str()).collect();
        assert_eq!(names, vec!["École_tour", "ÜBER_cats"]);
        assert!(lookup.unmatched.is_empty());
    }

    #[test]
    fn non_database_file_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("videos.db");
        std::fs::write(&path, "this is a plain text file, not a catalog\n".repeat(64)).unwrap();
        let err = CatalogReader::new(path)
            .lookup(&tokens(&["cat"]))
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn missing_table_is_a_query_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (id INTEGER);")
            .unwrap();
        let err = CatalogReader::new(path)
            .lookup(&tokens(&["cat"]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Query(_)));
    }
}
