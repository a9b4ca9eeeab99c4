// SPDX-License-Identifier: Apache-2.0

use crate::metadata::{FilterValueSummary, MetadataQuery, MetadataSession, MetadataStore};
use crate::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use niagads_model::{Assembly, Collection, GenomeBuild, Track};
use niagads_query::{FilterField, FilterOp, MetadataFilter, BIOSAMPLE_FIELDS};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::debug;

/// Tables read by [`SqliteMetadataStore`].
pub const METADATA_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS filertrack (
    track_id TEXT PRIMARY KEY,
    description TEXT,
    genome_build TEXT,
    feature_type TEXT,
    biosample_characteristics TEXT,
    biological_replicates TEXT,
    technical_replicates TEXT,
    antibody_target TEXT,
    assay TEXT,
    analysis TEXT,
    classification TEXT,
    data_category TEXT,
    output_type TEXT,
    is_lifted INTEGER,
    experiment_info TEXT,
    data_source TEXT,
    data_source_version TEXT,
    download_url TEXT,
    download_date TEXT,
    release_date TEXT,
    experiment_id TEXT,
    project TEXT,
    file_name TEXT,
    url TEXT,
    md5sum TEXT,
    bp_covered INTEGER,
    number_of_intervals INTEGER,
    file_size INTEGER,
    file_format TEXT,
    file_schema TEXT,
    searchable_text TEXT,
    is_shard INTEGER,
    shard_parent_track_id TEXT
);
CREATE TABLE IF NOT EXISTS filercollection (
    collection_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    tracks_are_sharded INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS filercollectiontracklink (
    collection_track_link_id INTEGER PRIMARY KEY,
    track_id TEXT NOT NULL REFERENCES filertrack(track_id),
    collection_id INTEGER NOT NULL REFERENCES filercollection(collection_id)
);
";

const TRACK_COLUMNS: &str = "t.track_id, t.description, t.genome_build, t.feature_type, \
    t.biosample_characteristics, t.biological_replicates, t.technical_replicates, \
    t.antibody_target, t.assay, t.analysis, t.classification, t.data_category, t.output_type, \
    t.is_lifted, t.experiment_info, t.data_source, t.data_source_version, t.download_url, \
    t.download_date, t.release_date, t.experiment_id, t.project, t.file_name, t.url, t.md5sum, \
    t.bp_covered, t.number_of_intervals, t.file_size, t.file_format, t.file_schema, t.is_shard, \
    t.shard_parent_track_id";

/// Read-only SQLite metadata store; at most `max_sessions` connections are checked out at once.
pub struct SqliteMetadataStore {
    path: PathBuf,
    sessions: Arc<Semaphore>,
    checkout_timeout: Duration,
}

impl SqliteMetadataStore {
    #[must_use]
    pub fn new(path: PathBuf, max_sessions: usize, checkout_timeout: Duration) -> Self {
        Self {
            path,
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
            checkout_timeout,
        }
    }

    #[must_use]
    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }
}

fn open_readonly(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(StoreError::database)?;
    conn.execute_batch("PRAGMA query_only=ON; PRAGMA temp_store=MEMORY;")
        .map_err(StoreError::database)?;
    Ok(conn)
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn checkout(&self) -> Result<Box<dyn MetadataSession>, StoreError> {
        let permit = timeout(self.checkout_timeout, self.sessions.clone().acquire_owned())
            .await
            .map_err(|_| {
                StoreError::new(
                    StoreErrorCode::Unavailable,
                    "timed out waiting for a metadata session",
                )
            })?
            .map_err(|e| StoreError::new(StoreErrorCode::Unavailable, e.to_string()))?;
        let path = self.path.clone();
        let conn = tokio::task::spawn_blocking(move || open_readonly(&path))
            .await
            .map_err(|e| StoreError::new(StoreErrorCode::Unavailable, e.to_string()))??;
        debug!(path = %self.path.display(), "metadata session checked out");
        Ok(Box::new(SqliteSession {
            conn,
            _permit: permit,
        }))
    }
}

struct SqliteSession {
    conn: Connection,
    _permit: OwnedSemaphorePermit,
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn text_params(values: &[String]) -> Vec<SqlValue> {
    values.iter().map(|v| SqlValue::Text(v.clone())).collect()
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    let biosample: Option<String> = row.get("biosample_characteristics")?;
    Ok(Track {
        track_id: row.get("track_id")?,
        description: row.get("description")?,
        genome_build: row.get("genome_build")?,
        feature_type: row.get("feature_type")?,
        biosample_characteristics: biosample.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        }),
        biological_replicates: row.get("biological_replicates")?,
        technical_replicates: row.get("technical_replicates")?,
        antibody_target: row.get("antibody_target")?,
        assay: row.get("assay")?,
        analysis: row.get("analysis")?,
        classification: row.get("classification")?,
        data_category: row.get("data_category")?,
        output_type: row.get("output_type")?,
        is_lifted: row.get("is_lifted")?,
        experiment_info: row.get("experiment_info")?,
        data_source: row.get("data_source")?,
        data_source_version: row.get("data_source_version")?,
        download_url: row.get("download_url")?,
        download_date: row.get("download_date")?,
        release_date: row.get("release_date")?,
        experiment_id: row.get("experiment_id")?,
        project: row.get("project")?,
        file_name: row.get("file_name")?,
        url: row.get("url")?,
        md5sum: row.get("md5sum")?,
        bp_covered: row.get("bp_covered")?,
        number_of_intervals: row.get("number_of_intervals")?,
        file_size: row.get("file_size")?,
        file_format: row.get("file_format")?,
        file_schema: row.get("file_schema")?,
        is_shard: row.get("is_shard")?,
        shard_parent_track_id: row.get("shard_parent_track_id")?,
    })
}

fn filter_clause(filter: &MetadataFilter, params: &mut Vec<SqlValue>) -> String {
    if filter.field == FilterField::Biosample {
        // biosample tests are always substring matches across the biosample keys
        let any_match = BIOSAMPLE_FIELDS
            .iter()
            .map(|key| {
                params.push(SqlValue::Text(format!("%{}%", filter.value)));
                format!("json_extract(t.biosample_characteristics, '$.{key}') LIKE ?")
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        return match filter.op {
            FilterOp::Neq => format!("NOT COALESCE(({any_match}), 0)"),
            FilterOp::Eq | FilterOp::Like => format!("({any_match})"),
        };
    }
    let column = filter.field.column();
    match filter.op {
        FilterOp::Eq => {
            params.push(SqlValue::Text(filter.value.clone()));
            format!("t.{column} = ?")
        }
        FilterOp::Neq => {
            params.push(SqlValue::Text(filter.value.clone()));
            format!("NOT (t.{column} = ?)")
        }
        FilterOp::Like => {
            params.push(SqlValue::Text(format!("%{}%", filter.value)));
            format!("t.{column} LIKE ?")
        }
    }
}

fn where_clause(query: &MetadataQuery, params: &mut Vec<SqlValue>) -> String {
    params.push(SqlValue::Text(query.assembly.as_str().to_string()));
    params.push(SqlValue::Text(query.assembly.filer_genome_build().to_string()));
    let mut clauses = vec!["t.genome_build IN (?, ?)".to_string()];
    for filter in &query.filters {
        clauses.push(filter_clause(filter, params));
    }
    if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
        let pattern = format!("%{}%", keyword.trim());
        params.push(SqlValue::Text(pattern.clone()));
        params.push(SqlValue::Text(pattern));
        clauses.push("(t.searchable_text LIKE ? OR t.antibody_target LIKE ?)".to_string());
    }
    clauses.join(" AND ")
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl SqliteSession {
    fn select_tracks(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Track>, StoreError> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(StoreError::database)?;
        let rows = stmt
            .query_map(params_from_iter(params), track_from_row)
            .map_err(StoreError::database)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::database)
    }
}

impl MetadataSession for SqliteSession {
    fn validate_tracks(&mut self, tracks: &[String]) -> Result<(), StoreError> {
        if tracks.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "SELECT track_id FROM filertrack WHERE track_id IN ({})",
            placeholders(tracks.len())
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::database)?;
        let found = stmt
            .query_map(params_from_iter(text_params(tracks)), |row| {
                row.get::<_, String>(0)
            })
            .map_err(StoreError::database)?
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(StoreError::database)?;
        let mut seen = BTreeSet::new();
        let missing: Vec<String> = tracks
            .iter()
            .filter(|t| !found.contains(*t) && seen.insert(t.as_str()))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::invalid_tracks(&missing))
        }
    }

    fn validate_collection(&mut self, name: &str) -> Result<i64, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT collection_id FROM filercollection WHERE lower(name) = lower(?1)")
            .map_err(StoreError::database)?;
        let mut rows = stmt
            .query_map([name], |row| row.get::<_, i64>(0))
            .map_err(StoreError::database)?;
        let first = rows.next();
        match first {
            Some(id) => id.map_err(StoreError::database),
            None => Err(StoreError::new(
                StoreErrorCode::InvalidCollection,
                format!("Invalid collection: {name}"),
            )),
        }
    }

    fn get_genome_build(
        &mut self,
        tracks: &[String],
        validate: bool,
    ) -> Result<GenomeBuild, StoreError> {
        if tracks.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::InvalidTrackId,
                "no track identifiers provided",
            ));
        }
        if validate {
            self.validate_tracks(tracks)?;
        }
        let sql = format!(
            "SELECT track_id, genome_build FROM filertrack WHERE track_id IN ({}) ORDER BY genome_build, track_id",
            placeholders(tracks.len())
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::database)?;
        let rows = stmt
            .query_map(params_from_iter(text_params(tracks)), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map_err(StoreError::database)?;
        let mut builds = BTreeMap::new();
        for row in rows {
            let (track_id, raw) = row.map_err(StoreError::database)?;
            let assembly = Assembly::parse(raw.as_deref().unwrap_or_default()).map_err(|_| {
                StoreError::new(
                    StoreErrorCode::Database,
                    format!("track {track_id} has no recognized genome build"),
                )
            })?;
            builds.insert(track_id, assembly);
        }
        let mut distinct = builds
            .values()
            .copied()
            .collect::<BTreeSet<Assembly>>()
            .into_iter();
        match (distinct.next(), distinct.next()) {
            (None, _) => Err(StoreError::invalid_tracks(tracks)),
            (Some(assembly), None) => Ok(GenomeBuild::Single(assembly)),
            _ => Ok(GenomeBuild::Mixed(builds)),
        }
    }

    fn get_track_metadata(
        &mut self,
        tracks: &[String],
        validate: bool,
    ) -> Result<Vec<Track>, StoreError> {
        if validate {
            self.validate_tracks(tracks)?;
        }
        if tracks.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM filertrack t WHERE t.track_id IN ({}) ORDER BY t.track_id",
            placeholders(tracks.len())
        );
        self.select_tracks(&sql, text_params(tracks))
    }

    fn get_collection_track_metadata(&mut self, name: &str) -> Result<Vec<Track>, StoreError> {
        let collection_id = self.validate_collection(name)?;
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM filertrack t \
             JOIN filercollectiontracklink l ON l.track_id = t.track_id \
             WHERE l.collection_id = ? ORDER BY t.track_id"
        );
        self.select_tracks(&sql, vec![SqlValue::Integer(collection_id)])
    }

    fn get_collections(&mut self) -> Result<Vec<Collection>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT c.name, c.description, COUNT(l.track_id) AS num_tracks \
                 FROM filercollection c JOIN filercollectiontracklink l ON l.collection_id = c.collection_id \
                 GROUP BY c.collection_id ORDER BY c.collection_id",
            )
            .map_err(StoreError::database)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Collection {
                    name: row.get(0)?,
                    description: row.get(1)?,
                    num_tracks: u64::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
                })
            })
            .map_err(StoreError::database)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::database)
    }

    fn query_track_metadata(&mut self, query: &MetadataQuery) -> Result<Vec<Track>, StoreError> {
        let mut params = Vec::new();
        let predicate = where_clause(query, &mut params);
        params.push(SqlValue::Integer(query.limit.map_or(-1, to_i64)));
        params.push(SqlValue::Integer(query.offset.map_or(0, to_i64)));
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM filertrack t WHERE {predicate} ORDER BY t.track_id LIMIT ? OFFSET ?"
        );
        self.select_tracks(&sql, params)
    }

    fn count_track_metadata(&mut self, query: &MetadataQuery) -> Result<u64, StoreError> {
        let mut params = Vec::new();
        let predicate = where_clause(query, &mut params);
        let sql = format!("SELECT COUNT(t.track_id) FROM filertrack t WHERE {predicate}");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params), |row| row.get(0))
            .map_err(StoreError::database)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn get_track_filter_summary(
        &mut self,
        field: FilterField,
        include_counts: bool,
    ) -> Result<Vec<FilterValueSummary>, StoreError> {
        let expr = if field == FilterField::Biosample {
            "json_extract(t.biosample_characteristics, '$.tissue_category')".to_string()
        } else {
            format!("t.{}", field.column())
        };
        let sql = format!(
            "SELECT CAST({expr} AS TEXT) AS value, COUNT(t.track_id) FROM filertrack t \
             WHERE {expr} IS NOT NULL GROUP BY value ORDER BY value"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::database)?;
        let rows = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok(FilterValueSummary {
                    value: row.get(0)?,
                    num_tracks: include_counts.then(|| u64::try_from(count).unwrap_or(0)),
                })
            })
            .map_err(StoreError::database)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::database)
    }
}
