//! Durable record storage

use crate::{lock, open_connection, StoreError};
use intake_domain::traits::{RecordFilter, RecordStore};
use intake_domain::{Record, RecordId, SourceType, TOMBSTONE_KEY};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

const RECORD_COLUMNS: &str = "id, source_type, source_url, scrape_id, analysis_id, tags, metadata, seo_slug, seo_enabled, created_at";

/// SQLite-based implementation of `RecordStore`
///
/// Tags and metadata are stored as JSON text. Tombstone filtering reads the
/// marker straight out of the metadata column, so there is no second copy of
/// deletion state to keep in sync.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the store at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            conn: open_connection(path)?,
        })
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
        let source_type: String = row.get(1)?;
        let source_type = SourceType::parse(&source_type).ok_or_else(|| {
            conversion_error(1, StoreError::InvalidData(format!("Unknown source type: {}", source_type)))
        })?;

        let tags: String = row.get(5)?;
        let tags: Vec<String> = serde_json::from_str(&tags)
            .map_err(|e| conversion_error(5, StoreError::InvalidData(e.to_string())))?;

        let metadata: String = row.get(6)?;
        let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)
            .map_err(|e| conversion_error(6, StoreError::InvalidData(e.to_string())))?;

        Ok(Record {
            id: RecordId::new(row.get::<_, String>(0)?),
            source_type,
            source_url: row.get(2)?,
            scrape_id: row.get(3)?,
            analysis_id: row.get(4)?,
            tags,
            metadata,
            seo_slug: row.get(7)?,
            seo_enabled: row.get::<_, i64>(8)? != 0,
            created_at: row.get::<_, i64>(9)? as u64,
        })
    }
}

fn conversion_error(column: usize, e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

impl RecordStore for SqliteRecordStore {
    type Error = StoreError;

    fn save(&self, record: &Record) -> Result<RecordId, Self::Error> {
        let tags = serde_json::to_string(&record.tags)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let metadata = serde_json::to_string(&record.metadata)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO records (id, source_type, source_url, scrape_id, analysis_id, tags, metadata, seo_slug, seo_enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
             source_type = excluded.source_type, source_url = excluded.source_url,
             scrape_id = excluded.scrape_id, analysis_id = excluded.analysis_id,
             tags = excluded.tags, metadata = excluded.metadata,
             seo_slug = excluded.seo_slug, seo_enabled = excluded.seo_enabled",
            params![
                record.id.as_str(),
                record.source_type.as_str(),
                &record.source_url,
                &record.scrape_id,
                &record.analysis_id,
                tags,
                metadata,
                &record.seo_slug,
                record.seo_enabled as i64,
                record.created_at as i64,
            ],
        )?;

        Ok(record.id.clone())
    }

    fn get(&self, id: &RecordId) -> Result<Option<Record>, Self::Error> {
        let conn = lock(&self.conn)?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS),
                params![id.as_str()],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn filter(&self, filter: &RecordFilter) -> Result<Vec<Record>, Self::Error> {
        let mut sql = format!("SELECT {} FROM records WHERE 1=1", RECORD_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(source_type) = filter.source_type {
            sql.push_str(" AND source_type = ?");
            params.push(Box::new(source_type.as_str()));
        }

        if let Some(tag) = &filter.tag {
            sql.push_str(" AND EXISTS (SELECT 1 FROM json_each(records.tags) WHERE json_each.value = ?)");
            params.push(Box::new(tag.clone()));
        }

        if let Some(tombstoned) = filter.tombstoned {
            let op = if tombstoned { "IS NOT NULL" } else { "IS NULL" };
            sql.push_str(&format!(
                " AND json_extract(metadata, '$.{}') {}",
                TOMBSTONE_KEY, op
            ));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let records = stmt
            .query_map(&param_refs[..], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn delete(&self, id: &RecordId) -> Result<bool, Self::Error> {
        let conn = lock(&self.conn)?;
        let removed = conn.execute("DELETE FROM records WHERE id = ?1", params![id.as_str()])?;
        Ok(removed > 0)
    }
}
