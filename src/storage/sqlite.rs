//! SQLite-backed implementation of [`super::StorageBackend`].

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::ScoreError;
use crate::text::normalize_term;
use crate::types::{Band, FeatureQuantiles, FeedbackRequest, TermScoreHistoryItem, TermScoreResponse};

use super::StorageBackend;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS term_scores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    term TEXT NOT NULL,
    locale TEXT NOT NULL,
    sample_size INTEGER NOT NULL,
    eigen_ctx REAL NOT NULL,
    eigen_graph REAL NOT NULL,
    severity_mean REAL NOT NULL,
    targetedness_mean REAL NOT NULL,
    reclaimed_rate REAL NOT NULL,
    trend_velocity REAL NOT NULL,
    score REAL NOT NULL,
    confidence REAL NOT NULL,
    band TEXT NOT NULL,
    model_version TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_term_scores_term_created
    ON term_scores(term, created_at DESC);

CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    term TEXT NOT NULL,
    locale TEXT NOT NULL,
    feedback_type TEXT NOT NULL,
    proposed_band TEXT,
    proposed_score REAL,
    notes TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_feedback_term_created
    ON feedback(term, created_at DESC);
";

/// Linear-interpolation quantile over a sorted slice, matching `numpy.quantile`'s default method.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn band_to_str(band: Band) -> &'static str {
    match band {
        Band::Monitor => "monitor",
        Band::Review => "review",
        Band::Block => "block",
    }
}

fn band_from_str(value: &str) -> Band {
    match value {
        "block" => Band::Block,
        "review" => Band::Review,
        _ => Band::Monitor,
    }
}

pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(database_path: &Path) -> Result<Self, ScoreError> {
        if let Some(parent) = database_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ScoreError::Internal {
                reason: format!("failed to create database directory: {e}"),
            })?;
        }

        let connection = Connection::open(database_path)?;
        connection.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        connection.execute_batch(SCHEMA)?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn open_in_memory() -> Result<Self, ScoreError> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

impl StorageBackend for SqliteStore {
    fn save_term_score(&self, score: &TermScoreResponse) -> Result<i64, ScoreError> {
        let conn = self.connection.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO term_scores (
                term, locale, sample_size, eigen_ctx, eigen_graph,
                severity_mean, targetedness_mean, reclaimed_rate, trend_velocity,
                score, confidence, band, model_version, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )?;

        stmt.execute(params![
            normalize_term(&score.term),
            score.locale,
            score.sample_size as i64,
            score.eigen_ctx,
            score.eigen_graph,
            score.severity_mean,
            score.targetedness_mean,
            score.reclaimed_rate,
            score.trend_velocity,
            score.score,
            score.confidence,
            band_to_str(score.band),
            score.model_version,
            Utc::now(),
        ])?;

        Ok(conn.last_insert_rowid())
    }

    fn get_feature_quantiles(&self) -> Result<Option<FeatureQuantiles>, ScoreError> {
        const SAMPLE_LIMIT: i64 = 1000;
        const MIN_SAMPLES: usize = 40;

        let conn = self.connection.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT eigen_ctx, eigen_graph, score FROM term_scores ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![SAMPLE_LIMIT], |row| {
                Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?, row.get::<_, f64>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.len() < MIN_SAMPLES {
            return Ok(None);
        }

        let mut eigen_ctx: Vec<f64> = rows.iter().map(|r| r.0).collect();
        let mut eigen_graph: Vec<f64> = rows.iter().map(|r| r.1).collect();
        let mut scores: Vec<f64> = rows.iter().map(|r| r.2).collect();
        eigen_ctx.sort_by(|a, b| a.partial_cmp(b).unwrap());
        eigen_graph.sort_by(|a, b| a.partial_cmp(b).unwrap());
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mut quantiles = FeatureQuantiles::new();
        quantiles.insert("sample_count".to_string(), rows.len() as f64);
        quantiles.insert("eigen_ctx_p50".to_string(), quantile(&eigen_ctx, 0.5));
        quantiles.insert("eigen_ctx_p90".to_string(), quantile(&eigen_ctx, 0.9));
        quantiles.insert("eigen_graph_p50".to_string(), quantile(&eigen_graph, 0.5));
        quantiles.insert("eigen_graph_p90".to_string(), quantile(&eigen_graph, 0.9));
        quantiles.insert("score_p70".to_string(), quantile(&scores, 0.7));
        quantiles.insert("score_p90".to_string(), quantile(&scores, 0.9));
        Ok(Some(quantiles))
    }

    fn get_term_history(&self, term: &str, limit: usize) -> Result<Vec<TermScoreHistoryItem>, ScoreError> {
        let safe_limit = limit.clamp(1, 200) as i64;
        let conn = self.connection.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, term, locale, score, confidence, band, model_version, created_at
             FROM term_scores WHERE term = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;

        let history = stmt
            .query_map(params![normalize_term(term), safe_limit], |row| {
                Ok(TermScoreHistoryItem {
                    id: row.get(0)?,
                    term: row.get(1)?,
                    locale: row.get(2)?,
                    score: row.get(3)?,
                    confidence: row.get(4)?,
                    band: band_from_str(&row.get::<_, String>(5)?),
                    model_version: row.get(6)?,
                    created_at: row.get::<_, chrono::DateTime<Utc>>(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(history)
    }

    fn save_feedback(&self, feedback: &FeedbackRequest) -> Result<i64, ScoreError> {
        let conn = self.connection.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO feedback (term, locale, feedback_type, proposed_band, proposed_score, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        let feedback_type = match feedback.feedback_type {
            crate::types::FeedbackType::FalsePositive => "false_positive",
            crate::types::FeedbackType::FalseNegative => "false_negative",
            crate::types::FeedbackType::PolicyOverride => "policy_override",
            crate::types::FeedbackType::Other => "other",
        };
        let proposed_band = feedback.proposed_band.map(band_to_str);

        stmt.execute(params![
            normalize_term(&feedback.term),
            feedback.locale,
            feedback_type,
            proposed_band,
            feedback.proposed_score,
            feedback.notes,
            Utc::now(),
        ])?;

        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeedbackType, TermScoreResponse};

    fn sample_score(term: &str, score: f64) -> TermScoreResponse {
        TermScoreResponse {
            term: term.to_string(),
            locale: "en-US".to_string(),
            sample_size: 3,
            eigen_ctx: 0.1,
            eigen_graph: 0.2,
            severity_mean: 0.3,
            targetedness_mean: 0.4,
            reclaimed_rate: 0.0,
            trend_velocity: 0.0,
            score,
            confidence: 0.7,
            band: Band::Review,
            model_version: "fusion_v1".to_string(),
            warnings: vec![],
        }
    }

    #[test]
    fn save_and_fetch_history_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_term_score(&sample_score("widget", 0.5)).unwrap();
        store.save_term_score(&sample_score("widget", 0.6)).unwrap();

        let history = store.get_term_history("widget", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].term, "widget");
    }

    #[test]
    fn quantiles_are_none_below_min_samples() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.save_term_score(&sample_score("t", i as f64 / 10.0)).unwrap();
        }
        assert!(store.get_feature_quantiles().unwrap().is_none());
    }

    #[test]
    fn quantiles_appear_once_min_samples_reached() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..50 {
            store.save_term_score(&sample_score("t", (i % 10) as f64 / 10.0)).unwrap();
        }
        let quantiles = store.get_feature_quantiles().unwrap().unwrap();
        assert_eq!(quantiles.get("sample_count").copied(), Some(50.0));
    }

    #[test]
    fn feedback_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .save_feedback(&FeedbackRequest {
                term: "widget".to_string(),
                locale: "en-US".to_string(),
                feedback_type: FeedbackType::FalsePositive,
                proposed_band: Some(Band::Monitor),
                proposed_score: Some(0.1),
                notes: "looked fine".to_string(),
            })
            .unwrap();
        assert!(id >= 1);
    }
}
