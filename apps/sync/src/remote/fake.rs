//! In-memory `Remote` double for service tests. Records every call and can
//! be scripted to fail in the shapes the sync algorithms care about:
//! total outage, schema mismatch on upsert, or per-row update failures.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::remote::Remote;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Select { table: String },
    Upsert { table: String, rows: usize },
    InsertIgnore { table: String, rows: usize },
    Update { table: String, id: String },
    Delete { table: String, id: String },
}

#[derive(Default)]
pub struct FakeRemote {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    pub calls: Mutex<Vec<Call>>,
    /// Every select fails with a 500.
    pub fail_selects: bool,
    /// Every upsert fails with a 500.
    pub fail_upserts: bool,
    /// Every upsert fails with a schema mismatch (missing `updated_at`).
    pub schema_mismatch_on_upsert: bool,
    /// Inserts (ignore-duplicates path) fail with a 500.
    pub fail_insert_ignore: bool,
    /// Updates fail for these ids only.
    pub fail_update_ids: HashSet<String>,
    /// Every update fails.
    pub fail_all_updates: bool,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: &str, row: Value) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn upsert_batch_sizes(&self, table: &str) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Upsert { table: t, rows } if t == table => Some(*rows),
                _ => None,
            })
            .collect()
    }

    pub fn select_count(&self, table: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::Select { table: t } if t == table))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn merge_row(rows: &mut Vec<Value>, row: &Value, ignore_duplicates: bool) {
        let id = row.get("id").cloned();
        if let Some(existing) = rows.iter_mut().find(|r| r.get("id") == id.as_ref()) {
            if !ignore_duplicates {
                *existing = row.clone();
            }
        } else {
            rows.push(row.clone());
        }
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn select_owned(&self, table: &str, user_id: Uuid) -> Result<Vec<Value>, AppError> {
        self.record(Call::Select {
            table: table.to_string(),
        });
        if self.fail_selects {
            return Err(AppError::Api {
                status: 500,
                message: "select unavailable".to_string(),
            });
        }
        let uid = user_id.to_string();
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|r| r.get("user_id").and_then(|v| v.as_str()) == Some(uid.as_str()))
            .collect())
    }

    async fn upsert(
        &self,
        table: &str,
        rows: &[Value],
        _on_conflict: &str,
    ) -> Result<(), AppError> {
        self.record(Call::Upsert {
            table: table.to_string(),
            rows: rows.len(),
        });
        if self.schema_mismatch_on_upsert {
            return Err(AppError::SchemaMismatch(
                "Could not find the 'updated_at' column".to_string(),
            ));
        }
        if self.fail_upserts {
            return Err(AppError::Api {
                status: 500,
                message: "upsert unavailable".to_string(),
            });
        }
        let mut tables = self.tables.lock().unwrap();
        let stored = tables.entry(table.to_string()).or_default();
        for row in rows {
            Self::merge_row(stored, row, false);
        }
        Ok(())
    }

    async fn insert_ignore(&self, table: &str, rows: &[Value]) -> Result<(), AppError> {
        self.record(Call::InsertIgnore {
            table: table.to_string(),
            rows: rows.len(),
        });
        if self.fail_insert_ignore {
            return Err(AppError::Api {
                status: 500,
                message: "insert unavailable".to_string(),
            });
        }
        let mut tables = self.tables.lock().unwrap();
        let stored = tables.entry(table.to_string()).or_default();
        for row in rows {
            Self::merge_row(stored, row, true);
        }
        Ok(())
    }

    async fn update_by_id(&self, table: &str, id: &str, patch: &Value) -> Result<(), AppError> {
        self.record(Call::Update {
            table: table.to_string(),
            id: id.to_string(),
        });
        if self.fail_all_updates || self.fail_update_ids.contains(id) {
            return Err(AppError::Api {
                status: 500,
                message: format!("update of {id} unavailable"),
            });
        }
        let mut tables = self.tables.lock().unwrap();
        let stored = tables.entry(table.to_string()).or_default();
        if let Some(row) = stored
            .iter_mut()
            .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
        {
            if let (Some(row_obj), Some(patch_obj)) = (row.as_object_mut(), patch.as_object()) {
                for (k, v) in patch_obj {
                    row_obj.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Result<u64, AppError> {
        self.record(Call::Delete {
            table: table.to_string(),
            id: id.to_string(),
        });
        let mut tables = self.tables.lock().unwrap();
        let stored = tables.entry(table.to_string()).or_default();
        let before = stored.len();
        stored.retain(|r| r.get("id").and_then(|v| v.as_str()) != Some(id));
        Ok((before - stored.len()) as u64)
    }
}
