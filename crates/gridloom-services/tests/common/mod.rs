//! Shared test fixtures: a scripted in-memory remote source and a recording
//! notice sink.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use gridloom_core::{
    pk_to_string, record_pk, FieldMeta, FieldType, GridError, ListPage, ListParams, Record,
    RemoteSource, SchemaTree,
};
use gridloom_services::{NoticeLevel, NoticeSink};

/// In-memory remote source with a call log and save-failure injection.
pub struct MockSource {
    schema: SchemaTree,
    records: Mutex<Vec<Record>>,
    log: Mutex<Vec<String>>,
    fail_next_save: AtomicBool,
    next_pk: AtomicI64,
}

impl MockSource {
    pub fn new(schema: SchemaTree) -> Self {
        Self {
            schema,
            records: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
            fail_next_save: AtomicBool::new(false),
            next_pk: AtomicI64::new(1),
        }
    }

    pub fn with_records(self, records: Vec<Record>) -> Self {
        let max_pk = records
            .iter()
            .filter_map(|record| record_pk(record))
            .filter_map(Value::as_i64)
            .max()
            .unwrap_or(0);
        self.next_pk.store(max_pk + 1, Ordering::SeqCst);
        *self.records.lock() = records;
        self
    }

    /// Make the next create/update call fail with a validation error.
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    pub fn call_log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    fn check_save_failure(&self) -> gridloom_core::Result<()> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(GridError::Remote {
                status: 400,
                message: "validation failed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    async fn list(&self, table: &str, params: &ListParams) -> gridloom_core::Result<ListPage> {
        let query = params
            .to_pairs()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        self.log.lock().push(format!("list {}?{}", table, query));

        let records = self.records.lock().clone();
        Ok(ListPage {
            count: records.len() as u64,
            results: records,
        })
    }

    async fn create(&self, table: &str, body: &Record) -> gridloom_core::Result<Record> {
        self.log.lock().push(format!("create {}", table));
        self.check_save_failure()?;

        let mut stored = body.clone();
        if record_pk(&stored).is_none() {
            let pk = self.next_pk.fetch_add(1, Ordering::SeqCst);
            stored.insert("pk".to_string(), Value::from(pk));
        }
        self.records.lock().push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, table: &str, id: &str, body: &Record) -> gridloom_core::Result<Record> {
        self.log.lock().push(format!("update {}/{}", table, id));
        self.check_save_failure()?;

        let mut records = self.records.lock();
        let position = records
            .iter()
            .position(|record| record_pk(record).and_then(pk_to_string).as_deref() == Some(id));
        match position {
            Some(index) => {
                records[index] = body.clone();
                Ok(body.clone())
            }
            None => Err(GridError::NotFound(format!("{}/{}", table, id))),
        }
    }

    async fn delete(&self, table: &str, id: &str) -> gridloom_core::Result<()> {
        self.log.lock().push(format!("delete {}/{}", table, id));

        let mut records = self.records.lock();
        if let Some(position) = records
            .iter()
            .position(|record| record_pk(record).and_then(pk_to_string).as_deref() == Some(id))
        {
            records.remove(position);
            return Ok(());
        }

        // nested entity: drop the matching element from any collection field
        for record in records.iter_mut() {
            for (_, value) in record.iter_mut() {
                if let Value::Array(elements) = value {
                    elements.retain(|element| {
                        element
                            .as_object()
                            .and_then(record_pk)
                            .and_then(pk_to_string)
                            .as_deref()
                            != Some(id)
                    });
                }
            }
        }
        Ok(())
    }

    async fn options(&self, table: &str) -> gridloom_core::Result<SchemaTree> {
        self.log.lock().push(format!("options {}", table));
        Ok(self.schema.clone())
    }
}

/// Notice sink that records everything it is told.
#[derive(Default)]
pub struct RecordingNotices {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().clone()
    }
}

impl NoticeSink for RecordingNotices {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().push((level, message.to_string()));
    }
}

/// Order schema used across the controller tests: scalar fields plus a
/// one-to-many `items` collection.
pub fn order_schema() -> SchemaTree {
    let mut items = SchemaTree::new();
    items.insert("pk".into(), FieldMeta::scalar(FieldType::Integer));
    items.insert("sku".into(), FieldMeta::scalar(FieldType::String));
    items.insert("qty".into(), FieldMeta::scalar(FieldType::Integer));

    let mut schema = SchemaTree::new();
    schema.insert("pk".into(), FieldMeta::scalar(FieldType::Integer));
    schema.insert(
        "name".into(),
        FieldMeta::scalar(FieldType::String).required(),
    );
    schema.insert("items".into(), FieldMeta::collection(items));
    schema
}

pub fn to_record(value: serde_json::Value) -> Record {
    value.as_object().expect("object fixture").clone()
}
