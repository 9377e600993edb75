//! Single-row-edit table controller
//!
//! Drives the flatten/unflatten/merge engines against a paginated remote
//! source: owns pagination and filter/sort state, the single-active-edit
//! invariant, optimistic local row updates with snapshot rollback, and
//! refresh debouncing with stale-response protection.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;

use gridloom_core::{
    collection_paths, join_path, leaf_paths, pk_paths, pk_to_string, record_pk, FieldKind, FlatRow,
    ListPage, ListParams, Record, RemoteSource, RowKey, SchemaTree,
};
use gridloom_engine::{flatten, merge, resolve_deletable, unflatten};
use gridloom_query::{to_query_params, to_sort_param, FilterModel, SortClause};

use crate::edit_state::{transition, EditCommand, EditEvent, EditState};
use crate::error::{ServiceError, ServiceResult};
use crate::notices::{NoticeLevel, NoticeSink};
use crate::schema_cache::SchemaCache;

const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Loading lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
}

/// Controller for one grid backed by one remote table.
///
/// All methods take `&mut self`: the controller is driven by a single UI
/// event loop and never shared across tasks. The engines it calls are pure;
/// the only suspension points are the remote calls.
pub struct TableController {
    table: String,
    source: Arc<dyn RemoteSource>,
    schema_cache: Arc<SchemaCache>,
    notices: Arc<dyn NoticeSink>,

    page_size: usize,
    offset: usize,
    filter_model: IndexMap<String, FilterModel>,
    sorts: Vec<SortClause>,
    search: Option<String>,

    schema: Option<SchemaTree>,
    visible_columns: Option<Vec<String>>,
    included_paths: Vec<String>,
    raw_paths: Vec<String>,

    records: Vec<Record>,
    rows: Vec<FlatRow>,
    count: u64,
    phase: LoadPhase,

    edit: EditState,
    snapshot: Option<Vec<FlatRow>>,
    draft: Option<FlatRow>,
    draft_snapshot: Option<FlatRow>,

    /// Monotonically increasing fetch generation; a page is applied only if
    /// its generation still matches, so stale in-flight responses are
    /// discarded instead of relying on debounce timing alone.
    generation: u64,
    debounce: Duration,
}

impl TableController {
    pub fn new(
        table: impl Into<String>,
        source: Arc<dyn RemoteSource>,
        schema_cache: Arc<SchemaCache>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            table: table.into(),
            source,
            schema_cache,
            notices,
            page_size: DEFAULT_PAGE_SIZE,
            offset: 0,
            filter_model: IndexMap::new(),
            sorts: Vec::new(),
            search: None,
            schema: None,
            visible_columns: None,
            included_paths: Vec::new(),
            raw_paths: Vec::new(),
            records: Vec::new(),
            rows: Vec::new(),
            count: 0,
            phase: LoadPhase::Idle,
            edit: EditState::Idle,
            snapshot: None,
            draft: None,
            draft_snapshot: None,
            generation: 0,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn total_count(&self) -> u64 {
        self.count
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    pub fn schema(&self) -> Option<&SchemaTree> {
        self.schema.as_ref()
    }

    /// Initial load: fetch schema (through the injected cache) and the first
    /// page, then derive rows.
    #[tracing::instrument(skip(self), fields(table = %self.table))]
    pub async fn load(&mut self) -> ServiceResult<()> {
        self.phase = LoadPhase::Loading;
        self.ensure_schema().await?;
        self.refresh_now().await
    }

    /// Restrict the visible grid columns. Identity columns are always kept
    /// internally so edits and deletes can find their way home.
    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.visible_columns = Some(columns);
        if let Some(schema) = self.schema.take() {
            self.apply_schema(schema);
            self.rederive_rows();
        }
    }

    /// Replace the filter model. Invalidates any in-flight fetch.
    pub fn set_filter_model(&mut self, model: IndexMap<String, FilterModel>) {
        self.filter_model = model;
        self.offset = 0;
        self.generation += 1;
    }

    /// Replace the sort model. Invalidates any in-flight fetch.
    pub fn set_sorts(&mut self, sorts: Vec<SortClause>) {
        self.sorts = sorts;
        self.offset = 0;
        self.generation += 1;
    }

    /// Set the free-text search term. Invalidates any in-flight fetch.
    pub fn set_search(&mut self, search: Option<String>) {
        self.search = search;
        self.offset = 0;
        self.generation += 1;
    }

    /// Jump to a page offset. Invalidates any in-flight fetch.
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
        self.generation += 1;
    }

    /// Debounced refresh for pagination/filter/sort/search changes: waits
    /// out the debounce window, then fetches unless a newer change
    /// superseded this one while waiting.
    #[tracing::instrument(skip(self), fields(table = %self.table))]
    pub async fn refresh(&mut self) -> ServiceResult<()> {
        let generation = self.next_generation();
        tokio::time::sleep(self.debounce).await;
        if generation != self.generation {
            tracing::debug!(generation, latest = self.generation, "refresh superseded during debounce");
            return Ok(());
        }
        let page = self.fetch_page().await?;
        self.apply_page(generation, page);
        Ok(())
    }

    /// Begin editing an existing row. Rejected with a user-visible notice
    /// while another edit is active.
    pub fn begin_edit(&mut self, key: &RowKey) -> ServiceResult<()> {
        let Some(row) = self.rows.iter().find(|row| row.key() == key).cloned() else {
            return Err(ServiceError::RowNotFound(key.to_string()));
        };
        let (state, commands) = transition(self.edit.clone(), EditEvent::BeginEdit(key.clone()));
        let rejected = commands
            .iter()
            .any(|command| matches!(command, EditCommand::Reject(..)));
        self.edit = state;
        for command in commands {
            self.execute(command);
        }
        if rejected {
            return Err(ServiceError::EditInProgress);
        }
        self.draft_snapshot = Some(row.clone());
        self.draft = Some(row);
        Ok(())
    }

    /// Insert an empty placeholder row at the head of the list and begin
    /// editing it under the draft key.
    pub fn add_row(&mut self) -> ServiceResult<()> {
        self.start_draft(FlatRow::with_key(RowKey::draft()))
    }

    /// Like [`add_row`](Self::add_row), but seed the placeholder from an
    /// existing row with its primary keys stripped at every nesting level.
    pub fn copy_row(&mut self, key: &RowKey) -> ServiceResult<()> {
        let Some(template) = self.rows.iter().find(|row| row.key() == key) else {
            return Err(ServiceError::RowNotFound(key.to_string()));
        };
        let mut draft = FlatRow::with_key(RowKey::draft());
        for (path, value) in template.values() {
            draft.set(path.clone(), value.clone());
        }
        if let Some(schema) = &self.schema {
            for pk_path in pk_paths(schema) {
                draft.remove(&pk_path);
            }
        }
        self.start_draft(draft)
    }

    /// Write one cell of the row being edited. The grid row updates
    /// optimistically; nothing hits the network until [`save`](Self::save).
    pub fn set_cell(&mut self, path: &str, value: Value) -> ServiceResult<()> {
        let EditState::Editing(key) = self.edit.clone() else {
            return Err(ServiceError::NoActiveEdit);
        };
        let Some(draft) = self.draft.as_mut() else {
            return Err(ServiceError::NoActiveEdit);
        };
        draft.set(path.to_string(), value.clone());
        if let Some(row) = self.rows.iter_mut().find(|row| *row.key() == key) {
            row.set(path.to_string(), value);
        }
        Ok(())
    }

    /// Save the row being edited: a deep-equal no-op exits editing without a
    /// network call; otherwise the draft is unflattened, reconciled with the
    /// last-known record, and created or updated keyed by the presence of a
    /// primary key. On failure the rows roll back to the pre-edit snapshot
    /// and the edit stays active so the user can retry or cancel.
    #[tracing::instrument(skip(self), fields(table = %self.table))]
    pub async fn save(&mut self) -> ServiceResult<()> {
        if matches!(self.edit, EditState::Editing(_))
            && self.draft.is_some()
            && self.draft == self.draft_snapshot
        {
            tracing::debug!("no changes detected, exiting edit without a network call");
            let (state, commands) = transition(self.edit.clone(), EditEvent::Cancel);
            self.edit = state;
            for command in commands {
                self.execute(command);
            }
            return Ok(());
        }

        let (state, commands) = transition(self.edit.clone(), EditEvent::Save);
        self.edit = state;
        let mut submit = None;
        for command in commands {
            match command {
                EditCommand::SubmitDraft(key) => submit = Some(key),
                EditCommand::Reject(level, message) => {
                    self.notices.notify(level, message);
                    return Err(ServiceError::NoActiveEdit);
                }
                other => self.execute(other),
            }
        }
        let Some(_key) = submit else {
            return Ok(());
        };

        match self.submit_draft().await {
            Ok(()) => {
                let (state, commands) = transition(self.edit.clone(), EditEvent::SaveSucceeded);
                self.edit = state;
                for command in commands {
                    match command {
                        EditCommand::Refresh => self.refresh_now().await?,
                        other => self.execute(other),
                    }
                }
                Ok(())
            }
            Err(error) => {
                self.notices.notify(NoticeLevel::Error, &error.to_string());
                let (state, commands) = transition(self.edit.clone(), EditEvent::SaveFailed);
                self.edit = state;
                for command in commands {
                    match command {
                        // roll back the optimistic rows but keep the snapshot
                        // and draft so the user can retry or cancel
                        EditCommand::RestoreSnapshot => {
                            if let Some(rows) = &self.snapshot {
                                self.rows = rows.clone();
                            }
                        }
                        other => self.execute(other),
                    }
                }
                Err(error)
            }
        }
    }

    /// Abandon the active edit and restore the pre-edit rows.
    pub fn cancel(&mut self) -> ServiceResult<()> {
        let (state, commands) = transition(self.edit.clone(), EditEvent::Cancel);
        let rejected = commands
            .iter()
            .any(|command| matches!(command, EditCommand::Reject(..)));
        self.edit = state;
        for command in commands {
            self.execute(command);
        }
        if rejected {
            return Err(ServiceError::NoActiveEdit);
        }
        Ok(())
    }

    /// Delete the entities a row solely owns: one remote delete per level
    /// the resolver identifies, then a refresh.
    #[tracing::instrument(skip(self), fields(table = %self.table))]
    pub async fn delete_row(&mut self, key: &RowKey) -> ServiceResult<()> {
        if !self.edit.is_idle() {
            self.notices
                .notify(NoticeLevel::Warning, "finish the active edit before deleting");
            return Err(ServiceError::EditInProgress);
        }
        let Some(row) = self.rows.iter().find(|row| row.key() == key).cloned() else {
            return Err(ServiceError::RowNotFound(key.to_string()));
        };
        let Some(schema) = self.schema.clone() else {
            return Err(ServiceError::SchemaLoadFailed("schema not loaded".to_string()));
        };

        let targets = resolve_deletable(&row, &schema);
        if targets.is_empty() {
            self.notices.notify(
                NoticeLevel::Warning,
                "this row does not solely own a deletable entity",
            );
            return Ok(());
        }

        for (pk_path, pk_value) in &targets {
            let resource = self.resource_for(pk_path);
            let id = pk_to_string(pk_value).ok_or_else(|| {
                ServiceError::DeleteFailed(format!("unusable primary key at {}", pk_path))
            })?;
            tracing::info!(resource = %resource, id = %id, "deleting entity");
            if let Err(error) = self.source.delete(&resource, &id).await {
                self.notices.notify(NoticeLevel::Error, &error.to_string());
                return Err(ServiceError::DeleteFailed(error.to_string()));
            }
        }

        self.refresh_now().await
    }

    /// Map a resolved `pk` path to the REST resource addressing that level:
    /// the final collection segment for nested levels, the controller's own
    /// table at the top.
    fn resource_for(&self, pk_path: &str) -> String {
        match pk_path.rsplit_once('.') {
            Some((prefix, _)) => prefix
                .rsplit('.')
                .next()
                .unwrap_or(&self.table)
                .to_string(),
            None => self.table.clone(),
        }
    }

    fn execute(&mut self, command: EditCommand) {
        match command {
            EditCommand::SnapshotRows => self.snapshot = Some(self.rows.clone()),
            EditCommand::RestoreSnapshot => {
                if let Some(rows) = self.snapshot.take() {
                    self.rows = rows;
                }
            }
            EditCommand::DiscardSnapshot => {
                self.snapshot = None;
                self.draft = None;
                self.draft_snapshot = None;
            }
            EditCommand::Reject(level, message) => self.notices.notify(level, message),
            // async and flow-specific commands are interpreted at the call site
            EditCommand::InsertDraft | EditCommand::SubmitDraft(_) | EditCommand::Refresh => {}
        }
    }

    fn start_draft(&mut self, draft: FlatRow) -> ServiceResult<()> {
        let (state, commands) = transition(self.edit.clone(), EditEvent::BeginAdd);
        let rejected = commands
            .iter()
            .any(|command| matches!(command, EditCommand::Reject(..)));
        self.edit = state;
        for command in commands {
            match command {
                EditCommand::InsertDraft => self.rows.insert(0, draft.clone()),
                other => self.execute(other),
            }
        }
        if rejected {
            return Err(ServiceError::EditInProgress);
        }
        self.draft_snapshot = Some(draft.clone());
        self.draft = Some(draft);
        Ok(())
    }

    async fn ensure_schema(&mut self) -> ServiceResult<()> {
        if self.schema.is_some() {
            return Ok(());
        }
        if let Some(schema) = self.schema_cache.get(&self.table) {
            self.apply_schema(schema);
            return Ok(());
        }
        let schema = self
            .source
            .options(&self.table)
            .await
            .map_err(|error| ServiceError::SchemaLoadFailed(error.to_string()))?;
        self.schema_cache.set(&self.table, schema.clone());
        self.apply_schema(schema);
        Ok(())
    }

    fn apply_schema(&mut self, schema: SchemaTree) {
        let mut included = match &self.visible_columns {
            Some(columns) => columns.clone(),
            None => leaf_paths(&schema),
        };
        for pk_path in pk_paths(&schema) {
            if !included.contains(&pk_path) {
                included.push(pk_path);
            }
        }
        self.raw_paths = collection_paths(&schema);
        self.included_paths = included;
        self.schema = Some(schema);
    }

    fn list_params(&self) -> ListParams {
        let mut params = ListParams::new()
            .with_limit(self.page_size)
            .with_offset(self.offset);
        params.query.extend(to_query_params(&self.filter_model));
        if let Some(ordering) = to_sort_param(&self.sorts) {
            params.query.push(ordering);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push("search", search);
        }
        params
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    async fn fetch_page(&mut self) -> ServiceResult<ListPage> {
        self.phase = LoadPhase::Loading;
        self.source
            .list(&self.table, &self.list_params())
            .await
            .map_err(|error| {
                self.notices.notify(NoticeLevel::Error, &error.to_string());
                ServiceError::RefreshFailed(error.to_string())
            })
    }

    /// Apply a fetched page if it is still current. Stale responses (an
    /// older generation than the latest issued) are discarded.
    fn apply_page(&mut self, generation: u64, page: ListPage) -> bool {
        if generation != self.generation {
            tracing::debug!(
                generation,
                latest = self.generation,
                "discarding stale page response"
            );
            return false;
        }
        self.records = page.results;
        self.count = page.count;
        self.rederive_rows();
        self.phase = LoadPhase::Ready;
        tracing::info!(
            table = %self.table,
            records = self.records.len(),
            rows = self.rows.len(),
            total = self.count,
            "page applied"
        );
        true
    }

    async fn refresh_now(&mut self) -> ServiceResult<()> {
        let generation = self.next_generation();
        let page = self.fetch_page().await?;
        self.apply_page(generation, page);
        Ok(())
    }

    /// Rows are derived wholesale, never patched: any change to the backing
    /// record set re-runs the flatten engine.
    fn rederive_rows(&mut self) {
        let Some(schema) = &self.schema else {
            self.rows = Vec::new();
            return;
        };
        let prepared: Vec<Record> = self
            .records
            .iter()
            .map(|record| with_placeholders(record, schema, "", &self.raw_paths))
            .collect();
        self.rows = flatten(&prepared, schema, &self.included_paths, &self.raw_paths);
    }

    async fn submit_draft(&mut self) -> ServiceResult<()> {
        let draft = self.draft.clone().ok_or(ServiceError::NoActiveEdit)?;
        let schema = self
            .schema
            .clone()
            .ok_or_else(|| ServiceError::SchemaLoadFailed("schema not loaded".to_string()))?;

        let fragment = unflatten(&draft, &schema);
        match record_pk(&fragment).cloned() {
            Some(pk) => {
                let id = pk_to_string(&pk).ok_or_else(|| {
                    ServiceError::SaveFailed(format!("unusable primary key: {}", pk))
                })?;
                let base = self
                    .records
                    .iter()
                    .find(|record| record_pk(record) == Some(&pk));
                let body = match base {
                    // fold the form's values into the authoritative record
                    // first; merge then re-attaches untouched siblings
                    Some(base) => {
                        let edited = apply_edits(base, &fragment, &schema);
                        merge(&edited, &fragment, &schema)
                    }
                    None => fragment,
                };
                self.source
                    .update(&self.table, &id, &body)
                    .await
                    .map_err(|error| ServiceError::SaveFailed(error.to_string()))?;
            }
            None => {
                self.source
                    .create(&self.table, &fragment)
                    .await
                    .map_err(|error| ServiceError::SaveFailed(error.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Substitute a single empty element for empty or absent expanded
/// collections so the record still renders one editable row instead of
/// vanishing from the grid.
fn with_placeholders(record: &Record, schema: &SchemaTree, prefix: &str, raw: &[String]) -> Record {
    let mut out = record.clone();
    for (name, meta) in schema {
        let path = join_path(prefix, name);
        match &meta.kind {
            FieldKind::Scalar => {}
            FieldKind::Nested(children) => {
                if let Some(Value::Object(nested)) = record.get(name.as_str()) {
                    out.insert(
                        name.clone(),
                        Value::Object(with_placeholders(nested, children, &path, raw)),
                    );
                }
            }
            FieldKind::Collection(children) => {
                if !raw.iter().any(|p| p == &path) {
                    continue;
                }
                let elements = record.get(name.as_str()).and_then(Value::as_array);
                let replaced = match elements {
                    Some(elements) if !elements.is_empty() => elements
                        .iter()
                        .map(|element| match element.as_object() {
                            Some(object) => {
                                Value::Object(with_placeholders(object, children, &path, raw))
                            }
                            None => element.clone(),
                        })
                        .collect(),
                    _ => vec![Value::Object(Record::new())],
                };
                out.insert(name.clone(), Value::Array(replaced));
            }
        }
    }
    out
}

/// Fold an unflattened row fragment into the authoritative record, the
/// caller-side step the merge contract expects: edited values win, fields
/// the fragment does not carry keep their authoritative values, and
/// collection elements are targeted by primary key (key-less elements are
/// new).
fn apply_edits(base: &Record, edit: &Record, schema: &SchemaTree) -> Record {
    let mut out = base.clone();
    for (name, meta) in schema {
        let Some(edited) = edit.get(name.as_str()) else {
            continue;
        };
        match &meta.kind {
            FieldKind::Scalar => {
                out.insert(name.clone(), edited.clone());
            }
            FieldKind::Nested(children) => match (base.get(name.as_str()), edited) {
                (Some(Value::Object(known)), Value::Object(fresh)) => {
                    out.insert(
                        name.clone(),
                        Value::Object(apply_edits(known, fresh, children)),
                    );
                }
                _ => {
                    out.insert(name.clone(), edited.clone());
                }
            },
            FieldKind::Collection(children) => match (base.get(name.as_str()), edited) {
                (Some(Value::Array(known)), Value::Array(fresh)) => {
                    let mut elements = known.clone();
                    for element in fresh {
                        let Some(edited_element) = element.as_object() else {
                            continue;
                        };
                        let position = record_pk(edited_element).and_then(|pk| {
                            elements.iter().position(|candidate| {
                                candidate.as_object().and_then(record_pk) == Some(pk)
                            })
                        });
                        match position {
                            Some(index) => {
                                let known_element = elements[index].as_object().cloned();
                                if let Some(known_element) = known_element {
                                    elements[index] = Value::Object(apply_edits(
                                        &known_element,
                                        edited_element,
                                        children,
                                    ));
                                }
                            }
                            None => elements.push(element.clone()),
                        }
                    }
                    out.insert(name.clone(), Value::Array(elements));
                }
                _ => {
                    out.insert(name.clone(), edited.clone());
                }
            },
        }
    }
    out
}
