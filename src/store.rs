use crate::errors::{AppError, ResultExt};
use crate::gateway::Gateway;
use crate::models::{Entity, EntityKind, FieldLabel, Filter, Note, StatusUpdateStyle};
use crate::phone;
use crate::render::{Cell, Renderer, RowView, Severity, StatusCell, TableView};
use crate::shell::{ActivationToken, Page, PageController};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Derives the dynamic column schema from the loaded collection.
///
/// Scans every entity's `original_list_labels`, keeping the first-seen label
/// text per unique field name; iteration order is first appearance across
/// the collection. Recomputed on every render: the schema is a function of
/// current data, not a fixed contract.
pub fn derive_columns(entities: &[Entity]) -> Vec<FieldLabel> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for entity in entities {
        for label in &entity.original_list_labels {
            if seen.insert(label.name.clone()) {
                columns.push(label.clone());
            }
        }
    }
    columns
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn entity_matches(entity: &Entity, needle: &str) -> bool {
    if entity.id.to_lowercase().contains(needle)
        || entity.status.to_lowercase().contains(needle)
        || entity.original_list_name.to_lowercase().contains(needle)
    {
        return true;
    }
    entity
        .custom_fields
        .values()
        .filter_map(value_text)
        .any(|text| text.to_lowercase().contains(needle))
}

/// Applies the filter over the cached collection.
///
/// Pure and idempotent; called on every keystroke. Clauses are conjunctive,
/// order is preserved, and no client-side sorting is applied beyond what the
/// API returned.
pub fn apply_filter<'a>(entities: &'a [Entity], filter: &Filter) -> Vec<&'a Entity> {
    let needle = filter.search.trim().to_lowercase();
    entities
        .iter()
        .filter(|e| filter.status.is_empty() || e.status == filter.status)
        .filter(|e| needle.is_empty() || entity_matches(e, &needle))
        .collect()
}

fn custom_field_cell(column: &FieldLabel, entity: &Entity) -> Cell {
    let Some(text) = entity.custom_fields.get(&column.name).and_then(value_text) else {
        return Cell::Missing;
    };
    if phone::is_phone_field(&column.name) {
        Cell::Phone {
            display: phone::mask_number(&text),
            dial: phone::normalize_number(&text),
        }
    } else {
        Cell::Text { value: text }
    }
}

/// Note text typed into the dialog but not yet saved.
#[derive(Debug, Clone)]
pub struct PendingNote {
    pub entity_id: String,
    pub content: String,
}

/// Data backing the notes modal for one entity.
#[derive(Debug, Clone)]
pub struct NotesDialogView {
    pub entity_id: String,
    pub status: String,
    pub status_options: Vec<String>,
    pub notes: Vec<Note>,
}

/// The client-side controller pattern, instantiated once per entity kind.
///
/// Holds the in-memory cached list (insertion order = API response order),
/// the active filter, and note text staged in the dialog. All mutation goes
/// through the gateway; the cache is only updated after a write succeeds.
pub struct EntityStore {
    kind: EntityKind,
    gateway: Arc<Gateway>,
    renderer: Arc<dyn Renderer>,
    cache: Vec<Entity>,
    filter: Filter,
    pending_note: Option<PendingNote>,
    activation: ActivationToken,
}

impl EntityStore {
    pub fn new(kind: EntityKind, gateway: Arc<Gateway>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            kind,
            gateway,
            renderer,
            cache: Vec::new(),
            filter: Filter::default(),
            pending_note: None,
            activation: ActivationToken::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn cache(&self) -> &[Entity] {
        &self.cache
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Replaces the active filter and re-renders from the current cache.
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.render();
    }

    /// Fetches the full collection and replaces the cache wholesale.
    ///
    /// Every load is a full resync; there is no incremental merge. A load
    /// that completes after the page was deactivated is discarded.
    pub async fn load(&mut self) -> Result<(), AppError> {
        let payload = self
            .gateway
            .get(self.kind.collection_path())
            .await
            .context(format!("Loading {} list", self.kind.label()))?;

        if self.activation.is_cancelled() {
            tracing::debug!("Discarding stale {} load", self.kind.label());
            return Ok(());
        }

        let entities: Vec<Entity> =
            serde_json::from_value(payload).map_err(|e| AppError::RequestFailed {
                status: 200,
                message: format!("Unexpected {} collection payload: {}", self.kind.label(), e),
            })?;

        tracing::info!("Loaded {} {} records", entities.len(), self.kind.label());
        self.cache = entities;
        self.render();
        Ok(())
    }

    /// Builds the table view: data-derived header, one row per filtered
    /// entity, phone-classified cells masked for display.
    pub fn view(&self) -> TableView {
        let columns = derive_columns(&self.cache);
        let options: Vec<String> = self
            .kind
            .status_options()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = apply_filter(&self.cache, &self.filter)
            .into_iter()
            .map(|entity| RowView {
                id: entity.id.clone(),
                cells: columns
                    .iter()
                    .map(|column| custom_field_cell(column, entity))
                    .collect(),
                status: Some(StatusCell {
                    current: entity.status.clone(),
                    options: options.clone(),
                }),
                created: entity
                    .created_at
                    .map(|dt| dt.format("%Y-%m-%d").to_string()),
            })
            .collect();
        TableView {
            kind_label: self.kind.label().to_string(),
            columns,
            rows,
        }
    }

    pub fn render(&self) {
        self.renderer.render_table(&self.view());
    }

    fn notes_path(&self, id: &str) -> String {
        format!("{}/{}/notes", self.kind.collection_path(), id)
    }

    fn position_of(&self, id: &str) -> Result<usize, AppError> {
        self.cache
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AppError::ValidationFailed(format!("Unknown {} id", self.kind.label())))
    }

    /// Mutates an entity's status: write first, reflect in the cache only
    /// after the write succeeds. On failure the cache stays untouched and
    /// the re-render resets the selector to the last known-good value.
    pub async fn update_status(&mut self, id: &str, new_status: &str) -> Result<(), AppError> {
        if !self.kind.status_options().contains(&new_status) {
            return Err(AppError::ValidationFailed(format!(
                "\"{}\" is not a {} status",
                new_status,
                self.kind.label()
            )));
        }
        let position = self.position_of(id)?;

        let write = match self.kind.status_update_style() {
            StatusUpdateStyle::NotesPost => {
                self.gateway
                    .post(&self.notes_path(id), &json!({ "status": new_status }))
                    .await
            }
            StatusUpdateStyle::StatusPatch => {
                let path = format!("{}/{}/status", self.kind.collection_path(), id);
                self.gateway.patch(&path, &json!({ "status": new_status })).await
            }
        };

        if let Err(e) = write {
            self.render();
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }

        self.cache[position].status = new_status.to_string();
        self.render();
        Ok(())
    }

    /// Data for the notes modal.
    pub fn notes_dialog(&self, id: &str) -> Option<NotesDialogView> {
        let entity = self.cache.iter().find(|e| e.id == id)?;
        Some(NotesDialogView {
            entity_id: entity.id.clone(),
            status: entity.status.clone(),
            status_options: self
                .kind
                .status_options()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            notes: entity.notes.clone(),
        })
    }

    /// Stages note text typed in the dialog. Empty text clears the staging.
    pub fn stage_note(&mut self, id: &str, content: &str) {
        if content.trim().is_empty() {
            self.pending_note = None;
        } else {
            self.pending_note = Some(PendingNote {
                entity_id: id.to_string(),
                content: content.to_string(),
            });
        }
    }

    /// Saves the dialog: a save with no note text omits the `note` key
    /// entirely, distinguishing a status-only update from a note-plus-status
    /// update at the wire level.
    pub async fn save_note(
        &mut self,
        id: &str,
        note: Option<&str>,
        status: &str,
    ) -> Result<(), AppError> {
        let position = self.position_of(id)?;

        let mut body = serde_json::Map::new();
        body.insert("status".to_string(), json!(status));
        if let Some(content) = note.map(str::trim).filter(|c| !c.is_empty()) {
            body.insert("note".to_string(), json!(content));
        }

        if let Err(e) = self.gateway.post(&self.notes_path(id), &Value::Object(body)).await {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }

        self.cache[position].status = status.to_string();
        if self
            .pending_note
            .as_ref()
            .is_some_and(|pending| pending.entity_id == id)
        {
            self.pending_note = None;
        }
        self.render();
        Ok(())
    }

    /// Runs a cross-entity transition: flush the staged note for this entity
    /// (the write is awaited to completion before the transition call), issue
    /// the transition, then fully reload the collection.
    pub async fn transition(&mut self, id: &str, name: &str) -> Result<(), AppError> {
        let Some(transition) = self
            .kind
            .transitions()
            .iter()
            .find(|t| t.name == name)
            .copied()
        else {
            return Err(AppError::ValidationFailed(format!(
                "{} records do not support \"{}\"",
                self.kind.label(),
                name
            )));
        };
        let position = self.position_of(id)?;

        if let Some(pending) = self
            .pending_note
            .take_if(|pending| pending.entity_id == id)
        {
            let status = self.cache[position].status.clone();
            self.save_note(id, Some(&pending.content), &status).await?;
        }

        let path = format!(
            "{}/{}/{}",
            self.kind.collection_path(),
            id,
            transition.path_suffix
        );
        if let Err(e) = self.gateway.request(Method::POST, &path, None).await {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        tracing::info!("{} {} -> {}", self.kind.label(), id, transition.name);

        self.load().await
    }

    /// Releases a customer or depositor back to the lead pool.
    pub async fn release(&mut self, id: &str) -> Result<(), AppError> {
        self.transition(id, "release").await
    }

    /// Promotes a customer to the depositors collection.
    pub async fn move_to_depositors(&mut self, id: &str) -> Result<(), AppError> {
        self.transition(id, "move-to-depositors").await
    }

    /// Demotes a depositor back to the customers collection.
    pub async fn release_to_customers(&mut self, id: &str) -> Result<(), AppError> {
        self.transition(id, "release-to-customers").await
    }
}

#[async_trait]
impl PageController for EntityStore {
    fn page(&self) -> Page {
        match self.kind {
            EntityKind::Lead => Page::Leads,
            EntityKind::Customer => Page::Customers,
            EntityKind::Depositor => Page::Depositors,
        }
    }

    async fn activate(&mut self, token: ActivationToken) -> Result<(), AppError> {
        self.activation = token;
        self.load().await
    }
}
