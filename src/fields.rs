use crate::errors::{AppError, ResultExt};
use crate::gateway::Gateway;
use crate::models::{FieldDef, FieldLabel};
use crate::render::{Cell, Renderer, RowView, Severity, TableView};
use crate::shell::{ActivationToken, Page, PageController};
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;

/// Validates a custom-field name before any network call.
///
/// Field names become custom-field keys and column headers, so they must
/// start with a letter and stay within letters, digits, spaces, underscores
/// and dashes.
pub fn validate_field_name(name: &str) -> Result<(), AppError> {
    let pattern = Regex::new(r"^[A-Za-z][A-Za-z0-9 _-]*$").expect("static pattern compiles");
    if name.trim().is_empty() {
        return Err(AppError::ValidationFailed(
            "Field name is required".to_string(),
        ));
    }
    if !pattern.is_match(name) {
        return Err(AppError::ValidationFailed(format!(
            "Malformed field name \"{}\": use letters, digits, spaces, _ or -",
            name
        )));
    }
    Ok(())
}

/// Admin-only custom lead-field administration page.
pub struct FieldsController {
    gateway: Arc<Gateway>,
    renderer: Arc<dyn Renderer>,
    fields: Vec<FieldDef>,
    activation: ActivationToken,
}

impl FieldsController {
    pub fn new(gateway: Arc<Gateway>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            gateway,
            renderer,
            fields: Vec::new(),
            activation: ActivationToken::new(),
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        let payload = self
            .gateway
            .get("/lead-fields")
            .await
            .context("Loading lead fields")?;

        if self.activation.is_cancelled() {
            return Ok(());
        }

        self.fields = serde_json::from_value(payload).map_err(|e| AppError::RequestFailed {
            status: 200,
            message: format!("Unexpected lead-fields payload: {}", e),
        })?;
        self.render();
        Ok(())
    }

    fn view(&self) -> TableView {
        let columns = vec![
            FieldLabel {
                name: "name".to_string(),
                label: "Name".to_string(),
            },
            FieldLabel {
                name: "label".to_string(),
                label: "Label".to_string(),
            },
        ];
        let rows = self
            .fields
            .iter()
            .map(|field| RowView {
                id: field.id.clone(),
                cells: vec![
                    Cell::Text {
                        value: field.name.clone(),
                    },
                    Cell::Text {
                        value: field.label.clone(),
                    },
                ],
                status: None,
                created: None,
            })
            .collect();
        TableView {
            kind_label: "Field".to_string(),
            columns,
            rows,
        }
    }

    pub fn render(&self) {
        self.renderer.render_table(&self.view());
    }

    pub async fn create(&mut self, name: &str, label: &str) -> Result<(), AppError> {
        validate_field_name(name)?;
        let label = if label.trim().is_empty() { name } else { label };
        if let Err(e) = self
            .gateway
            .post("/lead-fields", &json!({ "name": name, "label": label }))
            .await
        {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }

    pub async fn update(&mut self, id: &str, name: &str, label: &str) -> Result<(), AppError> {
        validate_field_name(name)?;
        if let Err(e) = self
            .gateway
            .put(
                &format!("/lead-fields/{}", id),
                &json!({ "name": name, "label": label }),
            )
            .await
        {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }

    pub async fn remove(&mut self, id: &str) -> Result<(), AppError> {
        if let Err(e) = self.gateway.delete(&format!("/lead-fields/{}", id)).await {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }
}

#[async_trait]
impl PageController for FieldsController {
    fn page(&self) -> Page {
        Page::Fields
    }

    async fn activate(&mut self, token: ActivationToken) -> Result<(), AppError> {
        self.activation = token;
        self.load().await
    }
}
