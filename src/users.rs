use crate::errors::{AppError, ResultExt};
use crate::gateway::Gateway;
use crate::models::{FieldLabel, NewUser, User};
use crate::render::{Cell, Renderer, RowView, Severity, TableView};
use crate::shell::{ActivationToken, Page, PageController};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const ROLES: [&str; 2] = ["admin", "agent"];

fn validate_role(role: &str) -> Result<(), AppError> {
    if ROLES.contains(&role) {
        Ok(())
    } else {
        Err(AppError::ValidationFailed(format!(
            "Role must be one of: {}",
            ROLES.join(", ")
        )))
    }
}

/// Admin-only user management page.
pub struct UsersController {
    gateway: Arc<Gateway>,
    renderer: Arc<dyn Renderer>,
    users: Vec<User>,
    activation: ActivationToken,
}

impl UsersController {
    pub fn new(gateway: Arc<Gateway>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            gateway,
            renderer,
            users: Vec::new(),
            activation: ActivationToken::new(),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        let payload = self.gateway.get("/users").await.context("Loading users")?;

        if self.activation.is_cancelled() {
            return Ok(());
        }

        self.users = serde_json::from_value(payload).map_err(|e| AppError::RequestFailed {
            status: 200,
            message: format!("Unexpected users payload: {}", e),
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
                name: "email".to_string(),
                label: "Email".to_string(),
            },
            FieldLabel {
                name: "role".to_string(),
                label: "Role".to_string(),
            },
        ];
        let rows = self
            .users
            .iter()
            .map(|user| RowView {
                id: user.id.clone(),
                cells: vec![
                    Cell::Text {
                        value: user.name.clone(),
                    },
                    user.email
                        .clone()
                        .map(|value| Cell::Text { value })
                        .unwrap_or(Cell::Missing),
                    Cell::Text {
                        value: user.role.clone(),
                    },
                ],
                status: None,
                created: None,
            })
            .collect();
        TableView {
            kind_label: "User".to_string(),
            columns,
            rows,
        }
    }

    pub fn render(&self) {
        self.renderer.render_table(&self.view());
    }

    /// Registers a new account; validation blocks before any network call.
    pub async fn register(&mut self, user: NewUser) -> Result<(), AppError> {
        if user.name.trim().is_empty() {
            return Err(AppError::ValidationFailed("Name is required".to_string()));
        }
        if !user.email.contains('@') {
            return Err(AppError::ValidationFailed(
                "A valid email is required".to_string(),
            ));
        }
        if user.password.len() < 8 {
            return Err(AppError::ValidationFailed(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        validate_role(&user.role)?;

        if let Err(e) = self.gateway.post("/register", &json!(user)).await {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }

    pub async fn update_role(&mut self, id: &str, role: &str) -> Result<(), AppError> {
        validate_role(role)?;
        if let Err(e) = self
            .gateway
            .patch(&format!("/users/{}", id), &json!({ "role": role }))
            .await
        {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }

    pub async fn update_profile(&mut self, id: &str, name: &str, email: &str) -> Result<(), AppError> {
        if name.trim().is_empty() {
            return Err(AppError::ValidationFailed("Name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(AppError::ValidationFailed(
                "A valid email is required".to_string(),
            ));
        }
        if let Err(e) = self
            .gateway
            .put(
                &format!("/users/{}", id),
                &json!({ "name": name, "email": email }),
            )
            .await
        {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }

    pub async fn delete_user(&mut self, id: &str) -> Result<(), AppError> {
        if let Err(e) = self.gateway.delete(&format!("/users/{}", id)).await {
            self.renderer.notify(Severity::Error, &e.to_string());
            return Err(e);
        }
        self.load().await
    }
}

#[async_trait]
impl PageController for UsersController {
    fn page(&self) -> Page {
        Page::Users
    }

    async fn activate(&mut self, token: ActivationToken) -> Result<(), AppError> {
        self.activation = token;
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_validation_accepts_known_roles_only() {
        assert!(validate_role("admin").is_ok());
        assert!(validate_role("agent").is_ok());
        assert!(matches!(
            validate_role("superuser"),
            Err(AppError::ValidationFailed(_))
        ));
    }
}
