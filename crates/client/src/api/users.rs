//! `/usuarios` resource plus the password-recovery calls under `/auth`.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use ori_auth::Role;
use ori_core::UserId;

use super::envelope::single_item;
use super::{ApiClient, ApiError, ListPage, Page};

const USERS: &str = "usuarios";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    #[serde(rename = "Activo")]
    Active,
    #[serde(rename = "Inactivo")]
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "usuario")]
    pub username: String,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "estado")]
    pub status: UserStatus,
    /// ISO timestamps, passed through as sent.
    #[serde(rename = "ultimo_acceso", default)]
    pub last_access: Option<String>,
    #[serde(rename = "creado_en", default)]
    pub created_at: Option<String>,
    #[serde(rename = "actualizado_en", default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    #[serde(rename = "usuario")]
    pub username: String,
    pub password: String,
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "correo", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "rol", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            name: None,
            email: None,
            role: None,
            status: None,
        }
    }
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(rename = "usuario", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "correo", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "rol", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

fn user_from(body: Value) -> Result<User, ApiError> {
    serde_json::from_value(single_item(body)).map_err(ApiError::decode)
}

pub struct Users<'a> {
    client: &'a ApiClient,
}

impl<'a> Users<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: Page) -> Result<ListPage<User>, ApiError> {
        let req = self.client.request(Method::GET, &[USERS]).query(&page);
        let body = self.client.send(req).await?;
        ListPage::from_envelope(&body, |item| serde_json::from_value(item.clone()).map_err(ApiError::decode))
    }

    pub async fn get(&self, id: UserId) -> Result<User, ApiError> {
        let id = id.to_string();
        let req = self.client.request(Method::GET, &[USERS, id.as_str()]);
        user_from(self.client.send(req).await?)
    }

    pub async fn create(&self, user: &NewUser) -> Result<User, ApiError> {
        let req = self.client.request(Method::POST, &[USERS]).json(user);
        let created = user_from(self.client.send(req).await?)?;
        tracing::info!(user_id = %created.id, username = %created.username, "user created");
        Ok(created)
    }

    pub async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User, ApiError> {
        let path_id = id.to_string();
        let req = self.client.request(Method::PUT, &[USERS, path_id.as_str()]).json(update);
        user_from(self.client.send(req).await?)
    }

    /// Returns the backend's confirmation message.
    pub async fn deactivate(&self, id: UserId) -> Result<String, ApiError> {
        let path_id = id.to_string();
        let req = self
            .client
            .request(Method::PATCH, &[USERS, path_id.as_str(), "desactivar"])
            .json(&json!({}));
        let body = self.client.send(req).await?;
        tracing::info!(user_id = %id, "user deactivated");
        Ok(body.get("message").and_then(Value::as_str).unwrap_or_default().to_string())
    }

    /// Reactivation is an update of `estado`.
    pub async fn activate(&self, id: UserId) -> Result<User, ApiError> {
        let update = UserUpdate {
            status: Some(UserStatus::Active),
            ..UserUpdate::default()
        };
        self.update(id, &update).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let req = self
            .client
            .request(Method::POST, &["auth", "forgot-password"])
            .json(&json!({ "correo": email }));
        self.client.send(req).await.map(drop)
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), ApiError> {
        let req = self
            .client
            .request(Method::POST, &["auth", "reset-password"])
            .json(&json!({ "token": token, "password": password }));
        self.client.send(req).await.map(drop)
    }
}
