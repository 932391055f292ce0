//! Agreement expiry notices from `/notificaciones`.

use std::collections::HashSet;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::envelope::extract_items;
use super::{ApiClient, ApiError};

pub const NOTICES_UNAVAILABLE: &str = "No se pudieron obtener notificaciones.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Danger,
}

/// One agreement approaching its end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementNotice {
    pub id: String,
    #[serde(rename = "convenioCodigo")]
    pub agreement_code: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "mensaje")]
    pub message: String,
    #[serde(rename = "diasRestantes")]
    pub days_left: i64,
    #[serde(rename = "severidad")]
    pub severity: Severity,
    /// Client-side only; never sent by the backend.
    #[serde(rename = "visto", default, skip_deserializing)]
    pub seen: bool,
}

/// Filters for the expiry listing, sent as query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpiryQuery {
    pub max_days: u32,
    pub min_days: u32,
    pub solo_activos: bool,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ExpiryQuery {
    fn default() -> Self {
        Self {
            max_days: 90,
            min_days: 1,
            solo_activos: true,
            limit: 100,
            offset: 0,
        }
    }
}

pub struct Notifications<'a> {
    client: &'a ApiClient,
}

impl<'a> Notifications<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Agreements ending within the query's window, most urgent first.
    pub async fn expiring_agreements(&self, query: &ExpiryQuery) -> Result<Vec<AgreementNotice>, ApiError> {
        let req = self
            .client
            .request(Method::GET, &["notificaciones", "convenios", "proximos-vencer"])
            .query(query);
        let body = self.client.send(req).await?;

        let mut notices = extract_items(&body)
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(ApiError::decode))
            .collect::<Result<Vec<AgreementNotice>, _>>()?;
        notices.sort_by_key(|n| n.days_left);
        Ok(notices)
    }
}

/// Current notices plus which ones the user has already seen.
///
/// Seen ids survive refreshes.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: Vec<AgreementNotice>,
    seen: HashSet<String>,
    error: Option<String>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload from the backend. On failure the board is emptied and
    /// [`error`](Self::error) holds a message to show.
    pub async fn refresh(&mut self, notifications: &Notifications<'_>, query: &ExpiryQuery) -> Result<(), ApiError> {
        match notifications.expiring_agreements(query).await {
            Ok(notices) => {
                self.error = None;
                self.replace(notices);
                Ok(())
            }
            Err(err) => {
                self.notices.clear();
                self.error = Some(match &err {
                    ApiError::Status { message: Some(m), .. } => m.clone(),
                    _ => NOTICES_UNAVAILABLE.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Swap in a fresh list, keeping it sorted and restoring seen marks.
    pub fn replace(&mut self, mut notices: Vec<AgreementNotice>) {
        notices.sort_by_key(|n| n.days_left);
        for notice in &mut notices {
            notice.seen = self.seen.contains(&notice.id);
        }
        self.notices = notices;
    }

    pub fn mark_all_seen(&mut self) {
        for notice in &mut self.notices {
            notice.seen = true;
            self.seen.insert(notice.id.clone());
        }
    }

    pub fn unread_count(&self) -> usize {
        self.notices.iter().filter(|n| !n.seen).count()
    }

    pub fn notices(&self) -> &[AgreementNotice] {
        &self.notices
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn notice(id: &str, days_left: i64) -> AgreementNotice {
        serde_json::from_value(json!({
            "id": id,
            "convenioCodigo": format!("CV-{id}"),
            "titulo": "Convenio por vencer",
            "mensaje": format!("Vence en {days_left} días"),
            "diasRestantes": days_left,
            "severidad": if days_left <= 30 { "danger" } else { "warn" },
        }))
        .unwrap()
    }

    #[test]
    fn reads_wire_names() {
        let n = notice("7", 12);
        assert_eq!(n.agreement_code, "CV-7");
        assert_eq!(n.severity, Severity::Danger);
        assert!(!n.seen);
    }

    #[test]
    fn seen_marks_survive_refresh() {
        let mut board = NoticeBoard::new();
        board.replace(vec![notice("a", 60), notice("b", 5)]);
        assert_eq!(board.notices()[0].id, "b");
        assert_eq!(board.unread_count(), 2);

        board.mark_all_seen();
        assert_eq!(board.unread_count(), 0);

        board.replace(vec![notice("c", 20), notice("a", 59)]);
        assert_eq!(board.unread_count(), 1);
        assert!(!board.notices()[0].seen);
        assert!(board.notices()[1].seen);
    }

    #[test]
    fn default_query() {
        let q = ExpiryQuery::default();
        assert_eq!((q.max_days, q.min_days, q.solo_activos, q.limit, q.offset), (90, 1, true, 100, 0));
    }
}
