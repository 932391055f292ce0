//! `/convenios` resource.
//!
//! Listing and detail responses use different field names for the same
//! things, so agreements are read from raw JSON rather than derived.

use chrono::NaiveDate;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use ori_core::{AgreementCode, InstitutionCode};

use super::envelope::single_item;
use super::{ApiClient, ApiError, ListPage, Page};

const AGREEMENTS: &str = "convenios";
/// Key used by the listing endpoint for mobility type names.
const LISTING_MOBILITY_KEY: &str = "Movilidades del convenio";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementStatus {
    #[default]
    #[serde(rename = "activo")]
    Active,
    #[serde(rename = "inactivo")]
    Inactive,
    #[serde(rename = "pendiente")]
    Pending,
}

impl AgreementStatus {
    /// Case-insensitive; unknown or missing reads as active.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("inactivo") => AgreementStatus::Inactive,
            Some("pendiente") => AgreementStatus::Pending,
            _ => AgreementStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agreement {
    pub code: AgreementCode,
    pub name: String,
    pub kind: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub status: AgreementStatus,
    pub institution_code: Option<InstitutionCode>,
    /// Only sent by the listing endpoint.
    pub institution_name: Option<String>,
    pub mobility_types: Vec<String>,
}

impl Agreement {
    pub(crate) fn from_value(value: &Value) -> Result<Self, ApiError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ApiError::Decode("agreement is not an object".into()))?;

        let code = text(obj, "codigo").ok_or_else(|| ApiError::Decode("agreement without codigo".into()))?;

        Ok(Self {
            code: AgreementCode::new(code).map_err(ApiError::decode)?,
            name: text(obj, "nombre_convenio").or_else(|| text(obj, "nombre")).unwrap_or_default(),
            kind: text(obj, "tipo"),
            starts_on: date(obj.get("fecha_inicio")),
            ends_on: date(obj.get("fecha_finalizacion")),
            status: AgreementStatus::from_wire(obj.get("estado").and_then(Value::as_str)),
            institution_code: text(obj, "codigo_institucion").and_then(|c| InstitutionCode::new(c).ok()),
            institution_name: text(obj, "nombre_institucion"),
            mobility_types: mobility_types(obj),
        })
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// First ten characters as `YYYY-MM-DD`; anything else is no date.
fn date(value: Option<&Value>) -> Option<NaiveDate> {
    let head = value?.as_str()?.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn mobility_types(obj: &Map<String, Value>) -> Vec<String> {
    [LISTING_MOBILITY_KEY, "tipos_movilidad"]
        .iter()
        .find_map(|key| obj.get(*key)?.as_array())
        .map(|types| types.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Editable fields of an agreement, in the backend's payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgreementDraft {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "fecha_inicio")]
    pub starts_on: NaiveDate,
    #[serde(rename = "fecha_finalizacion")]
    pub ends_on: NaiveDate,
    #[serde(rename = "estado")]
    pub status: AgreementStatus,
    #[serde(rename = "codigo_institucion")]
    pub institution_code: InstitutionCode,
    #[serde(rename = "tipos_movilidad")]
    pub mobility_types: Vec<String>,
}

#[derive(Serialize)]
struct NewAgreement<'a> {
    codigo: &'a AgreementCode,
    #[serde(flatten)]
    draft: &'a AgreementDraft,
}

pub struct Agreements<'a> {
    client: &'a ApiClient,
}

impl<'a> Agreements<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: Page) -> Result<ListPage<Agreement>, ApiError> {
        let req = self
            .client
            .request(Method::GET, &[AGREEMENTS, "movilidades"])
            .query(&page);
        let body = self.client.send(req).await?;
        ListPage::from_envelope(&body, Agreement::from_value)
    }

    pub async fn get(&self, code: &AgreementCode) -> Result<Agreement, ApiError> {
        let req = self.client.request(Method::GET, &[AGREEMENTS, code.as_str()]);
        let body = self.client.send(req).await?;
        Agreement::from_value(&single_item(body))
    }

    pub async fn create(&self, code: &AgreementCode, draft: &AgreementDraft) -> Result<Agreement, ApiError> {
        let req = self
            .client
            .request(Method::POST, &[AGREEMENTS, ""])
            .json(&NewAgreement { codigo: code, draft });
        let body = self.client.send(req).await?;
        tracing::info!(agreement = %code, "agreement created");
        Agreement::from_value(&single_item(body))
    }

    pub async fn update(&self, code: &AgreementCode, draft: &AgreementDraft) -> Result<Agreement, ApiError> {
        let req = self.client.request(Method::PUT, &[AGREEMENTS, code.as_str()]).json(draft);
        let body = self.client.send(req).await?;
        Agreement::from_value(&single_item(body))
    }

    pub async fn delete(&self, code: &AgreementCode) -> Result<(), ApiError> {
        let req = self.client.request(Method::DELETE, &[AGREEMENTS, code.as_str()]);
        self.client.send(req).await?;
        tracing::info!(agreement = %code, "agreement deleted");
        Ok(())
    }
}
