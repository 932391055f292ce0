//! Mobility statistics under `/dashboard`.
//!
//! Aggregates arrive as `{ total, data }` where `data` is a list, a single
//! row or `null`; every reader here accepts all three.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiClient, ApiError};

const DASHBOARD: &str = "dashboard";

/// Mobilities in one academic period. Also the shape of the per-period
/// totals, whose count field is named after what was counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRow {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "semestre")]
    pub semester: u8,
    #[serde(rename = "total_movilidades", alias = "total_entrantes", alias = "total_salientes", default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRow {
    #[serde(rename = "paisorigen")]
    pub origin: String,
    #[serde(rename = "paisdestino", default)]
    pub destination: Option<String>,
    #[serde(rename = "total_movilidades", default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRow {
    #[serde(rename = "nombreprograma")]
    pub program: String,
    #[serde(rename = "facultad", default)]
    pub faculty: Option<String>,
    #[serde(rename = "total_movilidades", default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementRow {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "total_movilidades", default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionRow {
    #[serde(rename = "institucionorigen")]
    pub origin: String,
    #[serde(rename = "instituciondestino")]
    pub destination: String,
    #[serde(rename = "total_movilidades", default)]
    pub total: u64,
}

/// Count per gender, direction, mobility type or modality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRow {
    #[serde(alias = "genero", alias = "direccion", alias = "tipo", alias = "modalidad")]
    pub label: String,
    #[serde(rename = "total_movilidades", default)]
    pub total: u64,
}

/// Academic period sent as `?anio=&semestre=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "semestre")]
    pub semester: u8,
}

impl Period {
    pub fn new(year: i32, semester: u8) -> Self {
        Self { year, semester }
    }
}

/// Leading origin country of a period, if it had any mobility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTopCountry {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "semestre")]
    pub semester: u8,
    #[serde(rename = "data", default)]
    pub top: Option<CountryRow>,
}

/// Rows of an aggregate envelope.
pub(crate) fn as_rows<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, ApiError> {
    let data = match body {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
        other => other,
    };
    let rows = match data {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        row => vec![row],
    };
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(ApiError::decode))
        .collect()
}

pub struct Dashboard<'a> {
    client: &'a ApiClient,
}

impl<'a> Dashboard<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    async fn get(&self, path: &[&str], period: Option<Period>) -> Result<Value, ApiError> {
        let segments: Vec<&str> = std::iter::once(DASHBOARD).chain(path.iter().copied()).collect();
        let mut req = self.client.request(Method::GET, &segments);
        if let Some(period) = period {
            req = req.query(&period);
        }
        self.client.send(req).await
    }

    async fn rows<T: DeserializeOwned>(&self, path: &[&str]) -> Result<Vec<T>, ApiError> {
        as_rows(self.get(path, None).await?)
    }

    async fn top<T: DeserializeOwned>(&self, path: &[&str]) -> Result<Option<T>, ApiError> {
        Ok(self.rows(path).await?.into_iter().next())
    }

    pub async fn by_period(&self) -> Result<Vec<PeriodRow>, ApiError> {
        self.rows(&["movilidades"]).await
    }

    pub async fn by_country(&self) -> Result<Vec<CountryRow>, ApiError> {
        self.rows(&["paises"]).await
    }

    pub async fn by_program(&self) -> Result<Vec<ProgramRow>, ApiError> {
        self.rows(&["programas"]).await
    }

    pub async fn by_agreement(&self) -> Result<Vec<AgreementRow>, ApiError> {
        self.rows(&["convenios"]).await
    }

    pub async fn by_institution(&self) -> Result<Vec<InstitutionRow>, ApiError> {
        self.rows(&["instituciones"]).await
    }

    pub async fn by_gender(&self) -> Result<Vec<LabeledRow>, ApiError> {
        self.rows(&["generos"]).await
    }

    pub async fn by_direction(&self) -> Result<Vec<LabeledRow>, ApiError> {
        self.rows(&["direcciones"]).await
    }

    pub async fn by_type(&self) -> Result<Vec<LabeledRow>, ApiError> {
        self.rows(&["tipos"]).await
    }

    pub async fn by_modality(&self) -> Result<Vec<LabeledRow>, ApiError> {
        self.rows(&["modalidades"]).await
    }

    pub async fn top_period(&self) -> Result<Option<PeriodRow>, ApiError> {
        self.top(&["top", "semestre"]).await
    }

    pub async fn top_countries(&self) -> Result<Vec<CountryRow>, ApiError> {
        self.rows(&["top", "paises"]).await
    }

    pub async fn bottom_countries(&self) -> Result<Vec<CountryRow>, ApiError> {
        self.rows(&["bottom", "paises"]).await
    }

    pub async fn top_program(&self) -> Result<Option<ProgramRow>, ApiError> {
        self.top(&["top", "programa"]).await
    }

    pub async fn top_type(&self) -> Result<Option<LabeledRow>, ApiError> {
        self.top(&["top", "tipo"]).await
    }

    pub async fn top_agreement(&self) -> Result<Option<AgreementRow>, ApiError> {
        self.top(&["top", "convenio"]).await
    }

    pub async fn period_total(&self, period: Period) -> Result<PeriodRow, ApiError> {
        let body = self.get(&["periodo", "total"], Some(period)).await?;
        serde_json::from_value(body).map_err(ApiError::decode)
    }

    pub async fn period_incoming(&self, period: Period) -> Result<PeriodRow, ApiError> {
        let body = self.get(&["periodo", "entrantes"], Some(period)).await?;
        serde_json::from_value(body).map_err(ApiError::decode)
    }

    pub async fn period_outgoing(&self, period: Period) -> Result<PeriodRow, ApiError> {
        let body = self.get(&["periodo", "salientes"], Some(period)).await?;
        serde_json::from_value(body).map_err(ApiError::decode)
    }

    pub async fn period_top_country(&self, period: Period) -> Result<PeriodTopCountry, ApiError> {
        let body = self.get(&["periodo", "top_pais"], Some(period)).await?;
        serde_json::from_value(body).map_err(ApiError::decode)
    }

    /// Ask the backend to rebuild its mobility aggregates.
    pub async fn refresh(&self) -> Result<Value, ApiError> {
        tracing::info!("refreshing mobility aggregates");
        let req = self
            .client
            .request(Method::POST, &[DASHBOARD, "movilidades", "refresh"])
            .json(&json!({}));
        self.client.send(req).await
    }
}
