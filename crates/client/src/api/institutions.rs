//! `/instituciones/` resource.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError, ListPage, Page};

/// Partner institution.
///
/// Reads both camelCase and snake_case spellings of the representative
/// and country fields; camelCase wins when both are sent. Also reads back
/// its own serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InstitutionRecord")]
pub struct Institution {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub legal_representative: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Empty when the backend sends no country.
    pub country_iso: String,
    pub country_name: Option<String>,
}

#[derive(Deserialize)]
struct InstitutionRecord {
    #[serde(default)]
    id: i64,
    #[serde(default, alias = "code")]
    codigo: String,
    #[serde(default, alias = "name")]
    nombre: String,
    #[serde(alias = "address")]
    direccion: Option<String>,
    #[serde(rename = "representanteLegal")]
    representante_legal_camel: Option<String>,
    #[serde(alias = "legal_representative")]
    representante_legal: Option<String>,
    #[serde(alias = "email")]
    correo: Option<String>,
    #[serde(alias = "phone")]
    telefono: Option<String>,
    #[serde(rename = "paisIso")]
    pais_iso_camel: Option<String>,
    #[serde(alias = "country_iso")]
    pais_iso: Option<String>,
    #[serde(alias = "country_name")]
    nombre_pais: Option<String>,
}

impl From<InstitutionRecord> for Institution {
    fn from(r: InstitutionRecord) -> Self {
        Self {
            id: r.id,
            code: r.codigo,
            name: r.nombre,
            address: r.direccion,
            legal_representative: r.representante_legal_camel.or(r.representante_legal),
            email: r.correo,
            phone: r.telefono,
            country_iso: r.pais_iso_camel.or(r.pais_iso).unwrap_or_default(),
            country_name: r.nombre_pais,
        }
    }
}

pub struct Institutions<'a> {
    client: &'a ApiClient,
}

impl<'a> Institutions<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: Page) -> Result<ListPage<Institution>, ApiError> {
        let req = self.client.request(Method::GET, &["instituciones", ""]).query(&page);
        let body = self.client.send(req).await?;
        ListPage::from_envelope(&body, |item| serde_json::from_value(item.clone()).map_err(ApiError::decode))
    }
}
