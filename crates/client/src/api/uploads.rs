//! Spreadsheet ingestion under `/ingesta`.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::{ApiClient, ApiError};

/// Multipart field the backend reads the workbook from.
const FILE_FIELD: &str = "file";

pub struct Uploads<'a> {
    client: &'a ApiClient,
}

impl<'a> Uploads<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Upload a workbook for ingestion. The backend's summary is returned as sent.
    pub async fn upload_excel(&self, file_name: &str, bytes: Vec<u8>) -> Result<Value, ApiError> {
        tracing::info!(file_name, size = bytes.len(), "uploading workbook");
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part(FILE_FIELD, part);

        let req = self
            .client
            .request(Method::POST, &["ingesta", "upload-excel"])
            .multipart(form);
        self.client.send(req).await
    }
}
