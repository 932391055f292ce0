//! SNIES report downloads.

use reqwest::Method;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};
use serde::Serialize;

use super::{ApiClient, ApiError};

/// A downloaded report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// From `Content-Disposition`, when the backend names the file.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
struct DownloadQuery<'q> {
    name: &'q str,
    /// Cache buster.
    t: i64,
}

pub struct Snies<'a> {
    client: &'a ApiClient,
}

impl<'a> Snies<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Download the report called `name`, e.g. `"Movilidad entrante 2024-1"`.
    pub async fn download(&self, name: &str) -> Result<Download, ApiError> {
        let query = DownloadQuery {
            name,
            t: chrono::Utc::now().timestamp_millis(),
        };
        let req = self.client.request(Method::GET, &["snies", "download"]).query(&query);
        let resp = self.client.send_raw(req).await?;

        let header = |key: HeaderName| resp.headers().get(key).and_then(|v| v.to_str().ok()).map(str::to_string);
        let file_name = header(CONTENT_DISPOSITION).as_deref().and_then(disposition_file_name);
        let content_type = header(CONTENT_TYPE);

        let bytes = resp.bytes().await.map_err(|e| ApiError::Network(e.to_string()))?;
        tracing::debug!(name, size = bytes.len(), "report downloaded");
        Ok(Download {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// File name from a `Content-Disposition` value. `filename*=UTF-8''...`
/// is preferred and percent-decoded; a quoted or bare `filename=` is the fallback.
pub(crate) fn disposition_file_name(value: &str) -> Option<String> {
    let params = value.split(';').map(str::trim).filter_map(|p| p.split_once('='));

    let mut plain = None;
    for (key, raw) in params {
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim();
                let encoded = encoded
                    .get(..7)
                    .filter(|prefix| prefix.eq_ignore_ascii_case("utf-8''"))
                    .map_or(encoded, |_| &encoded[7..]);
                if let Some(decoded) = percent_decode(encoded).filter(|s| !s.is_empty()) {
                    return Some(decoded);
                }
            }
            "filename" => plain = Some(raw.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }
    plain.filter(|s| !s.is_empty())
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
