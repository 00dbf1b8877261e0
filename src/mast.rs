use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::TessError;
use crate::http::{REQUEST_TIMEOUT, default_headers};
use crate::table::Table;
use crate::urls::MAST_INVOKE_URL;

/// Identifiers sent per MAST request.
pub const ID_BATCH_SIZE: usize = 5000;
const PAGE_SIZE: u64 = 50_000;
const TIC_SERVICE: &str = "Mast.Catalogs.Filtered.Tic";

/// Remote stellar-parameter catalog, keyed by TIC identifier. The returned
/// table carries an `ID` column plus whatever attributes the service provides.
pub trait TicCatalog: Send + Sync {
    fn query_by_identifiers(&self, ids: &[String]) -> Result<Table, TessError>;
}

#[derive(Debug, Serialize)]
struct MastRequest<'a> {
    service: &'a str,
    format: &'a str,
    params: Value,
    pagesize: u64,
    page: u64,
}

#[derive(Debug, Deserialize)]
pub struct MastResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub fields: Vec<MastField>,
    #[serde(default)]
    pub paging: Option<MastPaging>,
}

#[derive(Debug, Deserialize)]
pub struct MastField {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MastPaging {
    pub page: u64,
    pub pages_filtered: u64,
}

#[derive(Clone)]
pub struct MastTicClient {
    client: Client,
    endpoint: String,
}

impl MastTicClient {
    pub fn new() -> Result<Self, TessError> {
        Self::with_endpoint(MAST_INVOKE_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, TessError> {
        let client = Client::builder()
            .default_headers(default_headers()?)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TessError::CatalogQuery(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn query_page(&self, ids: &[String], page: u64) -> Result<MastResponse, TessError> {
        let request = build_request(ids, page)?;
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("request", request.as_str())])
            .send()
            .map_err(|err| TessError::CatalogQuery(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "MAST request failed".to_string());
            return Err(TessError::CatalogStatus { status, message });
        }
        let parsed: MastResponse = response
            .json()
            .map_err(|err| TessError::CatalogQuery(err.to_string()))?;
        if parsed.status.eq_ignore_ascii_case("error") {
            return Err(TessError::CatalogQuery(
                parsed
                    .msg
                    .unwrap_or_else(|| "MAST reported an error".to_string()),
            ));
        }
        Ok(parsed)
    }
}

impl TicCatalog for MastTicClient {
    fn query_by_identifiers(&self, ids: &[String]) -> Result<Table, TessError> {
        let mut tables = Vec::new();
        for batch in ids.chunks(ID_BATCH_SIZE) {
            let mut page = 1;
            loop {
                let response = self.query_page(batch, page)?;
                let last_page = response
                    .paging
                    .as_ref()
                    .map(|paging| paging.page >= paging.pages_filtered)
                    .unwrap_or(true);
                tables.push(table_from_response(&response)?);
                if last_page {
                    break;
                }
                page += 1;
            }
        }
        if tables.is_empty() {
            return Ok(Table::new(vec!["ID".to_string()]));
        }
        Ok(Table::concat(tables))
    }
}

fn build_request(ids: &[String], page: u64) -> Result<String, TessError> {
    let values = ids
        .iter()
        .map(|id| match id.parse::<u64>() {
            Ok(numeric) => json!(numeric),
            Err(_) => json!(id),
        })
        .collect::<Vec<_>>();
    let request = MastRequest {
        service: TIC_SERVICE,
        format: "json",
        params: json!({
            "columns": "*",
            "filters": [{ "paramName": "ID", "values": values }],
        }),
        pagesize: PAGE_SIZE,
        page,
    };
    serde_json::to_string(&request).map_err(|err| TessError::CatalogQuery(err.to_string()))
}

/// Flattens a MAST JSON response into a table, columns in `fields` order.
pub fn table_from_response(response: &MastResponse) -> Result<Table, TessError> {
    let columns = if response.fields.is_empty() {
        response
            .data
            .first()
            .map(|row| row.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_else(|| vec!["ID".to_string()])
    } else {
        response
            .fields
            .iter()
            .map(|field| field.name.clone())
            .collect()
    };

    let mut table = Table::new(columns.clone());
    for record in &response.data {
        let row = columns
            .iter()
            .map(|name| cell_text(record.get(name)))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_filters_on_id() {
        let request = build_request(&["100".to_string(), "200".to_string()], 2).unwrap();
        let value: Value = serde_json::from_str(&request).unwrap();
        assert_eq!(value["service"], TIC_SERVICE);
        assert_eq!(value["page"], 2);
        assert_eq!(value["params"]["filters"][0]["paramName"], "ID");
        assert_eq!(value["params"]["filters"][0]["values"], json!([100, 200]));
    }

    #[test]
    fn response_becomes_table() {
        let response: MastResponse = serde_json::from_value(json!({
            "status": "COMPLETE",
            "fields": [{"name": "ID", "type": "string"}, {"name": "Tmag", "type": "float"}],
            "data": [
                {"ID": "100", "Tmag": 9.5},
                {"ID": "200", "Tmag": null}
            ],
            "paging": {"page": 1, "pageSize": 2, "pagesFiltered": 1, "rows": 2}
        }))
        .unwrap();

        let table = table_from_response(&response).unwrap();
        assert_eq!(table.columns(), &["ID", "Tmag"]);
        assert_eq!(table.column("ID").unwrap(), vec!["100", "200"]);
        assert_eq!(table.column("Tmag").unwrap(), vec!["9.5", ""]);
    }
}
