//! Page-by-page fetching with a guard against APIs that ignore paging.

use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;

use super::client::RemoteClient;
use super::error::Result;
use super::task::SyncTask;

/// Anything that can answer a GET for one page of a dataset.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value>;
}

#[async_trait]
impl PageSource for RemoteClient {
    async fn fetch_page(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        self.get_json(endpoint, query).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub page_size: usize,
    pub max_pages: u32,
}

/// All pages of one task merged back into a single payload.
#[derive(Debug, Clone)]
pub struct FetchedDataset {
    pub payload: Value,
    pub pages_fetched: u32,
    pub records: usize,
}

/// Records of a page: the payload itself when it is a list, else its `data`
/// list, else nothing.
pub fn extract_rows(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(rows) => rows,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(rows)) => rows,
            _ => &[],
        },
        _ => &[],
    }
}

/// Rebuilds the first page's shape around every collected row.
pub fn merge_payload(first: Option<Value>, rows: Vec<Value>) -> Value {
    match first {
        Some(Value::Object(mut map)) => {
            map.insert("data".to_string(), Value::Array(rows));
            Value::Object(map)
        }
        _ => Value::Array(rows),
    }
}

/// Fingerprint of a page: row count plus the serialized first and last row.
pub fn page_signature(rows: &[Value]) -> String {
    let encode = |row: Option<&Value>| row.map_or_else(|| "null".to_string(), Value::to_string);
    format!("{}|{}|{}", rows.len(), encode(rows.first()), encode(rows.last()))
}

/// Fetches every page of `task`.
///
/// Stops on a short or empty page, on a page identical in signature to the
/// previous one (its rows are discarded), or at the page ceiling.
pub async fn fetch_all_pages<S>(
    source: &S,
    task: &SyncTask,
    limits: PageLimits,
) -> Result<FetchedDataset>
where
    S: PageSource + ?Sized,
{
    let mut all_rows: Vec<Value> = Vec::new();
    let mut first_payload: Option<Value> = None;
    let mut previous_signature: Option<String> = None;
    let mut pages_fetched = 0u32;
    let mut page = 1u32;

    while page <= limits.max_pages {
        let mut query = task.query.clone();
        query.push(("page", page.to_string()));
        query.push(("pageSize", limits.page_size.to_string()));

        info!("[sync] {} page {}", task.id, page);
        let payload = source.fetch_page(task.endpoint, &query).await?;
        pages_fetched += 1;

        let rows = extract_rows(&payload).to_vec();
        let count = rows.len();
        info!("[sync] {} page {}: {} records", task.id, page, count);

        let signature = page_signature(&rows);
        if count > 0 && previous_signature.as_deref() == Some(signature.as_str()) {
            warn!(
                "[sync] {}: page {} repeats the previous page, stopping pagination",
                task.id, page
            );
            break;
        }

        all_rows.extend(rows);
        if first_payload.is_none() {
            first_payload = Some(payload);
        }

        if count < limits.page_size {
            break;
        }

        previous_signature = Some(signature);
        page += 1;
    }

    if page > limits.max_pages {
        warn!(
            "[sync] {}: page limit reached ({})",
            task.id, limits.max_pages
        );
    }

    let records = all_rows.len();
    Ok(FetchedDataset {
        payload: merge_payload(first_payload, all_rows),
        pages_fetched,
        records,
    })
}
