//! Pagination iterators
//!
//! Two shapes of lazy, forward-only sequences built on `Client::get`:
//!
//! - cursor pages (`ids` plus `next_cursor`), starting from `-1` and ending
//!   at cursor `0` or an empty page;
//! - max-id pages, where the lowest id of each page minus one becomes the
//!   exclusive upper bound of the next request, ending at an empty page.
//!
//! Identifiers are carried as decimal strings end to end. Both sequences end
//! after their first error, and a finished sequence stays finished.

use async_stream::stream;
use futures_util::Stream;
use serde_json::Value;
use tracing::{debug, info};
use transport::ApiRequest;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::options::RequestOptions;

/// Identifiers per lookup call.
pub const LOOKUP_BATCH: usize = 100;

const FIRST_CURSOR: &str = "-1";
const LAST_CURSOR: &str = "0";

/// Ids from a cursor-paginated endpoint, as strings.
pub(crate) fn cursor_ids(
    client: &mut Client,
    mut request: ApiRequest,
    options: RequestOptions,
) -> impl Stream<Item = Result<String>> + '_ {
    stream! {
        let mut cursor = FIRST_CURSOR.to_string();
        loop {
            request.set_query("cursor", &cursor);
            let page = match client.get_json(request.clone(), options).await {
                Ok(page) => page,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let ids = match page.get("ids").and_then(Value::as_array) {
                Some(ids) => ids,
                None => {
                    yield Err(Error::Payload(format!("page from {} has no ids", request.url)));
                    return;
                }
            };
            if ids.is_empty() {
                debug!(url = %request.url, "empty page");
                return;
            }
            for id in ids {
                match id_string(id) {
                    Some(id) => {
                        yield Ok(id);
                    }
                    None => {
                        yield Err(Error::Payload(format!("unexpected id: {id}")));
                        return;
                    }
                }
            }

            match next_cursor(&page) {
                Some(next) if next != LAST_CURSOR => cursor = next,
                Some(_) => return,
                None => {
                    yield Err(Error::Payload(format!("page from {} has no next_cursor", request.url)));
                    return;
                }
            }
        }
    }
}

/// Extracts the items of one max-id page from its JSON body.
pub(crate) type PageItems = fn(Value) -> Result<Vec<Value>>;

/// A max-id traversal.
pub(crate) struct MaxIdPages {
    pub request: ApiRequest,
    pub options: RequestOptions,
    pub items: PageItems,
    pub max_id: Option<String>,
    pub since_id: Option<String>,
    /// Treat 404 as the end of the data.
    pub end_on_not_found: bool,
    /// Drop items whose `user.id_str` differs.
    pub only_user: Option<String>,
}

/// Items from a max-id paginated endpoint, in the order received.
pub(crate) fn max_id_items(
    client: &mut Client,
    pages: MaxIdPages,
) -> impl Stream<Item = Result<Value>> + '_ {
    let MaxIdPages {
        mut request,
        options,
        items,
        mut max_id,
        since_id,
        end_on_not_found,
        only_user,
    } = pages;

    stream! {
        if let Some(since_id) = since_id {
            request.set_query("since_id", since_id);
        }
        loop {
            if let Some(max_id) = &max_id {
                request.set_query("max_id", max_id);
            }
            let page = match client.get_json(request.clone(), options).await {
                Ok(page) => page,
                Err(err) if end_on_not_found && err.status() == Some(404) => {
                    info!(url = %request.url, "no data available");
                    return;
                }
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            let page = match items(page) {
                Ok(page) => page,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            if page.is_empty() {
                info!(url = %request.url, "no new results");
                return;
            }

            let lowest = page.iter().map(status_id).min();
            for item in page {
                if !from_user(&item, only_user.as_deref()) {
                    debug!(user = ?only_user, "skipping item from another user");
                    continue;
                }
                yield Ok(item);
            }

            match lowest.flatten() {
                Some(0) => return,
                Some(lowest) => max_id = Some((lowest - 1).to_string()),
                None => {
                    yield Err(Error::Payload(format!("page from {} has items without ids", request.url)));
                    return;
                }
            }
        }
    }
}

/// Up to `LOOKUP_BATCH` ids from the iterator.
pub(crate) fn next_chunk(ids: &mut impl Iterator<Item = String>) -> Vec<String> {
    ids.take(LOOKUP_BATCH).collect()
}

/// Order statuses by numeric id without parsing into floats.
pub(crate) fn sort_by_id(items: &mut [Value]) {
    items.sort_by(|a, b| {
        let a = a["id_str"].as_str().unwrap_or_default();
        let b = b["id_str"].as_str().unwrap_or_default();
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    });
}

/// A JSON id as a decimal string. Floats are rejected.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

fn from_user(item: &Value, user: Option<&str>) -> bool {
    match user {
        Some(user) => item["user"]["id_str"].as_str() == Some(user),
        None => true,
    }
}

/// `id_str`, or `id` when the string form is missing.
fn status_id(item: &Value) -> Option<u64> {
    match item["id_str"].as_str() {
        Some(id) => id.parse().ok(),
        None => item["id"].as_u64(),
    }
}

fn next_cursor(page: &Value) -> Option<String> {
    match page.get("next_cursor_str").and_then(Value::as_str) {
        Some(cursor) => Some(cursor.to_string()),
        None => page.get("next_cursor").and_then(id_string),
    }
}

/// The `statuses` array of a search page.
pub(crate) fn search_statuses(page: Value) -> Result<Vec<Value>> {
    match page {
        Value::Object(mut body) => match body.remove("statuses") {
            Some(Value::Array(statuses)) => Ok(statuses),
            _ => Err(Error::Payload("search page has no statuses".into())),
        },
        _ => Err(Error::Payload("search page is not an object".into())),
    }
}

/// A timeline page is a bare array.
pub(crate) fn array_items(page: Value) -> Result<Vec<Value>> {
    match page {
        Value::Array(items) => Ok(items),
        other => Err(Error::Payload(format!("expected an array, got: {other}"))),
    }
}
