//! Pagination styles and where their parameters go on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::PageRequest;

/// Where a pagination parameter is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "in", rename_all = "snake_case")]
pub enum ParamTarget {
    /// URL query parameter
    Query { name: String },
    /// JSON pointer into the request body template
    Body { pointer: String },
}

impl ParamTarget {
    pub fn query(name: impl Into<String>) -> Self {
        ParamTarget::Query { name: name.into() }
    }

    pub fn body(pointer: impl Into<String>) -> Self {
        ParamTarget::Body {
            pointer: pointer.into(),
        }
    }

    pub fn is_body(&self) -> bool {
        matches!(self, ParamTarget::Body { .. })
    }
}

fn default_first_page() -> u32 {
    1
}

/// How a source splits its results across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum Pagination {
    OffsetLimit {
        offset: ParamTarget,
        limit: ParamTarget,
        page_size: u64,
        /// Pointer to the total item count in the response, if reported
        #[serde(default)]
        total_pointer: Option<String>,
    },
    Cursor {
        cursor: ParamTarget,
        next_cursor_pointer: String,
    },
    PageNumber {
        page: ParamTarget,
        #[serde(default = "default_first_page")]
        first_page: u32,
    },
    #[default]
    Single,
}

/// A resolved parameter value for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValue<'a> {
    pub target: &'a ParamTarget,
    pub value: Value,
}

impl Pagination {
    pub fn first_request(&self) -> PageRequest {
        match self {
            Pagination::OffsetLimit { page_size, .. } => PageRequest::Offset {
                offset: 0,
                limit: *page_size,
            },
            Pagination::Cursor { .. } => PageRequest::Cursor(None),
            Pagination::PageNumber { first_page, .. } => PageRequest::Number(*first_page),
            Pagination::Single => PageRequest::Single,
        }
    }

    /// Parameters to place on the wire for `request`.
    pub fn params<'a>(&'a self, request: &PageRequest) -> Vec<ParamValue<'a>> {
        match (self, request) {
            (Pagination::OffsetLimit { offset: o, limit: l, .. }, PageRequest::Offset { offset, limit }) => vec![
                ParamValue { target: o, value: Value::from(*offset) },
                ParamValue { target: l, value: Value::from(*limit) },
            ],
            (Pagination::Cursor { cursor, .. }, PageRequest::Cursor(Some(c))) => {
                vec![ParamValue { target: cursor, value: Value::from(c.clone()) }]
            }
            (Pagination::PageNumber { page, .. }, PageRequest::Number(n)) => {
                vec![ParamValue { target: page, value: Value::from(*n) }]
            }
            _ => Vec::new(),
        }
    }

    /// Request for the page after `current`, or `None` when the source is drained.
    ///
    /// `response` is the decoded body (JSON sources) or `Value::Null` (HTML).
    pub fn next_request(
        &self,
        current: &PageRequest,
        response: &Value,
        record_count: usize,
    ) -> Option<PageRequest> {
        if record_count == 0 {
            return None;
        }
        match (self, current) {
            (Pagination::OffsetLimit { total_pointer, .. }, PageRequest::Offset { offset, limit }) => {
                let next_offset = offset + limit;
                let total = total_pointer
                    .as_deref()
                    .and_then(|p| response.pointer(p))
                    .and_then(as_u64);
                let drained = match total {
                    Some(total) => next_offset >= total,
                    None => (record_count as u64) < *limit,
                };
                (!drained).then_some(PageRequest::Offset {
                    offset: next_offset,
                    limit: *limit,
                })
            }
            (Pagination::Cursor { next_cursor_pointer, .. }, PageRequest::Cursor(_)) => response
                .pointer(next_cursor_pointer)
                .and_then(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .map(|c| PageRequest::Cursor(Some(c))),
            (Pagination::PageNumber { .. }, PageRequest::Number(n)) => Some(PageRequest::Number(n + 1)),
            _ => None,
        }
    }

    /// Whether any parameter of this style is written into a request body.
    pub fn uses_body(&self) -> bool {
        match self {
            Pagination::OffsetLimit { offset, limit, .. } => offset.is_body() || limit.is_body(),
            Pagination::Cursor { cursor, .. } => cursor.is_body(),
            Pagination::PageNumber { page, .. } => page.is_body(),
            Pagination::Single => false,
        }
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Write `value` at a JSON pointer, creating missing object members.
///
/// Returns `false` when the path runs through a non-container or an
/// out-of-range array index.
pub fn set_pointer(target: &mut Value, pointer: &str, value: Value) -> bool {
    if pointer.is_empty() {
        *target = value;
        return true;
    }
    let tokens: Vec<String> = pointer
        .trim_start_matches('/')
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect();

    let mut current = target;
    for (i, token) in tokens.iter().enumerate() {
        let last = i + 1 == tokens.len();
        current = match current {
            Value::Object(map) => {
                if last {
                    map.insert(token.clone(), value);
                    return true;
                }
                map.entry(token.clone())
                    .or_insert_with(|| Value::Object(Default::default()))
            }
            Value::Array(items) => {
                let Some(slot) = token.parse::<usize>().ok().and_then(|idx| items.get_mut(idx)) else {
                    return false;
                };
                if last {
                    *slot = value;
                    return true;
                }
                slot
            }
            _ => return false,
        };
    }
    false
}
