//! Query language understood by [`MemoryStore`](super::MemoryStore).
//!
//! ```text
//! @<collection>/*                          every document
//! @<collection>/[<field> = <json>]         top-level equality filter
//!     | apply <json-merge-patch>           patch each match (mutating)
//!     | limit <n>                          stop after n matches
//! ```

use serde_json::Value;

use super::{QuerySpec, StoreError};

/// Parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryQuery {
    pub collection: String,
    pub filter: Option<(String, Value)>,
    pub apply: Option<Value>,
    pub limit: Option<usize>,
}

impl QuerySpec for MemoryQuery {
    fn is_mutating(&self) -> bool {
        self.apply.is_some()
    }

    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

impl MemoryQuery {
    pub fn matches(&self, doc: &Value) -> bool {
        match &self.filter {
            None => true,
            Some((field, expected)) => doc.get(field) == Some(expected),
        }
    }

    /// One-line description of how the query will run.
    pub fn explain(&self) -> String {
        let mut plan = match &self.filter {
            None => format!("[COLLECTOR] scan @{}", self.collection),
            Some((field, _)) => format!("[COLLECTOR] filter @{} by {}", self.collection, field),
        };
        if self.apply.is_some() {
            plan.push_str(" [APPLY] merge");
        }
        if let Some(limit) = self.limit {
            plan.push_str(&format!(" [LIMIT] {limit}"));
        }
        plan
    }
}

fn syntax(at: usize, message: &str) -> StoreError {
    StoreError::QueryParse(format!("Query syntax error at {at}: {message}"))
}

/// Read one JSON value from the front of `input`, returning it and the rest.
fn leading_json(input: &str) -> Result<(Value, &str), String> {
    let mut stream = serde_json::Deserializer::from_str(input).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => {
            let consumed = stream.byte_offset();
            Ok((value, &input[consumed..]))
        }
        Some(Err(e)) => Err(e.to_string()),
        None => Err("expected a JSON value".to_string()),
    }
}

pub fn parse(text: &str) -> Result<MemoryQuery, StoreError> {
    let source = text.trim();
    let offset = |rest: &str| source.len() - rest.len();

    let Some(rest) = source.strip_prefix('@') else {
        if source.starts_with('/') {
            return Err(StoreError::NoCollection("query does not name a collection".into()));
        }
        return Err(syntax(0, "expected '@<collection>'"));
    };
    let slash = rest
        .find('/')
        .ok_or_else(|| syntax(source.len(), "expected '/' after collection name"))?;
    let collection = &rest[..slash];
    if collection.is_empty() {
        return Err(StoreError::NoCollection("empty collection name".into()));
    }
    if collection.chars().any(|c| c.is_whitespace()) {
        return Err(syntax(1, "collection name contains whitespace"));
    }
    let mut rest = &rest[slash + 1..];

    let filter = if let Some(after) = rest.strip_prefix('*') {
        rest = after;
        None
    } else if let Some(body) = rest.strip_prefix('[') {
        let eq = body
            .find('=')
            .ok_or_else(|| syntax(offset(body), "expected '=' in filter"))?;
        let field = body[..eq].trim();
        if field.is_empty() {
            return Err(syntax(offset(body), "empty field name in filter"));
        }
        let value_text = &body[eq + 1..];
        let (value, after) =
            leading_json(value_text).map_err(|e| syntax(offset(value_text), &e))?;
        let after = after.trim_start();
        rest = after
            .strip_prefix(']')
            .ok_or_else(|| syntax(offset(after), "expected ']'"))?;
        Some((field.to_string(), value))
    } else {
        return Err(syntax(offset(rest), "expected '*' or '[' after collection"));
    };

    let mut query = MemoryQuery {
        collection: collection.to_string(),
        filter,
        apply: None,
        limit: None,
    };

    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        let clause = trimmed
            .strip_prefix('|')
            .ok_or_else(|| syntax(offset(trimmed), "expected '|'"))?
            .trim_start();
        if let Some(body) = clause.strip_prefix("apply") {
            let (value, after) = leading_json(body).map_err(|e| syntax(offset(body), &e))?;
            query.apply = Some(value);
            rest = after;
        } else if let Some(body) = clause.strip_prefix("limit") {
            let body = body.trim_start();
            let end = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
            let limit = body[..end]
                .parse::<usize>()
                .map_err(|_| syntax(offset(body), "expected a number after 'limit'"))?;
            query.limit = Some(limit);
            rest = &body[end..];
        } else {
            return Err(syntax(offset(clause), "unknown clause"));
        }
    }
    Ok(query)
}
