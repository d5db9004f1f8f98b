//! Method and path parsing into a typed [`Action`].
//!
//! # Grammar
//! ```text
//! /                       → Root        (POST only: query)
//! /{collection}           → Collection  (POST only: create)
//! /{collection}/          → Collection
//! /{collection}/{id}      → Document    (every verb but POST), id ≥ 1
//! ```

use thiserror::Error;

/// HTTP verbs the gateway serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    /// Parse a method token. Case-sensitive, as HTTP methods are.
    pub fn parse(token: &str) -> Option<Verb> {
        match token {
            "GET" => Some(Verb::Get),
            "HEAD" => Some(Verb::Head),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "PATCH" => Some(Verb::Patch),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

/// What a request path addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Root,
    Collection(String),
    Document { collection: String, id: i64 },
}

/// A routed request: verb plus target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub verb: Verb,
    pub target: Target,
}

impl Action {
    /// Whether the request may run without a token under anonymous-read.
    pub fn allows_anonymous(&self) -> bool {
        match self.verb {
            Verb::Get | Verb::Head => true,
            Verb::Post => self.target == Target::Root,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("unsupported method {0:?}")]
    UnsupportedMethod(String),

    #[error("malformed path")]
    MalformedPath,

    #[error("{0} requires a document id")]
    IdRequired(&'static str),

    #[error("POST does not accept a document id")]
    IdNotAllowed,

    #[error("invalid document id {0:?}")]
    InvalidId(String),

    #[error("collection name is {len} bytes, limit is {max}")]
    CollectionTooLong { len: usize, max: usize },
}

/// Route a request. Any error here is answered with 400.
pub fn route(method: &str, path: &str, max_collection_len: usize) -> Result<Action, RouteError> {
    let verb = Verb::parse(method).ok_or_else(|| RouteError::UnsupportedMethod(method.to_string()))?;
    let target = parse_path(path, max_collection_len)?;

    match (&target, verb) {
        (Target::Root, Verb::Post) => {}
        (Target::Root, other) | (Target::Collection(_), other) if other != Verb::Post => {
            return Err(RouteError::IdRequired(other.as_str()));
        }
        (Target::Document { .. }, Verb::Post) => return Err(RouteError::IdNotAllowed),
        _ => {}
    }
    Ok(Action { verb, target })
}

fn parse_path(path: &str, max_collection_len: usize) -> Result<Target, RouteError> {
    if path.is_empty() || path == "/" {
        return Ok(Target::Root);
    }
    let rest = path.strip_prefix('/').ok_or(RouteError::MalformedPath)?;
    let (collection, id) = match rest.split_once('/') {
        None => (rest, None),
        Some((collection, "")) => (collection, None),
        Some((collection, id)) => (collection, Some(id)),
    };
    if collection.is_empty() {
        return Err(RouteError::MalformedPath);
    }
    if collection.len() > max_collection_len {
        return Err(RouteError::CollectionTooLong {
            len: collection.len(),
            max: max_collection_len,
        });
    }
    match id {
        None => Ok(Target::Collection(collection.to_string())),
        Some(token) => Ok(Target::Document {
            collection: collection.to_string(),
            id: parse_id(token)?,
        }),
    }
}

/// Parse a document id: base-10 digits only, value ≥ 1.
pub fn parse_id(token: &str) -> Result<i64, RouteError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RouteError::InvalidId(token.to_string()));
    }
    match token.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(RouteError::InvalidId(token.to_string())),
    }
}
