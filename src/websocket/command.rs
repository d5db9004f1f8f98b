//! WebSocket command tokenizer.
//!
//! ```text
//! <key> set   <collection> <id> <json-document>
//! <key> add   <collection> <json-document>
//! <key> del   <collection> <id>
//! <key> patch <collection> <id> <json-patch>
//! <key> <query text>
//! ```
//!
//! Fields are separated by runs of whitespace. Anything that does not fit
//! the grammar parses to `None` and the message is dropped.

use crate::routing::parse_id;

/// Longest accepted correlation key.
pub const MAX_KEY_LEN: usize = 36;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    /// Client-chosen correlation key echoed in every reply.
    pub key: &'a str,
    pub op: Op<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op<'a> {
    Set { collection: &'a str, id: i64, payload: &'a str },
    Add { collection: &'a str, payload: &'a str },
    Del { collection: &'a str, id: i64 },
    Patch { collection: &'a str, id: i64, payload: &'a str },
    Query(&'a str),
}

impl Op<'_> {
    pub fn verb(&self) -> &'static str {
        match self {
            Op::Set { .. } => "set",
            Op::Add { .. } => "add",
            Op::Del { .. } => "del",
            Op::Patch { .. } => "patch",
            Op::Query(_) => "query",
        }
    }

    /// Whether the verb itself writes. Queries are judged after parsing.
    pub fn is_write(&self) -> bool {
        !matches!(self, Op::Query(_))
    }
}

/// Split off the next whitespace-delimited token.
fn next_token(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    Some((&input[..end], &input[end..]))
}

fn take_collection(input: &str, max_len: usize) -> Option<(&str, &str)> {
    let (name, rest) = next_token(input)?;
    (name.len() <= max_len).then_some((name, rest))
}

fn take_id(input: &str) -> Option<(i64, &str)> {
    let (token, rest) = next_token(input)?;
    parse_id(token).ok().map(|id| (id, rest))
}

fn take_payload(input: &str) -> Option<&str> {
    let payload = input.trim();
    (!payload.is_empty()).then_some(payload)
}

/// Parse one text message.
pub fn parse(message: &str, max_collection_len: usize) -> Option<Command<'_>> {
    let (key, rest) = next_token(message)?;
    if key.len() > MAX_KEY_LEN {
        return None;
    }
    let (verb, after_verb) = next_token(rest)?;
    let op = match verb {
        "set" => {
            let (collection, rest) = take_collection(after_verb, max_collection_len)?;
            let (id, rest) = take_id(rest)?;
            Op::Set { collection, id, payload: take_payload(rest)? }
        }
        "add" => {
            let (collection, rest) = take_collection(after_verb, max_collection_len)?;
            Op::Add { collection, payload: take_payload(rest)? }
        }
        "del" => {
            let (collection, rest) = take_collection(after_verb, max_collection_len)?;
            let (id, _) = take_id(rest)?;
            Op::Del { collection, id }
        }
        "patch" => {
            let (collection, rest) = take_collection(after_verb, max_collection_len)?;
            let (id, rest) = take_id(rest)?;
            Op::Patch { collection, id, payload: take_payload(rest)? }
        }
        _ => Op::Query(take_payload(rest)?),
    };
    Some(Command { key, op })
}
