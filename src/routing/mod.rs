//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path)
//!     → router.rs (verb + target parsing)
//!     → Action { verb, target } or RouteError (400)
//!     → access guard, then the matching handler
//! ```
//!
//! # Design Decisions
//! - No regex and no route table: the path grammar is two segments deep
//! - Routing runs before the access guard, so malformed requests are 400
//!   even without a token
//! - Deterministic: same input always routes the same way

pub mod router;

pub use router::{parse_id, route, Action, RouteError, Target, Verb};
