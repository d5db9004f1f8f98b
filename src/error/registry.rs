//! Process-wide error-description registry.
//!
//! Components register a describer mapping their numeric codes to text.
//! Lookups ask each describer in registration order.

use std::sync::{PoisonError, RwLock};

/// Maps a numeric error code to a description, `None` if the code is foreign.
pub type Describer = fn(u32) -> Option<&'static str>;

static DESCRIBERS: RwLock<Vec<Describer>> = RwLock::new(Vec::new());

/// Register a describer. Registering the same function twice is a no-op.
pub fn register(describer: Describer) {
    let mut describers = DESCRIBERS.write().unwrap_or_else(PoisonError::into_inner);
    if !describers.iter().any(|d| *d as usize == describer as usize) {
        describers.push(describer);
    }
}

/// Describe a code using the first describer that recognizes it.
pub fn explain(code: u32) -> Option<&'static str> {
    let describers = DESCRIBERS.read().unwrap_or_else(PoisonError::into_inner);
    describers.iter().find_map(|describe| describe(code))
}
