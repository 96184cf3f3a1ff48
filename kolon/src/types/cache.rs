//! Process-wide, append-only cache of parsed type expressions.
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::Error;

use super::{TypeDescriptor, parser::parse_type};

static CACHE: OnceLock<RwLock<HashMap<String, Arc<TypeDescriptor>>>> = OnceLock::new();

/// Parse `input` into a [`TypeDescriptor`], reusing a cached result for the
/// exact same string if one already exists.
///
/// Safe to race: two callers may both miss the cache and parse the same
/// string concurrently, each inserting an equal value.
pub fn parse(input: &str) -> Result<Arc<TypeDescriptor>, Error> {
    let cache = CACHE.get_or_init(Default::default);

    if let Some(hit) = cache.read().unwrap().get(input) {
        return Ok(hit.clone());
    }

    let parsed = Arc::new(parse_type(input)?);

    cache
        .write()
        .unwrap()
        .entry(input.to_string())
        .or_insert_with(|| parsed.clone());

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_by_exact_string() {
        let a = parse("Array(UInt8)").unwrap();
        let b = parse("Array(UInt8)").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
