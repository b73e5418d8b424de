//! Thread-local pattern compilation cache for ast-grep patterns.
//!
//! Recipes evaluate the same guard patterns against every file they touch;
//! compiled patterns are kept per thread and capped at 256 entries.

use ast_grep_core::Pattern;
use ast_grep_language::SupportLang;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Key is "<lang_debug>:<pattern_str>": the same pattern text compiles
    // differently for JavaScript and TypeScript.
    static PATTERN_CACHE: RefCell<HashMap<String, Pattern>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled pattern from cache, or compile and cache it.
///
/// When the cap is reached, the cache is cleared and rebuilt on demand.
pub fn get_or_compile_pattern(pattern_str: &str, lang: SupportLang) -> Pattern {
    let cache_key = format!("{lang:?}:{pattern_str}");

    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(p) = cache.get(&cache_key) {
            return p.clone();
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Pattern::new(pattern_str, lang);
        cache.insert(cache_key, compiled.clone());
        compiled
    })
}

/// Clear the pattern cache (mainly for testing).
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

/// Number of cached patterns on this thread.
pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}
