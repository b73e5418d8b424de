//! Thread-local parser pooling.
//!
//! Keeps one tree-sitter parser per dialect per thread. The parser is created
//! on first use and reused for every later parse on that thread.

use crate::js::{Dialect, JsParser, ParseError};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static PARSERS: RefCell<HashMap<Dialect, JsParser>> = RefCell::new(HashMap::new());
}

/// Execute function with the pooled parser for `dialect`.
///
/// The closure must not call back into `with_parser`.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use js_patcher::js::Dialect;
/// use js_patcher::pool::with_parser;
///
/// let tree = with_parser(Dialect::TypeScript, |parser| parser.parse("export {};"))??;
/// assert_eq!(tree.root_node().kind(), "program");
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(dialect: Dialect, f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut JsParser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        if !parsers.contains_key(&dialect) {
            parsers.insert(dialect, JsParser::new(dialect)?);
        }
        let parser = parsers.get_mut(&dialect).ok_or(ParseError::ParseFailed)?;
        Ok(f(parser))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_parser_per_dialect() {
        let a = with_parser(Dialect::JavaScript, |p| p.dialect()).unwrap();
        let b = with_parser(Dialect::Tsx, |p| p.dialect()).unwrap();
        assert_eq!(a, Dialect::JavaScript);
        assert_eq!(b, Dialect::Tsx);

        let count = PARSERS.with(|cell| cell.borrow().len());
        assert!(count >= 2);
    }
}
