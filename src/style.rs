//! Formatting inference.
//!
//! Generated code follows the indentation and quote character the file
//! already uses. Both guesses are advisory: ambiguous input falls back to
//! a tab and single quotes.

use tree_sitter::{Node, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Single,
    Double,
}

impl QuoteStyle {
    pub fn char(self) -> char {
        match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }
}

/// Layout applied to regenerated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    /// One level of indentation
    pub indent: String,
    pub quote: QuoteStyle,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            quote: QuoteStyle::Single,
        }
    }
}

impl Style {
    /// Infer the style of a parsed file from its own content.
    pub fn infer(source: &str, tree: &Tree) -> Self {
        Self {
            indent: guess_indent_string(source),
            quote: guess_quote_style(tree.root_node(), source).unwrap_or(QuoteStyle::Single),
        }
    }

    /// Quote `inner` (string contents as written in source) with this style.
    pub fn quote(&self, inner: &str) -> String {
        let q = self.quote.char();
        let mut out = String::with_capacity(inner.len() + 2);
        out.push(q);
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q {
                out.push('\\');
                out.push(c);
            } else {
                out.push(c);
            }
        }
        out.push(q);
        out
    }
}

/// Guess the indentation unit of `source`.
///
/// Counts lines led by tabs against lines led by spaces, ignoring lines that
/// are whitespace only, and remembers the shortest space run of at least two.
/// Spaces win only when strictly more frequent.
pub fn guess_indent_string(source: &str) -> String {
    let mut tabs = 0usize;
    let mut spaces = 0usize;
    let mut min_spaces = 8usize;

    for line in source.lines() {
        let Some(first) = line.chars().next() else {
            continue;
        };
        if first != ' ' && first != '\t' {
            continue;
        }
        let run = line.chars().take_while(|&c| c == first).count();
        if run == line.len() {
            continue;
        }
        if first == '\t' {
            tabs += 1;
        } else {
            spaces += 1;
            if run > 1 && run < min_spaces {
                min_spaces = run;
            }
        }
    }

    if spaces > tabs {
        " ".repeat(min_spaces)
    } else {
        "\t".to_string()
    }
}

/// Guess the quote character from the string literals in `root`.
///
/// Returns `None` when the file has no string literals.
pub fn guess_quote_style(root: Node<'_>, source: &str) -> Option<QuoteStyle> {
    let mut single = 0usize;
    let mut double = 0usize;
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.kind() == "string" {
            let raw = &source[node.byte_range()];
            if raw.len() >= 2 {
                for quote in [raw.chars().next(), raw.chars().last()].into_iter().flatten() {
                    match quote {
                        '\'' => single += 1,
                        '"' => double += 1,
                        _ => {}
                    }
                }
            }
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }

    if single == 0 && double == 0 {
        None
    } else if single > double {
        Some(QuoteStyle::Single)
    } else {
        Some(QuoteStyle::Double)
    }
}
