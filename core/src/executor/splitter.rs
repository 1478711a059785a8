//! Statement splitter
//!
//! Cuts source text on `;`, but only at bracket depth zero and outside string
//! literals, so `const o = {a: 1; b}` or `"a;b"` stay in one piece.
//!
//! String literals open with `"`, `'` or `` ` `` and close at the next occurrence
//! of the same character. Escapes are not recognised: `"a\"b"` closes after the
//! backslash. This is a known limitation of the statement language.

use super::types::Statement;

const TERMINATOR: char = ';';

/// Bracket nesting counters
///
/// Closers decrement without clamping, so a stray `)` also keeps the scanner
/// from splitting for the rest of the source.
#[derive(Debug, Default, Clone, Copy)]
struct Depth {
    paren: i32,
    brace: i32,
    bracket: i32,
}

impl Depth {
    fn is_top_level(&self) -> bool {
        self.paren == 0 && self.brace == 0 && self.bracket == 0
    }

    fn total(&self) -> i32 {
        self.paren + self.brace + self.bracket
    }
}

/// Character-at-a-time bracket and string tracker
#[derive(Debug, Default)]
struct Scanner {
    depth: Depth,
    quote: Option<char>,
}

impl Scanner {
    /// Consume `ch`; true when it sits outside strings at bracket depth zero
    fn step(&mut self, ch: char) -> bool {
        if let Some(open) = self.quote {
            if ch == open {
                self.quote = None;
            }
            return false;
        }

        match ch {
            '"' | '\'' | '`' => {
                self.quote = Some(ch);
                return false;
            }
            '(' => self.depth.paren += 1,
            ')' => self.depth.paren -= 1,
            '{' => self.depth.brace += 1,
            '}' => self.depth.brace -= 1,
            '[' => self.depth.bracket += 1,
            ']' => self.depth.bracket -= 1,
            _ => {}
        }
        self.depth.is_top_level()
    }
}

/// Split source text into trimmed, non-empty statements
pub fn split_statements(source: &str) -> Vec<Statement> {
    split_top_level(source, TERMINATOR)
        .into_iter()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(Statement::new)
        .collect()
}

/// Cut `source` at every `separator` outside brackets and strings
///
/// Pieces are returned untrimmed; there is always at least one.
pub fn split_top_level(source: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut scanner = Scanner::default();
    let mut start = 0;

    for (i, ch) in source.char_indices() {
        if scanner.step(ch) && ch == separator {
            pieces.push(&source[start..i]);
            start = i + ch.len_utf8();
        }
    }

    pieces.push(&source[start..]);
    pieces
}

/// Deepest combined bracket nesting reached outside strings
pub fn max_nesting_depth(source: &str) -> usize {
    let mut scanner = Scanner::default();
    let mut deepest = 0;

    for ch in source.chars() {
        scanner.step(ch);
        deepest = deepest.max(scanner.depth.total());
    }
    deepest.max(0) as usize
}
