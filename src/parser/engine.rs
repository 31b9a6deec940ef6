//! Backtracking parser primitives over a byte cursor.
//!
//! Every production returns [`Parse<T>`]. A failed production yields
//! [`NoMatch`], which the combinators here catch and turn into backtracking
//! by restoring the cursor position. `NoMatch` is the only failure a
//! production can signal, so nothing else is ever swallowed by
//! [`Cursor::optional`] or the repetition combinators.

use regex::bytes::{Captures, Regex};

/// The "this production does not match here" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoMatch;

/// Result of a grammar production.
pub type Parse<T> = Result<T, NoMatch>;

/// A position into an input buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Current offset into the input.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total input length.
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Unconsumed input.
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Input consumed since offset `start`.
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.input[start.min(self.pos)..self.pos]
    }

    /// Whether the cursor has reached the end of the input.
    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }

    // ── Primitives ──────────────────────────────────────────────────

    /// Consume `s` if the remaining input starts with it.
    pub fn literal(&mut self, s: &[u8]) -> Parse<&'a [u8]> {
        let rest = self.remaining();
        if rest.starts_with(s) {
            self.pos += s.len();
            Ok(&rest[..s.len()])
        } else {
            Err(NoMatch)
        }
    }

    /// Consume exactly one byte.
    pub fn any_char(&mut self) -> Parse<u8> {
        let b = *self.input.get(self.pos).ok_or(NoMatch)?;
        self.pos += 1;
        Ok(b)
    }

    /// Consume exactly `n` bytes.
    pub fn skip(&mut self, n: usize) -> Parse<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(NoMatch)?;
        if end > self.input.len() {
            return Err(NoMatch);
        }
        let s = &self.input[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    /// Consume and return everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let s = self.remaining();
        self.pos = self.input.len();
        s
    }

    /// Consume everything that is left without returning it.
    pub fn discard(&mut self) {
        self.pos = self.input.len();
    }

    /// Consume up to the next occurrence of `marker`, returning the bytes
    /// before it. With `consume_marker` the marker itself is consumed too.
    pub fn skip_to(&mut self, marker: &[u8], consume_marker: bool) -> Parse<&'a [u8]> {
        let rest = self.remaining();
        let at = find(rest, marker).ok_or(NoMatch)?;
        let s = &rest[..at];
        self.pos += at;
        if consume_marker {
            self.pos += marker.len();
        }
        Ok(s)
    }

    /// Match `re` anchored at the cursor and consume the whole match.
    ///
    /// Patterns are expected to start with `^`; the haystack handed to the
    /// regex begins at the cursor so `^` anchors there.
    pub fn regex(&mut self, re: &Regex) -> Parse<&'a [u8]> {
        let rest = self.remaining();
        let m = re.find(rest).filter(|m| m.start() == 0).ok_or(NoMatch)?;
        self.pos += m.end();
        Ok(&rest[..m.end()])
    }

    /// Like [`Cursor::regex`] but returns the capture groups.
    pub fn regex_match(&mut self, re: &Regex) -> Parse<Captures<'a>> {
        let rest = self.remaining();
        let caps = re.captures(rest).ok_or(NoMatch)?;
        let whole = caps.get(0).ok_or(NoMatch)?;
        if whole.start() != 0 {
            return Err(NoMatch);
        }
        self.pos += whole.end();
        Ok(caps)
    }

    /// Succeed only at the end of the input.
    pub fn end(&self) -> Parse<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(NoMatch)
        }
    }

    // ── Combinators ─────────────────────────────────────────────────

    /// Run `f` as an all-or-nothing unit: on failure the cursor is restored.
    pub fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Parse<T>) -> Parse<T> {
        let start = self.pos;
        let r = f(self);
        if r.is_err() {
            self.restore(start);
        }
        r
    }

    /// Run `f`; on no-match restore the cursor and yield `None`.
    pub fn optional<T>(&mut self, f: impl FnOnce(&mut Self) -> Parse<T>) -> Option<T> {
        self.attempt(f).ok()
    }

    /// Run `f` between `min` and `max` times.
    ///
    /// The first `min` runs must all succeed. Further runs stop at the first
    /// no-match (restoring the cursor) or at the first run that consumed
    /// nothing, which keeps nullable productions from looping forever.
    pub fn repeat<T>(
        &mut self,
        min: usize,
        max: Option<usize>,
        mut f: impl FnMut(&mut Self) -> Parse<T>,
    ) -> Parse<Vec<T>> {
        let start = self.pos;
        let mut out = Vec::new();

        for _ in 0..min {
            match f(self) {
                Ok(v) => out.push(v),
                Err(e) => {
                    self.restore(start);
                    return Err(e);
                }
            }
        }

        while max.is_none_or(|max| out.len() < max) {
            let before = self.pos;
            match f(self) {
                Ok(v) => {
                    out.push(v);
                    if self.pos == before {
                        break;
                    }
                }
                Err(NoMatch) => {
                    self.restore(before);
                    break;
                }
            }
        }

        Ok(out)
    }

    /// Zero or more repetitions of `f`. Never fails.
    pub fn zero_or_more<T>(&mut self, f: impl FnMut(&mut Self) -> Parse<T>) -> Vec<T> {
        self.repeat(0, None, f).unwrap_or_default()
    }

    /// One or more repetitions of `f`.
    pub fn one_or_more<T>(&mut self, f: impl FnMut(&mut Self) -> Parse<T>) -> Parse<Vec<T>> {
        self.repeat(1, None, f)
    }
}

/// Ordered choice over productions: the first alternative that matches
/// wins, and the cursor is restored between attempts.
///
/// ```ignore
/// let v = first_of!(c; |c| token(c), |c| quoted_string(c))?;
/// ```
macro_rules! first_of {
    ($cursor:expr; $($alt:expr),+ $(,)?) => {{
        let cursor = &mut *$cursor;
        let mut result = Err($crate::parser::engine::NoMatch);
        $(
            if result.is_err() {
                result = cursor.attempt($alt);
            }
        )+
        result
    }};
}
pub(crate) use first_of;

/// Parse the whole of `input` with `f`, requiring it to consume everything.
pub fn parse_all<'a, T>(input: &'a [u8], f: impl FnOnce(&mut Cursor<'a>) -> Parse<T>) -> Option<T> {
    let mut c = Cursor::new(input);
    c.optional(|c| {
        let v = f(c)?;
        c.end()?;
        Ok(v)
    })
}

/// Byte-substring search.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Compile a byte regex that is known to be valid.
///
/// Every pattern in this crate is a literal checked by the unit tests, so a
/// failure here is a programming error.
pub(crate) fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid built-in pattern")
}
