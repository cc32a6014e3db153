/// Returned by `current` and `peek` when the position is outside the buffer.
pub const EOF_CHAR: char = '\0';

#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    column: usize,
}

/// Cursor over the chars of a template source.
///
/// Knows nothing about tags. The tokenizer and refiner drive it with
/// `mark`/`collect_from_mark` and the `walk_until_*` primitives.
///
/// - `Vec<char>` source for index-based navigation in both directions
/// - the cursor is terminated once it moves past the last char
/// - line and column are kept in step with every forward and backward move
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    mark: Mark,
}

impl Scanner {
    /// Create a scanner positioned on the first char of `source`.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            mark: Mark {
                pos: 0,
                line: 1,
                column: 1,
            },
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// True once the position has moved past the last char.
    pub fn is_terminated(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// The char under the cursor, or `EOF_CHAR` when terminated.
    pub fn current(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or(EOF_CHAR)
    }

    /// The char `offset` positions away (negative looks behind).
    pub fn peek(&self, offset: isize) -> char {
        self.pos
            .checked_add_signed(offset)
            .and_then(|i| self.chars.get(i))
            .copied()
            .unwrap_or(EOF_CHAR)
    }

    /// Move forward one char. A no-op once terminated.
    pub fn step(&mut self) {
        if self.is_terminated() {
            return;
        }
        if self.chars[self.pos] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    /// Move back one char. A no-op at the first char; clears termination.
    pub fn step_back(&mut self) {
        if self.pos == 0 {
            return;
        }
        self.pos -= 1;
        if self.chars[self.pos] == '\n' {
            self.line -= 1;
            let line_start = self.chars[..self.pos]
                .iter()
                .rposition(|&c| c == '\n')
                .map_or(0, |i| i + 1);
            self.column = self.pos - line_start + 1;
        } else {
            self.column -= 1;
        }
    }

    /// Remember the current position for `collect_from_mark`.
    pub fn mark(&mut self) {
        self.mark = Mark {
            pos: self.pos,
            line: self.line,
            column: self.column,
        };
    }

    pub fn mark_position(&self) -> usize {
        self.mark.pos
    }

    /// The char `offset` positions after the mark.
    pub fn peek_from_mark(&self, offset: usize) -> char {
        self.chars
            .get(self.mark.pos + offset)
            .copied()
            .unwrap_or(EOF_CHAR)
    }

    /// Line and column of the lower end of the marked range.
    pub fn mark_location(&self) -> (usize, usize) {
        if self.mark.pos <= self.pos {
            (self.mark.line, self.mark.column)
        } else {
            (self.line, self.column)
        }
    }

    /// The chars between the mark and the current position, both inclusive.
    ///
    /// Works in either direction. Positions past the end clamp to the last char.
    pub fn collect_from_mark(&self) -> String {
        let Some(last) = self.chars.len().checked_sub(1) else {
            return String::new();
        };
        let lo = self.mark.pos.min(self.pos);
        let hi = self.mark.pos.max(self.pos).min(last);
        if lo > hi {
            return String::new();
        }
        self.chars[lo..=hi].iter().collect()
    }

    /// The chars `start..end`, clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Advance until the current char is `target`. Returns whether it was found;
    /// when it is not, the scanner ends terminated.
    pub fn walk_until(&mut self, target: char) -> bool {
        while !self.is_terminated() {
            if self.current() == target {
                return true;
            }
            self.step();
        }
        false
    }

    /// Like `walk_until`, but a run quoted with `'` or `"` is opaque: a `target`
    /// inside it is not a match. A quote preceded by `\` neither opens nor
    /// closes a run.
    pub fn walk_until_skipping_quotes(&mut self, target: char) -> bool {
        let mut quote: Option<char> = None;
        while !self.is_terminated() {
            let ch = self.current();
            let escaped = self.peek(-1) == '\\';
            match quote {
                Some(open) => {
                    if ch == open && !escaped {
                        quote = None;
                    }
                }
                None => {
                    if ch == target {
                        return true;
                    }
                    if (ch == '"' || ch == '\'') && !escaped {
                        quote = Some(ch);
                    }
                }
            }
            self.step();
        }
        false
    }

    /// Advance until the current char is `target` and the char before it is
    /// not a backslash.
    pub fn walk_until_unescaped(&mut self, target: char) -> bool {
        while !self.is_terminated() {
            if self.current() == target && self.peek(-1) != '\\' {
                return true;
            }
            self.step();
        }
        false
    }
}
