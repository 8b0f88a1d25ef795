//! Editable source text with a line/column cursor.

/// Mutable source text owned by one pad.
///
/// Trailing whitespace is trimmed once at construction; after that the
/// buffer is freely editable and never trimmed again. The cursor column
/// counts characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBuffer {
    lines: Vec<String>,
    line: usize,
    col: usize,
}

impl SourceBuffer {
    pub fn from_source(source: &str) -> Self {
        let trimmed = source.trim_end();
        let lines = if trimmed.is_empty() {
            vec![String::new()]
        } else {
            trimmed.split('\n').map(str::to_string).collect()
        };
        Self { lines, line: 0, col: 0 }
    }

    /// Full buffer text, lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Cursor position as (line, column), both zero-based.
    pub fn cursor(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    pub fn insert_char(&mut self, c: char) {
        let at = char_to_byte(&self.lines[self.line], self.col);
        self.lines[self.line].insert(at, c);
        self.col += 1;
    }

    /// Split the current line at the cursor.
    pub fn insert_newline(&mut self) {
        let at = char_to_byte(&self.lines[self.line], self.col);
        let rest = self.lines[self.line].split_off(at);
        self.lines.insert(self.line + 1, rest);
        self.line += 1;
        self.col = 0;
    }

    /// Delete backwards; at column zero this joins onto the previous line.
    pub fn backspace(&mut self) {
        if self.col > 0 {
            let at = char_to_byte(&self.lines[self.line], self.col - 1);
            self.lines[self.line].remove(at);
            self.col -= 1;
        } else if self.line > 0 {
            let removed = self.lines.remove(self.line);
            self.line -= 1;
            self.col = self.lines[self.line].chars().count();
            self.lines[self.line].push_str(&removed);
        }
    }

    /// Delete forwards; at end of line this joins the next line up.
    pub fn delete(&mut self) {
        if self.col < self.line_len(self.line) {
            let at = char_to_byte(&self.lines[self.line], self.col);
            self.lines[self.line].remove(at);
        } else if self.line + 1 < self.lines.len() {
            let next = self.lines.remove(self.line + 1);
            self.lines[self.line].push_str(&next);
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.line > 0 {
            self.line -= 1;
            self.col = self.line_len(self.line);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < self.line_len(self.line) {
            self.col += 1;
        } else if self.line + 1 < self.lines.len() {
            self.line += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.line > 0 {
            self.line -= 1;
            self.clamp_col();
        }
    }

    pub fn move_down(&mut self) {
        if self.line + 1 < self.lines.len() {
            self.line += 1;
            self.clamp_col();
        }
    }

    pub fn move_home(&mut self) {
        self.col = 0;
    }

    pub fn move_end(&mut self) {
        self.col = self.line_len(self.line);
    }

    fn line_len(&self, line: usize) -> usize {
        self.lines[line].chars().count()
    }

    fn clamp_col(&mut self) {
        let len = self.line_len(self.line);
        if self.col > len {
            self.col = len;
        }
    }
}

/// Byte offset of the `n`-th character, or the string's end.
fn char_to_byte(s: &str, n: usize) -> usize {
    match s.char_indices().nth(n) {
        Some((i, _)) => i,
        None => s.len(),
    }
}
