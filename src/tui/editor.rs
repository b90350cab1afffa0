//! Cursor movement and edits over the session's source buffer.
//!
//! The cursor is a character index into the whole buffer; rows and columns
//! are derived on demand so the buffer itself stays a plain `String`.

use crate::utils::unicode::char_to_byte_index;

pub const TAB_WIDTH: usize = 4;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Editor {
    pub cursor: usize,
    /// First visible row.
    pub scroll: usize,
}

impl Editor {
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.scroll = 0;
    }

    /// `(row, column)` of the cursor, both in characters.
    pub fn position(&self, text: &str) -> (usize, usize) {
        let mut row = 0;
        let mut col = 0;
        for c in text.chars().take(self.cursor) {
            if c == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (row, col)
    }

    fn clamp(&mut self, text: &str) {
        self.cursor = self.cursor.min(text.chars().count());
    }

    pub fn insert_char(&mut self, text: &mut String, c: char) {
        self.clamp(text);
        let at = char_to_byte_index(text, self.cursor);
        text.insert(at, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &mut String, s: &str) {
        self.clamp(text);
        let s = s.replace("\r\n", "\n");
        let at = char_to_byte_index(text, self.cursor);
        text.insert_str(at, &s);
        self.cursor += s.chars().count();
    }

    /// Newline keeping the current line's leading indentation.
    pub fn newline(&mut self, text: &mut String) {
        self.clamp(text);
        let (row, _) = self.position(text);
        let indent: String = text
            .lines()
            .nth(row)
            .map(|l| l.chars().take_while(|c| *c == ' ' || *c == '\t').collect())
            .unwrap_or_default();
        self.insert_str(text, &format!("\n{}", indent));
    }

    pub fn backspace(&mut self, text: &mut String) {
        self.clamp(text);
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = char_to_byte_index(text, self.cursor);
        text.remove(at);
    }

    pub fn delete(&mut self, text: &mut String) {
        self.clamp(text);
        if self.cursor < text.chars().count() {
            let at = char_to_byte_index(text, self.cursor);
            text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self, text: &str) {
        self.cursor = (self.cursor + 1).min(text.chars().count());
    }

    pub fn home(&mut self, text: &str) {
        let (_, col) = self.position(text);
        self.cursor -= col;
    }

    pub fn end(&mut self, text: &str) {
        let (row, col) = self.position(text);
        let len = line_len(text, row);
        self.cursor += len - col;
    }

    pub fn up(&mut self, text: &str) {
        let (row, col) = self.position(text);
        if row > 0 {
            self.move_to(text, row - 1, col);
        }
    }

    pub fn down(&mut self, text: &str) {
        let (row, col) = self.position(text);
        if row + 1 < line_count(text) {
            self.move_to(text, row + 1, col);
        }
    }

    fn move_to(&mut self, text: &str, row: usize, col: usize) {
        let start: usize = text
            .split('\n')
            .take(row)
            .map(|l| l.chars().count() + 1)
            .sum();
        self.cursor = start + col.min(line_len(text, row));
    }

    /// Keep the cursor row inside a viewport of `height` rows.
    pub fn follow(&mut self, text: &str, height: usize) {
        let (row, _) = self.position(text);
        if row < self.scroll {
            self.scroll = row;
        } else if height > 0 && row >= self.scroll + height {
            self.scroll = row + 1 - height;
        }
    }
}

fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

fn line_len(text: &str, row: usize) -> usize {
    text.split('\n').nth(row).map_or(0, |l| l.chars().count())
}

/// Display column of a character column, expanding tabs.
pub fn display_column(line: &str, col: usize) -> usize {
    line.chars()
        .take(col)
        .map(|c| match c {
            '\t' => TAB_WIDTH,
            c => unicode_width::UnicodeWidthChar::width(c).unwrap_or(0),
        })
        .sum()
}
