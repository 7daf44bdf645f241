/// The composer grows one row per wrapped line up to this cap, then keeps a
/// fixed height and scrolls.
pub const MAX_VISIBLE_ROWS: u16 = 8;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Hard-wrap one logical line into rows of at most `width` characters. A line
/// whose length is an exact multiple of the width gets a trailing empty row,
/// so the cursor always has a cell to land on after a full row. The row count
/// therefore equals `chars / width + 1` for every line.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let chars: Vec<char> = line.chars().collect();
    let mut rows: Vec<String> = chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect();
    if chars.len() % width == 0 {
        rows.push(String::new());
    }
    rows
}

/// The draft text of the composer. Height and cursor placement are derived
/// from the text and the available width on every call, never cached.
#[derive(Debug, Default)]
pub struct InputBuffer {
    text: String,
    cursor: usize, // char index into text
}

impl InputBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Hand the raw (untrimmed) draft to the caller and reset the field.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    // Editing

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    // Derived metrics

    /// Total wrapped rows at the given width.
    pub fn total_rows(&self, width: u16) -> u16 {
        let width = width.max(1) as usize;
        self.text
            .split('\n')
            .map(|line| (line.chars().count() / width + 1) as u16)
            .sum()
    }

    /// Rows the composer should occupy: grows with content, capped at
    /// [`MAX_VISIBLE_ROWS`].
    pub fn visible_rows(&self, width: u16) -> u16 {
        self.total_rows(width).clamp(1, MAX_VISIBLE_ROWS)
    }

    /// All wrapped rows of the draft, in render order.
    pub fn wrapped_rows(&self, width: u16) -> Vec<String> {
        let width = width.max(1) as usize;
        self.text
            .split('\n')
            .flat_map(|line| wrap_line(line, width))
            .collect()
    }

    /// Cursor position in wrapped-row coordinates.
    pub fn cursor_row_col(&self, width: u16) -> (u16, u16) {
        let width = width.max(1) as usize;
        let mut row: u16 = 0;
        let mut line_start: usize = 0;

        for line in self.text.split('\n') {
            let len = line.chars().count();
            if self.cursor <= line_start + len {
                let within = self.cursor - line_start;
                return (row + (within / width) as u16, (within % width) as u16);
            }
            row += (len / width + 1) as u16;
            line_start += len + 1; // account for the '\n'
        }

        (row, 0)
    }

    /// Rows to skip so the cursor stays visible once the field is at its cap.
    pub fn scroll_offset(&self, width: u16) -> u16 {
        let (cursor_row, _) = self.cursor_row_col(width);
        let visible = self.visible_rows(width);
        if cursor_row >= visible {
            cursor_row + 1 - visible
        } else {
            0
        }
    }
}
