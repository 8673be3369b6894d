use ropey::Rope;

/// Line-granular change notification: lines `[start_line, end_line_exclusive)` of the old text
/// were replaced by `new_line_count` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEvent {
    pub start_line: usize,
    pub end_line_exclusive: usize,
    pub new_line_count: usize,
}

impl EditEvent {
    pub fn new(start_line: usize, end_line_exclusive: usize, new_line_count: usize) -> Self {
        Self {
            start_line,
            end_line_exclusive,
            new_line_count,
        }
    }

    /// A change confined to one line.
    pub fn line(line: usize) -> Self {
        Self::new(line, line + 1, 1)
    }

    pub fn old_line_count(&self) -> usize {
        self.end_line_exclusive.saturating_sub(self.start_line)
    }
}

/// Character-offset text change, from a local keystroke or from the collaboration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    Insert {
        char_offset: usize,
        text: String,
    },
    Delete {
        start: usize,
        end: usize,
    },
    Replace {
        start: usize,
        end: usize,
        text: String,
    },
}

impl TextEdit {
    fn parts(&self) -> (usize, usize, &str) {
        match self {
            TextEdit::Insert { char_offset, text } => (*char_offset, *char_offset, text.as_str()),
            TextEdit::Delete { start, end } => (*start, *end, ""),
            TextEdit::Replace { start, end, text } => (*start, *end, text.as_str()),
        }
    }
}

/// Applies `edit` to `rope` and reports which lines changed. Offsets are clamped to the text.
pub fn apply_text_edit(rope: &mut Rope, edit: &TextEdit) -> EditEvent {
    let (start, end, text) = edit.parts();
    let len = rope.len_chars();
    let start = start.min(len);
    let end = end.clamp(start, len);

    let start_line = rope.char_to_line(start);
    let old_end_line = rope.char_to_line(end);

    if start < end {
        rope.remove(start..end);
    }
    if !text.is_empty() {
        rope.insert(start, text);
    }

    let inserted_chars = text.chars().count();
    let new_end_line = rope.char_to_line(start + inserted_chars);

    EditEvent {
        start_line,
        end_line_exclusive: old_end_line + 1,
        new_line_count: new_end_line - start_line + 1,
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/editor/edit.rs"]
mod tests;
