use heapless::Vec;

use crate::error::EditError;
use crate::escape::Key;
use crate::parser::CommandParser;
use crate::writer::Output;

const BACKSPACE: u8 = 0x08;
const TAB: u8 = 0x09;
const DEL: u8 = 0x7F;

/// Source of tab completions and parameter hints
pub trait Completion {
    /// The single name that starts with `partial`, if there is exactly one
    fn complete(&self, partial: &str) -> Option<&str>;

    /// Parameter hints registered for `command`
    fn hints(&self, _command: &str) -> Option<&[&str]> {
        None
    }
}

/// Input understood by the line editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    /// A raw byte, printable or control
    Byte(u8),
    Left,
    Right,
    Home,
    End,
    /// Forward delete
    Delete,
}

impl EditKey {
    /// Map a recognized escape key, if the editor handles it
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::ArrowLeft => Some(EditKey::Left),
            Key::ArrowRight => Some(EditKey::Right),
            Key::Home => Some(EditKey::Home),
            Key::End => Some(EditKey::End),
            Key::Delete => Some(EditKey::Delete),
            _ => None,
        }
    }
}

/// Result of applying one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditResult<'c> {
    /// Keep editing
    Pending,
    /// A line terminator arrived; the line is ready
    Complete,
    /// Tab on a command with parameter hints
    Hints(&'c [&'c str]),
}

/// In-place editor for a single line.
///
/// The line never grows past `BUF_SIZE - 1` bytes and the cursor always sits
/// within `0..=len`. Every edit echoes what a dumb terminal needs to show it:
/// plain characters, backspaces and spaces, no ANSI.
#[derive(Debug, Default)]
pub struct LineEditor<const BUF_SIZE: usize> {
    buffer: Vec<u8, BUF_SIZE>,
    // None until the first edit of a line
    cursor: Option<usize>,
    last_byte: Option<u8>,
}

impl<const BUF_SIZE: usize> LineEditor<BUF_SIZE> {
    /// Longest line the buffer accepts
    pub const MAX_LEN: usize = BUF_SIZE.saturating_sub(1);

    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: None,
            last_byte: None,
        }
    }

    /// Get the current line
    pub fn line(&self) -> &str {
        core::str::from_utf8(&self.buffer).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the current cursor position
    pub fn cursor_position(&self) -> usize {
        self.cursor.unwrap_or(self.buffer.len())
    }

    /// Drop the line and start a fresh one.
    ///
    /// The last-byte tracker survives so the second half of a CR/LF pair is
    /// still swallowed.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = None;
    }

    /// Insert `byte` at `index` without echo.
    ///
    /// Only printable ASCII (`0x20..=0x7E`) is accepted, so [`line`](Self::line)
    /// always reads back what was inserted.
    pub fn insert_at(&mut self, index: usize, byte: u8) -> Result<(), EditError> {
        if !matches!(byte, 0x20..=0x7E) {
            return Err(EditError::NotPrintable);
        }
        if index > self.buffer.len() {
            return Err(EditError::OutOfRange);
        }
        if self.buffer.len() >= Self::MAX_LEN {
            return Err(EditError::BufferFull);
        }
        self.buffer.insert(index, byte).map_err(|_| EditError::BufferFull)
    }

    /// Remove the byte at `index` without echo
    pub fn remove_at(&mut self, index: usize) -> Result<u8, EditError> {
        if index >= self.buffer.len() {
            return Err(EditError::OutOfRange);
        }
        let removed = self.buffer.remove(index);
        if let Some(cursor) = self.cursor {
            self.cursor = Some(cursor.min(self.buffer.len()));
        }
        Ok(removed)
    }

    /// Note a byte that was consumed elsewhere (escape sequences, Ctrl-C).
    ///
    /// A terminator after it starts a new line even if it is the partner of
    /// the one that ended the previous line.
    pub fn note_other_input(&mut self) {
        self.last_byte = None;
    }

    /// Apply one key to the line
    pub fn apply<'c, C>(
        &mut self,
        key: EditKey,
        completion: &'c C,
        out: &mut Output<'_>,
    ) -> EditResult<'c>
    where
        C: Completion + ?Sized,
    {
        if self.cursor.is_none() {
            self.cursor = Some(self.buffer.len());
        }

        let previous = self.last_byte.take();
        match key {
            EditKey::Byte(BACKSPACE | DEL) => {
                self.backspace(out);
                EditResult::Pending
            }
            EditKey::Delete => {
                self.delete_forward(out);
                EditResult::Pending
            }
            EditKey::Left => {
                let cursor = self.cursor_position();
                if cursor > 0 {
                    out.echo_backspaces(1);
                    self.cursor = Some(cursor - 1);
                }
                EditResult::Pending
            }
            EditKey::Right => {
                let cursor = self.cursor_position();
                if cursor < self.buffer.len() {
                    out.echo_bytes(&self.buffer[cursor..=cursor]);
                    self.cursor = Some(cursor + 1);
                }
                EditResult::Pending
            }
            EditKey::Home => {
                out.echo_backspaces(self.cursor_position());
                self.cursor = Some(0);
                EditResult::Pending
            }
            EditKey::End => {
                out.echo_bytes(&self.buffer[self.cursor_position()..]);
                self.cursor = Some(self.buffer.len());
                EditResult::Pending
            }
            EditKey::Byte(TAB) => self.tab(completion, out),
            EditKey::Byte(byte @ 0x20..=0x7E) => {
                self.insert_char(byte, out);
                EditResult::Pending
            }
            EditKey::Byte(byte @ (b'\r' | b'\n')) => {
                let partner = if byte == b'\r' { b'\n' } else { b'\r' };
                if previous == Some(partner) {
                    // second half of a CR/LF pair
                    EditResult::Pending
                } else {
                    self.last_byte = Some(byte);
                    self.cursor = None;
                    EditResult::Complete
                }
            }
            EditKey::Byte(_) => EditResult::Pending,
        }
    }

    /// Replace the line with `text` and redisplay it after `prompt`
    pub fn replace(&mut self, text: &str, prompt: &str, out: &mut Output<'_>) {
        if out.ansi_enabled() {
            out.clear_line();
            out.echo_bytes(prompt.as_bytes());
        } else {
            let len = self.buffer.len();
            out.echo_backspaces(self.cursor_position());
            out.echo_spaces(len);
            out.echo_backspaces(len);
        }

        let mut end = text.len().min(Self::MAX_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.buffer.clear();
        // end <= MAX_LEN, so this always fits
        let _ = self.buffer.extend_from_slice(&text.as_bytes()[..end]);
        self.cursor = Some(self.buffer.len());
        out.echo_bytes(&self.buffer);
    }

    /// Redisplay prompt and line, leaving the terminal cursor where the
    /// edit cursor is
    pub fn redraw(&self, prompt: &str, out: &mut Output<'_>) {
        out.clear_line();
        out.echo_bytes(prompt.as_bytes());
        out.echo_bytes(&self.buffer);
        out.echo_backspaces(self.buffer.len() - self.cursor_position());
    }

    fn backspace(&mut self, out: &mut Output<'_>) {
        let cursor = self.cursor_position();
        if cursor == 0 || self.remove_at(cursor - 1).is_err() {
            return;
        }
        self.cursor = Some(cursor - 1);
        out.echo_backspaces(1);
        self.echo_tail(cursor - 1, out);
    }

    fn delete_forward(&mut self, out: &mut Output<'_>) {
        let cursor = self.cursor_position();
        if self.remove_at(cursor).is_ok() {
            self.echo_tail(cursor, out);
        }
    }

    /// Retype the line from `from`, blank the vacated cell, then walk back
    fn echo_tail(&self, from: usize, out: &mut Output<'_>) {
        let tail = &self.buffer[from..];
        out.echo_bytes(tail);
        out.echo_spaces(1);
        out.echo_backspaces(tail.len() + 1);
    }

    fn insert_char(&mut self, byte: u8, out: &mut Output<'_>) {
        let cursor = self.cursor_position();
        if let Err(e) = self.insert_at(cursor, byte) {
            log::debug!("dropping input byte {:#04x}: {}", byte, e);
            return;
        }
        self.cursor = Some(cursor + 1);
        out.echo_bytes(&self.buffer[cursor..]);
        out.echo_backspaces(self.buffer.len() - cursor - 1);
    }

    fn tab<'c, C>(&mut self, completion: &'c C, out: &mut Output<'_>) -> EditResult<'c>
    where
        C: Completion + ?Sized,
    {
        if self.cursor_position() != self.buffer.len() {
            return EditResult::Pending;
        }

        let typed = self.buffer.len();
        let suffix = completion
            .complete(self.line())
            .and_then(|name| name.get(typed..))
            .filter(|suffix| !suffix.is_empty());

        if let Some(suffix) = suffix {
            if typed + suffix.len() <= Self::MAX_LEN {
                let _ = self.buffer.extend_from_slice(suffix.as_bytes());
                self.cursor = Some(self.buffer.len());
                out.echo_bytes(suffix.as_bytes());
            }
            return EditResult::Pending;
        }

        CommandParser::parse(self.line())
            .and_then(|parsed| completion.hints(parsed.command))
            .map_or(EditResult::Pending, EditResult::Hints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::LineEnd;
    use heapless::String;

    struct Names(&'static [&'static str]);

    const MOVE_HINTS: &[&str] = &["<x>", "<y>"];

    impl Completion for Names {
        fn complete(&self, partial: &str) -> Option<&str> {
            let mut found = self.0.iter().filter(|n| n.starts_with(partial));
            let first = found.next()?;
            found.next().is_none().then_some(*first)
        }

        fn hints(&self, command: &str) -> Option<&[&str]> {
            (command == "move").then_some(MOVE_HINTS)
        }
    }

    const NAMES: Names = Names(&["help", "move", "reset", "read"]);

    /// Apply keys and return the echo they produced
    fn feed<const N: usize>(editor: &mut LineEditor<N>, keys: &[EditKey]) -> (Vec<u8, 256>, bool) {
        let mut echoed = Vec::new();
        let mut complete = false;
        let mut sink = |b: u8| {
            let _ = echoed.push(b);
        };
        let mut out = Output::new(&mut sink, LineEnd::CRLF, true, false);
        for key in keys {
            if editor.apply(*key, &NAMES, &mut out) == EditResult::Complete {
                complete = true;
            }
        }
        drop(out);
        (echoed, complete)
    }

    fn bytes(s: &str) -> Vec<EditKey, 64> {
        s.bytes().map(EditKey::Byte).collect()
    }

    #[test]
    fn test_typing_echoes_and_completes() {
        let mut editor = LineEditor::<32>::new();
        let (echo, complete) = feed(&mut editor, &bytes("add 2 3\r"));
        assert!(complete);
        assert_eq!(editor.line(), "add 2 3");
        assert_eq!(echo.as_slice(), b"add 2 3");
    }

    #[test]
    fn test_backspace_undoes_insert() {
        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("abc"));
        feed(&mut editor, &[EditKey::Left]);
        let before: String<32> = String::try_from(editor.line()).unwrap();
        let cursor = editor.cursor_position();

        feed(&mut editor, &bytes("x"));
        assert_eq!(editor.line(), "abxc");
        feed(&mut editor, &[EditKey::Byte(DEL)]);
        assert_eq!(editor.line(), before.as_str());
        assert_eq!(editor.cursor_position(), cursor);
    }

    #[test]
    fn test_mid_line_insert_redraws_tail() {
        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("ac"));
        feed(&mut editor, &[EditKey::Left]);
        let (echo, _) = feed(&mut editor, &bytes("b"));
        assert_eq!(echo.as_slice(), b"bc\x08");
        assert_eq!(editor.line(), "abc");
        assert_eq!(editor.cursor_position(), 2);
    }

    #[test]
    fn test_backspace_mid_line_redraw() {
        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("abc"));
        feed(&mut editor, &[EditKey::Left]);
        let (echo, _) = feed(&mut editor, &[EditKey::Byte(BACKSPACE)]);
        assert_eq!(editor.line(), "ac");
        assert_eq!(echo.as_slice(), b"\x08c \x08\x08");
        assert_eq!(editor.cursor_position(), 1);
    }

    #[test]
    fn test_backspace_at_start_does_nothing() {
        let mut editor = LineEditor::<32>::new();
        let (echo, _) = feed(&mut editor, &[EditKey::Byte(BACKSPACE)]);
        assert!(echo.is_empty());
        assert_eq!(editor.len(), 0);
    }

    #[test]
    fn test_forward_delete() {
        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("abc"));
        feed(&mut editor, &[EditKey::Home]);
        let (echo, _) = feed(&mut editor, &[EditKey::Delete]);
        assert_eq!(editor.line(), "bc");
        assert_eq!(echo.as_slice(), b"bc \x08\x08\x08");
        assert_eq!(editor.cursor_position(), 0);

        feed(&mut editor, &[EditKey::End]);
        let (echo, _) = feed(&mut editor, &[EditKey::Delete]);
        assert!(echo.is_empty());
        assert_eq!(editor.line(), "bc");
    }

    #[test]
    fn test_cursor_movement_bounds() {
        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("ab"));
        let (echo, _) = feed(&mut editor, &[EditKey::Right]);
        assert!(echo.is_empty());
        assert_eq!(editor.cursor_position(), 2);

        let (echo, _) = feed(&mut editor, &[EditKey::Home]);
        assert_eq!(echo.as_slice(), b"\x08\x08");
        let (echo, _) = feed(&mut editor, &[EditKey::Left]);
        assert!(echo.is_empty());
        assert_eq!(editor.cursor_position(), 0);

        let (echo, _) = feed(&mut editor, &[EditKey::Right]);
        assert_eq!(echo.as_slice(), b"a");
        let (echo, _) = feed(&mut editor, &[EditKey::End]);
        assert_eq!(echo.as_slice(), b"b");
        assert_eq!(editor.cursor_position(), 2);
    }

    #[test]
    fn test_full_buffer_refuses_insert() {
        let mut editor = LineEditor::<8>::new();
        feed(&mut editor, &bytes("1234567"));
        assert_eq!(editor.len(), 7);
        let (echo, _) = feed(&mut editor, &bytes("8"));
        assert!(echo.is_empty());
        assert_eq!(editor.line(), "1234567");
        assert_eq!(editor.insert_at(0, b'x'), Err(EditError::BufferFull));
    }

    #[test]
    fn test_primitives_reject_bad_indices() {
        let mut editor = LineEditor::<8>::new();
        assert_eq!(editor.insert_at(1, b'a'), Err(EditError::OutOfRange));
        assert_eq!(editor.remove_at(0), Err(EditError::OutOfRange));
        editor.insert_at(0, b'a').unwrap();
        assert_eq!(editor.remove_at(0), Ok(b'a'));
        assert!(editor.is_empty());
    }

    #[test]
    fn test_crlf_completes_once_either_order() {
        let mut editor = LineEditor::<32>::new();
        let (_, complete) = feed(&mut editor, &bytes("a\r"));
        assert!(complete);
        editor.clear();
        let (_, complete) = feed(&mut editor, &bytes("\n"));
        assert!(!complete);

        let (_, complete) = feed(&mut editor, &bytes("\n"));
        assert!(complete);
        let (_, complete) = feed(&mut editor, &bytes("\r"));
        assert!(!complete);

        // a second CR/LF pair is a second line
        let (_, complete) = feed(&mut editor, &bytes("\r"));
        assert!(complete);
    }

    #[test]
    fn test_insert_at_rejects_non_printable() {
        let mut editor = LineEditor::<8>::new();
        editor.insert_at(0, b'o').unwrap();
        assert_eq!(editor.insert_at(1, 0xB0), Err(EditError::NotPrintable));
        assert_eq!(editor.insert_at(1, b'\r'), Err(EditError::NotPrintable));
        editor.insert_at(1, b'k').unwrap();
        assert_eq!(editor.line(), "ok");
    }

    #[test]
    fn test_other_input_breaks_crlf_pair() {
        let mut editor = LineEditor::<32>::new();
        let (_, complete) = feed(&mut editor, &bytes("a\r"));
        assert!(complete);
        editor.clear();
        editor.note_other_input();
        let (_, complete) = feed(&mut editor, &bytes("\n"));
        assert!(complete);
    }

    #[test]
    fn test_control_bytes_ignored() {
        let mut editor = LineEditor::<32>::new();
        let (echo, complete) = feed(&mut editor, &bytes("\x01\x1b\x07"));
        assert!(!complete);
        assert!(echo.is_empty());
        assert!(editor.is_empty());
    }

    #[test]
    fn test_tab_completes_unique_name() {
        let mut editor = LineEditor::<32>::new();
        let (echo, _) = feed(&mut editor, &bytes("mo\t"));
        assert_eq!(editor.line(), "move");
        assert_eq!(echo.as_slice(), b"move");

        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("re\t"));
        assert_eq!(editor.line(), "re");
    }

    #[test]
    fn test_tab_ignored_away_from_end() {
        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("mo"));
        feed(&mut editor, &[EditKey::Left]);
        feed(&mut editor, &bytes("\t"));
        assert_eq!(editor.line(), "mo");
    }

    #[test]
    fn test_tab_on_complete_command_reports_hints() {
        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("move 1"));
        let mut sink = |_b: u8| {};
        let mut out = Output::new(&mut sink, LineEnd::CRLF, true, false);
        let result = editor.apply(EditKey::Byte(TAB), &NAMES, &mut out);
        assert_eq!(result, EditResult::Hints(&["<x>", "<y>"]));
    }

    #[test]
    fn test_replace_erases_old_line() {
        let mut editor = LineEditor::<32>::new();
        feed(&mut editor, &bytes("ab"));
        let mut echoed = Vec::<u8, 64>::new();
        let mut sink = |b: u8| {
            let _ = echoed.push(b);
        };
        let mut out = Output::new(&mut sink, LineEnd::CRLF, true, false);
        editor.replace("xyz", "> ", &mut out);
        drop(out);
        assert_eq!(echoed.as_slice(), b"\x08\x08  \x08\x08xyz");
        assert_eq!(editor.line(), "xyz");
        assert_eq!(editor.cursor_position(), 3);
    }
}
