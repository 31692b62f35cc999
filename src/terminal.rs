use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::RawMutex, signal::Signal};
use embedded_io_async::{Error as _, Read, Write as AsyncWrite};
use heapless::{String, Vec};

use crate::commands::{CommandHandler, CommandTable};
use crate::editor::{EditKey, EditResult, LineEditor};
use crate::error::{ConfigError, RegisterError, RunError};
use crate::escape::{Escape, EscapeRecognizer, Key};
use crate::history::{History, HistoryConfig};
use crate::writer::{LineEnd, Output};

/// Default line buffer: nine 16-character tokens, eight separators and a spare byte
pub const DEFAULT_BUF_SIZE: usize = 153;
/// Default history depth
pub const DEFAULT_HISTORY: usize = 16;
/// Default command table capacity, including `help`
pub const DEFAULT_COMMANDS: usize = 64;
/// Longest prompt accepted
pub const MAX_PROMPT: usize = 16;
/// Capacity of the buffer returned by [`Terminal::process_byte`]
pub const OUTPUT_BUFFER_SIZE: usize = 1024;

const CTRL_C: u8 = 0x03;

/// Configuration for the terminal
#[derive(Clone)]
pub struct TerminalConfig {
    /// Prompt string to display
    pub prompt: String<MAX_PROMPT>,
    /// Line ending written to the output
    pub line_end: LineEnd,
    /// Enable echo of typed characters
    pub echo: bool,
    /// Enable ANSI escape codes for line clearing and colored errors
    pub ansi_enabled: bool,
    /// History behavior
    pub history: HistoryConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        let mut prompt = String::new();
        let _ = prompt.push_str("> ");
        Self {
            prompt,
            line_end: LineEnd::CRLF,
            echo: true,
            ansi_enabled: false,
            history: HistoryConfig::default(),
        }
    }
}

/// One interactive shell session.
///
/// Owns the line buffer, history and command table. Feed it one input byte
/// at a time; output comes back either through a callback
/// ([`process_byte_with`](Self::process_byte_with)) or as a string
/// ([`process_byte`](Self::process_byte)). Nothing here blocks or allocates.
pub struct Terminal<
    'a,
    const BUF_SIZE: usize = DEFAULT_BUF_SIZE,
    const HISTORY: usize = DEFAULT_HISTORY,
    const COMMANDS: usize = DEFAULT_COMMANDS,
> {
    config: TerminalConfig,
    recognizer: EscapeRecognizer,
    editor: LineEditor<BUF_SIZE>,
    history: History<BUF_SIZE, HISTORY>,
    commands: CommandTable<'a, COMMANDS>,
    // line being edited when recall started
    stash: String<BUF_SIZE>,
    output: Vec<u8, OUTPUT_BUFFER_SIZE>,
}

/// A [`Terminal`] with the default capacities
pub type DefaultTerminal<'a> = Terminal<'a, DEFAULT_BUF_SIZE, DEFAULT_HISTORY, DEFAULT_COMMANDS>;

impl<'a, const BUF_SIZE: usize, const HISTORY: usize, const COMMANDS: usize>
    Terminal<'a, BUF_SIZE, HISTORY, COMMANDS>
{
    /// Create a new terminal instance
    pub fn new(config: TerminalConfig) -> Self {
        let mut commands = CommandTable::new();
        commands.register_builtins();
        Self {
            history: History::new(config.history),
            config,
            recognizer: EscapeRecognizer::new(),
            editor: LineEditor::new(),
            commands,
            stash: String::new(),
            output: Vec::new(),
        }
    }

    /// Register a command handler. See [`CommandTable::register`].
    pub fn register(
        &mut self,
        name: &'a str,
        handler: &'a dyn CommandHandler,
        help: Option<&'a str>,
        hints: Option<&'a [&'a str]>,
    ) -> Result<(), RegisterError> {
        self.commands.register(name, handler, help, hints)
    }

    /// Replace the action for unrecognized commands
    pub fn set_fallback(&mut self, handler: &'a dyn CommandHandler) {
        self.commands.set_fallback(handler);
    }

    pub fn set_prompt(&mut self, prompt: &str) -> Result<(), ConfigError> {
        self.config.prompt = String::try_from(prompt).map_err(|_| ConfigError::PromptTooLong)?;
        Ok(())
    }

    pub fn set_line_end(&mut self, line_end: &str) -> Result<(), ConfigError> {
        self.config.line_end = LineEnd::new(line_end)?;
        Ok(())
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    /// Get the line being edited
    pub fn line(&self) -> &str {
        self.editor.line()
    }

    /// Get the current cursor position
    pub fn cursor_position(&self) -> usize {
        self.editor.cursor_position()
    }

    pub fn history(&self) -> &History<BUF_SIZE, HISTORY> {
        &self.history
    }

    pub fn commands(&self) -> &CommandTable<'a, COMMANDS> {
        &self.commands
    }

    /// Process one input byte, returning the output it produced.
    ///
    /// Output past [`OUTPUT_BUFFER_SIZE`] bytes is dropped. The returned
    /// string is valid until the next call.
    pub fn process_byte(&mut self, byte: u8) -> &str {
        self.buffered(|terminal, out| terminal.step(byte, out))
    }

    /// Process one input byte, sending output to `sink` a byte at a time
    pub fn process_byte_with(&mut self, byte: u8, sink: &mut dyn FnMut(u8)) {
        let mut out = self.output_for(sink);
        self.step(byte, &mut out);
    }

    /// Emit the prompt, for the start of a session
    pub fn write_prompt(&mut self) -> &str {
        self.buffered(|terminal, out| out.write_text(&terminal.config.prompt))
    }

    /// Emit the prompt to `sink`
    pub fn write_prompt_with(&mut self, sink: &mut dyn FnMut(u8)) {
        let mut out = self.output_for(sink);
        out.write_text(&self.config.prompt);
    }

    /// Reprint prompt and line, e.g. after other output scrolled past
    pub fn redraw(&mut self) -> &str {
        self.buffered(|terminal, out| terminal.editor.redraw(&terminal.config.prompt, out))
    }

    /// Read bytes from `reader` until it reports end of input, writing all
    /// output to `writer`.
    ///
    /// When `redraw_signal` fires, the prompt and current line are reprinted.
    pub async fn run<R, W, M>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        redraw_signal: Option<&Signal<M, ()>>,
    ) -> Result<(), RunError>
    where
        R: Read,
        W: AsyncWrite,
        M: RawMutex,
    {
        let prompt = self.write_prompt();
        write_out(writer, prompt.as_bytes()).await?;

        let mut byte_buf = [0u8; 1];

        loop {
            let input = match redraw_signal {
                Some(signal) => match select(reader.read(&mut byte_buf), signal.wait()).await {
                    Either::First(result) => Some(result),
                    Either::Second(()) => None,
                },
                None => Some(reader.read(&mut byte_buf).await),
            };

            let output = match input {
                None => self.redraw(),
                Some(Ok(0)) => return Ok(()),
                Some(Ok(_)) => self.process_byte(byte_buf[0]),
                Some(Err(e)) => {
                    log::warn!("terminal read failed: {:?}", e.kind());
                    return Err(RunError::Read);
                }
            };
            write_out(writer, output.as_bytes()).await?;
        }
    }

    fn output_for<'o>(&self, sink: &'o mut dyn FnMut(u8)) -> Output<'o> {
        Output::new(sink, self.config.line_end, self.config.echo, self.config.ansi_enabled)
    }

    fn buffered<F>(&mut self, f: F) -> &str
    where
        F: FnOnce(&mut Self, &mut Output<'_>),
    {
        let mut buffer = core::mem::take(&mut self.output);
        buffer.clear();
        let mut text = TextSink::new(&mut buffer);
        {
            let mut sink = |b: u8| text.push(b);
            let mut out = self.output_for(&mut sink);
            f(self, &mut out);
        }
        text.finish();
        if text.replaced {
            log::warn!("output contained invalid UTF-8, replaced with '?'");
        }
        if text.overflowed {
            log::warn!("output exceeded {} bytes and was truncated", OUTPUT_BUFFER_SIZE);
        }
        self.output = buffer;
        core::str::from_utf8(&self.output).unwrap_or("")
    }

    fn step(&mut self, byte: u8, out: &mut Output<'_>) {
        if byte == CTRL_C {
            self.interrupt(out);
            return;
        }

        let escape = self.recognizer.feed(byte);
        if escape != Escape::NotEscape {
            // the byte never reaches the editor, so it breaks any CR/LF pair
            self.editor.note_other_input();
        }
        match escape {
            Escape::Processing => {}
            Escape::Unhandled => self.history.reset_recall(),
            Escape::Key(Key::ArrowUp | Key::Function(3)) => self.recall_previous(out),
            Escape::Key(Key::ArrowDown) => self.recall_next(out),
            Escape::Key(key) => {
                self.history.reset_recall();
                if let Some(edit) = EditKey::from_key(key) {
                    self.edit(edit, out);
                }
            }
            Escape::NotEscape => {
                self.history.reset_recall();
                self.edit(EditKey::Byte(byte), out);
            }
        }
    }

    fn edit(&mut self, key: EditKey, out: &mut Output<'_>) {
        match self.editor.apply(key, &self.commands, out) {
            EditResult::Pending => {}
            EditResult::Hints(hints) => {
                out.new_line();
                for (i, hint) in hints.iter().enumerate() {
                    if i > 0 {
                        out.write_byte(b' ');
                    }
                    out.write_text(hint);
                }
                out.new_line();
                self.editor.redraw(&self.config.prompt, out);
            }
            EditResult::Complete => self.finish_line(out),
        }
    }

    fn finish_line(&mut self, out: &mut Output<'_>) {
        self.history.reset_recall();
        self.stash.clear();
        out.new_line();

        let line = self.editor.line();
        if !line.trim().is_empty() {
            self.history.record(line);
            self.commands.dispatch(line, out);
            out.new_line();
        }
        self.editor.clear();
        out.write_text(&self.config.prompt);
    }

    fn interrupt(&mut self, out: &mut Output<'_>) {
        self.recognizer.reset();
        self.editor.note_other_input();
        out.write_text("^C");
        out.new_line();
        self.editor.clear();
        self.history.reset_recall();
        self.stash.clear();
        out.write_text(&self.config.prompt);
    }

    fn recall_previous(&mut self, out: &mut Output<'_>) {
        let starting = !self.history.is_recalling();
        let Some(entry) = self.history.recall_previous() else {
            return;
        };
        if starting {
            self.stash.clear();
            let _ = self.stash.push_str(self.editor.line());
        }
        self.editor.replace(entry, &self.config.prompt, out);
    }

    fn recall_next(&mut self, out: &mut Output<'_>) {
        if !self.history.is_recalling() {
            return;
        }
        match self.history.recall_next() {
            Some(entry) => self.editor.replace(entry, &self.config.prompt, out),
            None => {
                // back past the newest entry: restore the line recall started from
                self.history.reset_recall();
                self.editor.replace(&self.stash, &self.config.prompt, out);
                self.stash.clear();
            }
        }
    }
}

async fn write_out<W: AsyncWrite>(writer: &mut W, bytes: &[u8]) -> Result<(), RunError> {
    if bytes.is_empty() {
        return Ok(());
    }
    writer.write_all(bytes).await.map_err(|e| {
        log::warn!("terminal write failed: {:?}", e.kind());
        RunError::Write
    })?;
    writer.flush().await.map_err(|e| {
        log::warn!("terminal flush failed: {:?}", e.kind());
        RunError::Write
    })
}

/// Collects output into the bounded buffer one byte at a time.
///
/// The buffer only ever holds whole UTF-8 characters: a byte that cannot
/// start or continue a valid character becomes `?`, and a character that
/// does not fit is dropped entirely.
struct TextSink<'b> {
    buffer: &'b mut Vec<u8, OUTPUT_BUFFER_SIZE>,
    pending: Vec<u8, 4>,
    width: usize,
    replaced: bool,
    overflowed: bool,
}

impl<'b> TextSink<'b> {
    fn new(buffer: &'b mut Vec<u8, OUTPUT_BUFFER_SIZE>) -> Self {
        Self {
            buffer,
            pending: Vec::new(),
            width: 0,
            replaced: false,
            overflowed: false,
        }
    }

    fn push(&mut self, byte: u8) {
        if !self.pending.is_empty() {
            if byte & 0xC0 == 0x80 {
                let _ = self.pending.push(byte);
                if self.pending.len() == self.width {
                    self.complete_char();
                }
                return;
            }
            self.abandon_char();
        }

        let width = match byte {
            0x00..=0x7F => return self.append(&[byte]),
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return self.replace(),
        };
        let _ = self.pending.push(byte);
        self.width = width;
    }

    /// Flush a character cut short by the end of output
    fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.abandon_char();
        }
    }

    fn complete_char(&mut self) {
        let pending = core::mem::take(&mut self.pending);
        // rejects overlong forms and surrogates
        if core::str::from_utf8(&pending).is_ok() {
            self.append(&pending);
        } else {
            self.replace();
        }
    }

    fn abandon_char(&mut self) {
        self.pending.clear();
        self.replace();
    }

    fn replace(&mut self) {
        self.replaced = true;
        self.append(b"?");
    }

    fn append(&mut self, bytes: &[u8]) {
        if self.buffer.extend_from_slice(bytes).is_err() {
            self.overflowed = true;
        }
    }
}
