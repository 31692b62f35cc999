use core::fmt;

use crate::error::ConfigError;

const BACKSPACE: u8 = 0x08;

/// Line ending written to the output, one or two bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEnd {
    bytes: [u8; 2],
    len: u8,
}

impl LineEnd {
    pub const CRLF: LineEnd = LineEnd { bytes: *b"\r\n", len: 2 };
    pub const LF: LineEnd = LineEnd { bytes: [b'\n', 0], len: 1 };
    pub const CR: LineEnd = LineEnd { bytes: [b'\r', 0], len: 1 };

    /// Build a line ending from one or two bytes
    pub fn new(s: &str) -> Result<Self, ConfigError> {
        match s.as_bytes() {
            [a] => Ok(Self { bytes: [*a, 0], len: 1 }),
            [a, b] => Ok(Self { bytes: [*a, *b], len: 2 }),
            _ => Err(ConfigError::InvalidLineEnd),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl Default for LineEnd {
    fn default() -> Self {
        Self::CRLF
    }
}

/// Output sink handed to the line editor and to command handlers.
///
/// Wraps the caller's per-byte callback. Keystroke echo goes through the
/// `echo_*` methods and is dropped when echo is off; everything else is
/// always written.
pub struct Output<'o> {
    sink: &'o mut dyn FnMut(u8),
    line_end: LineEnd,
    echo: bool,
    ansi_enabled: bool,
}

impl<'o> Output<'o> {
    /// Create a new output over a byte callback
    pub fn new(
        sink: &'o mut dyn FnMut(u8),
        line_end: LineEnd,
        echo: bool,
        ansi_enabled: bool,
    ) -> Self {
        Self {
            sink,
            line_end,
            echo,
            ansi_enabled,
        }
    }

    /// Write a single byte
    pub fn write_byte(&mut self, byte: u8) {
        (self.sink)(byte);
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            (self.sink)(b);
        }
    }

    /// Write a string (adds nothing)
    pub fn write_text(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Write the configured line ending
    pub fn new_line(&mut self) {
        let line_end = self.line_end;
        self.write_bytes(line_end.as_bytes());
    }

    /// Write a line followed by the configured line ending
    pub fn writeln(&mut self, s: &str) {
        self.write_text(s);
        self.new_line();
    }

    /// Write a diagnostic line, in red when ANSI is enabled
    pub fn write_error(&mut self, args: fmt::Arguments<'_>) {
        if self.ansi_enabled {
            self.write_text("\x1b[31m");
        }
        let _ = fmt::Write::write_fmt(self, args);
        if self.ansi_enabled {
            self.write_text("\x1b[0m");
        }
        self.new_line();
    }

    pub fn ansi_enabled(&self) -> bool {
        self.ansi_enabled
    }

    /// Echo bytes typed by the user
    pub fn echo_bytes(&mut self, bytes: &[u8]) {
        if self.echo {
            self.write_bytes(bytes);
        }
    }

    /// Echo a run of backspaces, moving the cursor left
    pub fn echo_backspaces(&mut self, n: usize) {
        self.echo_repeat(BACKSPACE, n);
    }

    /// Echo a run of spaces
    pub fn echo_spaces(&mut self, n: usize) {
        self.echo_repeat(b' ', n);
    }

    fn echo_repeat(&mut self, byte: u8, n: usize) {
        if self.echo {
            for _ in 0..n {
                (self.sink)(byte);
            }
        }
    }

    /// Return to column zero and blank the line
    pub fn clear_line(&mut self) {
        if !self.echo {
            return;
        }
        if self.ansi_enabled {
            self.write_text("\r\x1b[K");
        } else {
            self.write_byte(b'\r');
        }
    }
}

impl fmt::Write for Output<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_text(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use heapless::Vec;

    #[test]
    fn test_line_end_lengths() {
        assert_eq!(LineEnd::new("\r\n").unwrap(), LineEnd::CRLF);
        assert_eq!(LineEnd::new("\n").unwrap().as_bytes(), b"\n");
        assert_eq!(LineEnd::new(""), Err(ConfigError::InvalidLineEnd));
        assert_eq!(LineEnd::new("\r\n\r"), Err(ConfigError::InvalidLineEnd));
    }

    #[test]
    fn test_echo_suppressed_but_text_written() {
        let mut buf = Vec::<u8, 64>::new();
        let mut sink = |b: u8| {
            let _ = buf.push(b);
        };
        let mut out = Output::new(&mut sink, LineEnd::LF, false, false);
        out.echo_bytes(b"typed");
        out.echo_backspaces(3);
        write!(out, "v={}", 7).unwrap();
        out.new_line();
        drop(out);
        assert_eq!(buf.as_slice(), b"v=7\n");
    }

    #[test]
    fn test_error_is_colored_with_ansi() {
        let mut buf = Vec::<u8, 64>::new();
        let mut sink = |b: u8| {
            let _ = buf.push(b);
        };
        let mut out = Output::new(&mut sink, LineEnd::CRLF, true, true);
        out.write_error(format_args!("bad {}", "x"));
        drop(out);
        assert_eq!(buf.as_slice(), b"\x1b[31mbad x\x1b[0m\r\n");
    }
}
