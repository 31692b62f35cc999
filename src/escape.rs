use heapless::Vec;

/// The escape marker that starts every key sequence
pub const ESC: u8 = 0x1B;

/// Marker plus the longest suffix in [`SEQUENCES`]
const MAX_SEQUENCE: usize = 5;

/// Symbolic codes for keys that arrive as escape sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowRight,
    ArrowLeft,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    /// Function key F1..F12
    Function(u8),
}

/// Outcome of feeding one byte to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// A sequence is in progress, nothing to do yet
    Processing,
    /// The byte is not part of a sequence and should be taken literally
    NotEscape,
    /// The sequence matched nothing known; the byte is discarded
    Unhandled,
    /// A complete, known sequence
    Key(Key),
}

/// Known sequences, as the bytes following the marker.
///
/// No row may be a prefix of another, otherwise the shorter one would shadow it.
const SEQUENCES: &[(&[u8], Key)] = &[
    (b"[A", Key::ArrowUp),
    (b"[B", Key::ArrowDown),
    (b"[C", Key::ArrowRight),
    (b"[D", Key::ArrowLeft),
    (b"[H", Key::Home),
    (b"[F", Key::End),
    (b"OH", Key::Home),
    (b"OF", Key::End),
    (b"[1~", Key::Home),
    (b"[2~", Key::Insert),
    (b"[3~", Key::Delete),
    (b"[4~", Key::End),
    (b"[5~", Key::PageUp),
    (b"[6~", Key::PageDown),
    (b"OP", Key::Function(1)),
    (b"OQ", Key::Function(2)),
    (b"OR", Key::Function(3)),
    (b"OS", Key::Function(4)),
    (b"[15~", Key::Function(5)),
    (b"[17~", Key::Function(6)),
    (b"[18~", Key::Function(7)),
    (b"[19~", Key::Function(8)),
    (b"[20~", Key::Function(9)),
    (b"[21~", Key::Function(10)),
    (b"[23~", Key::Function(11)),
    (b"[24~", Key::Function(12)),
];

/// Byte-at-a-time matcher for terminal escape sequences
#[derive(Debug, Default)]
pub struct EscapeRecognizer {
    pending: Vec<u8, MAX_SEQUENCE>,
}

impl EscapeRecognizer {
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Whether a sequence is currently being gathered
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop any partially gathered sequence
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Feed one raw input byte.
    ///
    /// A second marker directly after the first cancels the sequence and is
    /// reported as [`Escape::NotEscape`].
    pub fn feed(&mut self, byte: u8) -> Escape {
        if byte == ESC {
            let doubled = self.pending.len() == 1;
            self.pending.clear();
            if doubled {
                return Escape::NotEscape;
            }
            // Capacity is never zero, so the marker always fits.
            let _ = self.pending.push(ESC);
            return Escape::Processing;
        }

        if self.pending.is_empty() {
            return Escape::NotEscape;
        }

        if self.pending.push(byte).is_err() {
            self.pending.clear();
            return Escape::Unhandled;
        }

        let suffix = &self.pending[1..];
        let mut partial = false;
        for (sequence, key) in SEQUENCES {
            if *sequence == suffix {
                self.pending.clear();
                return Escape::Key(*key);
            }
            if sequence.starts_with(suffix) {
                partial = true;
            }
        }

        if partial {
            Escape::Processing
        } else {
            log::debug!("discarding unknown escape sequence {:?}", self.pending);
            self.pending.clear();
            Escape::Unhandled
        }
    }
}
