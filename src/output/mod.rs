//! What happens with recognized input
//!
//! Type mode sends combinations, Enter and Ctrl+U to a virtual keyboard
//! and never ends the session. Print mode writes combination notation to
//! a stream; confirm finishes the session, clear aborts it.

use log::debug;
use std::io::{self, Write};

use crate::input::Combination;
use crate::typing::{KeySink, Typist, TypingError};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error(transparent)]
    Typing(#[from] TypingError),

    #[error("Failed to write combination: {0}")]
    Write(#[from] io::Error),
}

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Shutdown requested by signal
    Stopped,
    /// Print mode: confirm pressed
    Confirmed,
    /// Print mode: clear pressed
    Aborted,
}

/// Whether the session keeps going after an output action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finish(Outcome),
}

pub trait Output {
    fn combination(&mut self, combo: &Combination) -> Result<Flow, OutputError>;
    fn confirm(&mut self) -> Result<Flow, OutputError>;
    fn clear(&mut self) -> Result<Flow, OutputError>;
}

/// Types everything through a virtual keyboard
pub struct TypeOutput<S: KeySink> {
    typist: Typist<S>,
}

impl<S: KeySink> TypeOutput<S> {
    pub fn new(typist: Typist<S>) -> Self {
        Self { typist }
    }
}

impl<S: KeySink> Output for TypeOutput<S> {
    fn combination(&mut self, combo: &Combination) -> Result<Flow, OutputError> {
        self.typist.type_str(&combo.to_string())?;
        Ok(Flow::Continue)
    }

    fn confirm(&mut self) -> Result<Flow, OutputError> {
        debug!("confirm: Enter");
        self.typist.confirm()?;
        Ok(Flow::Continue)
    }

    fn clear(&mut self) -> Result<Flow, OutputError> {
        debug!("clear: Ctrl+U");
        self.typist.clear_line()?;
        Ok(Flow::Continue)
    }
}

/// Writes combination notation to a stream
pub struct PrintOutput<W: Write> {
    out: W,
}

impl<W: Write> PrintOutput<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Output for PrintOutput<W> {
    fn combination(&mut self, combo: &Combination) -> Result<Flow, OutputError> {
        write!(self.out, "{}", combo)?;
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    fn confirm(&mut self) -> Result<Flow, OutputError> {
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(Flow::Finish(Outcome::Confirmed))
    }

    fn clear(&mut self) -> Result<Flow, OutputError> {
        Ok(Flow::Finish(Outcome::Aborted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::constants::{BTN_THUMB, BTN_TRIGGER, KEY_ENTER, KEY_LEFTCTRL, KEY_U};
    use crate::input::{ButtonTable, Normalizer, RawEvent};
    use crate::keymap::CharMap;
    use crate::typing::tests::{RecordingSink, Sent};
    use std::time::Duration;

    fn trig_thmb() -> Combination {
        let table = ButtonTable::from_config(&InputConfig::default()).unwrap();
        let mut normalizer = Normalizer::new(table, 250);
        normalizer.handle(&RawEvent::key(BTN_TRIGGER, 1, 0));
        normalizer.handle(&RawEvent::key(BTN_THUMB, 1, 400));
        normalizer.handle(&RawEvent::key(BTN_THUMB, 0, 450)).unwrap()
    }

    #[test]
    fn test_print_combination_and_confirm() {
        let mut output = PrintOutput::new(Vec::new());
        assert_eq!(output.combination(&trig_thmb()).unwrap(), Flow::Continue);
        assert_eq!(output.combination(&trig_thmb()).unwrap(), Flow::Continue);
        assert_eq!(output.confirm().unwrap(), Flow::Finish(Outcome::Confirmed));
        assert_eq!(output.into_inner(), b"TRIG+THMB;TRIG+THMB;\n");
    }

    #[test]
    fn test_print_clear_aborts() {
        let mut output = PrintOutput::new(Vec::new());
        assert_eq!(output.clear().unwrap(), Flow::Finish(Outcome::Aborted));
        assert!(output.into_inner().is_empty());
    }

    #[test]
    fn test_print_write_failure_is_error() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut output = PrintOutput::new(Closed);
        assert!(matches!(output.combination(&trig_thmb()), Err(OutputError::Write(_))));
    }

    #[test]
    fn test_type_mode_never_finishes() {
        let typist = Typist::new(RecordingSink::default(), CharMap::us(), Duration::ZERO);
        let mut output = TypeOutput::new(typist);
        assert_eq!(output.combination(&trig_thmb()).unwrap(), Flow::Continue);
        assert_eq!(output.confirm().unwrap(), Flow::Continue);
        assert_eq!(output.clear().unwrap(), Flow::Continue);

        let sent = &output.typist.sink().sent;
        let downs: Vec<u16> = sent
            .iter()
            .filter_map(|s| match s {
                Sent::Down(code) => Some(*code),
                _ => None,
            })
            .collect();
        // "TRIG+THMB;" is 10 characters; 9 shifted, ';' plain
        assert_eq!(downs.len(), 9 * 2 + 1 + 1 + 2);
        assert_eq!(downs[downs.len() - 3], KEY_ENTER);
        assert_eq!(&downs[downs.len() - 2..], &[KEY_LEFTCTRL, KEY_U]);
    }
}
