use rustyline::error::ReadlineError;
use tracing::warn;

/// Line editor for the REPL. History is loaded on creation and written back
/// when the reader is dropped.
pub struct LineReader {
    rl: rustyline::Editor<()>,
    history_file: String,
    prompt: String,
}

impl Drop for LineReader {
    fn drop(&mut self) {
        if let Err(err) = self.rl.save_history(&self.history_file) {
            warn!(file = %self.history_file, error = %err, "could not save history");
        }
    }
}

pub enum LineReadStatus {
    Line(String),
    /// Ctrl-C: the current line is discarded but the session goes on.
    Interrupted,
    Done,
}

impl LineReader {
    pub fn new(history_file: &str, prompt: &str) -> LineReader {
        let mut rl = rustyline::Editor::<()>::new();
        // a missing history file just means a first session
        rl.load_history(history_file).ok();
        LineReader {
            rl,
            history_file: history_file.into(),
            prompt: prompt.into(),
        }
    }

    pub fn readline(&mut self) -> LineReadStatus {
        match self.rl.readline(&self.prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.rl.add_history_entry(line.as_str());
                }
                LineReadStatus::Line(line)
            }
            Err(ReadlineError::Interrupted) => LineReadStatus::Interrupted,
            Err(ReadlineError::Eof) => LineReadStatus::Done,
            Err(err) => {
                warn!(error = %err, "line editor failed");
                LineReadStatus::Done
            }
        }
    }
}
