use loxi::Lox;
use tracing::debug;

use crate::config::{Config, HISTORY_FILE};
use crate::error_formatting;
use crate::input;
use crate::line_reader::{LineReadStatus, LineReader};

/// Reads lines until end of input, running each one in the same session so
/// definitions carry over. Errors are reported and the loop goes on.
pub fn run(config: &Config) -> i32 {
    let mut lox = Lox::default();
    let mut line_reader = LineReader::new(HISTORY_FILE, ">>> ");

    println!(
        "============================================\n\
         Welcome to lox! using tree-walk interpreter.\n\
         ============================================\n"
    );

    loop {
        let line = match line_reader.readline() {
            LineReadStatus::Line(line) => line,
            LineReadStatus::Interrupted => continue,
            LineReadStatus::Done => break,
        };

        if line.trim().is_empty() {
            continue;
        }

        if let Err(err) = lox.run_line(&line) {
            debug!(error = %err, "repl line failed");
            let input = input::Input {
                source: input::Source::Repl,
                content: line,
            };
            error_formatting::report(&err, &input, config.error_format);
        }
    }

    0
}
