/// Where a piece of source text came from, for diagnostics.
pub enum Source {
    Repl,
    File(String),
}

pub struct Input {
    pub source: Source,
    pub content: String,
}

impl Input {
    pub fn name(&self) -> &str {
        match &self.source {
            Source::Repl => "<repl>",
            Source::File(filename) => filename,
        }
    }

    /// The text of a 1-based source line, if there is one.
    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|idx| self.content.lines().nth(idx))
    }
}
