use colored::*;
use serde::Serialize;

use loxi::error::{Phase, RuntimeError, StaticError};
use loxi::RunError;

use crate::config::ErrorFormat;
use crate::input;

fn format_input(input: &input::Input, line: usize, col: i64) {
    let text = match input.line(line) {
        Some(text) => text,
        None => return,
    };
    eprintln!("in {}, at line {}, column {}:", input.name(), line, col);
    eprintln!("{}", text);
    let padding = "~".repeat((col.max(1) - 1) as usize);
    eprintln!("{}{}", padding.blue().bold(), "^".blue().bold());
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Lexical => "lexical error",
        Phase::Parse => "parse error",
        Phase::Resolve => "resolution error",
    }
}

pub fn format_static_error(err: &StaticError, input: &input::Input) {
    let what = match err.location.as_str() {
        "" => err.message.clone(),
        location => format!("{} (at{})", err.message, location.trim_start_matches(" at")),
    };
    eprintln!(
        "loxi: {}: {}",
        phase_name(err.phase).red().bold(),
        what.white().bold()
    );

    format_input(input, err.line, err.col);
}

pub fn format_runtime_error(err: &RuntimeError, input: &input::Input) {
    eprintln!(
        "loxi: {}: {}",
        "runtime error".red().bold(),
        err.message.white().bold()
    );

    format_input(input, err.line, err.col);
}

fn emit_json<T: Serialize>(record: &T) {
    match serde_json::to_string(record) {
        Ok(json) => eprintln!("{}", json),
        Err(err) => eprintln!("loxi: could not encode diagnostic: {}", err),
    }
}

pub fn report(err: &RunError, input: &input::Input, format: ErrorFormat) {
    match (err, format) {
        (RunError::Static(errors), ErrorFormat::Human) => {
            for err in errors {
                format_static_error(err, input);
            }
        }
        (RunError::Static(errors), ErrorFormat::Json) => errors.iter().for_each(emit_json),
        (RunError::Runtime(err), ErrorFormat::Human) => format_runtime_error(err, input),
        (RunError::Runtime(err), ErrorFormat::Json) => emit_json(err),
    }
}
