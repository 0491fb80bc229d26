extern crate clap;

use std::fs;
use std::process;
use std::sync::Once;

use loxi::{ast_printer, parser, scanner, Lox, RunError};

mod config;
mod error_formatting;
mod input;
mod line_reader;
mod repl;

use config::Config;

const EXIT_OK: i32 = 0;
const EXIT_USAGE: i32 = 64;
const EXIT_STATIC_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;
const EXIT_IO_ERROR: i32 = 74;

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(filter)
                .init();
        }
    });
}

fn main() {
    init_tracing();

    let matches = match config::app().get_matches_safe() {
        Ok(matches) => matches,
        Err(err) => match err.kind {
            clap::ErrorKind::HelpDisplayed | clap::ErrorKind::VersionDisplayed => err.exit(),
            _ => {
                eprintln!("{}", err.message);
                process::exit(EXIT_USAGE);
            }
        },
    };
    let config = Config::from_matches(&matches);

    let code = match &config.input {
        Some(input_file) => run_file(input_file, &config),
        None => repl::run(&config),
    };
    process::exit(code);
}

fn run_file(input_file: &str, config: &Config) -> i32 {
    let content = match fs::read_to_string(input_file) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("loxi: error reading {}: {}", input_file, err);
            return EXIT_IO_ERROR;
        }
    };
    let input = input::Input {
        source: input::Source::File(input_file.to_string()),
        content,
    };

    if config.show_tokens || config.show_ast || config.print_ast {
        return dump(&input, config);
    }

    match Lox::default().run(&input.content) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            error_formatting::report(&err, &input, config.error_format);
            match err {
                RunError::Static(_) => EXIT_STATIC_ERROR,
                RunError::Runtime(_) => EXIT_RUNTIME_ERROR,
            }
        }
    }
}

/// Prints the requested intermediate form instead of running the program.
fn dump(input: &input::Input, config: &Config) -> i32 {
    let (tokens, mut errors) = scanner::scan_tokens(&input.content);

    if config.show_tokens {
        println!("tokens: {:#?}", tokens);
    } else {
        let (stmts, parse_errors) = parser::parse(tokens);
        errors.extend(parse_errors);
        if config.show_ast {
            println!("AST: {:#?}", stmts);
        }
        if config.print_ast {
            println!("{}", ast_printer::print_program(&stmts));
        }
    }

    if errors.is_empty() {
        EXIT_OK
    } else {
        error_formatting::report(&RunError::Static(errors), input, config.error_format);
        EXIT_STATIC_ERROR
    }
}
