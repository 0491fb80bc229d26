use clap::{App, Arg, ArgMatches};

pub static INPUT_STR: &str = "INPUT";
pub static SHOW_TOKENS_STR: &str = "tokens";
pub static SHOW_AST_STR: &str = "ast";
pub static PRINT_AST_STR: &str = "print-ast";
pub static ERROR_FORMAT_STR: &str = "error-format";

pub static HISTORY_FILE: &str = ".loxi-history.txt";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorFormat {
    Human,
    Json,
}

impl ErrorFormat {
    pub const NAMES: &'static [&'static str] = &["human", "json"];

    fn from_name(name: &str) -> ErrorFormat {
        match name {
            "json" => ErrorFormat::Json,
            _ => ErrorFormat::Human,
        }
    }
}

pub fn app() -> App<'static, 'static> {
    App::new("loxi")
        .version("0.1.0")
        .about("lox language interpreter")
        .author("Thomas Peters")
        .arg(
            Arg::with_name(INPUT_STR)
                .help("script to run; starts a REPL when omitted")
                .required(false)
                .index(1),
        )
        .arg(
            Arg::with_name(SHOW_TOKENS_STR)
                .long("--show-tokens")
                .takes_value(false)
                .help("show the token stream"),
        )
        .arg(
            Arg::with_name(SHOW_AST_STR)
                .long("--show-ast")
                .takes_value(false)
                .help("show the AST"),
        )
        .arg(
            Arg::with_name(PRINT_AST_STR)
                .long("--print-ast")
                .takes_value(false)
                .help("print the AST in prefix notation"),
        )
        .arg(
            Arg::with_name(ERROR_FORMAT_STR)
                .long("--error-format")
                .takes_value(true)
                .possible_values(ErrorFormat::NAMES)
                .default_value("human")
                .help("how diagnostics are reported"),
        )
}

/// Everything the command line decides. No input file means the REPL.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: Option<String>,
    pub show_tokens: bool,
    pub show_ast: bool,
    pub print_ast: bool,
    pub error_format: ErrorFormat,
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Config {
        Config {
            input: matches.value_of(INPUT_STR).map(String::from),
            show_tokens: matches.is_present(SHOW_TOKENS_STR),
            show_ast: matches.is_present(SHOW_AST_STR),
            print_ast: matches.is_present(PRINT_AST_STR),
            error_format: matches
                .value_of(ERROR_FORMAT_STR)
                .map_or(ErrorFormat::Human, ErrorFormat::from_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(args: &[&str]) -> Config {
        Config::from_matches(&app().get_matches_from(args))
    }

    #[test]
    fn no_input_means_repl() {
        let config = config(&["loxi"]);
        assert_eq!(config.input, None);
        assert_eq!(config.error_format, ErrorFormat::Human);
        assert!(!config.show_tokens && !config.show_ast && !config.print_ast);
    }

    #[test]
    fn flags() {
        let config = config(&["loxi", "--print-ast", "--error-format", "json", "prog.lox"]);
        assert_eq!(config.input.as_deref(), Some("prog.lox"));
        assert!(config.print_ast);
        assert_eq!(config.error_format, ErrorFormat::Json);
    }

    #[test]
    fn unknown_error_format_is_rejected() {
        assert!(app()
            .get_matches_from_safe(&["loxi", "--error-format", "xml"])
            .is_err());
    }
}
