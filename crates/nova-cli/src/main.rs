//! Thin binary: load rule file(s), scan prompt(s), print verdicts as JSON.
//!
//! Argument parsing follows `john-wennstrom-astorion`'s hand-rolled
//! `std::env::args` loop (no `clap`); logging setup follows the
//! env-var-driven `tracing_subscriber` init every plugin binary in the
//! teacher workspace performs at the top of `main` (gRPC server setup in
//! those binaries is out of scope here, §1).

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use nova_core::evaluators::{MockEmbeddingProvider, MockLlmProvider, NovaLlmEvaluator, NovaSemanticEvaluator};
use nova_core::matcher::EvaluatorOverrides;
use nova_core::parser::Parser;
use nova_core::scanner::{InputMode, ScanOutcome, Scanner};

struct Config {
    rule_paths: Vec<String>,
    input: Option<String>,
    file: Option<String>,
    mode: InputMode,
    offline: bool,
    no_llm: bool,
    pretty: bool,
}

fn main() -> ExitCode {
    nova_core::logging::init();

    let config = match parse_args() {
        Ok(c) => c,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let mut rules = Vec::new();
    let mut had_parse_errors = false;
    for path in &config.rule_paths {
        let (parsed, errors) = Parser::parse_file(path);
        for error in &errors {
            eprintln!("{error}");
            had_parse_errors = true;
        }
        rules.extend(parsed);
    }

    if rules.is_empty() {
        eprintln!("error: no rules parsed successfully");
        return ExitCode::from(1);
    }
    if had_parse_errors {
        tracing::warn!("continuing with {} rule(s) after parse errors", rules.len());
    }

    let offline = config.offline;
    let no_llm = config.no_llm;
    let scanner = Scanner::new(
        rules,
        move || {
            if offline {
                EvaluatorOverrides {
                    semantic: Some(Box::new(NovaSemanticEvaluator::new(MockEmbeddingProvider::new()))),
                    llm: Some(Box::new(NovaLlmEvaluator::new(MockLlmProvider::new()))),
                    ..Default::default()
                }
            } else {
                EvaluatorOverrides::default()
            }
        },
        !no_llm,
    );

    let outcomes = match run_scan(&scanner, &config) {
        Ok(outcomes) => outcomes,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(1);
        }
    };

    print_outcomes(&outcomes, config.pretty);
    ExitCode::SUCCESS
}

fn run_scan(scanner: &Scanner, config: &Config) -> Result<Vec<ScanOutcome>, String> {
    if let Some(text) = &config.input {
        return Ok(vec![scanner.scan_text("input", text)]);
    }
    if let Some(path) = &config.file {
        return scanner.scan_file(path, config.mode).map_err(|e| format!("could not read '{path}': {e}"));
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|e| format!("failed to read stdin: {e}"))?;
    Ok(vec![scanner.scan_text("stdin", &buffer)])
}

fn print_outcomes(outcomes: &[ScanOutcome], pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(outcomes)
    } else {
        serde_json::to_string(outcomes)
    };
    match json {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error: failed to serialize verdicts: {e}"),
    }
}

fn parse_args() -> Result<Config, String> {
    let mut rule_paths = Vec::new();
    let mut input = None;
    let mut file = None;
    let mut mode = InputMode::Lines;
    let mut offline = true;
    let mut no_llm = false;
    let mut pretty = io::stdout().is_terminal();

    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("nova {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "-r" | "--rules" => {
                let value = args.next().ok_or_else(|| "error: --rules expects a path".to_string())?;
                rule_paths.push(value);
            }
            "-i" | "--input" => {
                let value = args.next().ok_or_else(|| "error: --input expects text".to_string())?;
                input = Some(value);
            }
            "-f" | "--file" => {
                let value = args.next().ok_or_else(|| "error: --file expects a path".to_string())?;
                file = Some(value);
            }
            "--whole-file" => mode = InputMode::WholeFile,
            "--lines" => mode = InputMode::Lines,
            "--offline" => offline = true,
            "--no-offline" => offline = false,
            "--no-llm" => no_llm = true,
            "--pretty" => pretty = true,
            "--compact" => pretty = false,
            other if other.starts_with('-') => return Err(format!("error: unknown option '{other}'")),
            other => rule_paths.push(other.to_string()),
        }
    }

    if rule_paths.is_empty() {
        return Err(format!("error: no rule file(s) given\n\n{}", help_text()));
    }
    if input.is_some() && file.is_some() {
        return Err("error: --input and --file are mutually exclusive".to_string());
    }

    Ok(Config { rule_paths, input, file, mode, offline, no_llm, pretty })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "nova {version}

Rule engine for detecting patterns in free-form prompts.

Usage:
  nova [OPTIONS] <rule-file>...

Options:
  -r, --rules <path>      A .nov/.nova rule file. May be given multiple times,
                           or passed positionally.
  -i, --input <text>      Scan this text instead of reading a file or stdin.
  -f, --file <path>       Scan prompts from this file instead of stdin.
  --lines                 Treat --file as one prompt per line (default).
  --whole-file            Treat --file as a single prompt.
  --offline               Use deterministic mock semantic/llm evaluators (default).
  --no-offline            Leave semantic/llm evaluators unset (sections evaluate false).
  --no-llm                Suppress llm evaluation even if an evaluator is available.
  --pretty                Pretty-print JSON output.
  --compact               Compact JSON output (default when not a terminal).
  -h, --help              Show this help message.
  -V, --version           Print version information.

Exit codes:
  0  Success (regardless of whether any rule matched).
  1  Internal error (no rules parsed, file read failure).
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
