// config-check
// Parses a project configuration file and reports every defect in one pass

use project_config::{ConfigError, ParseOutcome, ProjectParser};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut json = false;
    let mut path: Option<&str> = None;
    for arg in &args[1..] {
        match arg.as_str() {
            "--json" => json = true,
            other if path.is_none() => path = Some(other),
            other => {
                eprintln!("unexpected argument: {}", other);
                usage(&args[0]);
            }
        }
    }
    let Some(path) = path else {
        usage(&args[0]);
    };

    match ProjectParser::parse_file(path) {
        Ok(outcome) => {
            report(&outcome, json);
            if !outcome.success() {
                process::exit(1);
            }
        }
        Err(ConfigError::Parse(err)) => {
            eprint!("{}", err);
            process::exit(1);
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(2);
        }
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--json] <project.yml>", program);
    process::exit(2);
}

fn report(outcome: &ParseOutcome, json: bool) {
    if json {
        match serde_json::to_string_pretty(outcome) {
            Ok(rendered) => println!("{}", rendered),
            Err(err) => {
                eprintln!("failed to render JSON: {}", err);
                process::exit(2);
            }
        }
        return;
    }

    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &outcome.errors {
        eprintln!("error: {}", error);
    }
    println!(
        "{} tasks, {} build variants, {} errors, {} warnings",
        outcome.project.tasks.len(),
        outcome.project.buildvariants.len(),
        outcome.errors.len(),
        outcome.warnings.len()
    );
}
