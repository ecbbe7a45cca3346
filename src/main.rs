use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox as lox;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::scanner::Scanner;
use lox::Lox;

/// Exit status for lexical, syntax and resolution errors.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status for a runtime error.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every token of a file (or stdin)
    Tokenize {
        filename: Option<PathBuf>,

        /// Print one JSON object per token instead of the plain format
        #[arg(long)]
        json: bool,
    },

    /// Print the syntax tree of each statement of a file (or stdin)
    Parse { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program; starts a prompt without one
    Run { filename: Option<PathBuf> },
}

/// The whole of `filename`, or of stdin when no file is given.
fn read_source(filename: Option<PathBuf>) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();

    let bytes: usize = match &filename {
        Some(path) => {
            info!("Reading file: {:?}", path);

            let file = File::open(path).with_context(|| format!("Failed to open file {:?}", path))?;

            BufReader::new(file)
                .read_to_end(&mut buf)
                .with_context(|| format!("Failed to read file {:?}", path))?
        }

        None => io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("Failed to read from stdin")?,
    };

    debug!("Read {} bytes", bytes);

    let text: String = String::from_utf8(buf).map_err(LoxError::from)?;

    Ok(text)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logging to app.log");
    Ok(())
}

/// Print every static diagnostic, or the runtime error, to stderr.
fn report(error: &LoxError) {
    match error {
        LoxError::Static(diagnostics) => {
            for diagnostic in diagnostics.iter() {
                eprintln!("{}", diagnostic);
            }
        }

        other => eprintln!("{}", other),
    }
}

fn exit_code(error: &LoxError) -> i32 {
    if error.is_static() {
        EXIT_STATIC_ERROR
    } else {
        EXIT_RUNTIME_ERROR
    }
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;

                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);

        std::process::exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenized without errors");
    Ok(())
}

fn parse(source: &str) {
    match lox::parse_source(source) {
        Ok(statements) => {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
        }

        Err(e) => {
            report(&e);
            std::process::exit(exit_code(&e));
        }
    }
}

fn run_file(source: &str) {
    let mut session = Lox::new();

    if let Err(e) = session.run(source) {
        debug!("Run failed: {}", e);
        report(&e);
        std::process::exit(exit_code(&e));
    }

    info!("Program finished");
}

fn run_prompt() -> Result<()> {
    let mut session = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line: String = line.context("Failed to read from stdin")?;

        // Static errors are per entry; globals and the runtime flag persist.
        if let Err(e) = session.run_prompt_line(&line) {
            report(&e);
        }
    }

    info!(
        "Prompt closed (runtime error seen: {})",
        session.had_runtime_error()
    );

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&read_source(filename)?, json)?,

        Commands::Parse { filename } => parse(&read_source(filename)?),

        Commands::Run {
            filename: Some(filename),
        } => run_file(&read_source(Some(filename))?),

        Commands::Run { filename: None } => run_prompt()?,
    }

    Ok(())
}
