use std::{error::Error, process::exit};

use clap::Parser;
use log::debug;

use dragon::compiler::compile;
use dragon::interpreter::Interpreter;
use dragon::lexer::Lexer;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Source file to execute.
    file: std::path::PathBuf,

    /// Print token and postfix dumps while running.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Cli::parse();

    let level = if args.verbose {
        log::Level::Trace
    } else {
        log::Level::Warn
    };
    simple_logger::init_with_level(level).unwrap();

    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(error) => {
            eprintln!(
                "Failed to open file `{}`: {error}",
                args.file.to_string_lossy()
            );
            exit(1);
        }
    };

    if let Err(error) = run(&source) {
        eprintln!("{error}");
        exit(1);
    }
}

fn run(source: &str) -> Result<(), Box<dyn Error>> {
    let lines = Lexer::new(source).lex()?;
    debug!("lexed {} line(s)", lines.len());

    let functions = compile(&lines)?;

    Interpreter::new(&functions).run()?;

    Ok(())
}
