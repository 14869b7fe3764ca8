use std::fs;
use std::io::{self, BufWriter, Write};
use std::process;

use anyhow::{Context, Result};
use basis_rs::basic_interpreter::Interpreter;
use basis_rs::basic_logging::init_tracing;
use basis_rs::basic_parser::parse_source;
use basis_rs::basic_runtime::LineReader;
use basis_rs::basic_types::{BasicError, RunStatus};
use basis_rs::rust_codegen::compile;
use clap::Parser as ClapParser;
use tracing::info;

#[derive(ClapParser)]
#[command(author, version, about = "basis_rs - run or compile a line-numbered BASIC program")]
struct Args {
    /// BASIC program file
    program: String,

    /// Write the program as Rust source to this file ('-' for stdout) instead of running it
    #[arg(long, value_name = "PATH")]
    compile: Option<String>,

    /// Print the parsed program as JSON instead of running it
    #[arg(long)]
    emit_ast: bool,

    /// Echo each executed line number to stderr
    #[arg(long)]
    trace: bool,

    /// Debug-level logging on stderr
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.trace);

    let code = match run(&args) {
        Ok(status) => {
            info!(?status, "program finished");
            0
        }
        Err(e) => report(&e),
    };
    process::exit(code);
}

fn run(args: &Args) -> Result<RunStatus> {
    let source = fs::read_to_string(&args.program)
        .with_context(|| format!("Error reading file {}", args.program))?;
    let program = parse_source(&source)?;

    if args.emit_ast {
        let json = serde_json::to_string_pretty(&program).context("Error encoding AST")?;
        println!("{}", json);
        return Ok(RunStatus::EndOfProgram);
    }

    if let Some(output) = &args.compile {
        let code = compile(&program, args.trace)?;
        if output == "-" {
            print!("{}", code);
        } else {
            fs::write(output, code).with_context(|| format!("Error writing output {}", output))?;
            println!("Rust source written to {}", output);
            println!("Build with: rustc --edition 2021 -O -o basic_out {}", output);
        }
        return Ok(RunStatus::EndOfProgram);
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let stdin = io::stdin();
    let mut input = LineReader::new(stdin.lock());

    let mut interpreter = Interpreter::new(program).with_trace(args.trace);
    let status = interpreter.run(&mut out, &mut input)?;
    out.flush()?;
    Ok(status)
}

/// Prints `e` and picks the exit code for its kind.
fn report(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<BasicError>() {
        Some(BasicError::Syntax { messages }) => {
            println!("Parser errors:");
            for message in messages {
                println!("\t{}", message);
            }
            2
        }
        Some(err @ BasicError::Runtime { .. }) => {
            eprintln!("Runtime error: {}", err);
            1
        }
        Some(err @ BasicError::Translation { .. }) => {
            eprintln!("Compile error: {}", err);
            3
        }
        Some(err @ BasicError::Internal { .. }) => {
            eprintln!("{}", err);
            4
        }
        None => {
            eprintln!("{:#}", e);
            4
        }
    }
}
