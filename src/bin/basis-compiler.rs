use std::fs;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use basis_rs::basic_logging::init_tracing;
use basis_rs::basic_parser::parse_source;
use basis_rs::basic_types::BasicError;
use basis_rs::rust_codegen::RustCodeGenerator;
use clap::Parser as ClapParser;

#[derive(ClapParser)]
#[command(author, version, about = "basis-compiler - translates BASIC programs to standalone Rust source")]
struct Args {
    /// BASIC program file to compile
    input: String,

    /// Output Rust file (defaults to input with .rs extension)
    #[arg(short, long)]
    output: Option<String>,

    /// Echo each executed line number to stderr from the generated program
    #[arg(long)]
    trace: bool,

    /// Debug-level logging on stderr
    #[arg(long)]
    verbose: bool,
}

fn output_path(args: &Args) -> String {
    match &args.output {
        Some(path) => path.clone(),
        None => {
            let stem = Path::new(&args.input)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            format!("{}.rs", stem)
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Error reading file {}", args.input))?;
    let program = parse_source(&source)?;

    let code = RustCodeGenerator::new(program, args.trace).generate()?;

    let output = output_path(args);
    fs::write(&output, code).with_context(|| format!("Error writing output {}", output))?;
    Ok(output)
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, false);

    match run(&args) {
        Ok(output) => {
            println!("Rust source written to {}", output);
            println!("Build with: rustc --edition 2021 -O -o basic_out {}", output);
        }
        Err(e) => {
            let code = match e.downcast_ref::<BasicError>() {
                Some(BasicError::Syntax { messages }) => {
                    println!("Parser errors:");
                    for message in messages {
                        println!("\t{}", message);
                    }
                    2
                }
                Some(err @ BasicError::Translation { .. }) => {
                    eprintln!("Compile error: {}", err);
                    3
                }
                Some(err) => {
                    eprintln!("{}", err);
                    1
                }
                None => {
                    eprintln!("{:#}", e);
                    4
                }
            };
            process::exit(code);
        }
    }
}
