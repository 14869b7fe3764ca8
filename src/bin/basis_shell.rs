use std::io::{self, Write};
use std::process;

use basis_rs::basic_editor::{ProgramBuffer, Shell};
use basis_rs::basic_logging::init_tracing;
use basis_rs::basic_runtime::LineReader;
use clap::Parser as ClapParser;

#[derive(ClapParser)]
#[command(author, version, about = "basis_shell - line-numbered BASIC editor and REPL")]
struct Args {
    /// Program to load before the first prompt
    program: Option<String>,

    /// Debug-level logging on stderr
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, false);

    let mut buffer = ProgramBuffer::new();
    if let Some(path) = &args.program {
        match buffer.load(path) {
            Ok(count) => println!("Loaded {} lines from {}", count, path),
            Err(e) => {
                eprintln!("Error loading program: {}", e);
                process::exit(4);
            }
        }
    }

    println!("basis shell {}", env!("CARGO_PKG_VERSION"));
    println!("Type 'EXIT' to quit, 'RUN' to execute, 'LIST' to show program");
    println!();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stderr = io::stderr();
    let mut err = stderr.lock();
    let stdin = io::stdin();
    let mut input = LineReader::new(stdin.lock());

    let mut shell = Shell::with_buffer(buffer);
    if let Err(e) = shell.repl(&mut out, &mut err, &mut input) {
        let _ = out.flush();
        eprintln!("Error: {}", e);
        process::exit(4);
    }
}
