use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

const TEST_TIMEOUT_SECS: u64 = 30;
const EXIT_CODE_MARKER: &str = "@EXPECT_EXIT_CODE=";

fn find_basic_programs(test_suite_dir: &Path) -> Vec<PathBuf> {
    let mut programs = Vec::new();
    if let Ok(entries) = fs::read_dir(test_suite_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("bas") {
                programs.push(path);
            }
        }
    }
    programs.sort();
    programs
}

fn get_expected_exit_code(program_path: &Path) -> i32 {
    if let Ok(content) = fs::read_to_string(program_path) {
        for line in content.lines() {
            if let Some(pos) = line.find(EXIT_CODE_MARKER) {
                if let Ok(code) = line[pos + EXIT_CODE_MARKER.len()..].trim().parse() {
                    return code;
                }
            }
        }
    }
    0 // Default to 0 (success)
}

/// Runs `command` with `stdin` fed in, returning its exit code and stdout.
fn run_with_timeout(command: &mut Command, stdin: Option<&[u8]>) -> Result<(i32, String), String> {
    command
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(data)
            .map_err(|e| format!("Failed to write stdin: {}", e))?;
    }

    match child.wait_timeout(Duration::from_secs(TEST_TIMEOUT_SECS)) {
        Ok(Some(status)) => {
            let mut stdout = String::new();
            if let Some(mut pipe) = child.stdout.take() {
                pipe.read_to_string(&mut stdout)
                    .map_err(|e| format!("Failed to read stdout: {}", e))?;
            }
            Ok((status.code().unwrap_or(-1), stdout))
        }
        Ok(None) => {
            let _ = child.kill();
            Err(format!("Test timed out after {} seconds", TEST_TIMEOUT_SECS))
        }
        Err(e) => Err(format!("Error waiting for process: {}", e)),
    }
}

struct Expectation {
    exit_code: i32,
    stdout: Option<String>,
    stdin: Option<Vec<u8>>,
}

impl Expectation {
    fn for_program(program_path: &Path) -> Self {
        Expectation {
            exit_code: get_expected_exit_code(program_path),
            stdout: fs::read_to_string(program_path.with_extension("out")).ok(),
            stdin: fs::read(program_path.with_extension("in")).ok(),
        }
    }

    fn check(&self, exit_code: i32, stdout: &str) -> Result<(), String> {
        if exit_code != self.exit_code {
            return Err(format!(
                "Expected exit code: {}, got: {}",
                self.exit_code, exit_code
            ));
        }
        if let Some(expected) = &self.stdout {
            if expected != stdout {
                return Err(format!(
                    "Expected stdout: {:?}, got: {:?}",
                    expected, stdout
                ));
            }
        }
        Ok(())
    }
}

fn interpret(program_path: &Path, expectation: &Expectation) -> Result<(), String> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_basis_rs"));
    command.arg(program_path);
    let (code, stdout) = run_with_timeout(&mut command, expectation.stdin.as_deref())?;
    expectation.check(code, &stdout)
}

fn rustc_available() -> bool {
    Command::new("rustc")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Compiles the program to Rust, builds it with rustc and runs the result.
fn compile_and_run(program_path: &Path, expectation: &Expectation, work_dir: &Path) -> Result<(), String> {
    let stem = program_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("program");
    let source = work_dir.join(format!("{}.rs", stem));
    let binary = work_dir.join(stem);

    let mut translate = Command::new(env!("CARGO_BIN_EXE_basis-compiler"));
    translate.arg(program_path).arg("-o").arg(&source);
    let (code, _) = run_with_timeout(&mut translate, None)?;
    if code != 0 {
        return Err(format!("basis-compiler exited with {}", code));
    }

    let status = Command::new("rustc")
        .args(["--edition", "2021", "-o"])
        .arg(&binary)
        .arg(&source)
        .status()
        .map_err(|e| format!("Failed to run rustc: {}", e))?;
    if !status.success() {
        return Err(format!("rustc failed on {}", source.display()));
    }

    let mut command = Command::new(&binary);
    let (code, stdout) = run_with_timeout(&mut command, expectation.stdin.as_deref())?;
    expectation.check(code, &stdout)
}

fn run_test_suite(test_suite_dir: &Path, compile: bool) -> bool {
    println!("Running BASIC test suite (compiled: {})...", compile);
    println!("==========================");

    let programs = find_basic_programs(test_suite_dir);
    if programs.is_empty() {
        println!("No BASIC programs found!");
        return false;
    }

    let work_dir = std::env::temp_dir().join(format!("basis_suite_{}", std::process::id()));
    if compile && fs::create_dir_all(&work_dir).is_err() {
        println!("Could not create {}", work_dir.display());
        return false;
    }

    let mut passed = 0;
    let mut failed = 0;

    for program_path in programs {
        let program_name = program_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy();

        let expectation = Expectation::for_program(&program_path);
        // Programs that fail to parse never reach the compiler.
        if compile && expectation.exit_code == 2 {
            continue;
        }

        print!("Testing {}... ", program_name);

        let result = if compile {
            compile_and_run(&program_path, &expectation, &work_dir)
        } else {
            interpret(&program_path, &expectation)
        };

        match result {
            Ok(()) => {
                println!("PASS");
                passed += 1;
            }
            Err(error) => {
                println!("FAIL");
                println!("  {}", error);
                failed += 1;
            }
        }
    }

    if compile {
        let _ = fs::remove_dir_all(&work_dir);
    }

    println!("==========================");
    println!("Results: {} passed, {} failed", passed, failed);

    failed == 0
}

fn test_suite_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test_suite")
}

#[test]
fn run_all_tests() {
    assert!(run_test_suite(&test_suite_dir(), false), "Some tests failed");
}

#[test]
fn run_all_tests_compiled() {
    if !rustc_available() {
        println!("rustc not found on PATH, skipping compiled run");
        return;
    }
    assert!(run_test_suite(&test_suite_dir(), true), "Some compiled tests failed");
}
