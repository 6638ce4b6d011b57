use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use lamina_ast::Program;
use lamina_typeck::TypeckResult;

#[derive(Parser)]
#[command(name = "lamina", about = "Compiler for the Lamina language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a .lam file and dump the AST
    Parse {
        /// Path to the .lam source file
        file: PathBuf,
    },
    /// Type-check a .lam file and print the binding types
    Check {
        /// Path to the .lam source file
        file: PathBuf,
    },
    /// Compile a .lam file to a WebAssembly text module
    Emit {
        /// Path to the .lam source file
        file: PathBuf,
        /// Output path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn read_file(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {}", file.display(), e);
            std::process::exit(1);
        }
    }
}

/// Parse source, reporting parse errors and exiting on failure.
fn parse_source(source: &str, file: &Path) -> Program {
    let (program, errors) = lamina_parser::parse(source);
    if !errors.is_empty() {
        for error in &errors {
            eprintln!(
                "{}:{}:{}: parse error: {}",
                file.display(),
                error.span.start,
                error.span.end,
                error.message
            );
        }
        std::process::exit(1);
    }
    program
}

/// Type-check a program, reporting the first error and exiting on failure.
fn check_program(program: &Program, file: &Path) -> TypeckResult {
    match lamina_typeck::check(program) {
        Ok(result) => result,
        Err(e) => {
            eprintln!(
                "{}:{}:{}: type error: {}",
                file.display(),
                e.span.start,
                e.span.end,
                e.kind
            );
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { file } => {
            let source = read_file(&file);
            let program = parse_source(&source, &file);
            print!("{}", lamina_ast::pretty_print(&program));
        }
        Command::Check { file } => {
            let source = read_file(&file);
            let program = parse_source(&source, &file);
            let result = check_program(&program, &file);
            for (name, ty) in &result.binding_types {
                println!("{} : {}", name, ty);
            }
            println!("OK");
        }
        Command::Emit { file, output } => {
            let source = read_file(&file);
            let program = parse_source(&source, &file);
            let result = check_program(&program, &file);
            let module = match lamina_wasm::compile_module(&program, &result) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("{}: codegen error: {}", file.display(), e);
                    std::process::exit(1);
                }
            };
            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(&path, &module) {
                        eprintln!("error: could not write {}: {}", path.display(), e);
                        std::process::exit(1);
                    }
                    log::info!("wrote {}", path.display());
                }
                None => print!("{}", module),
            }
        }
    }
}
