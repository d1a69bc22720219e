use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use loxvm::{scanner::Scanner, Chunk, ChunkError, InterpretResult, OpCode, VmConfig, VM};

#[derive(Debug, Parser)]
#[command(name = "loxvm", version, about = "Run and inspect Lox bytecode", long_about = None)]
struct Opt {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assemble a built-in program and execute it
    Run {
        #[arg(value_enum)]
        demo: Demo,
        /// Print the stack and each instruction as it executes
        #[arg(long)]
        trace: bool,
        /// Disassemble the chunk before running it
        #[arg(long = "print-bytecode")]
        print_bytecode: bool,
    },
    /// Dump the tokens of a source file
    Tokens { path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Demo {
    /// 1.2 + 3.4
    Add,
    /// -5
    Negate,
    /// 10 / 2
    Divide,
    /// -((1.2 + 3.4) / 5.6)
    Arith,
}

fn assemble(demo: Demo) -> Result<Chunk, ChunkError> {
    let mut chunk = Chunk::new();
    match demo {
        Demo::Add => {
            chunk.write_constant(1.2, 1)?;
            chunk.write_constant(3.4, 1)?;
            chunk.write_op(OpCode::Add, 1)?;
        }
        Demo::Negate => {
            chunk.write_constant(5.0, 1)?;
            chunk.write_op(OpCode::Negate, 1)?;
        }
        Demo::Divide => {
            chunk.write_constant(10.0, 1)?;
            chunk.write_constant(2.0, 1)?;
            chunk.write_op(OpCode::Divide, 1)?;
        }
        Demo::Arith => {
            chunk.write_constant(1.2, 123)?;
            chunk.write_constant(3.4, 123)?;
            chunk.write_op(OpCode::Add, 123)?;
            chunk.write_constant(5.6, 123)?;
            chunk.write_op(OpCode::Divide, 123)?;
            chunk.write_op(OpCode::Negate, 123)?;
        }
    }
    chunk.write_op(OpCode::Return, 124)?;
    Ok(chunk)
}

fn run_demo(demo: Demo, config: VmConfig) -> i32 {
    let chunk = match assemble(demo) {
        Ok(chunk) => chunk,
        Err(e) => {
            eprintln!("Could not assemble {:?}: {}", demo, e);
            return 70;
        }
    };

    let mut vm = VM::new(config);
    let result = vm.interpret(&chunk);
    if let Err(error) = &result {
        eprintln!("{}", error);
        if let Some(location) = error.location() {
            eprintln!("{}", location);
        }
    }
    InterpretResult::from(&result).exit_code()
}

fn dump_tokens(path: &Path) -> i32 {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Could not read file \"{}\": {}", path.display(), e);
            return 74;
        }
    };

    let mut line = 0;
    for token in Scanner::new(&source) {
        if token.line != line {
            print!("{:4} ", token.line);
            line = token.line;
        } else {
            print!("   | ");
        }
        println!("{:<12} '{}'", token.token_type.to_string(), token.lexeme);
    }
    0
}

fn main() {
    env_logger::init();

    let opt = Opt::parse();
    let code = match opt.cmd {
        Command::Run {
            demo,
            trace,
            print_bytecode,
        } => run_demo(
            demo,
            VmConfig {
                trace_execution: trace,
                print_bytecode,
            },
        ),
        Command::Tokens { path } => dump_tokens(&path),
    };
    process::exit(code);
}
