//! Glint command-line driver

use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use glint::bytecode::disasm::{print_function, summary};
use glint::bytecode::{Compiler, Function};
use glint::frontend::lexer::Lexer;
use glint::frontend::parse_source;
use glint::frontend::token_dumper::TokenDumper;
use glint::runtime::{Vm, VmConfig};

const SOURCE_EXTENSION: &str = "glint";
const COMPILED_EXTENSION: &str = "glintc";

#[derive(Parser, Debug)]
#[command(name = "glint", version)]
#[command(about = "Compile and run Glint expression programs")]
struct Cli {
    /// Program to run: `.glint` source or `.glintc` compiled bytecode
    file: PathBuf,

    /// Print the token stream and exit
    #[arg(long)]
    tokens: bool,

    /// Disable ANSI colors in --tokens output
    #[arg(long)]
    no_color: bool,

    /// Print tokens as source text instead of Debug form
    #[arg(long)]
    pretty: bool,

    /// Print the parsed tree and exit
    #[arg(long)]
    ast: bool,

    /// Print the disassembly before running
    #[arg(long = "bc", alias = "bytecode")]
    bytecode: bool,

    /// Write the compiled program to PATH and exit
    #[arg(long, value_name = "PATH")]
    emit: Option<PathBuf>,

    /// Seed for `rand`
    #[arg(long)]
    seed: Option<u64>,

    /// Set a field before running (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, f32)>,

    /// More logging: -v for debug, -vv for trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_assignment(arg: &str) -> Result<(String, f32), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", arg))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{}'", arg));
    }
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let extension = cli.file.extension().and_then(|e| e.to_str());
    let mut function = match extension {
        Some(SOURCE_EXTENSION) => {
            let source = fs::read_to_string(&cli.file)
                .with_context(|| format!("failed to read '{}'", cli.file.display()))?;

            if cli.tokens {
                return dump_tokens(&source, cli.no_color, cli.pretty);
            }

            match compile_source(&source, &cli)? {
                Some(function) => function,
                None => return Ok(()),
            }
        }
        Some(COMPILED_EXTENSION) => load_compiled(&cli.file, &cli.set)?,
        _ => bail!(
            "expected a .{} or .{} file, got '{}'",
            SOURCE_EXTENSION,
            COMPILED_EXTENSION,
            cli.file.display()
        ),
    };

    if let Some(path) = &cli.emit {
        let bytes = function.to_bytes()?;
        fs::write(path, &bytes)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "wrote compiled program");
        return Ok(());
    }

    if cli.bytecode {
        print_function(&function)?;
    }

    let config = match cli.seed {
        Some(seed) => VmConfig { seed },
        None => VmConfig::default(),
    };
    Vm::with_config(config)
        .run_checked(&mut function)
        .context("refusing to run invalid bytecode")?;

    print!("{}", summary(&function));
    Ok(())
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) -> Result<()> {
    let tokens = Lexer::new(source).tokenize()?;

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }

    dumper.dump(&tokens);
    Ok(())
}

/// Parses and compiles `source`. Returns `None` when `--ast` asked to stop
/// after parsing.
fn compile_source(source: &str, cli: &Cli) -> Result<Option<Function>> {
    let program = parse_source(source)?;

    if cli.ast {
        println!("{:#?}", program);
        return Ok(None);
    }

    let mut seeded = Function::new();
    for (name, value) in &cli.set {
        let local = seeded.declare_or_find_local(name);
        seeded.set_local(local, *value);
    }

    let function = Compiler::with_function(seeded).compile(&program)?;
    debug!(size = function.size(), "compiled source");
    Ok(Some(function))
}

fn load_compiled(path: &Path, set: &[(String, f32)]) -> Result<Function> {
    let bytes = fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    let mut function = Function::from_bytes(&bytes)
        .with_context(|| format!("'{}' is not a compiled Glint program", path.display()))?;

    for (name, value) in set {
        match function.find_local(name) {
            Some(local) => {
                function.set_local(local, *value);
            }
            None => warn!(name = name.as_str(), "field not used by compiled program, ignored"),
        }
    }

    Ok(function)
}
