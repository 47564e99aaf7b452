use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use asmcost::diagnostic::{Diagnostic, ansi::AnsiRenderer, json};
use asmcost::{Console, CostModel, Error, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "asmcost")]
#[command(about = "Run a register-based assembly program and report its simulated cost")]
struct Cli {
    /// Assembly source file.
    program: PathBuf,

    /// JSON file overriding entries of the default cost table.
    #[arg(long, value_name = "JSON")]
    costs: Option<PathBuf>,

    /// Read program input from this file instead of stdin.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Report and diagnostic format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Write the report here instead of stderr.
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Print the parsed program as JSON and exit.
    #[arg(long)]
    dump_ast: bool,
}

fn read(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

fn console(input: Option<&Path>) -> Result<Console, Error> {
    let Some(path) = input else {
        return Ok(Console::stdio());
    };
    let file = std::fs::File::open(path)
        .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    Ok(Console::new(std::io::BufReader::new(file), std::io::stdout()))
}

fn render_report(report: &Report, format: Format) -> Result<String, Error> {
    Ok(match format {
        Format::Text => report.to_text(),
        Format::Json => report.to_json()? + "\n",
    })
}

fn run(cli: &Cli, source: &str) -> Result<(), Error> {
    let program = asmcost::load(source)?;

    if cli.dump_ast {
        println!("{}", serde_json::to_string_pretty(&program)?);
        return Ok(());
    }

    let costs = match &cli.costs {
        Some(path) => CostModel::load(path)?,
        None => CostModel::default(),
    };
    let report = asmcost::run(&program, costs, console(cli.input.as_deref())?)?;
    let text = render_report(&report, cli.format)?;

    match &cli.log {
        Some(path) => std::fs::write(path, text)
            .map_err(|source| Error::Io { path: path.clone(), source })?,
        None => eprint!("{text}"),
    }
    Ok(())
}

fn report_error(err: &Error, source: Option<&str>, format: Format) {
    let mut d = Diagnostic::from(err);
    if let Some(source) = source {
        d = d.with_source(source);
    }
    match format {
        Format::Json => eprintln!("{}", json::render(&d)),
        Format::Text => {
            let renderer = AnsiRenderer { use_color: std::io::stderr().is_terminal() };
            eprint!("{}", renderer.render(&d));
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let source = match read(&cli.program) {
        Ok(s) => s,
        Err(e) => {
            report_error(&e, None, cli.format);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, Some(&source), cli.format);
            ExitCode::FAILURE
        }
    }
}
