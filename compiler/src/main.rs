use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use ufcgen::diag::Diagnostic;
use ufcgen::options::ScalarType;
use ufcgen::pipeline::{self, OptionOverrides};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    Source,
    Header,
    Both,
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "ufcgen",
    version,
    about = "UFCx integral code generator — compiles per-integral IR documents to C tabulation kernels"
)]
struct Cli {
    /// Input document (JSON)
    input: PathBuf,

    /// Output path prefix; writes <prefix>.c and <prefix>.h
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scalar type of the generated kernels (float32, float64, complex64, complex128)
    #[arg(long)]
    scalar_type: Option<ScalarType>,

    /// Target C compiler lacks complex arithmetic
    #[arg(long)]
    no_complex: bool,

    /// Options file (JSON), overriding the document's options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Both)]
    emit: EmitStage,

    /// Log each generated integral
    #[arg(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ufcgen=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ufcgen=warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Print a fatal error and exit with `code`.
fn fail(message: impl std::fmt::Display, code: i32) -> ! {
    eprintln!("ufcgen: {}", Diagnostic::error(message.to_string()));
    std::process::exit(code);
}

fn write_file(path: &Path, contents: &str) {
    if let Err(e) = std::fs::write(path, contents) {
        fail(format!("cannot write {}: {}", path.display(), e), 2);
    }
}

/// `<prefix>.<ext>`, keeping any dots already in the prefix.
fn output_path(prefix: &str, ext: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix, ext))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // ── Load input and options ──
    let loaded = match pipeline::load_document(&cli.input) {
        Ok(loaded) => loaded,
        Err(e) => fail(e, 2),
    };
    let config = match cli.config.as_deref().map(pipeline::load_options).transpose() {
        Ok(config) => config,
        Err(e) => fail(e, 2),
    };
    let overrides = OptionOverrides {
        scalar_type: cli.scalar_type,
        no_complex: cli.no_complex,
    };
    let options = pipeline::resolve_options(loaded.document.options, config, overrides);

    // ── Generate ──
    let compiled = match pipeline::compile_document(loaded.document, &options) {
        Ok(compiled) => compiled,
        Err(e) => {
            for diag in &e.diagnostics {
                eprintln!("ufcgen: {}", diag);
            }
            fail(e, 1)
        }
    };
    for diag in &compiled.diagnostics {
        eprintln!("ufcgen: {}", diag);
    }

    // ── Emit ──
    let prefix = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension(""));
    let prefix = prefix.to_string_lossy();
    let header = compiled.header();
    let source = compiled.source(&prefix);

    match cli.emit {
        EmitStage::Source => write_file(&output_path(&prefix, "c"), &source),
        EmitStage::Header => write_file(&output_path(&prefix, "h"), &header),
        EmitStage::Both => {
            write_file(&output_path(&prefix, "h"), &header);
            write_file(&output_path(&prefix, "c"), &source);
        }
        EmitStage::BuildInfo => {
            let provenance = pipeline::compute_provenance(&loaded.source, &header, &source);
            print!("{}", provenance.to_json());
        }
    }
}
