// pipeline.rs — Document loading and multi-integral compilation
//
// An input document lists the IR of every integral in one form, plus
// optional compilation options. `compile_document` runs `generate_integral`
// on each integral in order with the reference lowering and formatter.
//
// Preconditions: none.
// Postconditions: on success every integral has declaration and
//                 implementation text; diagnostics are in integral order.
// Failure modes: unreadable or malformed input (`LoadError`), or the first
//                fatal generation error (`PipelineError`).
// Side effects: reads input files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::cformat::CFormatter;
use crate::codegen::{generate_integral, CodegenError};
use crate::diag::Diagnostic;
use crate::file::{render_header, render_source};
use crate::ir::IntegralIr;
use crate::lowered::{LoweredBlock, TabulationBackend};
use crate::options::{CodegenOptions, ScalarType, TargetCaps};
use crate::template::IntegralCode;

// ── Input document ─────────────────────────────────────────────────────────

/// Parsed input file.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub options: Option<CodegenOptions>,
    pub integrals: Vec<IntegralIr<LoweredBlock>>,
}

/// A document together with the text it was parsed from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub source: String,
    pub document: Document,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid input document: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_document(source: &str) -> Result<Document, LoadError> {
    Ok(serde_json::from_str(source)?)
}

pub fn load_document(path: &Path) -> Result<LoadedDocument, LoadError> {
    let source = read(path)?;
    let document = parse_document(&source)?;
    debug!(
        path = %path.display(),
        integrals = document.integrals.len(),
        "loaded input document"
    );
    Ok(LoadedDocument { source, document })
}

/// Load a standalone options file (`--config`).
pub fn load_options(path: &Path) -> Result<CodegenOptions, LoadError> {
    let source = read(path)?;
    Ok(serde_json::from_str(&source)?)
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Options layering ───────────────────────────────────────────────────────

/// Command-line overrides, applied on top of every other layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionOverrides {
    pub scalar_type: Option<ScalarType>,
    pub no_complex: bool,
}

/// Effective options: overrides > config file > document > defaults.
pub fn resolve_options(
    document: Option<CodegenOptions>,
    config: Option<CodegenOptions>,
    overrides: OptionOverrides,
) -> CodegenOptions {
    let mut options = config.or(document).unwrap_or_default();
    if let Some(scalar_type) = overrides.scalar_type {
        options.scalar_type = scalar_type;
    }
    if overrides.no_complex {
        options.target = TargetCaps {
            complex_arithmetic: false,
        };
    }
    options
}

// ── Compilation ────────────────────────────────────────────────────────────

/// Generated code for a whole document.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub integrals: Vec<IntegralCode>,
    pub diagnostics: Vec<Diagnostic>,
    pub options: CodegenOptions,
}

impl CompiledDocument {
    pub fn header(&self) -> String {
        render_header(&self.integrals)
    }

    pub fn source(&self, prefix: &str) -> String {
        render_source(prefix, &self.integrals, &self.options)
    }
}

/// Generation stopped at a fatal error.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineError {
    pub error: CodegenError,
    /// Diagnostics of the integrals generated before the failure.
    pub diagnostics: Vec<Diagnostic>,
}

pub fn compile_document(
    document: Document,
    options: &CodegenOptions,
) -> Result<CompiledDocument, PipelineError> {
    info!(
        integrals = document.integrals.len(),
        scalar_type = %options.scalar_type,
        "compiling document"
    );
    let backend = TabulationBackend;
    let mut integrals = Vec::with_capacity(document.integrals.len());
    let mut diagnostics = Vec::new();

    for ir in document.integrals {
        match generate_integral(ir, &backend, &CFormatter, options) {
            Ok(result) => {
                integrals.push(result.code);
                diagnostics.extend(result.diagnostics);
            }
            Err(error) => return Err(PipelineError { error, diagnostics }),
        }
    }

    Ok(CompiledDocument {
        integrals,
        diagnostics,
        options: *options,
    })
}

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds (`--emit build-info`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// SHA-256 of the input document text.
    pub input_hash: [u8; 32],
    /// SHA-256 of the generated header followed by the generated source.
    pub output_hash: [u8; 32],
    pub compiler_version: &'static str,
}

#[derive(Serialize)]
struct BuildInfo<'a> {
    input_hash: String,
    output_hash: String,
    compiler_version: &'a str,
}

impl Provenance {
    pub fn input_hash_hex(&self) -> String {
        bytes_to_hex(&self.input_hash)
    }

    pub fn output_hash_hex(&self) -> String {
        bytes_to_hex(&self.output_hash)
    }

    pub fn to_json(&self) -> String {
        let info = BuildInfo {
            input_hash: self.input_hash_hex(),
            output_hash: self.output_hash_hex(),
            compiler_version: self.compiler_version,
        };
        let mut json = serde_json::to_string_pretty(&info).unwrap_or_default();
        json.push('\n');
        json
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(parts: &[&str]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

pub fn compute_provenance(input: &str, header: &str, source: &str) -> Provenance {
    Provenance {
        input_hash: sha256(&[input]),
        output_hash: sha256(&[header, source]),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
