// Snapshot tests: lock generated C output to detect unintended changes.
//
// Uses the library API (load document → generate_integral) with the
// reference lowering and C formatter. Snapshots are managed by `insta` and
// stored under `compiler/tests/snapshots/`.
//
// Run `cargo insta review` after intentional output changes to update baselines.

use std::path::Path;

use ufcgen::cformat::CFormatter;
use ufcgen::codegen::{generate_integral, CodegenResult};
use ufcgen::ir::IntegralIr;
use ufcgen::lowered::{LoweredBlock, TabulationBackend};
use ufcgen::options::{CodegenOptions, ScalarType};
use ufcgen::pipeline::load_document;

fn fixture_integral(name: &str) -> IntegralIr<LoweredBlock> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/form.json");
    let loaded = load_document(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    loaded
        .document
        .integrals
        .into_iter()
        .find(|ir| ir.name == name)
        .unwrap_or_else(|| panic!("fixture has no integral '{}'", name))
}

fn generate(name: &str, scalar_type: ScalarType) -> CodegenResult {
    generate_integral(
        fixture_integral(name),
        &TabulationBackend,
        &CFormatter,
        &CodegenOptions::new(scalar_type),
    )
    .unwrap_or_else(|e| panic!("generation of '{}' failed: {}", name, e))
}

#[test]
fn mass_float64() {
    let CodegenResult { code, diagnostics } = generate("mass", ScalarType::Float64);
    assert!(diagnostics.is_empty());
    assert_eq!(code.declaration, "extern ufcx_integral mass;\n");
    insta::assert_snapshot!("mass_float64", code.implementation);
}

#[test]
fn facet_rt_float32() {
    let CodegenResult { code, diagnostics } = generate("facet_rt", ScalarType::Float32);
    assert!(diagnostics.is_empty());
    insta::assert_snapshot!("facet_rt_float32", code.implementation);
}

#[test]
fn facet_rt_complex128() {
    let CodegenResult { code, diagnostics } = generate("facet_rt", ScalarType::Complex128);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].code.map(|c| c.0),
        Some("W0101"),
        "{:?}",
        diagnostics
    );
    insta::assert_snapshot!("facet_rt_complex128", code.implementation);
}
