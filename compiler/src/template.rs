// template.rs — Structured builders for the emitted C artifacts
//
// One builder per artifact (kernel function, descriptor struct), each
// rendered by a single `render` call. `assemble` concatenates them into the
// implementation text of one integral.
//
// Preconditions: builders are filled from a validated IR and dispatch table.
// Postconditions: identical builders render byte-identical text.
// Failure modes: none.
// Side effects: none.

use std::fmt::Write as _;

use crate::dispatch::DispatchTable;
use crate::metadata::{uint64_literal, MetadataTables};
use crate::options::ScalarType;

// ── Kernel functions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    Static,
    Runtime,
}

impl KernelKind {
    /// C symbol of this kernel for integral `name`.
    pub fn symbol(self, name: &str) -> String {
        match self {
            KernelKind::Static => format!("tabulate_tensor_{}", name),
            KernelKind::Runtime => format!("tabulate_tensor_runtime_{}", name),
        }
    }
}

/// A tabulation kernel definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelFunction {
    pub kind: KernelKind,
    pub symbol: String,
    pub scalar_type: ScalarType,
    /// Formatted body text, without surrounding braces.
    pub body: String,
}

impl KernelFunction {
    pub fn new(kind: KernelKind, integral: &str, scalar_type: ScalarType, body: String) -> Self {
        KernelFunction {
            kind,
            symbol: kind.symbol(integral),
            scalar_type,
            body,
        }
    }

    /// Parameter declarations in ABI order.
    pub fn parameters(&self) -> Vec<String> {
        let scalar = self.scalar_type.c_type();
        let geom = self.scalar_type.geometry_c_type();
        let mut params = vec![
            format!("{}* restrict A", scalar),
            format!("const {}* restrict w", scalar),
            format!("const {}* restrict c", scalar),
            format!("const {}* restrict coordinate_dofs", geom),
            "const int* restrict entity_local_index".to_string(),
            "const uint8_t* restrict quadrature_permutation".to_string(),
        ];
        if self.kind == KernelKind::Runtime {
            params.extend([
                "const int* restrict num_points".to_string(),
                format!("const {}* restrict points", geom),
                format!("const {}* restrict weights", geom),
                format!("const {}* restrict FE", scalar),
                "const size_t* restrict shape".to_string(),
            ]);
        }
        params
    }

    pub fn render(&self) -> String {
        let opening = format!("void {}(", self.symbol);
        let separator = format!(",\n{}", " ".repeat(opening.len()));
        let mut out = String::with_capacity(self.body.len() + 512);
        out.push_str(&opening);
        out.push_str(&self.parameters().join(&separator));
        out.push_str(")\n{\n");
        let body = self.body.trim_end_matches('\n');
        if !body.is_empty() {
            out.push_str(body);
            out.push('\n');
        }
        out.push('}');
        out
    }
}

// ── Descriptor struct ───────────────────────────────────────────────────────

/// The `ufcx_integral` instance describing one integral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorStruct<'a> {
    pub name: &'a str,
    pub dispatch: &'a DispatchTable,
    pub metadata: &'a MetadataTables,
    pub needs_facet_permutations: bool,
    pub coordinate_element_hash: Option<u64>,
}

impl DescriptorStruct<'_> {
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(1024);
        let _ = writeln!(out, "ufcx_integral {} =", self.name);
        out.push_str("{\n");
        let _ = writeln!(
            out,
            "  .enabled_coefficients = {},",
            self.metadata.enabled_coefficients.pointer()
        );
        for (slot, _) in self.dispatch.iter() {
            let line = self.dispatch.initializer(slot);
            if !line.is_empty() {
                let _ = writeln!(out, "  {}", line);
            }
        }
        let _ = writeln!(
            out,
            "  .needs_facet_permutations = {},",
            self.needs_facet_permutations
        );
        let _ = writeln!(
            out,
            "  .coordinate_element_hash = {},",
            uint64_literal(self.coordinate_element_hash)
        );
        let _ = writeln!(out, "  .num_fe = {},", self.metadata.num_fe);
        let _ = writeln!(
            out,
            "  .finite_element_hashes = {},",
            self.metadata.finite_element_hashes.pointer()
        );
        let _ = writeln!(
            out,
            "  .finite_element_deriv_order = {},",
            self.metadata.finite_element_deriv_order.pointer()
        );
        out.push_str("};");
        out
    }
}

// ── Assembly ────────────────────────────────────────────────────────────────

/// Generated text for one integral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegralCode {
    /// `extern ufcx_integral <name>;`
    pub declaration: String,
    pub implementation: String,
}

pub fn declaration(name: &str) -> String {
    format!("extern ufcx_integral {};\n", name)
}

/// Kernels first (static, then runtime), then metadata arrays, then the
/// descriptor struct.
pub fn assemble(
    static_kernel: Option<&KernelFunction>,
    runtime_kernel: Option<&KernelFunction>,
    descriptor: &DescriptorStruct<'_>,
) -> IntegralCode {
    let name = descriptor.name;
    let mut blocks = vec![format!("// Code for integral {}", name)];
    blocks.extend(static_kernel.map(KernelFunction::render));
    blocks.extend(runtime_kernel.map(KernelFunction::render));
    let definitions = descriptor.metadata.definitions();
    if !definitions.is_empty() {
        blocks.push(definitions.join("\n"));
    }
    blocks.push(descriptor.render());
    blocks.push(format!("// End of code for integral {}", name));

    let mut implementation = blocks.join("\n\n");
    implementation.push('\n');

    IntegralCode {
        declaration: declaration(name),
        implementation,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
