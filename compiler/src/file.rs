// file.rs — Translation-unit assembly
//
// Wraps the per-integral declarations and implementations into a C header
// and a C source file.
//
// Preconditions: every `IntegralCode` was generated with the same options.
// Postconditions: integrals appear in input order; output is deterministic.
// Failure modes: none.
// Side effects: none.

use std::fmt::Write as _;

use crate::options::CodegenOptions;
use crate::template::IntegralCode;

/// Header file text declaring every integral.
pub fn render_header(integrals: &[IntegralCode]) -> String {
    let mut out = String::with_capacity(256 + 64 * integrals.len());
    let _ = writeln!(out, "// Generated by ufcgen {}", env!("CARGO_PKG_VERSION"));
    out.push_str("// This file was automatically generated. Do not edit.\n\n");
    out.push_str("#pragma once\n\n");
    out.push_str("#include <ufcx.h>\n\n");
    out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");
    for code in integrals {
        out.push_str(&code.declaration);
    }
    if !integrals.is_empty() {
        out.push('\n');
    }
    out.push_str("#ifdef __cplusplus\n}\n#endif\n");
    out
}

/// Source file text defining every integral.
///
/// `<complex.h>` is only included when the target has complex arithmetic.
pub fn render_source(prefix: &str, integrals: &[IntegralCode], options: &CodegenOptions) -> String {
    let body_len: usize = integrals.iter().map(|c| c.implementation.len()).sum();
    let mut out = String::with_capacity(512 + body_len);
    let _ = writeln!(out, "// Generated by ufcgen {}", env!("CARGO_PKG_VERSION"));
    out.push_str("// This file was automatically generated. Do not edit.\n\n");
    out.push_str("#include <math.h>\n");
    out.push_str("#include <stdalign.h>\n");
    out.push_str("#include <stdbool.h>\n");
    out.push_str("#include <stddef.h>\n");
    out.push_str("#include <stdint.h>\n");
    out.push_str("#include <stdlib.h>\n");
    out.push_str("#include <string.h>\n");
    if options.target.complex_arithmetic {
        out.push_str("#include <complex.h>\n");
    }
    out.push_str("#include <ufcx.h>\n");
    let _ = writeln!(out, "#include \"{}.h\"", header_stem(prefix));
    for code in integrals {
        out.push('\n');
        out.push_str(&code.implementation);
    }
    out
}

/// File name component of `prefix`, used for the header include.
fn header_stem(prefix: &str) -> &str {
    prefix.rsplit(['/', '\\']).next().unwrap_or(prefix)
}
