// codegen.rs — C code generation for one integral
//
// Drives the rule partitioner, formats both kernel bodies, builds the
// dispatch fields and metadata arrays, and assembles declaration and
// implementation text.
//
// Preconditions: the IR comes straight from upstream and is not shared.
// Postconditions: returns `CodegenResult` with the integral's C text; the
//                 same (IR, options) always yields byte-identical text.
// Failure modes: more than one runtime rule, mismatched element tables,
//                or an invalid integral name.
// Side effects: none (the IR is consumed).

use thiserror::Error;
use tracing::info;

use crate::diag::Diagnostic;
use crate::dispatch::build_dispatch;
use crate::ir::{IntegralIr, IrError};
use crate::kernel::{CodeFormatter, GeneratorFactory};
use crate::metadata::build_metadata;
use crate::options::CodegenOptions;
use crate::partition::partition;
use crate::template::{assemble, DescriptorStruct, IntegralCode, KernelFunction, KernelKind};

// ── Public types ────────────────────────────────────────────────────────────

/// Generation aborted; no output was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("integral '{integral}' has {} runtime quadrature rules ({}); at most one is allowed", .rules.len(), .rules.join(", "))]
    MultipleRuntimeRules {
        integral: String,
        rules: Vec<String>,
    },
    #[error("integral '{integral}' lists {hashes} finite element hashes but {deriv_orders} derivative orders")]
    ElementTableMismatch {
        integral: String,
        hashes: usize,
        deriv_orders: usize,
    },
    #[error(transparent)]
    Ir(#[from] IrError),
}

#[derive(Debug, Clone)]
pub struct CodegenResult {
    pub code: IntegralCode,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Generate the C declaration and implementation of one integral.
pub fn generate_integral<E, F, C>(
    ir: IntegralIr<E>,
    factory: &F,
    formatter: &C,
    options: &CodegenOptions,
) -> Result<CodegenResult, CodegenError>
where
    F: GeneratorFactory<E> + ?Sized,
    C: CodeFormatter + ?Sized,
{
    ir.validate()?;

    info!(
        integral = %ir.name,
        integral_type = %ir.integral_type,
        scalar_type = %options.scalar_type,
        "generating code for integral"
    );

    let bodies = partition(ir, factory)?;
    let ir = bodies.residual;
    let scalar_type = options.scalar_type;

    let metadata = build_metadata(&ir)?;
    let (dispatch, diagnostics) = build_dispatch(
        &ir.name,
        options,
        bodies.static_body.is_some(),
        bodies.runtime.is_some(),
    );

    // A body the dispatch table dropped is not emitted.
    let static_kernel = bodies
        .static_body
        .filter(|_| dispatch.is_live(KernelKind::Static))
        .map(|code| {
            KernelFunction::new(
                KernelKind::Static,
                &ir.name,
                scalar_type,
                formatter.format(&code, scalar_type),
            )
        });
    let runtime_kernel = bodies
        .runtime
        .filter(|_| dispatch.is_live(KernelKind::Runtime))
        .map(|(_, code)| {
            KernelFunction::new(
                KernelKind::Runtime,
                &ir.name,
                scalar_type,
                formatter.format(&code, scalar_type),
            )
        });

    let descriptor = DescriptorStruct {
        name: &ir.name,
        dispatch: &dispatch,
        metadata: &metadata,
        needs_facet_permutations: ir.needs_facet_permutations,
        coordinate_element_hash: ir.coordinate_element_hash,
    };
    let code = assemble(static_kernel.as_ref(), runtime_kernel.as_ref(), &descriptor);

    Ok(CodegenResult { code, diagnostics })
}

// ── Tests ───────────────────────────────────────────────────────────────────
// Unit tests with a stub generator and formatter; tests/ covers the
// reference lowering and formatter end to end.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::codes;
    use crate::dispatch::DispatchSlot;
    use crate::ir::{Integrand, IntegralType, Rule};
    use crate::kernel::{AbstractCode, KernelBodyGenerator, Stmt};
    use crate::options::{ScalarType, TargetCaps};

    struct StubFactory;
    struct StubGenerator<'ir> {
        ir: &'ir IntegralIr<&'static str>,
    }

    impl KernelBodyGenerator for StubGenerator<'_> {
        fn generate_static(&self) -> AbstractCode {
            AbstractCode::new(
                self.ir
                    .integrand
                    .iter()
                    .filter(|(r, _)| !r.is_runtime)
                    .map(|(_, body)| Stmt::Comment(body.to_string()))
                    .collect(),
            )
        }

        fn generate_runtime(&self, rule: &Rule) -> AbstractCode {
            let body = self
                .ir
                .integrand
                .iter()
                .find(|(r, _)| r.name == rule.name)
                .map_or("", |(_, body)| *body);
            AbstractCode::new(vec![Stmt::Comment(body.to_string())])
        }
    }

    impl GeneratorFactory<&'static str> for StubFactory {
        fn bind<'ir>(
            &'ir self,
            ir: &'ir IntegralIr<&'static str>,
        ) -> Box<dyn KernelBodyGenerator + 'ir> {
            Box::new(StubGenerator { ir })
        }
    }

    struct StubFormatter;

    impl CodeFormatter for StubFormatter {
        fn format(&self, code: &AbstractCode, scalar_type: ScalarType) -> String {
            assert!(!code.is_empty(), "formatter called with empty code");
            code.statements
                .iter()
                .map(|s| match s {
                    Stmt::Comment(c) => format!("// {} [{}]\n", c, scalar_type),
                    other => format!("// {:?}\n", other),
                })
                .collect()
        }
    }

    fn ir(rules: Vec<(Rule, &'static str)>) -> IntegralIr<&'static str> {
        let mut integrand = Integrand::new();
        for (rule, body) in rules {
            integrand.insert(rule, body).unwrap();
        }
        IntegralIr::new("integral_x", IntegralType::Cell, integrand)
    }

    fn run(ir: IntegralIr<&'static str>, scalar_type: ScalarType) -> CodegenResult {
        generate_integral(ir, &StubFactory, &StubFormatter, &CodegenOptions::new(scalar_type))
            .unwrap()
    }

    #[test]
    fn static_only_float64() {
        let mut ir = ir(vec![(Rule::fixed("q0", vec![1.0]), "mass")]);
        ir.enabled_coefficients = vec![true, false, true];
        let result = run(ir, ScalarType::Float64);
        let text = &result.code.implementation;

        assert!(result.diagnostics.is_empty());
        assert_eq!(result.code.declaration, "extern ufcx_integral integral_x;\n");
        assert!(text.contains("void tabulate_tensor_integral_x(double* restrict A,"));
        assert!(text.contains("// mass [float64]\n"));
        assert!(!text.contains("tabulate_tensor_runtime_integral_x("));
        assert!(text.contains(".tabulate_tensor_float64 = tabulate_tensor_integral_x,"));
        assert!(text.contains(".tabulate_tensor_float32 = NULL,"));
        assert!(text.contains(".tabulate_tensor_runtime_float64 = NULL,"));
        assert!(text.contains("bool enabled_coefficients_integral_x[3] = {1, 0, 1};"));
        assert!(text.contains(".enabled_coefficients = enabled_coefficients_integral_x,"));
        assert!(text.contains(".finite_element_hashes = NULL,"));
        assert!(text.contains(".num_fe = 0,"));
    }

    #[test]
    fn static_and_runtime_both_emitted() {
        let ir = ir(vec![
            (Rule::fixed("q0", vec![1.0]), "static part"),
            (Rule::runtime("rt"), "runtime part"),
        ]);
        let result = run(ir, ScalarType::Float32);
        let text = &result.code.implementation;

        let static_pos = text.find("void tabulate_tensor_integral_x(").unwrap();
        let runtime_pos = text.find("void tabulate_tensor_runtime_integral_x(").unwrap();
        let struct_pos = text.find("ufcx_integral integral_x =").unwrap();
        assert!(static_pos < runtime_pos && runtime_pos < struct_pos);
        assert!(text.contains(".tabulate_tensor_float32 = tabulate_tensor_integral_x,"));
        assert!(text.contains(
            ".tabulate_tensor_runtime_float32 = tabulate_tensor_runtime_integral_x,"
        ));
        // Static kernel must not contain the runtime rule's body.
        let static_fn = &text[static_pos..runtime_pos];
        assert!(!static_fn.contains("runtime part"));
    }

    #[test]
    fn runtime_only_complex_drops_everything() {
        let ir = ir(vec![(Rule::runtime("rt"), "runtime part")]);
        let result = run(ir, ScalarType::Complex64);
        let text = &result.code.implementation;

        assert_eq!(result.diagnostics.len(), 1);
        assert!(!text.contains("void "));
        assert!(text.contains(".tabulate_tensor_runtime_float32 = NULL,"));
        assert!(text.contains(".tabulate_tensor_runtime_float64 = NULL,"));
        assert!(text.contains(".tabulate_tensor_complex64 = NULL,"));
    }

    #[test]
    fn multiple_runtime_rules_abort() {
        let ir = ir(vec![
            (Rule::runtime("a"), "a"),
            (Rule::runtime("b"), "b"),
        ]);
        let err = generate_integral(
            ir,
            &StubFactory,
            &StubFormatter,
            &CodegenOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "integral 'integral_x' has 2 runtime quadrature rules (a, b); at most one is allowed"
        );
    }

    #[test]
    fn complex_on_limited_target_degrades() {
        let options = CodegenOptions::new(ScalarType::Complex128).with_target(TargetCaps {
            complex_arithmetic: false,
        });
        let result = generate_integral(
            ir(vec![(Rule::fixed("q", vec![1.0]), "x")]),
            &StubFactory,
            &StubFormatter,
            &options,
        )
        .unwrap();
        let text = &result.code.implementation;

        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some(codes::W0102));
        assert!(!text.contains("void "));
        assert!(!text.contains(DispatchSlot::Complex128.field_name()));
        assert!(text.contains(".tabulate_tensor_float64 = NULL,"));
        assert!(text.contains("ufcx_integral integral_x =\n"));
    }

    #[test]
    fn runtime_only_complex_on_limited_target_warns_and_generates() {
        let options = CodegenOptions::new(ScalarType::Complex64).with_target(TargetCaps {
            complex_arithmetic: false,
        });
        let result = generate_integral(
            ir(vec![(Rule::runtime("rt"), "runtime part")]),
            &StubFactory,
            &StubFormatter,
            &options,
        )
        .unwrap();
        let text = &result.code.implementation;

        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some(codes::W0101));
        assert!(!text.contains("void "));
        assert!(text.contains(".tabulate_tensor_runtime_float32 = NULL,"));
        assert!(text.contains(".tabulate_tensor_runtime_float64 = NULL,"));
        assert!(!text.contains(DispatchSlot::Complex64.field_name()));
    }

    /// Generator that produces no code for the selected paths.
    struct EmptyFactory {
        empty_static: bool,
        empty_runtime: bool,
    }

    struct EmptyGenerator<'ir> {
        inner: StubGenerator<'ir>,
        empty_static: bool,
        empty_runtime: bool,
    }

    impl KernelBodyGenerator for EmptyGenerator<'_> {
        fn generate_static(&self) -> AbstractCode {
            if self.empty_static {
                AbstractCode::default()
            } else {
                self.inner.generate_static()
            }
        }

        fn generate_runtime(&self, rule: &Rule) -> AbstractCode {
            if self.empty_runtime {
                AbstractCode::default()
            } else {
                self.inner.generate_runtime(rule)
            }
        }
    }

    impl GeneratorFactory<&'static str> for EmptyFactory {
        fn bind<'ir>(
            &'ir self,
            ir: &'ir IntegralIr<&'static str>,
        ) -> Box<dyn KernelBodyGenerator + 'ir> {
            Box::new(EmptyGenerator {
                inner: StubGenerator { ir },
                empty_static: self.empty_static,
                empty_runtime: self.empty_runtime,
            })
        }
    }

    fn run_empty(empty_static: bool, empty_runtime: bool) -> CodegenResult {
        let ir = ir(vec![
            (Rule::fixed("q0", vec![1.0]), "static part"),
            (Rule::runtime("rt"), "runtime part"),
        ]);
        let factory = EmptyFactory {
            empty_static,
            empty_runtime,
        };
        generate_integral(
            ir,
            &factory,
            &StubFormatter,
            &CodegenOptions::new(ScalarType::Float64),
        )
        .unwrap()
    }

    #[test]
    fn empty_runtime_code_is_absent() {
        let result = run_empty(false, true);
        let text = &result.code.implementation;

        assert!(result.diagnostics.is_empty());
        assert!(!text.contains("tabulate_tensor_runtime_integral_x"));
        assert!(text.contains(".tabulate_tensor_runtime_float64 = NULL,"));
        // The runtime rule is gone from the static kernel too.
        assert!(text.contains("// static part [float64]\n"));
        assert!(!text.contains("runtime part"));
        assert!(text.contains(".tabulate_tensor_float64 = tabulate_tensor_integral_x,"));
    }

    #[test]
    fn empty_static_code_is_absent() {
        let result = run_empty(true, false);
        let text = &result.code.implementation;

        assert!(!text.contains("void tabulate_tensor_integral_x("));
        assert!(text.contains(".tabulate_tensor_float64 = NULL,"));
        assert!(text.contains(
            ".tabulate_tensor_runtime_float64 = tabulate_tensor_runtime_integral_x,"
        ));
    }

    #[test]
    fn all_code_empty_leaves_only_the_descriptor() {
        let result = run_empty(true, true);
        let text = &result.code.implementation;

        assert!(!text.contains("void "));
        for slot in DispatchSlot::ALL {
            assert!(text.contains(&format!(".{} = NULL,", slot.field_name())));
        }
    }

    #[test]
    fn limited_target_omits_complex_fields() {
        let options = CodegenOptions::new(ScalarType::Float64).with_target(TargetCaps {
            complex_arithmetic: false,
        });
        let result = generate_integral(
            ir(vec![(Rule::fixed("q", vec![1.0]), "x")]),
            &StubFactory,
            &StubFormatter,
            &options,
        )
        .unwrap();
        let text = &result.code.implementation;
        assert!(!text.contains(DispatchSlot::Complex64.field_name()));
        assert!(!text.contains(DispatchSlot::Complex128.field_name()));
        assert!(text.contains(DispatchSlot::RuntimeFloat64.field_name()));
    }

    #[test]
    fn invalid_name_is_rejected() {
        let mut ir = ir(vec![(Rule::fixed("q", vec![1.0]), "x")]);
        ir.name = "not valid".into();
        let err = generate_integral(
            ir,
            &StubFactory,
            &StubFormatter,
            &CodegenOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CodegenError::Ir(IrError::InvalidName(_))));
    }
}
