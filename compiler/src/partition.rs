// partition.rs — Split an integrand into its runtime and static parts
//
// An integral may carry at most one runtime-quadrature rule. That rule gets
// its own kernel; the remaining rules form the static kernel. The IR is
// consumed and handed back as a residual, static-only IR so that no
// generator bound to the full rule set survives the split.
//
// Preconditions: none.
// Postconditions: `KernelBodies::residual` contains no runtime rule.
// Failure modes: more than one runtime rule → `CodegenError::MultipleRuntimeRules`.
// Side effects: none.

use tracing::debug;

use crate::codegen::CodegenError;
use crate::ir::{IntegralIr, Rule};
use crate::kernel::{AbstractCode, GeneratorFactory};

/// Abstract bodies of the two kernels of one integral.
#[derive(Debug)]
pub struct KernelBodies<E> {
    /// Runtime rule and its body, if the integral had one with non-empty code.
    pub runtime: Option<(Rule, AbstractCode)>,
    /// Static body; `None` when no static rules remain or they produced no code.
    pub static_body: Option<AbstractCode>,
    /// The IR with the runtime rule removed.
    pub residual: IntegralIr<E>,
}

/// Runtime rules of `ir`, failing if there is more than one.
pub fn find_runtime_rule<E>(ir: &IntegralIr<E>) -> Result<Option<&Rule>, CodegenError> {
    let runtime: Vec<&Rule> = ir.integrand.runtime_rules().collect();
    match runtime.as_slice() {
        [] => Ok(None),
        [rule] => Ok(Some(rule)),
        _ => Err(CodegenError::MultipleRuntimeRules {
            integral: ir.name.clone(),
            rules: runtime.iter().map(|r| r.name.clone()).collect(),
        }),
    }
}

/// Generate the runtime body (if any), strip the runtime rule, then generate
/// the static body from a generator bound to the residual IR.
pub fn partition<E, F>(mut ir: IntegralIr<E>, factory: &F) -> Result<KernelBodies<E>, CodegenError>
where
    F: GeneratorFactory<E> + ?Sized,
{
    let generated = match find_runtime_rule(&ir)? {
        Some(rule) => {
            let code = factory.bind(&ir).generate_runtime(rule);
            Some((rule.name.clone(), code))
        }
        None => None,
    };

    let runtime = match generated {
        Some((name, code)) => {
            debug!(
                integral = %ir.name,
                rule = %name,
                statements = code.statements.len(),
                "runtime rule split off"
            );
            ir.integrand
                .remove(&name)
                .map(|entry| (entry.rule, code))
                .filter(|(_, code)| !code.is_empty())
        }
        None => None,
    };

    let static_body = if ir.integrand.is_empty() {
        debug!(integral = %ir.name, "no static rules, runtime-only integral");
        None
    } else {
        let generator = factory.bind(&ir);
        Some(generator.generate_static()).filter(|code| !code.is_empty())
    };

    Ok(KernelBodies {
        runtime,
        static_body,
        residual: ir,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
