// lowered.rs — Reference kernel body generator
//
// `LoweredBlock` is the lowered form of one quadrature rule's integrand:
// precomputed basis tables plus the per-quadrature-point statements, parsed
// from the lowered-statement language at load time. `TabulationBackend`
// turns blocks into abstract tabulation loops.
//
// Preconditions: blocks were parsed successfully (enforced on construction).
// Postconditions: generated code is a pure function of the bound IR.
// Failure modes: malformed statement text or table shapes → `IrError::Lowering`.
// Side effects: none.

use serde::{Deserialize, Serialize};

use crate::ir::{IntegralIr, IrError, Rule};
use crate::kernel::{
    AbstractCode, Expr, GeneratorFactory, KernelBodyGenerator, Stmt, ValueType,
};

/// Quadrature loop index visible to lowered statements.
pub const QUADRATURE_INDEX: &str = "iq";

// ── Lowered block ───────────────────────────────────────────────────────────

/// A precomputed table emitted as `static const` data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLoweredBlock {
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    body: String,
}

/// Lowered integrand of one quadrature rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawLoweredBlock")]
pub struct LoweredBlock {
    pub tables: Vec<Table>,
    pub statements: Vec<Stmt>,
}

impl LoweredBlock {
    /// Parse `body` and check table shapes.
    pub fn new(tables: Vec<Table>, body: &str) -> Result<Self, IrError> {
        for table in &tables {
            let expected: usize = table.shape.iter().product();
            if table.shape.is_empty() || expected != table.values.len() {
                return Err(IrError::Lowering(format!(
                    "table '{}' has shape {:?} but {} values",
                    table.name,
                    table.shape,
                    table.values.len()
                )));
            }
        }
        let statements = crate::parser::parse_statements(body).map_err(IrError::Lowering)?;
        Ok(LoweredBlock { tables, statements })
    }

    pub fn from_source(body: &str) -> Result<Self, IrError> {
        Self::new(Vec::new(), body)
    }
}

impl TryFrom<RawLoweredBlock> for LoweredBlock {
    type Error = IrError;

    fn try_from(raw: RawLoweredBlock) -> Result<Self, Self::Error> {
        LoweredBlock::new(raw.tables, &raw.body)
    }
}

// ── Generator ───────────────────────────────────────────────────────────────

/// Factory for tabulation generators over `LoweredBlock` integrands.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabulationBackend;

impl GeneratorFactory<LoweredBlock> for TabulationBackend {
    fn bind<'ir>(&'ir self, ir: &'ir IntegralIr<LoweredBlock>) -> Box<dyn KernelBodyGenerator + 'ir> {
        Box::new(TabulationGenerator::new(ir))
    }
}

/// Generator bound to one IR snapshot.
///
/// The rule set is captured at bind time; a generator must be re-bound
/// after the integrand changes.
pub struct TabulationGenerator<'ir> {
    static_rules: Vec<(&'ir Rule, &'ir LoweredBlock)>,
    blocks: Vec<(&'ir str, &'ir LoweredBlock)>,
}

impl<'ir> TabulationGenerator<'ir> {
    pub fn new(ir: &'ir IntegralIr<LoweredBlock>) -> Self {
        TabulationGenerator {
            static_rules: ir.integrand.iter().filter(|(r, _)| !r.is_runtime).collect(),
            blocks: ir
                .integrand
                .iter()
                .map(|(r, b)| (r.name.as_str(), b))
                .collect(),
        }
    }

    fn block(&self, rule: &str) -> Option<&'ir LoweredBlock> {
        self.blocks
            .iter()
            .find(|(name, _)| *name == rule)
            .map(|(_, block)| *block)
    }
}

fn table_decls(block: &LoweredBlock, out: &mut AbstractCode) {
    for table in &block.tables {
        out.push(Stmt::ArrayDecl {
            ty: ValueType::Real,
            name: table.name.clone(),
            shape: table.shape.clone(),
            values: table.values.clone(),
        });
    }
}

fn quadrature_loop(end: Expr, body: &[Stmt]) -> Stmt {
    Stmt::For {
        index: QUADRATURE_INDEX.to_string(),
        begin: Expr::Int(0),
        end,
        body: body.to_vec(),
    }
}

impl KernelBodyGenerator for TabulationGenerator<'_> {
    fn generate_static(&self) -> AbstractCode {
        let mut code = AbstractCode::default();
        for (rule, block) in &self.static_rules {
            if block.statements.is_empty() {
                continue;
            }
            code.push(Stmt::Comment(format!("Quadrature rule {}", rule.name)));
            code.push(Stmt::ArrayDecl {
                ty: ValueType::Real,
                name: format!("weights_{}", rule.name),
                shape: vec![rule.num_points()],
                values: rule.weights.clone(),
            });
            table_decls(block, &mut code);
            code.push(quadrature_loop(
                Expr::Int(rule.num_points() as i64),
                &block.statements,
            ));
        }
        code
    }

    fn generate_runtime(&self, rule: &Rule) -> AbstractCode {
        let mut code = AbstractCode::default();
        let Some(block) = self.block(&rule.name) else {
            return code;
        };
        if block.statements.is_empty() {
            return code;
        }
        code.push(Stmt::Comment(format!(
            "Runtime quadrature rule {}",
            rule.name
        )));
        table_decls(block, &mut code);
        code.push(quadrature_loop(
            Expr::index(Expr::symbol("num_points"), Expr::Int(0)),
            &block.statements,
        ));
        code
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
