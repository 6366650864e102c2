// kernel.rs — Abstract kernel code and the generator/formatter seams
//
// A kernel body generator lowers one integral's integrand into abstract
// statements; a code formatter renders those statements as C text for one
// scalar type. Both are collaborators of `codegen`, which only orchestrates.
//
// Preconditions: none (types and traits only).
// Postconditions: none.
// Failure modes: none.
// Side effects: none.

use crate::ir::{IntegralIr, Rule};
use crate::options::ScalarType;

// ── Abstract code ───────────────────────────────────────────────────────────

/// Ordered abstract statements making up one kernel body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbstractCode {
    pub statements: Vec<Stmt>,
}

impl AbstractCode {
    pub fn new(statements: Vec<Stmt>) -> Self {
        AbstractCode { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.statements.push(stmt);
    }
}

/// Type of a declared value, resolved to a C type by the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// The kernel scalar type.
    Scalar,
    /// The real geometry type.
    Real,
    Int,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Comment(String),
    /// `static const T name[d0][d1]... = {...};` with row-major `values`.
    ArrayDecl {
        ty: ValueType,
        name: String,
        shape: Vec<usize>,
        values: Vec<f64>,
    },
    VarDecl {
        ty: ValueType,
        name: String,
        value: Expr,
    },
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    /// `for (int index = begin; index < end; ++index) { body }`
    For {
        index: String,
        begin: Expr,
        end: Expr,
        body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
        }
    }
}

/// Math functions whose C spelling depends on the scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Sqrt,
    Abs,
    Exp,
    Log,
    Sin,
    Cos,
    Pow,
    Conj,
    Real,
    Imag,
}

impl MathFn {
    pub fn from_name(name: &str) -> Option<MathFn> {
        Some(match name {
            "sqrt" => MathFn::Sqrt,
            "abs" => MathFn::Abs,
            "exp" => MathFn::Exp,
            "log" => MathFn::Log,
            "sin" => MathFn::Sin,
            "cos" => MathFn::Cos,
            "pow" => MathFn::Pow,
            "conj" => MathFn::Conj,
            "real" => MathFn::Real,
            "imag" => MathFn::Imag,
            _ => return None,
        })
    }

    pub fn arity(self) -> usize {
        match self {
            MathFn::Pow => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Symbol(String),
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: MathFn,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn symbol(name: impl Into<String>) -> Expr {
        Expr::Symbol(name.into())
    }

    pub fn index(array: Expr, index: Expr) -> Expr {
        Expr::Index {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Valid as the left-hand side of an assignment.
    pub fn is_place(&self) -> bool {
        match self {
            Expr::Symbol(_) => true,
            Expr::Index { array, .. } => array.is_place(),
            _ => false,
        }
    }
}

// ── Collaborator traits ─────────────────────────────────────────────────────

/// Lowers an integrand into abstract kernel statements.
///
/// An instance is bound to one IR snapshot and must not outlive changes to
/// that IR's integrand.
pub trait KernelBodyGenerator {
    /// Body of the static tabulation kernel, covering every non-runtime rule.
    fn generate_static(&self) -> AbstractCode;

    /// Body of the runtime-quadrature kernel for `rule`.
    fn generate_runtime(&self, rule: &Rule) -> AbstractCode;
}

/// Creates kernel body generators bound to a given IR.
///
/// Backend state shared between bindings lives in the factory.
pub trait GeneratorFactory<E> {
    fn bind<'ir>(&'ir self, ir: &'ir IntegralIr<E>) -> Box<dyn KernelBodyGenerator + 'ir>;
}

/// Renders abstract statements as C text.
pub trait CodeFormatter {
    /// Same inputs always produce the same text. Never called with empty code.
    fn format(&self, code: &AbstractCode, scalar_type: ScalarType) -> String;
}
