// cformat.rs — Reference C formatter for abstract kernel code
//
// Renders `AbstractCode` as the body of a C kernel function for one scalar
// type. Statements are indented one level (two spaces) relative to the
// enclosing function braces.
//
// Preconditions: `code` is non-empty (guaranteed by `codegen`).
// Postconditions: output is a pure function of (code, scalar type); every
//                 line ends with '\n'.
// Failure modes: none.
// Side effects: none.

use std::fmt::Write as _;

use crate::kernel::{AbstractCode, AssignOp, CodeFormatter, Expr, MathFn, Stmt, ValueType};
use crate::options::ScalarType;

const INDENT: &str = "  ";

// Precedence of atoms (literals, symbols, indexing, calls) and unary minus.
// Binary operators use `BinOp::precedence`.
const ATOM_PREC: u8 = 4;
const UNARY_PREC: u8 = 3;

/// C99 formatter used by the command-line driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct CFormatter;

impl CodeFormatter for CFormatter {
    fn format(&self, code: &AbstractCode, scalar_type: ScalarType) -> String {
        let mut emitter = Emitter {
            out: String::with_capacity(256 * code.statements.len().max(1)),
            scalar_type,
        };
        emitter.emit_block(&code.statements, INDENT);
        emitter.out
    }
}

struct Emitter {
    out: String,
    scalar_type: ScalarType,
}

impl Emitter {
    fn emit_block(&mut self, statements: &[Stmt], indent: &str) {
        for stmt in statements {
            self.emit_stmt(stmt, indent);
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt, indent: &str) {
        match stmt {
            Stmt::Comment(text) => {
                let _ = writeln!(self.out, "{}// {}", indent, text);
            }
            Stmt::ArrayDecl {
                ty,
                name,
                shape,
                values,
            } => {
                let dims: String = shape.iter().map(|d| format!("[{}]", d)).collect();
                let init = self.array_init(*ty, shape, values);
                let _ = writeln!(
                    self.out,
                    "{}static const {} {}{} = {};",
                    indent,
                    self.c_type(*ty),
                    name,
                    dims,
                    init
                );
            }
            Stmt::VarDecl { ty, name, value } => {
                let value = self.expr(value, 0);
                let _ = writeln!(self.out, "{}{} {} = {};", indent, self.c_type(*ty), name, value);
            }
            Stmt::Assign { target, op, value } => {
                let op = match op {
                    AssignOp::Set => "=",
                    AssignOp::Add => "+=",
                };
                let target = self.expr(target, 0);
                let value = self.expr(value, 0);
                let _ = writeln!(self.out, "{}{} {} {};", indent, target, op, value);
            }
            Stmt::For {
                index,
                begin,
                end,
                body,
            } => {
                let begin = self.expr(begin, 0);
                let end = self.expr(end, 0);
                let _ = writeln!(
                    self.out,
                    "{}for (int {i} = {}; {i} < {}; ++{i})",
                    indent,
                    begin,
                    end,
                    i = index
                );
                let _ = writeln!(self.out, "{}{{", indent);
                self.emit_block(body, &format!("{}{}", indent, INDENT));
                let _ = writeln!(self.out, "{}}}", indent);
            }
        }
    }

    fn c_type(&self, ty: ValueType) -> &'static str {
        match ty {
            ValueType::Scalar => self.scalar_type.c_type(),
            ValueType::Real => self.scalar_type.geometry_c_type(),
            ValueType::Int => "int",
        }
    }

    /// Nested brace initializer following `shape` (row-major `values`).
    fn array_init(&self, ty: ValueType, shape: &[usize], values: &[f64]) -> String {
        let element = |v: f64| match ty {
            ValueType::Int => format!("{}", v as i64),
            ValueType::Scalar | ValueType::Real => self.float_literal(v),
        };
        match shape {
            [] => values.first().map(|v| element(*v)).unwrap_or_else(|| "0".into()),
            [_] => {
                let items: Vec<String> = values.iter().map(|v| element(*v)).collect();
                format!("{{{}}}", items.join(", "))
            }
            [_, rest @ ..] => {
                let stride = rest.iter().product::<usize>().max(1);
                let rows: Vec<String> = values
                    .chunks(stride)
                    .map(|row| self.array_init(ty, rest, row))
                    .collect();
                format!("{{{}}}", rows.join(", "))
            }
        }
    }

    fn float_literal(&self, v: f64) -> String {
        if v.is_nan() {
            return "NAN".into();
        }
        if v.is_infinite() {
            return if v > 0.0 { "INFINITY" } else { "-INFINITY" }.into();
        }
        // `{:?}` always keeps a decimal point or exponent.
        let mut s = format!("{:?}", v);
        if self.scalar_type.is_single_precision() {
            s.push('f');
        }
        s
    }

    /// Render `e`, parenthesized when it binds looser than `min_prec`.
    fn expr(&self, e: &Expr, min_prec: u8) -> String {
        let (text, prec) = match e {
            Expr::Int(n) => (n.to_string(), if *n < 0 { UNARY_PREC } else { ATOM_PREC }),
            Expr::Float(v) => (
                self.float_literal(*v),
                if v.is_sign_negative() { UNARY_PREC } else { ATOM_PREC },
            ),
            Expr::Symbol(name) => (name.clone(), ATOM_PREC),
            Expr::Index { array, index } => (
                format!("{}[{}]", self.expr(array, ATOM_PREC), self.expr(index, 0)),
                ATOM_PREC,
            ),
            Expr::Neg(operand) => {
                let inner = self.expr(operand, UNARY_PREC);
                // Avoid emitting `--x`.
                let inner = if inner.starts_with('-') {
                    format!("({})", inner)
                } else {
                    inner
                };
                (format!("-{}", inner), UNARY_PREC)
            }
            Expr::Binary { op, lhs, rhs } => {
                let p = op.precedence();
                (
                    format!(
                        "{} {} {}",
                        self.expr(lhs, p),
                        op.symbol(),
                        self.expr(rhs, p + 1)
                    ),
                    p,
                )
            }
            Expr::Call { func, args } => self.call(*func, args),
        };
        if prec < min_prec {
            format!("({})", text)
        } else {
            text
        }
    }

    fn call(&self, func: MathFn, args: &[Expr]) -> (String, u8) {
        let complex = self.scalar_type.is_complex();
        match func {
            MathFn::Conj | MathFn::Real if !complex => {
                let arg = args
                    .first()
                    .map(|a| self.expr(a, ATOM_PREC))
                    .unwrap_or_default();
                return (arg, ATOM_PREC);
            }
            MathFn::Imag if !complex => return (self.float_literal(0.0), ATOM_PREC),
            _ => {}
        }
        let args: Vec<String> = args.iter().map(|a| self.expr(a, 0)).collect();
        (
            format!("{}({})", math_fn_name(func, self.scalar_type), args.join(", ")),
            ATOM_PREC,
        )
    }
}

/// C library name of `func` for `scalar_type` (`<math.h>` / `<complex.h>`).
pub fn math_fn_name(func: MathFn, scalar_type: ScalarType) -> String {
    let (real, complex) = match func {
        MathFn::Sqrt => ("sqrt", "csqrt"),
        MathFn::Abs => ("fabs", "cabs"),
        MathFn::Exp => ("exp", "cexp"),
        MathFn::Log => ("log", "clog"),
        MathFn::Sin => ("sin", "csin"),
        MathFn::Cos => ("cos", "ccos"),
        MathFn::Pow => ("pow", "cpow"),
        MathFn::Conj => ("conj", "conj"),
        MathFn::Real => ("real", "creal"),
        MathFn::Imag => ("imag", "cimag"),
    };
    let base = if scalar_type.is_complex() { complex } else { real };
    if scalar_type.is_single_precision() {
        format!("{}f", base)
    } else {
        base.to_string()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
