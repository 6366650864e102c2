// options.rs — Compilation options for integral code generation
//
// Selects the scalar type of the translation unit and describes what the
// target C toolchain can compile. Both are plain data so that new targets
// need no code change.
//
// Preconditions: none.
// Postconditions: `CodegenOptions::is_supported` accepts only combinations the
//                 target can compile.
// Failure modes: unknown scalar type names fail to parse.
// Side effects: none.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Scalar type ─────────────────────────────────────────────────────────────

/// Scalar type of the generated kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl ScalarType {
    pub const ALL: [ScalarType; 4] = [
        ScalarType::Float32,
        ScalarType::Float64,
        ScalarType::Complex64,
        ScalarType::Complex128,
    ];

    /// Canonical lowercase name (`float64`, `complex128`, ...).
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Complex64 => "complex64",
            ScalarType::Complex128 => "complex128",
        }
    }

    /// C spelling of the scalar type.
    pub fn c_type(self) -> &'static str {
        match self {
            ScalarType::Float32 => "float",
            ScalarType::Float64 => "double",
            ScalarType::Complex64 => "float _Complex",
            ScalarType::Complex128 => "double _Complex",
        }
    }

    /// The real type used for geometry (coordinates, points, weights).
    pub fn geometry_type(self) -> ScalarType {
        match self {
            ScalarType::Float32 | ScalarType::Complex64 => ScalarType::Float32,
            ScalarType::Float64 | ScalarType::Complex128 => ScalarType::Float64,
        }
    }

    /// C spelling of the geometry type.
    pub fn geometry_c_type(self) -> &'static str {
        self.geometry_type().c_type()
    }

    pub fn is_complex(self) -> bool {
        matches!(self, ScalarType::Complex64 | ScalarType::Complex128)
    }

    /// Single-precision family (`float32`, `complex64`).
    pub fn is_single_precision(self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Complex64)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalarType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                format!(
                    "unknown scalar type '{}' (expected float32, float64, complex64, complex128)",
                    s
                )
            })
    }
}

// ── Target capabilities ─────────────────────────────────────────────────────

/// What the C toolchain that compiles the output supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetCaps {
    /// C99 `_Complex` arithmetic. Without it the descriptor struct is compiled
    /// without the complex dispatch fields.
    pub complex_arithmetic: bool,
}

impl Default for TargetCaps {
    fn default() -> Self {
        TargetCaps {
            complex_arithmetic: true,
        }
    }
}

// ── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    pub scalar_type: ScalarType,
    pub target: TargetCaps,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            scalar_type: ScalarType::Float64,
            target: TargetCaps::default(),
        }
    }
}

impl CodegenOptions {
    pub fn new(scalar_type: ScalarType) -> Self {
        CodegenOptions {
            scalar_type,
            ..CodegenOptions::default()
        }
    }

    pub fn with_target(mut self, target: TargetCaps) -> Self {
        self.target = target;
        self
    }

    /// True if the chosen scalar type can be compiled on the target.
    pub fn is_supported(&self) -> bool {
        !self.scalar_type.is_complex() || self.target.complex_arithmetic
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
