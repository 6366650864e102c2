// dispatch.rs — Per-precision dispatch fields of the integral descriptor
//
// The descriptor carries one function pointer per scalar type for the static
// kernel and one per real type for the runtime kernel. Exactly the slot
// matching the compilation scalar type is populated; the rest are NULL, or
// omitted when the target compiles the struct without complex fields.
//
// Preconditions: none.
// Postconditions: at most one static and one runtime slot hold a function.
// Failure modes: none; a runtime kernel in complex precision, or a complex
//                kernel on a target without complex fields, degrades to a warning.
// Side effects: none.

use tracing::warn;

use crate::diag::{codes, Diagnostic};
use crate::options::{CodegenOptions, ScalarType};
use crate::template::KernelKind;

// ── Slots ───────────────────────────────────────────────────────────────────

/// The six function-pointer fields of `ufcx_integral`, in ABI order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchSlot {
    Float32,
    Float64,
    Complex64,
    Complex128,
    RuntimeFloat32,
    RuntimeFloat64,
}

impl DispatchSlot {
    pub const ALL: [DispatchSlot; 6] = [
        DispatchSlot::Float32,
        DispatchSlot::Float64,
        DispatchSlot::Complex64,
        DispatchSlot::Complex128,
        DispatchSlot::RuntimeFloat32,
        DispatchSlot::RuntimeFloat64,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            DispatchSlot::Float32 => "tabulate_tensor_float32",
            DispatchSlot::Float64 => "tabulate_tensor_float64",
            DispatchSlot::Complex64 => "tabulate_tensor_complex64",
            DispatchSlot::Complex128 => "tabulate_tensor_complex128",
            DispatchSlot::RuntimeFloat32 => "tabulate_tensor_runtime_float32",
            DispatchSlot::RuntimeFloat64 => "tabulate_tensor_runtime_float64",
        }
    }

    /// Present in the struct only on targets with complex arithmetic.
    pub fn is_complex(self) -> bool {
        matches!(self, DispatchSlot::Complex64 | DispatchSlot::Complex128)
    }

    /// Static kernel slot for a scalar type.
    pub fn for_static(scalar_type: ScalarType) -> DispatchSlot {
        match scalar_type {
            ScalarType::Float32 => DispatchSlot::Float32,
            ScalarType::Float64 => DispatchSlot::Float64,
            ScalarType::Complex64 => DispatchSlot::Complex64,
            ScalarType::Complex128 => DispatchSlot::Complex128,
        }
    }

    /// Runtime kernel slot for a scalar type; runtime kernels are real-only.
    pub fn for_runtime(scalar_type: ScalarType) -> Option<DispatchSlot> {
        match scalar_type {
            ScalarType::Float32 => Some(DispatchSlot::RuntimeFloat32),
            ScalarType::Float64 => Some(DispatchSlot::RuntimeFloat64),
            ScalarType::Complex64 | ScalarType::Complex128 => None,
        }
    }
}

/// Initializer of one dispatch field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotInit {
    Null,
    Function(String),
    /// Field does not exist on this target.
    Omitted,
}

// ── Dispatch table ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    slots: Vec<(DispatchSlot, SlotInit)>,
}

impl DispatchTable {
    pub fn get(&self, slot: DispatchSlot) -> &SlotInit {
        self.slots
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, init)| init)
            .unwrap_or(&SlotInit::Null)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DispatchSlot, &SlotInit)> {
        self.slots.iter().map(|(s, init)| (*s, init))
    }

    /// True if `kind`'s kernel is referenced by some slot.
    pub fn is_live(&self, kind: KernelKind) -> bool {
        self.slots.iter().any(|(slot, init)| {
            matches!(init, SlotInit::Function(_)) && slot_kind(*slot) == kind
        })
    }

    /// Designated initializer line for `slot`, e.g.
    /// `.tabulate_tensor_float64 = tabulate_tensor_foo,`; empty if omitted.
    pub fn initializer(&self, slot: DispatchSlot) -> String {
        match self.get(slot) {
            SlotInit::Null => format!(".{} = NULL,", slot.field_name()),
            SlotInit::Function(symbol) => format!(".{} = {},", slot.field_name(), symbol),
            SlotInit::Omitted => String::new(),
        }
    }
}

fn slot_kind(slot: DispatchSlot) -> KernelKind {
    match slot {
        DispatchSlot::RuntimeFloat32 | DispatchSlot::RuntimeFloat64 => KernelKind::Runtime,
        _ => KernelKind::Static,
    }
}

/// Build the dispatch table for an integral.
///
/// `has_static`/`has_runtime` say whether the corresponding kernel body was
/// produced. Returns the table plus any degradation diagnostics.
pub fn build_dispatch(
    integral: &str,
    options: &CodegenOptions,
    has_static: bool,
    has_runtime: bool,
) -> (DispatchTable, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let scalar_type = options.scalar_type;

    let static_slot = has_static.then(|| DispatchSlot::for_static(scalar_type));
    if has_static && !options.is_supported() {
        warn!(
            integral,
            scalar_type = %scalar_type,
            "target has no complex arithmetic, static kernel dropped"
        );
        diagnostics.push(
            Diagnostic::warning(format!(
                "the target does not support complex arithmetic, so scalar type {} \
                 has no dispatch field; the static part of this integral is dropped",
                scalar_type
            ))
            .with_code(codes::W0102)
            .for_integral(integral)
            .with_hint("enable complex arithmetic on the target or compile with a real scalar type"),
        );
    }
    let runtime_slot = if has_runtime {
        let slot = DispatchSlot::for_runtime(scalar_type);
        if slot.is_none() {
            warn!(
                integral,
                scalar_type = %scalar_type,
                "runtime kernels are not supported in complex precision"
            );
            diagnostics.push(
                Diagnostic::warning(format!(
                    "runtime-quadrature kernels are not supported for scalar type {}; \
                     the runtime part of this integral is dropped",
                    scalar_type
                ))
                .with_code(codes::W0101)
                .for_integral(integral)
                .with_hint("compile this form with float32 or float64"),
            );
        }
        slot
    } else {
        None
    };

    let slots = DispatchSlot::ALL
        .into_iter()
        .map(|slot| {
            let init = if slot.is_complex() && !options.target.complex_arithmetic {
                SlotInit::Omitted
            } else if Some(slot) == static_slot {
                SlotInit::Function(KernelKind::Static.symbol(integral))
            } else if Some(slot) == runtime_slot {
                SlotInit::Function(KernelKind::Runtime.symbol(integral))
            } else {
                SlotInit::Null
            };
            (slot, init)
        })
        .collect();

    (DispatchTable { slots }, diagnostics)
}

// ── Tests ───────────────────────────────────────────────────────────────────
