// metadata.rs — Fixed-size metadata arrays referenced by the descriptor
//
// Renders the enabled-coefficient flags, finite-element hashes and
// finite-element derivative orders as C array definitions named after the
// integral. Empty sequences produce no definition and a NULL field.
//
// Preconditions: none.
// Postconditions: `num_fe` equals the number of finite-element hashes.
// Failure modes: hash and derivative-order lists of different length.
// Side effects: none.

use crate::codegen::CodegenError;
use crate::ir::IntegralIr;

/// A C array definition, e.g. `int finite_element_deriv_order_a[2] = {0, 1};`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CArray {
    pub elem_type: &'static str,
    pub name: String,
    pub values: Vec<String>,
}

impl CArray {
    pub fn definition(&self) -> String {
        format!(
            "{} {}[{}] = {{{}}};",
            self.elem_type,
            self.name,
            self.values.len(),
            self.values.join(", ")
        )
    }
}

/// How a descriptor pointer field is initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayBinding {
    Null,
    Array(CArray),
}

impl ArrayBinding {
    fn from_values(elem_type: &'static str, name: String, values: Vec<String>) -> Self {
        if values.is_empty() {
            ArrayBinding::Null
        } else {
            ArrayBinding::Array(CArray {
                elem_type,
                name,
                values,
            })
        }
    }

    /// Right-hand side of the struct field: the array symbol or `NULL`.
    pub fn pointer(&self) -> &str {
        match self {
            ArrayBinding::Null => "NULL",
            ArrayBinding::Array(array) => &array.name,
        }
    }

    pub fn definition(&self) -> Option<String> {
        match self {
            ArrayBinding::Null => None,
            ArrayBinding::Array(array) => Some(array.definition()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTables {
    pub enabled_coefficients: ArrayBinding,
    pub finite_element_hashes: ArrayBinding,
    pub finite_element_deriv_order: ArrayBinding,
    pub num_fe: usize,
}

impl MetadataTables {
    /// Array definitions in emission order.
    pub fn definitions(&self) -> Vec<String> {
        [
            &self.enabled_coefficients,
            &self.finite_element_hashes,
            &self.finite_element_deriv_order,
        ]
        .into_iter()
        .filter_map(ArrayBinding::definition)
        .collect()
    }
}

/// `UINT64_C(h)` literal; absent hashes render as 0.
pub fn uint64_literal(value: Option<u64>) -> String {
    format!("UINT64_C({})", value.unwrap_or(0))
}

pub fn build_metadata<E>(ir: &IntegralIr<E>) -> Result<MetadataTables, CodegenError> {
    let num_fe = ir.finite_element_hashes.len();
    if num_fe != ir.finite_element_deriv_order.len() {
        return Err(CodegenError::ElementTableMismatch {
            integral: ir.name.clone(),
            hashes: num_fe,
            deriv_orders: ir.finite_element_deriv_order.len(),
        });
    }

    let name = &ir.name;
    let enabled_coefficients = ArrayBinding::from_values(
        "bool",
        format!("enabled_coefficients_{}", name),
        ir.enabled_coefficients
            .iter()
            .map(|&on| if on { "1" } else { "0" }.to_string())
            .collect(),
    );
    let finite_element_hashes = ArrayBinding::from_values(
        "uint64_t",
        format!("finite_element_hashes_{}", name),
        ir.finite_element_hashes
            .iter()
            .map(|&h| uint64_literal(h))
            .collect(),
    );
    let finite_element_deriv_order = ArrayBinding::from_values(
        "int",
        format!("finite_element_deriv_order_{}", name),
        ir.finite_element_deriv_order
            .iter()
            .map(|d| d.to_string())
            .collect(),
    );

    Ok(MetadataTables {
        enabled_coefficients,
        finite_element_hashes,
        finite_element_deriv_order,
        num_fe,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Integrand, IntegralType};

    fn ir() -> IntegralIr<()> {
        IntegralIr::new("integral_m", IntegralType::Cell, Integrand::new())
    }

    #[test]
    fn coefficient_flags_render_as_ints() {
        let mut ir = ir();
        ir.enabled_coefficients = vec![true, false, true];
        let tables = build_metadata(&ir).unwrap();
        assert_eq!(
            tables.enabled_coefficients.definition().unwrap(),
            "bool enabled_coefficients_integral_m[3] = {1, 0, 1};"
        );
        assert_eq!(tables.enabled_coefficients.pointer(), "enabled_coefficients_integral_m");
        assert_eq!(tables.finite_element_hashes.pointer(), "NULL");
        assert_eq!(tables.finite_element_deriv_order.pointer(), "NULL");
        assert_eq!(tables.num_fe, 0);
        assert_eq!(tables.definitions().len(), 1);
    }

    #[test]
    fn absent_hash_renders_zero() {
        let mut ir = ir();
        ir.finite_element_hashes = vec![Some(17), None, Some(u64::MAX)];
        ir.finite_element_deriv_order = vec![0, 1, 2];
        let tables = build_metadata(&ir).unwrap();
        assert_eq!(tables.num_fe, 3);
        assert_eq!(
            tables.definitions(),
            vec![
                "uint64_t finite_element_hashes_integral_m[3] = \
                 {UINT64_C(17), UINT64_C(0), UINT64_C(18446744073709551615)};"
                    .to_string(),
                "int finite_element_deriv_order_integral_m[3] = {0, 1, 2};".to_string(),
            ]
        );
    }

    #[test]
    fn empty_everything_is_null() {
        let tables = build_metadata(&ir()).unwrap();
        assert_eq!(tables.enabled_coefficients, ArrayBinding::Null);
        assert!(tables.definitions().is_empty());
    }

    #[test]
    fn mismatched_element_tables_fail() {
        let mut ir = ir();
        ir.finite_element_hashes = vec![Some(1)];
        let err = build_metadata(&ir).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::ElementTableMismatch {
                hashes: 1,
                deriv_orders: 0,
                ..
            }
        ));
    }
}
