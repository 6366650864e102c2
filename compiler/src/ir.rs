// ir.rs — Per-integral intermediate representation
//
// `IntegralIr` is produced upstream from a symbolic form and consumed by
// exactly one `codegen::generate_integral` call. The lowered expression type
// `E` is opaque here; only the kernel body generator interprets it.
//
// Preconditions: none.
// Postconditions: a constructed `Integrand` has unique, identifier-safe rule names.
// Failure modes: duplicate or malformed rule names, static rules without
//                weights, malformed integral names.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────────────

/// Malformed IR detected while building or loading it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("integral name '{0}' is not a valid C identifier")]
    InvalidName(String),
    #[error("quadrature rule name '{0}' may only contain ASCII letters, digits and '_'")]
    InvalidRuleName(String),
    #[error("quadrature rule '{0}' appears more than once in the integrand")]
    DuplicateRule(String),
    #[error("static quadrature rule '{0}' has no weights")]
    MissingWeights(String),
    #[error("invalid lowered code: {0}")]
    Lowering(String),
}

// ── Integral type ───────────────────────────────────────────────────────────

/// Domain an integral is evaluated over. Passed through, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegralType {
    Cell,
    ExteriorFacet,
    InteriorFacet,
    Vertex,
}

impl fmt::Display for IntegralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegralType::Cell => "cell",
            IntegralType::ExteriorFacet => "exterior_facet",
            IntegralType::InteriorFacet => "interior_facet",
            IntegralType::Vertex => "vertex",
        };
        f.write_str(s)
    }
}

// ── Quadrature rule ─────────────────────────────────────────────────────────

/// A quadrature rule keying one part of the integrand.
///
/// Runtime rules receive their points and weights through the runtime kernel
/// arguments; `weights` is only meaningful for static rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub is_runtime: bool,
    #[serde(default)]
    pub weights: Vec<f64>,
}

impl Rule {
    pub fn fixed(name: impl Into<String>, weights: Vec<f64>) -> Self {
        Rule {
            name: name.into(),
            is_runtime: false,
            weights,
        }
    }

    pub fn runtime(name: impl Into<String>) -> Self {
        Rule {
            name: name.into(),
            is_runtime: true,
            weights: Vec::new(),
        }
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }
}

// ── Integrand ───────────────────────────────────────────────────────────────

/// One `(rule, lowered expression)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrandEntry<E> {
    pub rule: Rule,
    pub body: E,
}

/// Mapping from quadrature rule to lowered expression.
///
/// Keys are unique by rule name; iteration follows insertion order so that
/// generated text is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<IntegrandEntry<E>>", into = "Vec<IntegrandEntry<E>>")]
#[serde(bound(
    serialize = "E: Serialize + Clone",
    deserialize = "E: Deserialize<'de>"
))]
pub struct Integrand<E> {
    entries: Vec<IntegrandEntry<E>>,
}

impl<E> Default for Integrand<E> {
    fn default() -> Self {
        Integrand {
            entries: Vec::new(),
        }
    }
}

impl<E> Integrand<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Rejects duplicates, names unusable in C symbols and
    /// static rules without weights.
    pub fn insert(&mut self, rule: Rule, body: E) -> Result<(), IrError> {
        if rule.name.is_empty()
            || !rule
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(IrError::InvalidRuleName(rule.name));
        }
        if self.entries.iter().any(|e| e.rule.name == rule.name) {
            return Err(IrError::DuplicateRule(rule.name));
        }
        if !rule.is_runtime && rule.weights.is_empty() {
            return Err(IrError::MissingWeights(rule.name));
        }
        self.entries.push(IntegrandEntry { rule, body });
        Ok(())
    }

    pub fn with(mut self, rule: Rule, body: E) -> Result<Self, IrError> {
        self.insert(rule, body)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rule, &E)> {
        self.entries.iter().map(|e| (&e.rule, &e.body))
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.entries.iter().map(|e| &e.rule)
    }

    pub fn runtime_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules().filter(|r| r.is_runtime)
    }

    /// Remove and return the entry for `name`, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<IntegrandEntry<E>> {
        let pos = self.entries.iter().position(|e| e.rule.name == name)?;
        Some(self.entries.remove(pos))
    }
}

impl<E> TryFrom<Vec<IntegrandEntry<E>>> for Integrand<E> {
    type Error = IrError;

    fn try_from(entries: Vec<IntegrandEntry<E>>) -> Result<Self, Self::Error> {
        let mut integrand = Integrand::new();
        for entry in entries {
            integrand.insert(entry.rule, entry.body)?;
        }
        Ok(integrand)
    }
}

impl<E> From<Integrand<E>> for Vec<IntegrandEntry<E>> {
    fn from(integrand: Integrand<E>) -> Self {
        integrand.entries
    }
}

// ── Integral IR ─────────────────────────────────────────────────────────────

/// Everything needed to emit one integral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "E: Serialize + Clone",
    deserialize = "E: Deserialize<'de>"
))]
pub struct IntegralIr<E> {
    /// Unique identifier; every emitted symbol derives from it.
    pub name: String,
    pub integral_type: IntegralType,
    pub integrand: Integrand<E>,
    #[serde(default)]
    pub enabled_coefficients: Vec<bool>,
    /// `None` marks an element without a stable hash.
    #[serde(default)]
    pub finite_element_hashes: Vec<Option<u64>>,
    /// Same length and indexing as `finite_element_hashes`.
    #[serde(default)]
    pub finite_element_deriv_order: Vec<i32>,
    #[serde(default)]
    pub needs_facet_permutations: bool,
    #[serde(default)]
    pub coordinate_element_hash: Option<u64>,
}

impl<E> IntegralIr<E> {
    /// A cell integral with the given name and integrand and no metadata.
    pub fn new(name: impl Into<String>, integral_type: IntegralType, integrand: Integrand<E>) -> Self {
        IntegralIr {
            name: name.into(),
            integral_type,
            integrand,
            enabled_coefficients: Vec::new(),
            finite_element_hashes: Vec::new(),
            finite_element_deriv_order: Vec::new(),
            needs_facet_permutations: false,
            coordinate_element_hash: None,
        }
    }

    /// Check the integral name is usable as a C identifier.
    pub fn validate(&self) -> Result<(), IrError> {
        if is_c_identifier(&self.name) {
            Ok(())
        } else {
            Err(IrError::InvalidName(self.name.clone()))
        }
    }
}

fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_rejects_duplicates() {
        let mut integrand = Integrand::new();
        integrand.insert(Rule::fixed("q1", vec![1.0]), 1).unwrap();
        integrand.insert(Rule::runtime("rt"), 2).unwrap();
        integrand.insert(Rule::fixed("q0", vec![0.5, 0.5]), 3).unwrap();
        let names: Vec<&str> = integrand.rules().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["q1", "rt", "q0"]);

        let err = integrand.insert(Rule::fixed("q1", vec![1.0]), 4).unwrap_err();
        assert_eq!(err, IrError::DuplicateRule("q1".into()));
    }

    #[test]
    fn rule_names_must_be_identifier_safe() {
        let mut integrand = Integrand::new();
        let err = integrand.insert(Rule::fixed("q-1", vec![1.0]), ()).unwrap_err();
        assert_eq!(err, IrError::InvalidRuleName("q-1".into()));
        assert!(integrand.insert(Rule::fixed("", vec![1.0]), ()).is_err());
        assert!(integrand.insert(Rule::fixed("083", vec![1.0]), ()).is_ok());
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let integrand = Integrand::new()
            .with(Rule::fixed("a", vec![1.0]), 'a')
            .unwrap()
            .with(Rule::runtime("b"), 'b')
            .unwrap()
            .with(Rule::fixed("c", vec![1.0]), 'c')
            .unwrap();
        let mut integrand = integrand;
        let removed = integrand.remove("b").unwrap();
        assert_eq!(removed.body, 'b');
        assert!(removed.rule.is_runtime);
        let rest: Vec<char> = integrand.iter().map(|(_, b)| *b).collect();
        assert_eq!(rest, vec!['a', 'c']);
        assert!(integrand.remove("b").is_none());
    }

    #[test]
    fn static_rules_need_weights() {
        let mut integrand = Integrand::new();
        let err = integrand.insert(Rule::fixed("q", vec![]), ()).unwrap_err();
        assert_eq!(err, IrError::MissingWeights("q".into()));
        assert!(integrand.is_empty());
        assert!(integrand.insert(Rule::runtime("rt"), ()).is_ok());
    }

    #[test]
    fn deserialize_rejects_static_rule_without_weights() {
        let json = r#"{
            "name": "nw",
            "integral_type": "cell",
            "integrand": [{"rule": {"name": "q"}, "body": 1}]
        }"#;
        let err = serde_json::from_str::<IntegralIr<i32>>(json).unwrap_err();
        assert!(err.to_string().contains("static quadrature rule 'q' has no weights"), "{err}");
    }

    #[test]
    fn integral_names_are_checked() {
        let ok = IntegralIr::new("integral_a1", IntegralType::Cell, Integrand::<()>::new());
        assert!(ok.validate().is_ok());
        let bad = IntegralIr::new("1abc", IntegralType::Cell, Integrand::<()>::new());
        assert_eq!(bad.validate(), Err(IrError::InvalidName("1abc".into())));
    }

    #[test]
    fn deserialize_rejects_duplicate_rules() {
        let json = r#"{
            "name": "a",
            "integral_type": "cell",
            "integrand": [
                {"rule": {"name": "q", "weights": [1.0]}, "body": 1},
                {"rule": {"name": "q", "weights": [1.0]}, "body": 2}
            ]
        }"#;
        let err = serde_json::from_str::<IntegralIr<i32>>(json).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
    }

    #[test]
    fn deserialize_defaults_metadata() {
        let json = r#"{
            "name": "a",
            "integral_type": "exterior_facet",
            "integrand": [{"rule": {"name": "rt", "is_runtime": true}, "body": 7}],
            "finite_element_hashes": [12, null]
        }"#;
        let ir: IntegralIr<i32> = serde_json::from_str(json).unwrap();
        assert_eq!(ir.integral_type, IntegralType::ExteriorFacet);
        assert_eq!(ir.finite_element_hashes, vec![Some(12), None]);
        assert!(ir.enabled_coefficients.is_empty());
        assert!(!ir.needs_facet_permutations);
        assert_eq!(ir.integrand.runtime_rules().count(), 1);
    }
}
