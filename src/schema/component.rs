//! Component schema tree per DATAMODEL.md
//!
//! A component describes the structure of one record field:
//! - scalar: boolean, count, quantity, text, category, time
//! - record: ordered named fields
//! - vector: fixed tuple of named coordinate scalars
//! - array: homogeneous repeated element, fixed size or linked to a count
//! - choice: tagged union, exactly one alternative present per instance
//!
//! Trees are built bottom-up (leaves first), are logically immutable after
//! construction, and may be shared read-only across codec instances.
//! Structural invariants (DATAMODEL.md §4) are enforced when the tree is
//! compiled into a binding, not while it is being assembled.

use serde::{Deserialize, Serialize};

/// Scalar leaf kinds as defined in DATAMODEL.md §2.
///
/// Each scalar leaf contributes exactly one atom per record instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// True/false flag
    Boolean,
    /// 64-bit signed integer; also the size determinant for linked arrays
    Count,
    /// 64-bit floating point measurement, optionally carrying a unit label
    Quantity,
    /// Free-form UTF-8 text
    Text,
    /// Enumerated UTF-8 text, optionally constrained to a closed value set
    Category,
    /// Instant in time, stored as epoch milliseconds (UTC)
    Time,
}

impl ScalarKind {
    /// Returns the kind name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            ScalarKind::Boolean => "boolean",
            ScalarKind::Count => "count",
            ScalarKind::Quantity => "quantity",
            ScalarKind::Text => "text",
            ScalarKind::Category => "category",
            ScalarKind::Time => "time",
        }
    }
}

/// Scalar leaf definition.
///
/// The optional `id` is a global identifier; a linked array resolves its
/// size reference against the `id` of a count scalar (DATAMODEL.md §3.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarDef {
    /// Scalar kind
    pub kind: ScalarKind,
    /// Global identifier, referenced by `ArraySizing::Linked`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Unit label for quantities and times (carried, never interpreted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Closed value set for categories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<String>>,
}

impl ScalarDef {
    /// Create a plain scalar of the given kind
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            id: None,
            unit: None,
            enumeration: None,
        }
    }
}

/// Array sizing mode per DATAMODEL.md §3.3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArraySizing {
    /// Length is a schema constant; the wire carries no length
    Fixed(usize),
    /// Length is the runtime value of the count scalar with this `id`;
    /// the count must precede the array in depth-first atom order
    Linked(String),
}

/// A named child of a composite component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique among siblings
    pub name: String,
    /// Field structure
    #[serde(flatten)]
    pub component: Component,
}

impl Field {
    /// Create a named field
    pub fn new(name: impl Into<String>, component: Component) -> Self {
        Self {
            name: name.into(),
            component,
        }
    }
}

/// A node of the component schema tree.
///
/// Children of composites are ordered; field order is the depth-first atom
/// order used by every codec and by the flat value buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Component {
    /// Terminal scalar leaf
    Scalar(ScalarDef),
    /// Ordered named fields
    Record {
        /// Field definitions in declaration order
        fields: Vec<Field>,
    },
    /// Fixed tuple of named coordinates; every coordinate must be a scalar
    Vector {
        /// Coordinate definitions in declaration order
        coordinates: Vec<Field>,
    },
    /// Homogeneous repeated element
    Array {
        /// Element structure (boxed to allow recursion)
        element: Box<Component>,
        /// Fixed or linked length
        sizing: ArraySizing,
    },
    /// Tagged union; exactly one alternative is present per instance
    Choice {
        /// Alternative definitions in declaration order
        alternatives: Vec<Field>,
    },
}

impl Component {
    /// Create a boolean scalar
    pub fn boolean() -> Self {
        Component::Scalar(ScalarDef::new(ScalarKind::Boolean))
    }

    /// Create a count scalar
    pub fn count() -> Self {
        Component::Scalar(ScalarDef::new(ScalarKind::Count))
    }

    /// Create a count scalar carrying a global identifier, so a linked
    /// array elsewhere in the tree can reference it as its size
    pub fn count_with_id(id: impl Into<String>) -> Self {
        let mut def = ScalarDef::new(ScalarKind::Count);
        def.id = Some(id.into());
        Component::Scalar(def)
    }

    /// Create a quantity scalar
    pub fn quantity() -> Self {
        Component::Scalar(ScalarDef::new(ScalarKind::Quantity))
    }

    /// Create a quantity scalar with a unit label
    pub fn quantity_in(unit: impl Into<String>) -> Self {
        let mut def = ScalarDef::new(ScalarKind::Quantity);
        def.unit = Some(unit.into());
        Component::Scalar(def)
    }

    /// Create a text scalar
    pub fn text() -> Self {
        Component::Scalar(ScalarDef::new(ScalarKind::Text))
    }

    /// Create an unconstrained category scalar
    pub fn category() -> Self {
        Component::Scalar(ScalarDef::new(ScalarKind::Category))
    }

    /// Create a category scalar constrained to a closed value set
    pub fn category_of<V: Into<String>>(values: Vec<V>) -> Self {
        let mut def = ScalarDef::new(ScalarKind::Category);
        def.enumeration = Some(values.into_iter().map(Into::into).collect());
        Component::Scalar(def)
    }

    /// Create a time scalar
    pub fn time() -> Self {
        Component::Scalar(ScalarDef::new(ScalarKind::Time))
    }

    /// Create a record from named fields in declaration order
    pub fn record<N: Into<String>>(fields: Vec<(N, Component)>) -> Self {
        Component::Record {
            fields: fields
                .into_iter()
                .map(|(name, component)| Field::new(name, component))
                .collect(),
        }
    }

    /// Create a vector from named coordinates in declaration order
    pub fn vector<N: Into<String>>(coordinates: Vec<(N, Component)>) -> Self {
        Component::Vector {
            coordinates: coordinates
                .into_iter()
                .map(|(name, component)| Field::new(name, component))
                .collect(),
        }
    }

    /// Create a fixed-length array
    pub fn array_fixed(len: usize, element: Component) -> Self {
        Component::Array {
            element: Box::new(element),
            sizing: ArraySizing::Fixed(len),
        }
    }

    /// Create a variable-length array whose length is the runtime value of
    /// the count scalar identified by `id`
    pub fn array_linked(id: impl Into<String>, element: Component) -> Self {
        Component::Array {
            element: Box::new(element),
            sizing: ArraySizing::Linked(id.into()),
        }
    }

    /// Create a choice from named alternatives in declaration order
    pub fn choice<N: Into<String>>(alternatives: Vec<(N, Component)>) -> Self {
        Component::Choice {
            alternatives: alternatives
                .into_iter()
                .map(|(name, component)| Field::new(name, component))
                .collect(),
        }
    }

    /// Returns the component name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Component::Scalar(def) => def.kind.kind_name(),
            Component::Record { .. } => "record",
            Component::Vector { .. } => "vector",
            Component::Array { .. } => "array",
            Component::Choice { .. } => "choice",
        }
    }

    /// Returns the number of atoms one instance of this component occupies,
    /// if that number is a schema constant.
    ///
    /// Linked arrays and choices have no static width; per DATAMODEL.md §4.5
    /// they may therefore not appear inside an array element.
    pub fn fixed_atom_width(&self) -> Option<usize> {
        match self {
            Component::Scalar(_) => Some(1),
            Component::Record { fields } => fields
                .iter()
                .try_fold(0usize, |acc, f| Some(acc + f.component.fixed_atom_width()?)),
            Component::Vector { coordinates } => Some(coordinates.len()),
            Component::Array { element, sizing } => match sizing {
                ArraySizing::Fixed(len) => element.fixed_atom_width().map(|w| w * len),
                ArraySizing::Linked(_) => None,
            },
            Component::Choice { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Component {
        Component::record(vec![
            ("t0", Component::time()),
            ("size", Component::count_with_id("sample-count")),
            (
                "samples",
                Component::array_linked(
                    "sample-count",
                    Component::vector(vec![
                        ("c1", Component::quantity_in("m/s")),
                        ("c2", Component::quantity_in("m/s")),
                    ]),
                ),
            ),
        ])
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ScalarKind::Boolean.kind_name(), "boolean");
        assert_eq!(ScalarKind::Count.kind_name(), "count");
        assert_eq!(ScalarKind::Quantity.kind_name(), "quantity");
        assert_eq!(ScalarKind::Text.kind_name(), "text");
        assert_eq!(ScalarKind::Category.kind_name(), "category");
        assert_eq!(ScalarKind::Time.kind_name(), "time");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Component::boolean().type_name(), "boolean");
        assert_eq!(Component::record::<&str>(vec![]).type_name(), "record");
        assert_eq!(
            Component::array_fixed(3, Component::count()).type_name(),
            "array"
        );
        assert_eq!(Component::choice::<&str>(vec![]).type_name(), "choice");
    }

    #[test]
    fn test_count_with_id_carries_identifier() {
        match Component::count_with_id("n") {
            Component::Scalar(def) => {
                assert_eq!(def.kind, ScalarKind::Count);
                assert_eq!(def.id.as_deref(), Some("n"));
            }
            other => panic!("expected scalar, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_fixed_atom_width_scalars_and_vectors() {
        assert_eq!(Component::quantity().fixed_atom_width(), Some(1));
        let vec2 = Component::vector(vec![
            ("x", Component::quantity()),
            ("y", Component::quantity()),
        ]);
        assert_eq!(vec2.fixed_atom_width(), Some(2));
    }

    #[test]
    fn test_fixed_atom_width_composites() {
        let rec = Component::record(vec![
            ("flag", Component::boolean()),
            ("pair", Component::array_fixed(4, Component::count())),
        ]);
        assert_eq!(rec.fixed_atom_width(), Some(5));

        // A linked array has no static width, and neither does anything
        // containing one.
        assert_eq!(sample_schema().fixed_atom_width(), None);

        let choice = Component::choice(vec![
            ("a", Component::count()),
            ("b", Component::text()),
        ]);
        assert_eq!(choice.fixed_atom_width(), None);
    }

    #[test]
    fn test_schema_json_roundtrip() {
        let schema = sample_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: Component = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, parsed);
    }

    #[test]
    fn test_schema_json_shape() {
        let schema = Component::record(vec![("n", Component::count_with_id("n-id"))]);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["type"], "record");
        assert_eq!(json["fields"][0]["name"], "n");
        assert_eq!(json["fields"][0]["type"], "count");
        assert_eq!(json["fields"][0]["id"], "n-id");
    }

    #[test]
    fn test_category_enumeration() {
        match Component::category_of(vec!["rain", "snow", "hail"]) {
            Component::Scalar(def) => {
                let values = def.enumeration.unwrap();
                assert_eq!(values, vec!["rain", "snow", "hail"]);
            }
            other => panic!("expected scalar, got {}", other.type_name()),
        }
    }
}
