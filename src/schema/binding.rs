//! Schema binding per DATAMODEL.md §88-140
//!
//! `Binding::compile` walks a component tree once, enforces every structural
//! invariant, and produces the handler tree the codecs and block buffers
//! drive at runtime. Compilation is where all schema errors surface; after a
//! successful compile, traversal never fails for structural reasons.
//!
//! The compiled binding carries:
//! - the handler tree with array/choice slot indices assigned in
//!   depth-first order,
//! - one size register per identified count scalar,
//! - the default block image (atoms, array lengths) new blocks start from.
//!
//! Bindings are immutable and are shared between blocks, writers and
//! readers behind an `Arc`.

use std::collections::{HashMap, HashSet};

use crate::block::{Atom, MAX_ARRAY_ELEMENTS};
use crate::schema::component::{ArraySizing, Component, Field, ScalarDef, ScalarKind};
use crate::schema::errors::{SchemaError, SchemaErrorCode, SchemaResult};

/// Upper bound on choice alternatives; the binary codec stores the
/// selected index in a single byte.
pub const MAX_CHOICE_ALTERNATIVES: usize = 255;

/// Compiled sizing mode of one array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sizing {
    /// Schema-constant length; never resized
    Fixed(usize),
    /// Length is the runtime value of the count scalar bound to `register`
    Linked {
        /// Size register slot the governing count writes into
        register: usize,
    },
}

/// A named child in the compiled tree.
#[derive(Debug, Clone)]
pub(crate) struct BoundField {
    pub(crate) name: String,
    pub(crate) handler: Handler,
}

/// One node of the compiled handler tree.
///
/// Mirrors [`Component`] with resolution already done: size references are
/// register slots, arrays and choices carry their slot indices, and every
/// array knows its element atom width.
#[derive(Debug, Clone)]
pub(crate) enum Handler {
    Scalar {
        kind: ScalarKind,
        /// Register this count feeds, if it carries a referenced id
        size_register: Option<usize>,
        /// Closed value set, checked on decode
        enumeration: Option<Vec<String>>,
    },
    Record {
        fields: Vec<BoundField>,
    },
    Vector {
        coordinates: Vec<BoundField>,
    },
    Array {
        /// Slot in the block's array-length table
        index: usize,
        sizing: Sizing,
        /// Atoms per element, a schema constant
        elem_width: usize,
        element: Box<Handler>,
    },
    Choice {
        /// Slot in the block's choice-selection table
        index: usize,
        alternatives: Vec<BoundField>,
    },
}

/// Per-array metadata kept alongside the handler tree.
#[derive(Debug, Clone)]
pub(crate) struct ArrayInfo {
    /// Canonical dotted path of the array component
    pub(crate) path: String,
    /// Atoms per element
    pub(crate) elem_width: usize,
    /// Register of the governing count, for linked arrays
    pub(crate) linked_register: Option<usize>,
    /// Default atom image of one element, cloned on grow
    pub(crate) elem_defaults: Vec<Atom>,
}

/// A compiled schema, ready to mint blocks and drive codecs.
#[derive(Debug)]
pub struct Binding {
    root: Handler,
    arrays: Vec<ArrayInfo>,
    choice_count: usize,
    register_count: usize,
    default_atoms: Vec<Atom>,
    default_lengths: Vec<usize>,
}

impl Binding {
    /// Compile a component tree into a binding.
    ///
    /// Enforces every structural invariant: unique sibling names, non-empty
    /// composites, scalar-only vectors, resolvable and well-ordered size
    /// references, fixed-width array elements, the alternative cap, and
    /// enumeration validity. All violations are fatal.
    pub fn compile(root: &Component) -> SchemaResult<Binding> {
        let mut compiler = Compiler::new(root);
        let handler = compiler.bind(root)?;

        let mut default_atoms = Vec::new();
        handler.append_defaults(&mut default_atoms);

        Ok(Binding {
            root: handler,
            default_lengths: compiler.default_lengths,
            arrays: compiler.arrays,
            choice_count: compiler.choices,
            register_count: compiler.registers,
            default_atoms,
        })
    }

    /// Number of array slots in the schema
    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }

    /// Number of choice slots in the schema
    pub fn choice_count(&self) -> usize {
        self.choice_count
    }

    /// Resolve the canonical dotted path of an array to its slot index.
    ///
    /// Paths name the array component itself, e.g. `"samples"` or
    /// `"burst.samples"`; an array at the schema root is `"$root"`.
    pub fn array_index(&self, path: &str) -> Option<usize> {
        self.arrays.iter().position(|a| a.path == path)
    }

    /// Canonical path of the array at `index`
    pub fn array_path(&self, index: usize) -> Option<&str> {
        self.arrays.get(index).map(|a| a.path.as_str())
    }

    pub(crate) fn root(&self) -> &Handler {
        &self.root
    }

    pub(crate) fn arrays(&self) -> &[ArrayInfo] {
        &self.arrays
    }

    pub(crate) fn register_count(&self) -> usize {
        self.register_count
    }

    pub(crate) fn default_atoms(&self) -> &[Atom] {
        &self.default_atoms
    }

    pub(crate) fn default_lengths(&self) -> &[usize] {
        &self.default_lengths
    }
}

/// Walk state for one compile pass.
struct Compiler {
    /// ids declared on count scalars anywhere in the tree
    count_ids: HashSet<String>,
    /// ids declared on non-count scalars anywhere in the tree
    other_ids: HashSet<String>,
    /// One scope per enclosing record, id → register, in declaration order
    scopes: Vec<HashMap<String, usize>>,
    /// Count ids already assigned a register, for duplicate detection
    seen_count_ids: HashSet<String>,
    registers: usize,
    arrays: Vec<ArrayInfo>,
    default_lengths: Vec<usize>,
    choices: usize,
    path: Vec<String>,
}

impl Compiler {
    fn new(root: &Component) -> Self {
        let mut count_ids = HashSet::new();
        let mut other_ids = HashSet::new();
        collect_ids(root, &mut count_ids, &mut other_ids);
        Self {
            count_ids,
            other_ids,
            scopes: Vec::new(),
            seen_count_ids: HashSet::new(),
            registers: 0,
            arrays: Vec::new(),
            default_lengths: Vec::new(),
            choices: 0,
            path: Vec::new(),
        }
    }

    /// Dotted path of the component currently being bound
    fn path_string(&self) -> String {
        if self.path.is_empty() {
            return "$root".to_string();
        }
        let mut out = String::new();
        for segment in &self.path {
            if !out.is_empty() && !segment.starts_with('[') {
                out.push('.');
            }
            out.push_str(segment);
        }
        out
    }

    fn bind(&mut self, component: &Component) -> SchemaResult<Handler> {
        match component {
            Component::Scalar(def) => self.bind_scalar(def),
            Component::Record { fields } => self.bind_record(fields),
            Component::Vector { coordinates } => self.bind_vector(coordinates),
            Component::Array { element, sizing } => self.bind_array(element, sizing),
            Component::Choice { alternatives } => self.bind_choice(alternatives),
        }
    }

    fn bind_scalar(&mut self, def: &ScalarDef) -> SchemaResult<Handler> {
        if let Some(values) = &def.enumeration {
            if def.kind != ScalarKind::Category {
                return Err(SchemaError::at_path(
                    SchemaErrorCode::BadEnumeration,
                    self.path_string(),
                    format!("enumeration declared on {} scalar", def.kind.kind_name()),
                ));
            }
            if values.is_empty() {
                return Err(SchemaError::at_path(
                    SchemaErrorCode::BadEnumeration,
                    self.path_string(),
                    "enumeration is empty",
                ));
            }
            let mut seen = HashSet::new();
            for value in values {
                if !seen.insert(value.as_str()) {
                    return Err(SchemaError::at_path(
                        SchemaErrorCode::BadEnumeration,
                        self.path_string(),
                        format!("duplicate enumeration value '{}'", value),
                    ));
                }
            }
        }

        let size_register = match (&def.id, def.kind) {
            (Some(id), ScalarKind::Count) => {
                if !self.seen_count_ids.insert(id.clone()) {
                    return Err(SchemaError::at_path(
                        SchemaErrorCode::DuplicateSizeId,
                        self.path_string(),
                        format!("size id '{}' declared more than once", id),
                    ));
                }
                let register = self.registers;
                self.registers += 1;
                Some(register)
            }
            _ => None,
        };

        Ok(Handler::Scalar {
            kind: def.kind,
            size_register,
            enumeration: def.enumeration.clone(),
        })
    }

    fn bind_record(&mut self, fields: &[Field]) -> SchemaResult<Handler> {
        self.check_siblings("record", fields)?;
        self.scopes.push(HashMap::new());
        let mut bound = Vec::with_capacity(fields.len());
        for field in fields {
            self.path.push(field.name.clone());
            let handler = self.bind(&field.component)?;
            self.path.pop();
            // Direct count fields enter this record's size-reference scope.
            if let Handler::Scalar {
                size_register: Some(register),
                ..
            } = &handler
            {
                if let Component::Scalar(def) = &field.component {
                    if let Some(id) = &def.id {
                        if let Some(scope) = self.scopes.last_mut() {
                            scope.insert(id.clone(), *register);
                        }
                    }
                }
            }
            bound.push(BoundField {
                name: field.name.clone(),
                handler,
            });
        }
        self.scopes.pop();
        Ok(Handler::Record { fields: bound })
    }

    fn bind_vector(&mut self, coordinates: &[Field]) -> SchemaResult<Handler> {
        self.check_siblings("vector", coordinates)?;
        let mut bound = Vec::with_capacity(coordinates.len());
        for coord in coordinates {
            self.path.push(coord.name.clone());
            let handler = match &coord.component {
                Component::Scalar(def) => self.bind_scalar(def)?,
                other => {
                    return Err(SchemaError::at_path(
                        SchemaErrorCode::VectorNotScalar,
                        self.path_string(),
                        format!("vector coordinate is a {}", other.type_name()),
                    ));
                }
            };
            self.path.pop();
            bound.push(BoundField {
                name: coord.name.clone(),
                handler,
            });
        }
        Ok(Handler::Vector { coordinates: bound })
    }

    fn bind_array(&mut self, element: &Component, sizing: &ArraySizing) -> SchemaResult<Handler> {
        let elem_width = element.fixed_atom_width().ok_or_else(|| {
            SchemaError::at_path(
                SchemaErrorCode::VariableElement,
                self.path_string(),
                format!(
                    "array element ({}) has no fixed atom width; \
                     linked arrays and choices cannot nest inside array elements",
                    element.type_name()
                ),
            )
        })?;

        let sizing = match sizing {
            ArraySizing::Fixed(len) => {
                if *len > MAX_ARRAY_ELEMENTS {
                    return Err(SchemaError::at_path(
                        SchemaErrorCode::VariableElement,
                        self.path_string(),
                        format!(
                            "fixed length {} exceeds the element cap of {}",
                            len, MAX_ARRAY_ELEMENTS
                        ),
                    ));
                }
                Sizing::Fixed(*len)
            }
            ArraySizing::Linked(id) => {
                let register = self.resolve_size_ref(id)?;
                Sizing::Linked { register }
            }
        };

        let index = self.arrays.len();
        self.arrays.push(ArrayInfo {
            path: self.path_string(),
            elem_width,
            linked_register: match sizing {
                Sizing::Linked { register } => Some(register),
                Sizing::Fixed(_) => None,
            },
            elem_defaults: Vec::new(),
        });
        self.default_lengths.push(match sizing {
            Sizing::Fixed(len) => len,
            Sizing::Linked { .. } => 0,
        });

        self.path.push("[]".to_string());
        let element = Box::new(self.bind(element)?);
        self.path.pop();

        let mut elem_defaults = Vec::with_capacity(elem_width);
        element.append_defaults(&mut elem_defaults);
        self.arrays[index].elem_defaults = elem_defaults;

        Ok(Handler::Array {
            index,
            sizing,
            elem_width,
            element,
        })
    }

    fn bind_choice(&mut self, alternatives: &[Field]) -> SchemaResult<Handler> {
        self.check_siblings("choice", alternatives)?;
        if alternatives.len() > MAX_CHOICE_ALTERNATIVES {
            return Err(SchemaError::at_path(
                SchemaErrorCode::TooManyAlternatives,
                self.path_string(),
                format!(
                    "choice has {} alternatives, limit is {}",
                    alternatives.len(),
                    MAX_CHOICE_ALTERNATIVES
                ),
            ));
        }
        let index = self.choices;
        self.choices += 1;
        let mut bound = Vec::with_capacity(alternatives.len());
        for alt in alternatives {
            self.path.push(alt.name.clone());
            let handler = self.bind(&alt.component)?;
            self.path.pop();
            bound.push(BoundField {
                name: alt.name.clone(),
                handler,
            });
        }
        Ok(Handler::Choice {
            index,
            alternatives: bound,
        })
    }

    /// Resolve a linked-array size reference against the records enclosing
    /// the array. Misses are classified: id on a non-count scalar, id on a
    /// count that does not precede the array in an enclosing record, or id
    /// declared nowhere.
    fn resolve_size_ref(&self, id: &str) -> SchemaResult<usize> {
        for scope in self.scopes.iter().rev() {
            if let Some(register) = scope.get(id) {
                return Ok(*register);
            }
        }
        if self.count_ids.contains(id) {
            Err(SchemaError::at_path(
                SchemaErrorCode::MisorderedSizeRef,
                self.path_string(),
                format!(
                    "size id '{}' does not precede this array in an enclosing record",
                    id
                ),
            ))
        } else if self.other_ids.contains(id) {
            Err(SchemaError::at_path(
                SchemaErrorCode::SizeRefNotCount,
                self.path_string(),
                format!("size id '{}' is declared on a non-count scalar", id),
            ))
        } else {
            Err(SchemaError::at_path(
                SchemaErrorCode::UnresolvedSizeRef,
                self.path_string(),
                format!("size id '{}' is not declared anywhere", id),
            ))
        }
    }

    fn check_siblings(&self, what: &str, fields: &[Field]) -> SchemaResult<()> {
        if fields.is_empty() {
            return Err(SchemaError::at_path(
                SchemaErrorCode::EmptyComposite,
                self.path_string(),
                format!("{} has no children", what),
            ));
        }
        let mut seen = HashSet::new();
        for field in fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::at_path(
                    SchemaErrorCode::DuplicateName,
                    self.path_string(),
                    format!("{} declares '{}' more than once", what, field.name),
                ));
            }
        }
        Ok(())
    }
}

/// Record every declared scalar id, split by kind, for miss classification.
fn collect_ids(
    component: &Component,
    count_ids: &mut HashSet<String>,
    other_ids: &mut HashSet<String>,
) {
    match component {
        Component::Scalar(def) => {
            if let Some(id) = &def.id {
                if def.kind == ScalarKind::Count {
                    count_ids.insert(id.clone());
                } else {
                    other_ids.insert(id.clone());
                }
            }
        }
        Component::Record { fields }
        | Component::Vector {
            coordinates: fields,
        }
        | Component::Choice {
            alternatives: fields,
        } => {
            for field in fields {
                collect_ids(&field.component, count_ids, other_ids);
            }
        }
        Component::Array { element, .. } => collect_ids(element, count_ids, other_ids),
    }
}

impl Handler {
    /// Append the default atom image of this subtree: variable arrays
    /// empty, fixed arrays at their schema length, choices on their first
    /// alternative.
    pub(crate) fn append_defaults(&self, atoms: &mut Vec<Atom>) {
        match self {
            Handler::Scalar { kind, .. } => atoms.push(Atom::default_of(*kind)),
            Handler::Record { fields } => {
                for field in fields {
                    field.handler.append_defaults(atoms);
                }
            }
            Handler::Vector { coordinates } => {
                for coord in coordinates {
                    coord.handler.append_defaults(atoms);
                }
            }
            Handler::Array {
                sizing, element, ..
            } => {
                let len = match sizing {
                    Sizing::Fixed(len) => *len,
                    Sizing::Linked { .. } => 0,
                };
                for _ in 0..len {
                    element.append_defaults(atoms);
                }
            }
            Handler::Choice { alternatives, .. } => {
                if let Some(first) = alternatives.first() {
                    first.handler.append_defaults(atoms);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::component::Component;

    /// Timestamped burst of 2-coordinate velocity samples, sized by a
    /// preceding count. The shape exercised throughout the codec tests.
    fn burst_schema() -> Component {
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
    fn test_compile_burst_schema() {
        let binding = Binding::compile(&burst_schema()).unwrap();
        assert_eq!(binding.array_count(), 1);
        assert_eq!(binding.choice_count(), 0);
        assert_eq!(binding.register_count(), 1);
        // t0 + size; the linked array starts empty.
        assert_eq!(binding.default_atoms().len(), 2);
        assert_eq!(binding.default_lengths(), &[0]);
        assert_eq!(binding.array_index("samples"), Some(0));
        assert_eq!(binding.array_path(0), Some("samples"));
        assert_eq!(binding.arrays()[0].elem_width, 2);
        assert_eq!(binding.arrays()[0].linked_register, Some(0));
    }

    #[test]
    fn test_fixed_array_defaults_at_schema_length() {
        let schema = Component::record(vec![(
            "pairs",
            Component::array_fixed(
                3,
                Component::vector(vec![
                    ("x", Component::quantity()),
                    ("y", Component::quantity()),
                ]),
            ),
        )]);
        let binding = Binding::compile(&schema).unwrap();
        assert_eq!(binding.default_lengths(), &[3]);
        assert_eq!(binding.default_atoms().len(), 6);
        assert!(binding.arrays()[0].linked_register.is_none());
    }

    #[test]
    fn test_choice_defaults_to_first_alternative() {
        let schema = Component::record(vec![(
            "payload",
            Component::choice(vec![
                (
                    "pair",
                    Component::record(vec![
                        ("a", Component::count()),
                        ("b", Component::count()),
                    ]),
                ),
                ("note", Component::text()),
            ]),
        )]);
        let binding = Binding::compile(&schema).unwrap();
        assert_eq!(binding.choice_count(), 1);
        // First alternative has two atoms.
        assert_eq!(binding.default_atoms().len(), 2);
    }

    #[test]
    fn test_size_ref_resolves_from_enclosing_record() {
        let schema = Component::record(vec![
            ("n", Component::count_with_id("n")),
            (
                "inner",
                Component::record(vec![(
                    "items",
                    Component::array_linked("n", Component::quantity()),
                )]),
            ),
        ]);
        let binding = Binding::compile(&schema).unwrap();
        assert_eq!(binding.arrays()[0].linked_register, Some(0));
        assert_eq!(binding.array_index("inner.items"), Some(0));
    }

    #[test]
    fn test_duplicate_sibling_name_rejected() {
        let schema = Component::record(vec![
            ("x", Component::count()),
            ("x", Component::text()),
        ]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::DuplicateName);
        assert_eq!(err.path(), Some("$root"));
    }

    #[test]
    fn test_empty_composite_rejected() {
        let schema = Component::record(vec![("v", Component::vector::<&str>(vec![]))]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::EmptyComposite);
        assert_eq!(err.path(), Some("v"));
    }

    #[test]
    fn test_vector_rejects_composite_coordinate() {
        let schema = Component::vector(vec![(
            "bad",
            Component::record(vec![("x", Component::count())]),
        )]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::VectorNotScalar);
        assert_eq!(err.path(), Some("bad"));
    }

    #[test]
    fn test_unresolved_size_ref() {
        let schema = Component::record(vec![(
            "items",
            Component::array_linked("missing", Component::count()),
        )]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnresolvedSizeRef);
    }

    #[test]
    fn test_count_after_array_is_misordered() {
        let schema = Component::record(vec![
            ("items", Component::array_linked("n", Component::count())),
            ("n", Component::count_with_id("n")),
        ]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MisorderedSizeRef);
        assert_eq!(err.path(), Some("items"));
    }

    #[test]
    fn test_count_in_sibling_subtree_is_out_of_scope() {
        // The count precedes the array in atom order but sits inside a
        // sibling record, so it is not in any enclosing scope.
        let schema = Component::record(vec![
            (
                "header",
                Component::record(vec![("n", Component::count_with_id("n"))]),
            ),
            ("items", Component::array_linked("n", Component::count())),
        ]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MisorderedSizeRef);
    }

    #[test]
    fn test_size_ref_to_non_count_scalar() {
        let mut def = crate::schema::component::ScalarDef::new(ScalarKind::Text);
        def.id = Some("label".to_string());
        let schema = Component::record(vec![
            ("label", Component::Scalar(def)),
            ("items", Component::array_linked("label", Component::count())),
        ]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::SizeRefNotCount);
    }

    #[test]
    fn test_duplicate_size_id_rejected() {
        let schema = Component::record(vec![
            ("a", Component::count_with_id("n")),
            ("b", Component::count_with_id("n")),
        ]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::DuplicateSizeId);
        assert_eq!(err.path(), Some("b"));
    }

    #[test]
    fn test_linked_array_inside_array_element_rejected() {
        let schema = Component::record(vec![
            ("n", Component::count_with_id("n")),
            (
                "outer",
                Component::array_fixed(
                    2,
                    Component::record(vec![(
                        "inner",
                        Component::array_linked("n", Component::count()),
                    )]),
                ),
            ),
        ]);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::VariableElement);
        assert_eq!(err.path(), Some("outer"));
    }

    #[test]
    fn test_choice_inside_array_element_rejected() {
        let schema = Component::array_fixed(
            2,
            Component::choice(vec![
                ("a", Component::count()),
                ("b", Component::text()),
            ]),
        );
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::VariableElement);
        assert_eq!(err.path(), Some("$root"));
    }

    #[test]
    fn test_fixed_array_inside_array_element_allowed() {
        let schema = Component::array_fixed(
            2,
            Component::record(vec![(
                "grid",
                Component::array_fixed(3, Component::quantity()),
            )]),
        );
        let binding = Binding::compile(&schema).unwrap();
        assert_eq!(binding.array_count(), 2);
        assert_eq!(binding.array_index("$root"), Some(0));
        assert_eq!(binding.array_index("[].grid"), Some(1));
        // 2 elements x 3 atoms each.
        assert_eq!(binding.default_atoms().len(), 6);
    }

    #[test]
    fn test_too_many_alternatives_rejected() {
        let alts: Vec<(String, Component)> = (0..=MAX_CHOICE_ALTERNATIVES)
            .map(|i| (format!("alt{}", i), Component::boolean()))
            .collect();
        let schema = Component::choice(alts);
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::TooManyAlternatives);
    }

    #[test]
    fn test_bad_enumerations_rejected() {
        let empty = Component::record(vec![(
            "c",
            Component::category_of(Vec::<String>::new()),
        )]);
        assert_eq!(
            Binding::compile(&empty).unwrap_err().code(),
            SchemaErrorCode::BadEnumeration
        );

        let duped = Component::record(vec![(
            "c",
            Component::category_of(vec!["red", "blue", "red"]),
        )]);
        assert_eq!(
            Binding::compile(&duped).unwrap_err().code(),
            SchemaErrorCode::BadEnumeration
        );

        let mut def = crate::schema::component::ScalarDef::new(ScalarKind::Count);
        def.enumeration = Some(vec!["1".to_string()]);
        let wrong_kind = Component::record(vec![("c", Component::Scalar(def))]);
        assert_eq!(
            Binding::compile(&wrong_kind).unwrap_err().code(),
            SchemaErrorCode::BadEnumeration
        );
    }
}
