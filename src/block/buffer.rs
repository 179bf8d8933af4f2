//! Data blocks per DATAMODEL.md §141-210
//!
//! A block stores one record as a flat atom vector in depth-first schema
//! order. Variable structure is carried next to it: one length per array
//! slot and one selected alternative per choice slot. The atom offset of
//! any component is a pure function of those two tables, so resizing an
//! array or switching a choice is a single splice at the component's
//! current offset.
//!
//! Layout math:
//! - scalar width is 1
//! - record and vector width is the sum of child widths
//! - array width is `length x element_width`
//! - choice width is the width of the selected alternative
//!
//! Mutations validate first and splice second; a failed call leaves the
//! block exactly as it was.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::block::atom::{Atom, AtomValue, ByteSpan};
use crate::block::errors::{BlockError, BlockErrorCode, BlockResult};
use crate::block::MAX_ARRAY_ELEMENTS;
use crate::schema::{Binding, BoundField, Handler, ScalarKind};

/// One record's worth of values, laid out flat against a compiled schema.
///
/// Blocks are minted from a shared [`Binding`] and stay tied to it for
/// life; codecs refuse blocks minted from a different binding instance.
#[derive(Debug, Clone)]
pub struct DataBlock {
    binding: Arc<Binding>,
    atoms: Vec<Atom>,
    /// Current length of every array slot, fixed slots included
    array_lengths: Vec<usize>,
    /// Selected alternative of every choice slot
    choice_selections: Vec<usize>,
}

impl DataBlock {
    /// Mint a block in the default state: variable arrays empty, fixed
    /// arrays at their schema length, choices on their first alternative,
    /// every atom at its kind's default value.
    pub fn new(binding: Arc<Binding>) -> Self {
        let atoms = binding.default_atoms().to_vec();
        let array_lengths = binding.default_lengths().to_vec();
        let choice_selections = vec![0; binding.choice_count()];
        Self {
            binding,
            atoms,
            array_lengths,
            choice_selections,
        }
    }

    /// The binding this block was minted from
    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    /// True if this block was minted from the given binding instance
    pub fn shares_binding(&self, binding: &Arc<Binding>) -> bool {
        Arc::ptr_eq(&self.binding, binding)
    }

    /// Number of atoms in the current layout
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// The atom at a flat offset, if in range
    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// Current length of the array at slot `array`
    pub fn array_length(&self, array: usize) -> BlockResult<usize> {
        self.array_lengths.get(array).copied().ok_or_else(|| {
            BlockError::at(
                BlockErrorCode::BadIndex,
                format!("array {}", array),
                "array slot out of range",
            )
        })
    }

    /// Current length of the array at a canonical path
    pub fn array_length_at(&self, path: &str) -> BlockResult<usize> {
        let index = self.binding.array_index(path).ok_or_else(|| {
            BlockError::at(BlockErrorCode::BadPath, path, "no array at this path")
        })?;
        self.array_length(index)
    }

    /// Selected alternative of the choice at slot `choice`
    pub fn choice_selection(&self, choice: usize) -> BlockResult<usize> {
        self.choice_selections.get(choice).copied().ok_or_else(|| {
            BlockError::at(
                BlockErrorCode::BadIndex,
                format!("choice {}", choice),
                "choice slot out of range",
            )
        })
    }

    /// Restore the default state, reusing the existing allocations
    pub fn reset(&mut self) {
        self.atoms.clear();
        self.atoms.extend_from_slice(self.binding.default_atoms());
        self.array_lengths.clear();
        self.array_lengths
            .extend_from_slice(self.binding.default_lengths());
        self.choice_selections.clear();
        self.choice_selections
            .resize(self.binding.choice_count(), 0);
    }

    /// Resize a linked array to `new_len` elements.
    ///
    /// Grows by appending default-valued elements at the end of the array's
    /// subtree, shrinks by dropping trailing elements; atoms of surviving
    /// elements keep their values while their flat offsets shift. The
    /// governing count atom is rewritten to the new length.
    pub fn resize_array(&mut self, array: usize, new_len: usize) -> BlockResult<()> {
        let binding = Arc::clone(&self.binding);
        let info = binding.arrays().get(array).ok_or_else(|| {
            BlockError::at(
                BlockErrorCode::BadIndex,
                format!("array {}", array),
                "array slot out of range",
            )
        })?;
        let register = match info.linked_register {
            Some(register) => register,
            None => {
                return Err(BlockError::at(
                    BlockErrorCode::FixedResize,
                    info.path.as_str(),
                    "array length is fixed by the schema",
                ));
            }
        };
        if new_len > MAX_ARRAY_ELEMENTS {
            return Err(BlockError::at(
                BlockErrorCode::ArrayOverflow,
                info.path.as_str(),
                format!(
                    "requested {} elements, cap is {}",
                    new_len, MAX_ARRAY_ELEMENTS
                ),
            ));
        }

        let mut probe = ArrayProbe {
            target: array,
            register,
            array_offset: None,
            count_offset: None,
        };
        probe_array(
            binding.root(),
            0,
            &self.array_lengths,
            &self.choice_selections,
            &mut probe,
        );
        let start = probe.array_offset.ok_or_else(|| {
            BlockError::at(
                BlockErrorCode::BadPath,
                info.path.as_str(),
                "array is inside a deselected choice alternative",
            )
        })?;
        let count_offset = probe.count_offset.ok_or_else(|| {
            BlockError::at(
                BlockErrorCode::BadPath,
                info.path.as_str(),
                "governing count is not in the current layout",
            )
        })?;

        let old_len = self.array_lengths[array];
        let width = info.elem_width;
        if new_len > old_len {
            let mut grown = Vec::with_capacity((new_len - old_len) * width);
            for _ in 0..new_len - old_len {
                grown.extend_from_slice(&info.elem_defaults);
            }
            let insert_at = start + old_len * width;
            self.atoms.splice(insert_at..insert_at, grown);
        } else if new_len < old_len {
            self.atoms
                .drain(start + new_len * width..start + old_len * width);
        }
        self.array_lengths[array] = new_len;

        let count = &mut self.atoms[count_offset];
        count.value = AtomValue::Int(new_len as i64);
        count.span = None;
        Ok(())
    }

    /// Resize a linked array addressed by its canonical path
    pub fn resize_array_at(&mut self, path: &str, new_len: usize) -> BlockResult<()> {
        let index = self.binding.array_index(path).ok_or_else(|| {
            BlockError::at(BlockErrorCode::BadPath, path, "no array at this path")
        })?;
        self.resize_array(index, new_len)
    }

    /// Select an alternative of the choice at slot `choice`.
    ///
    /// The outgoing alternative's subtree is replaced by the incoming one's
    /// default image, and every array length and choice selection nested in
    /// the outgoing alternative is reset to its default. Selecting the
    /// already-selected alternative is a no-op.
    pub fn select_choice(&mut self, choice: usize, alternative: usize) -> BlockResult<()> {
        let binding = Arc::clone(&self.binding);
        if choice >= binding.choice_count() {
            return Err(BlockError::at(
                BlockErrorCode::BadIndex,
                format!("choice {}", choice),
                "choice slot out of range",
            ));
        }
        let (_, found) = probe_choice(
            binding.root(),
            0,
            choice,
            &self.array_lengths,
            &self.choice_selections,
        );
        let (offset, alternatives) = found.ok_or_else(|| {
            BlockError::at(
                BlockErrorCode::BadPath,
                format!("choice {}", choice),
                "choice is inside a deselected alternative",
            )
        })?;
        if alternative >= alternatives.len() {
            return Err(BlockError::at(
                BlockErrorCode::BadIndex,
                format!("choice {}", choice),
                format!(
                    "alternative {} out of range, choice has {}",
                    alternative,
                    alternatives.len()
                ),
            ));
        }
        let current = self.choice_selections[choice];
        if current == alternative {
            return Ok(());
        }

        let outgoing = &alternatives[current].handler;
        let old_width = width_of(outgoing, &self.array_lengths, &self.choice_selections);
        reset_slots(
            outgoing,
            binding.default_lengths(),
            &mut self.array_lengths,
            &mut self.choice_selections,
        );
        let mut fresh = Vec::new();
        alternatives[alternative].handler.append_defaults(&mut fresh);
        self.atoms.splice(offset..offset + old_width, fresh);
        self.choice_selections[choice] = alternative;
        Ok(())
    }

    /// Resolve a dotted path to the flat offset of a scalar atom.
    ///
    /// Segments are field names; array elements are addressed with
    /// `name[i]` (and `name[i][j]` for directly nested arrays). A choice
    /// segment must name the currently selected alternative. The offset is
    /// only valid until the next layout mutation.
    pub fn atom_offset(&self, path: &str) -> BlockResult<usize> {
        let binding = Arc::clone(&self.binding);
        let mut handler = binding.root();
        let mut offset = 0usize;

        for segment in path.split('.') {
            let (name, indices) = parse_segment(path, segment)?;
            if name.is_empty() && indices.is_empty() {
                return Err(bad_path(path, "empty path segment"));
            }
            if !name.is_empty() {
                handler = match handler {
                    Handler::Record { fields }
                    | Handler::Vector {
                        coordinates: fields,
                    } => {
                        let mut next = None;
                        for field in fields {
                            if field.name == name {
                                next = Some(&field.handler);
                                break;
                            }
                            offset += width_of(
                                &field.handler,
                                &self.array_lengths,
                                &self.choice_selections,
                            );
                        }
                        next.ok_or_else(|| {
                            bad_path(path, format!("no field named '{}'", name))
                        })?
                    }
                    Handler::Choice {
                        index,
                        alternatives,
                    } => {
                        let position = alternatives
                            .iter()
                            .position(|alt| alt.name == name)
                            .ok_or_else(|| {
                                bad_path(path, format!("no alternative named '{}'", name))
                            })?;
                        if position != self.choice_selections[*index] {
                            return Err(bad_path(
                                path,
                                format!("alternative '{}' is not selected", name),
                            ));
                        }
                        &alternatives[position].handler
                    }
                    other => {
                        return Err(bad_path(
                            path,
                            format!("'{}' cannot be resolved inside a {}", name, node_name(other)),
                        ));
                    }
                };
            }
            for idx in indices {
                handler = match handler {
                    Handler::Array {
                        index,
                        elem_width,
                        element,
                        ..
                    } => {
                        let len = self.array_lengths[*index];
                        if idx >= len {
                            return Err(bad_path(
                                path,
                                format!("index {} out of range, length is {}", idx, len),
                            ));
                        }
                        offset += idx * elem_width;
                        element.as_ref()
                    }
                    other => {
                        return Err(bad_path(
                            path,
                            format!("indexed a {}, not an array", node_name(other)),
                        ));
                    }
                };
            }
        }

        match handler {
            Handler::Scalar { .. } => Ok(offset),
            other => Err(bad_path(
                path,
                format!("path names a {}, not an atom", node_name(other)),
            )),
        }
    }

    /// Read a boolean atom
    pub fn get_bool(&self, path: &str) -> BlockResult<bool> {
        let atom = self.atom_ref(path)?;
        atom.value()
            .as_bool()
            .ok_or_else(|| mismatch(path, atom, "bool"))
    }

    /// Read an integer atom; works on counts and on times as raw epoch
    /// milliseconds
    pub fn get_int(&self, path: &str) -> BlockResult<i64> {
        let atom = self.atom_ref(path)?;
        atom.value()
            .as_int()
            .ok_or_else(|| mismatch(path, atom, "int"))
    }

    /// Read a quantity atom
    pub fn get_double(&self, path: &str) -> BlockResult<f64> {
        let atom = self.atom_ref(path)?;
        atom.value()
            .as_double()
            .ok_or_else(|| mismatch(path, atom, "double"))
    }

    /// Read a text or category atom
    pub fn get_text(&self, path: &str) -> BlockResult<&str> {
        let index = self.atom_offset(path)?;
        let atom = &self.atoms[index];
        atom.value()
            .as_text()
            .ok_or_else(|| mismatch(path, atom, "text"))
    }

    /// Read a time atom as a UTC instant
    pub fn get_time(&self, path: &str) -> BlockResult<DateTime<Utc>> {
        let atom = self.atom_ref(path)?;
        match (atom.kind(), atom.value()) {
            (ScalarKind::Time, AtomValue::Int(ms)) => {
                Utc.timestamp_millis_opt(*ms).single().ok_or_else(|| {
                    BlockError::at(
                        BlockErrorCode::TimeRange,
                        path,
                        format!("{} ms is outside the representable time range", ms),
                    )
                })
            }
            _ => Err(mismatch(path, atom, "time")),
        }
    }

    /// Write a boolean atom
    pub fn set_bool(&mut self, path: &str, value: bool) -> BlockResult<()> {
        let index = self.atom_offset(path)?;
        self.set_atom(index, AtomValue::Bool(value))
    }

    /// Write an integer atom; works on counts and on times as raw epoch
    /// milliseconds. Writing a count does not resize any linked array;
    /// encoders flag the disagreement instead.
    pub fn set_int(&mut self, path: &str, value: i64) -> BlockResult<()> {
        let index = self.atom_offset(path)?;
        self.set_atom(index, AtomValue::Int(value))
    }

    /// Write a quantity atom
    pub fn set_double(&mut self, path: &str, value: f64) -> BlockResult<()> {
        let index = self.atom_offset(path)?;
        self.set_atom(index, AtomValue::Double(value))
    }

    /// Write a text or category atom
    pub fn set_text(&mut self, path: &str, value: impl Into<String>) -> BlockResult<()> {
        let index = self.atom_offset(path)?;
        self.set_atom(index, AtomValue::Text(value.into()))
    }

    /// Write a time atom from a UTC instant
    pub fn set_time(&mut self, path: &str, value: DateTime<Utc>) -> BlockResult<()> {
        let index = self.atom_offset(path)?;
        if self.atoms[index].kind() != ScalarKind::Time {
            let atom = &self.atoms[index];
            return Err(mismatch(path, atom, "time"));
        }
        self.set_atom(index, AtomValue::Int(value.timestamp_millis()))
    }

    /// Write an atom at a flat offset, checking the value variant against
    /// the declared kind. Clears any decode span on the atom.
    pub fn set_atom(&mut self, index: usize, value: AtomValue) -> BlockResult<()> {
        let atom = self.atoms.get_mut(index).ok_or_else(|| {
            BlockError::at(
                BlockErrorCode::BadIndex,
                format!("atom {}", index),
                "atom offset out of range",
            )
        })?;
        if !value.matches_kind(atom.kind()) {
            return Err(BlockError::at(
                BlockErrorCode::TypeMismatch,
                format!("atom {}", index),
                format!(
                    "{} value against a {} atom",
                    value.type_name(),
                    atom.kind().kind_name()
                ),
            ));
        }
        atom.value = value;
        atom.span = None;
        Ok(())
    }

    /// Write a decoded atom together with the byte span it came from
    pub(crate) fn set_decoded(
        &mut self,
        index: usize,
        value: AtomValue,
        span: Option<ByteSpan>,
    ) -> BlockResult<()> {
        self.set_atom(index, value)?;
        if span.is_some() {
            self.atoms[index].span = span;
        }
        Ok(())
    }

    pub(crate) fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub(crate) fn lengths(&self) -> &[usize] {
        &self.array_lengths
    }

    pub(crate) fn selections(&self) -> &[usize] {
        &self.choice_selections
    }

    fn atom_ref(&self, path: &str) -> BlockResult<&Atom> {
        let index = self.atom_offset(path)?;
        Ok(&self.atoms[index])
    }
}

/// Value equality over the same binding instance; decode spans are
/// deliberately excluded so a decoded block compares equal to the block
/// that produced it.
impl PartialEq for DataBlock {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.binding, &other.binding)
            && self.array_lengths == other.array_lengths
            && self.choice_selections == other.choice_selections
            && self.atoms.len() == other.atoms.len()
            && self
                .atoms
                .iter()
                .zip(&other.atoms)
                .all(|(a, b)| a.kind() == b.kind() && a.value() == b.value())
    }
}

/// Width in atoms of a subtree under the given lengths and selections.
fn width_of(handler: &Handler, lengths: &[usize], selections: &[usize]) -> usize {
    match handler {
        Handler::Scalar { .. } => 1,
        Handler::Record { fields } => fields
            .iter()
            .map(|f| width_of(&f.handler, lengths, selections))
            .sum(),
        Handler::Vector { coordinates } => coordinates.len(),
        Handler::Array {
            index, elem_width, ..
        } => lengths[*index] * elem_width,
        Handler::Choice {
            index,
            alternatives,
        } => width_of(&alternatives[selections[*index]].handler, lengths, selections),
    }
}

struct ArrayProbe {
    target: usize,
    register: usize,
    array_offset: Option<usize>,
    count_offset: Option<usize>,
}

/// One pass over the current layout finding a linked array's subtree
/// offset and its governing count atom. Returns the subtree width. Array
/// elements are skipped: linked arrays and referenced counts cannot nest
/// inside them.
fn probe_array(
    handler: &Handler,
    base: usize,
    lengths: &[usize],
    selections: &[usize],
    probe: &mut ArrayProbe,
) -> usize {
    match handler {
        Handler::Scalar { size_register, .. } => {
            if *size_register == Some(probe.register) {
                probe.count_offset = Some(base);
            }
            1
        }
        Handler::Record { fields } => {
            let mut width = 0;
            for field in fields {
                width += probe_array(&field.handler, base + width, lengths, selections, probe);
            }
            width
        }
        Handler::Vector { coordinates } => {
            let mut width = 0;
            for coord in coordinates {
                width += probe_array(&coord.handler, base + width, lengths, selections, probe);
            }
            width
        }
        Handler::Array {
            index, elem_width, ..
        } => {
            if *index == probe.target {
                probe.array_offset = Some(base);
            }
            lengths[*index] * elem_width
        }
        Handler::Choice {
            index,
            alternatives,
        } => probe_array(
            &alternatives[selections[*index]].handler,
            base,
            lengths,
            selections,
            probe,
        ),
    }
}

/// One pass over the current layout finding a choice's subtree offset and
/// alternative list. Returns the subtree width and the find.
fn probe_choice<'h>(
    handler: &'h Handler,
    base: usize,
    target: usize,
    lengths: &[usize],
    selections: &[usize],
) -> (usize, Option<(usize, &'h [BoundField])>) {
    match handler {
        Handler::Scalar { .. } => (1, None),
        Handler::Record { fields } => {
            let mut width = 0;
            let mut found = None;
            for field in fields {
                let (w, f) = probe_choice(&field.handler, base + width, target, lengths, selections);
                width += w;
                found = found.or(f);
            }
            (width, found)
        }
        Handler::Vector { coordinates } => (coordinates.len(), None),
        Handler::Array {
            index, elem_width, ..
        } => (lengths[*index] * elem_width, None),
        Handler::Choice {
            index,
            alternatives,
        } => {
            let selected = selections[*index];
            let (width, found) = probe_choice(
                &alternatives[selected].handler,
                base,
                target,
                lengths,
                selections,
            );
            if *index == target {
                (width, Some((base, alternatives.as_slice())))
            } else {
                (width, found)
            }
        }
    }
}

/// Reset every array length and choice selection in a subtree to its
/// default, across all alternatives of nested choices.
fn reset_slots(
    handler: &Handler,
    default_lengths: &[usize],
    lengths: &mut [usize],
    selections: &mut [usize],
) {
    match handler {
        Handler::Scalar { .. } => {}
        Handler::Record { fields } => {
            for field in fields {
                reset_slots(&field.handler, default_lengths, lengths, selections);
            }
        }
        Handler::Vector { .. } => {}
        Handler::Array { index, element, .. } => {
            lengths[*index] = default_lengths[*index];
            reset_slots(element, default_lengths, lengths, selections);
        }
        Handler::Choice {
            index,
            alternatives,
        } => {
            selections[*index] = 0;
            for alt in alternatives {
                reset_slots(&alt.handler, default_lengths, lengths, selections);
            }
        }
    }
}

fn node_name(handler: &Handler) -> &'static str {
    match handler {
        Handler::Scalar { .. } => "scalar",
        Handler::Record { .. } => "record",
        Handler::Vector { .. } => "vector",
        Handler::Array { .. } => "array",
        Handler::Choice { .. } => "choice",
    }
}

fn bad_path(path: &str, message: impl Into<String>) -> BlockError {
    BlockError::at(BlockErrorCode::BadPath, path, message)
}

fn mismatch(path: &str, atom: &Atom, want: &str) -> BlockError {
    BlockError::at(
        BlockErrorCode::TypeMismatch,
        path,
        format!("atom is {}, not {}", atom.kind().kind_name(), want),
    )
}

/// Split one path segment into its name and trailing `[i]` indices.
fn parse_segment<'s>(path: &str, segment: &'s str) -> BlockResult<(&'s str, Vec<usize>)> {
    let (name, mut rest) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => (segment, ""),
    };
    let mut indices = Vec::new();
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(bad_path(
                path,
                format!("malformed index in segment '{}'", segment),
            ));
        }
        let close = rest.find(']').ok_or_else(|| {
            bad_path(path, format!("unterminated index in segment '{}'", segment))
        })?;
        let digits = &rest[1..close];
        let index = digits
            .parse::<usize>()
            .map_err(|_| bad_path(path, format!("bad array index '{}'", digits)))?;
        indices.push(index);
        rest = &rest[close + 1..];
    }
    Ok((name, indices))
}
