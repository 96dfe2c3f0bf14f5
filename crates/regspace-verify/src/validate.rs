//! The invariant walk over a canonical model.
//!
//! Every check runs to completion and appends to one list. Checks run in a
//! fixed order, each over the whole model, so two runs over the same model
//! report the same violations in the same order.

use std::collections::BTreeSet;

use regspace_model::{CanonicalModel, NamedRef, Resolution};

use crate::violation::{Violation, ViolationKind};

/// Validate a model. Returns `(is_valid, violations)`, where `is_valid`
/// means no Error-severity violation was found.
pub fn validate(model: &CanonicalModel) -> (bool, Vec<Violation>) {
    let mut validator = Validator::new(model);
    validator.check_field_overlap();
    validator.check_field_bounds();
    validator.check_register_overlap();
    validator.check_block_overlap();
    validator.check_reset_range();
    validator.check_references();
    validator.check_alignment();
    validator.check_duplicate_names();
    validator.check_array_stride();

    let violations = validator.violations;
    let is_valid = !violations.iter().any(Violation::is_error);
    tracing::debug!(
        violations = violations.len(),
        is_valid,
        "validated canonical model"
    );
    (is_valid, violations)
}

/// Every overlapping pair among half-open intervals `(start, end, id)`.
///
/// Pairs come out ordered by the later interval's start, each as
/// `(earlier, later)`. Empty intervals overlap nothing.
pub fn overlapping_pairs<T: Copy>(mut intervals: Vec<(u64, u64, T)>) -> Vec<(T, T)> {
    intervals.retain(|(start, end, _)| end > start);
    intervals.sort_by_key(|(start, end, _)| (*start, *end));

    let mut pairs = Vec::new();
    let mut active: Vec<(u64, T)> = Vec::new();
    for (start, end, id) in intervals {
        active.retain(|(active_end, _)| *active_end > start);
        pairs.extend(active.iter().map(|(_, other)| (*other, id)));
        active.push((end, id));
    }
    pairs
}

struct Validator<'a> {
    model: &'a CanonicalModel,
    violations: Vec<Violation>,
}

impl<'a> Validator<'a> {
    fn new(model: &'a CanonicalModel) -> Self {
        Self {
            model,
            violations: Vec::new(),
        }
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    fn check_field_overlap(&mut self) {
        let model = self.model;
        for entry in model.registers() {
            let fields = &entry.register.fields;
            let intervals = fields
                .iter()
                .enumerate()
                .map(|(i, f)| (u64::from(f.bit_offset), u64::from(f.bit_end()), i))
                .collect();
            for (a, b) in overlapping_pairs(intervals) {
                let (a, b) = (&fields[a], &fields[b]);
                let register = entry.path();
                self.push(
                    Violation::new(
                        ViolationKind::FieldOverlap,
                        format!("{register}.{}", b.name),
                        format!(
                            "fields `{}` [{}:{}] and `{}` [{}:{}] overlap",
                            a.name,
                            a.bit_end() - 1,
                            a.bit_offset,
                            b.name,
                            b.bit_end() - 1,
                            b.bit_offset
                        ),
                    )
                    .with_related(format!("{register}.{}", a.name)),
                );
            }
        }
    }

    fn check_field_bounds(&mut self) {
        let model = self.model;
        for entry in model.fields() {
            if entry.field.bit_end() > entry.register.width {
                self.push(Violation::new(
                    ViolationKind::FieldBounds,
                    entry.path(),
                    format!(
                        "field occupies bits up to {} but register `{}` is {} bits wide",
                        entry.field.bit_end() - 1,
                        entry.register.name,
                        entry.register.width
                    ),
                ));
            }
        }
    }

    fn check_register_overlap(&mut self) {
        let model = self.model;
        for block in model.blocks() {
            let registers = &block.block.registers;
            let intervals = registers
                .iter()
                .enumerate()
                .map(|(i, r)| (r.offset, r.end(), i))
                .collect();
            for (a, b) in overlapping_pairs(intervals) {
                let (a, b) = (&registers[a], &registers[b]);
                let path = block.path();
                self.push(
                    Violation::new(
                        ViolationKind::RegisterOverlap,
                        format!("{path}.{}", b.name),
                        format!(
                            "registers `{}` at {:#x} and `{}` at {:#x} overlap",
                            a.name, a.offset, b.name, b.offset
                        ),
                    )
                    .with_related(format!("{path}.{}", a.name)),
                );
            }
        }
    }

    fn check_block_overlap(&mut self) {
        let model = self.model;
        for map in model.memory_maps() {
            let intervals = map
                .blocks
                .iter()
                .enumerate()
                .map(|(i, b)| (b.base_offset, b.end(), i))
                .collect();
            for (a, b) in overlapping_pairs(intervals) {
                let (a, b) = (&map.blocks[a], &map.blocks[b]);
                self.push(
                    Violation::new(
                        ViolationKind::BlockOverlap,
                        format!("{}.{}", map.name, b.name),
                        format!(
                            "blocks `{}` [{:#x}, {:#x}) and `{}` [{:#x}, {:#x}) overlap",
                            a.name,
                            a.base_offset,
                            a.end(),
                            b.name,
                            b.base_offset,
                            b.end()
                        ),
                    )
                    .with_related(format!("{}.{}", map.name, a.name)),
                );
            }
        }
    }

    fn check_reset_range(&mut self) {
        let mut found = Vec::new();
        for entry in self.model.registers() {
            let register = entry.register;
            if let Some(reset) = register.reset_value {
                if reset & !register.word_mask() != 0 {
                    found.push(Violation::new(
                        ViolationKind::ResetRange,
                        entry.path(),
                        format!(
                            "reset value {reset:#x} does not fit in {} bits",
                            register.width
                        ),
                    ));
                }
            }
            for field in &register.fields {
                if let Some(reset) = field.reset_value {
                    if !field.fits(reset) {
                        found.push(Violation::new(
                            ViolationKind::ResetRange,
                            format!("{}.{}", entry.path(), field.name),
                            format!(
                                "reset value {reset:#x} does not fit in {} bits",
                                field.bit_width
                            ),
                        ));
                    }
                }
            }
        }
        self.violations.extend(found);
    }

    fn check_references(&mut self) {
        let model = self.model;
        for iface in model.bus_interfaces() {
            for reference in iface.references() {
                if model.is_resolved(reference) {
                    continue;
                }
                if let Some(v) = reference_violation(model, &iface.name, reference) {
                    self.push(v);
                }
            }
        }
    }

    fn check_alignment(&mut self) {
        let mut found = Vec::new();
        for entry in self.model.registers() {
            let size = entry.register.size_bytes();
            let address = entry.address();
            if size > 1 && address % size != 0 {
                found.push(Violation::new(
                    ViolationKind::Alignment,
                    entry.path(),
                    format!(
                        "register at {address:#x} is not aligned to its {size}-byte width"
                    ),
                ));
            }
        }
        self.violations.extend(found);
    }

    fn check_duplicate_names(&mut self) {
        let model = self.model;
        let top_level: [(&str, Vec<&str>); 4] = [
            ("memory map", model.memory_maps().iter().map(|m| m.name.as_str()).collect()),
            ("clock", model.clocks().iter().map(|c| c.name.as_str()).collect()),
            ("reset", model.resets().iter().map(|r| r.name.as_str()).collect()),
            (
                "bus interface",
                model.bus_interfaces().iter().map(|i| i.name.as_str()).collect(),
            ),
        ];
        for (what, names) in top_level {
            self.duplicates(what, "", names);
        }
        for map in model.memory_maps() {
            self.duplicates(
                "block",
                &format!("{}.", map.name),
                map.blocks.iter().map(|b| b.name.as_str()).collect(),
            );
        }
        for block in model.blocks() {
            self.duplicates(
                "register",
                &format!("{}.", block.path()),
                block.block.registers.iter().map(|r| r.name.as_str()).collect(),
            );
        }
        for entry in model.registers() {
            self.duplicates(
                "field",
                &format!("{}.", entry.path()),
                entry.register.fields.iter().map(|f| f.name.as_str()).collect(),
            );
        }
    }

    /// Report every repeat of an already-seen name.
    fn duplicates(&mut self, what: &str, prefix: &str, names: Vec<&str>) {
        let mut seen = BTreeSet::new();
        for name in names {
            if !seen.insert(name) {
                self.push(Violation::new(
                    ViolationKind::DuplicateName,
                    format!("{prefix}{name}"),
                    format!("{what} `{name}` is declared more than once"),
                ));
            }
        }
    }

    fn check_array_stride(&mut self) {
        let mut found = Vec::new();
        for block in self.model.blocks() {
            for array in &block.block.arrays {
                let span = array.span();
                if array.descriptor.count > 1 && array.descriptor.stride < span {
                    found.push(Violation::new(
                        ViolationKind::ArrayStride,
                        format!("{}.{}", block.path(), array.name),
                        format!(
                            "stride {:#x} is smaller than the {span:#x}-byte instance",
                            array.descriptor.stride
                        ),
                    ));
                }
            }
        }
        self.violations.extend(found);
    }
}

fn reference_violation(
    model: &CanonicalModel,
    interface: &str,
    reference: &NamedRef,
) -> Option<Violation> {
    match model.resolve(reference) {
        Resolution::Resolved => None,
        Resolution::Missing => Some(
            Violation::new(
                ViolationKind::DanglingReference,
                interface,
                format!(
                    "bus interface `{interface}` references undeclared {} `{}`",
                    reference.kind, reference.name
                ),
            )
            .with_related(reference.name.clone()),
        ),
        Resolution::WrongKind(kinds) => {
            let declared: Vec<String> = kinds.iter().map(ToString::to_string).collect();
            Some(
                Violation::new(
                    ViolationKind::ReferenceKindMismatch,
                    interface,
                    format!(
                        "bus interface `{interface}` expects {} `{}`, which is declared as {}",
                        reference.kind,
                        reference.name,
                        declared.join(" and ")
                    ),
                )
                .with_related(reference.name.clone()),
            )
        }
    }
}
