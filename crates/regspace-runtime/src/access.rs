//! Access-policy checks and field-write planning.
//!
//! Everything here is pure: it decides what the engines may do and what
//! word they will write, without touching a transport. Both the blocking
//! and the async engine go through these functions, so every policy
//! check happens before the first bus transaction.

use regspace_model::{AccessPolicy, BitField};

use crate::error::{Operation, Result, RuntimeError};
use crate::handle::RegisterHandle;

/// How a field write turns the current word into the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWrite {
    /// Read-modify-write: `(current & !mask) | bits`.
    Merge { mask: u64, bits: u64, read_current: bool },
    /// Write-1-to-clear: `current & !bits` when the register is readable,
    /// otherwise the bare ones word `bits` for the hardware to act on.
    ClearOnes { bits: u64, read_current: bool },
    /// Self-clearing write of `bits` into an all-zero word.
    Pulse { bits: u64 },
}

impl FieldWrite {
    /// Whether the engine must read the current word first.
    pub fn reads_current(&self) -> bool {
        match *self {
            FieldWrite::Merge { read_current, .. } | FieldWrite::ClearOnes { read_current, .. } => {
                read_current
            }
            FieldWrite::Pulse { .. } => false,
        }
    }

    /// The word to write given the current one (0 when not read).
    pub fn apply(&self, current: u64) -> u64 {
        match *self {
            FieldWrite::Merge { mask, bits, .. } => (current & !mask) | bits,
            FieldWrite::ClearOnes {
                bits,
                read_current: true,
            } => current & !bits,
            FieldWrite::ClearOnes {
                bits,
                read_current: false,
            } => bits,
            FieldWrite::Pulse { bits } => bits,
        }
    }
}

fn violation(
    handle: &RegisterHandle,
    field: Option<&BitField>,
    policy: AccessPolicy,
    operation: Operation,
) -> RuntimeError {
    RuntimeError::AccessViolation {
        path: handle.path().to_string(),
        field: field.map(|f| f.name.clone()),
        policy,
        operation,
    }
}

/// Check a whole-register read.
pub fn check_read(handle: &RegisterHandle) -> Result<()> {
    let policy = handle.register().access;
    if policy.is_readable() {
        Ok(())
    } else {
        Err(violation(handle, None, policy, Operation::Read))
    }
}

/// Check a whole-register write of `word`.
pub fn check_write(handle: &RegisterHandle, word: u64) -> Result<()> {
    let register = handle.register();
    if !register.access.is_writable() {
        return Err(violation(handle, None, register.access, Operation::Write));
    }
    if word & !register.word_mask() != 0 {
        return Err(RuntimeError::ValueOutOfRange {
            path: handle.path().to_string(),
            value: word,
            width: register.width,
        });
    }
    Ok(())
}

/// Check a field read, returning the field to extract.
///
/// The register must be readable as a whole before any field policy applies.
pub fn check_field_read<'h>(handle: &'h RegisterHandle, name: &str) -> Result<&'h BitField> {
    let field = handle.field(name)?;
    let register_policy = handle.register().access;
    if !register_policy.is_readable() {
        return Err(violation(handle, Some(field), register_policy, Operation::Read));
    }
    match field.access {
        AccessPolicy::ReadOnly | AccessPolicy::ReadWrite | AccessPolicy::ReadWriteOneToClear => {
            Ok(field)
        }
        AccessPolicy::WriteOnly | AccessPolicy::WriteOneToClear => Err(violation(
            handle,
            Some(field),
            field.access,
            Operation::Read,
        )),
    }
}

/// Decide how writing `value` to field `name` is carried out.
pub fn plan_field_write(handle: &RegisterHandle, name: &str, value: u64) -> Result<FieldWrite> {
    let field = handle.field(name)?;
    let register_readable = handle.register().access.is_readable();

    let plan = match field.access {
        AccessPolicy::ReadOnly => {
            return Err(violation(handle, Some(field), field.access, Operation::Write))
        }
        AccessPolicy::ReadWrite => FieldWrite::Merge {
            mask: field.mask(),
            bits: field.insert(value),
            read_current: register_readable,
        },
        AccessPolicy::WriteOneToClear | AccessPolicy::ReadWriteOneToClear => {
            FieldWrite::ClearOnes {
                bits: field.insert(value),
                read_current: register_readable,
            }
        }
        AccessPolicy::WriteOnly => FieldWrite::Pulse {
            bits: field.insert(value),
        },
    };

    if !field.fits(value) {
        return Err(RuntimeError::ValueOutOfRange {
            path: format!("{}.{}", handle.path(), field.name),
            value,
            width: field.bit_width,
        });
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regspace_model::Register;

    fn handle(register_access: AccessPolicy, field_access: AccessPolicy) -> RegisterHandle {
        RegisterHandle::from_parts(
            "soc.b.R",
            0x40,
            Register {
                name: "R".into(),
                description: None,
                offset: 0,
                width: 8,
                access: register_access,
                reset_value: None,
                fields: vec![BitField {
                    name: "F".into(),
                    description: None,
                    bit_offset: 0,
                    bit_width: 4,
                    access: field_access,
                    reset_value: None,
                }],
                instance: None,
            },
        )
    }

    #[test]
    fn policy_dispatch() {
        use AccessPolicy::*;
        let cases = [
            (ReadWrite, true, true),
            (ReadOnly, true, false),
            (WriteOnly, false, true),
            (WriteOneToClear, false, true),
            (ReadWriteOneToClear, true, true),
        ];
        for (policy, readable, writable) in cases {
            let h = handle(ReadWrite, policy);
            assert_eq!(check_field_read(&h, "F").is_ok(), readable, "{policy}");
            assert_eq!(plan_field_write(&h, "F", 1).is_ok(), writable, "{policy}");
        }
    }

    #[test]
    fn write_one_to_clear_word() {
        let h = handle(AccessPolicy::ReadWrite, AccessPolicy::WriteOneToClear);
        let plan = plan_field_write(&h, "F", 0b0100).unwrap();
        assert!(plan.reads_current());
        assert_eq!(plan.apply(0b0111), 0b0011);
    }

    #[test]
    fn clear_without_readable_register_sends_ones() {
        let h = handle(AccessPolicy::WriteOneToClear, AccessPolicy::WriteOneToClear);
        let plan = plan_field_write(&h, "F", 0b0001).unwrap();
        assert!(!plan.reads_current());
        assert_eq!(plan.apply(0), 0b0001);
        assert_eq!(
            plan_field_write(&h, "F", 0b1010).unwrap().apply(0),
            0b1010
        );
    }

    #[test]
    fn field_read_needs_readable_register() {
        let h = handle(AccessPolicy::WriteOnly, AccessPolicy::ReadWrite);
        match check_field_read(&h, "F") {
            Err(RuntimeError::AccessViolation {
                field,
                policy,
                operation,
                ..
            }) => {
                assert_eq!(field.as_deref(), Some("F"));
                assert_eq!(policy, AccessPolicy::WriteOnly);
                assert_eq!(operation, Operation::Read);
            }
            other => panic!("unexpected {other:?}"),
        }
        let w1c = handle(AccessPolicy::WriteOneToClear, AccessPolicy::ReadOnly);
        assert!(check_field_read(&w1c, "F").is_err());
    }

    #[test]
    fn merge_and_pulse() {
        let rw = plan_field_write(&handle(AccessPolicy::ReadWrite, AccessPolicy::ReadWrite), "F", 0x5)
            .unwrap();
        assert_eq!(rw.apply(0xF3), 0xF5);

        let pulse = plan_field_write(&handle(AccessPolicy::ReadWrite, AccessPolicy::WriteOnly), "F", 0x1)
            .unwrap();
        assert!(!pulse.reads_current());
        assert_eq!(pulse.apply(0xF0), 0x1);
    }

    #[test]
    fn out_of_range_values() {
        let h = handle(AccessPolicy::ReadWrite, AccessPolicy::ReadWrite);
        assert!(matches!(
            plan_field_write(&h, "F", 0x10),
            Err(RuntimeError::ValueOutOfRange { width: 4, .. })
        ));
        assert!(matches!(
            check_write(&h, 0x100),
            Err(RuntimeError::ValueOutOfRange { width: 8, .. })
        ));
        assert!(check_write(&h, 0xFF).is_ok());
    }

    #[test]
    fn register_level_checks() {
        assert!(check_read(&handle(AccessPolicy::WriteOnly, AccessPolicy::WriteOnly)).is_err());
        assert!(check_write(&handle(AccessPolicy::ReadOnly, AccessPolicy::ReadOnly), 0).is_err());
        assert!(matches!(
            check_field_read(&handle(AccessPolicy::ReadWrite, AccessPolicy::ReadWrite), "NOPE"),
            Err(RuntimeError::UnknownField { .. })
        ));
    }
}
