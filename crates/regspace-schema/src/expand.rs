//! Array expansion: normalized blocks and interfaces into canonical entities.

use std::collections::BTreeMap;

use regspace_model::{
    expand_pattern, AddressBlock, ArrayDescriptor, ArrayInstance, BitField, BusInterface,
    EntityKind, MemoryMap, NamedRef, Register, RegisterArray,
};

use crate::bits::FieldPlacer;
use crate::error::{ResolveError, Result};
use crate::normalize::{
    infer_block_size, ArrayBody, NormArray, NormBlock, NormInterface, NormMap, NormRegister,
    NormTemplate, RegisterEntry,
};
use crate::options::ResolveOptions;

/// State shared by one resolution pass: options and the legacy template
/// table. Nothing outlives the pass.
#[derive(Debug)]
pub struct ResolutionContext<'a> {
    options: &'a ResolveOptions,
    templates: &'a BTreeMap<String, NormTemplate>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(options: &'a ResolveOptions, templates: &'a BTreeMap<String, NormTemplate>) -> Self {
        Self { options, templates }
    }

    pub fn expand_map(&self, map: &NormMap) -> Result<MemoryMap> {
        let blocks = map
            .blocks
            .iter()
            .map(|block| self.expand_block(block))
            .collect::<Result<Vec<_>>>()?;
        Ok(MemoryMap {
            name: map.name.clone(),
            description: map.description.clone(),
            blocks,
        })
    }

    /// Expand one block. Registers without an explicit offset are placed at
    /// the byte cursor, which follows the last placed entry.
    pub fn expand_block(&self, block: &NormBlock) -> Result<AddressBlock> {
        let mut registers = Vec::new();
        let mut arrays = Vec::new();
        let mut cursor = 0u64;

        for entry in &block.entries {
            match entry {
                RegisterEntry::Register(reg) => {
                    let register = resolve_register(reg, cursor)?;
                    cursor = register.end();
                    registers.push(register);
                }
                RegisterEntry::Reserved { bytes, .. } => {
                    cursor = cursor.saturating_add(*bytes);
                }
                RegisterEntry::Array(array) => {
                    let array = self.expand_array(array, cursor)?;
                    cursor = array.end();
                    registers.extend(array.expand());
                    arrays.push(array);
                }
            }
        }

        let size = match block.size {
            Some(size) => size,
            None => infer_block_size(&registers, self.options),
        };
        tracing::debug!(
            block = %block.path,
            registers = registers.len(),
            arrays = arrays.len(),
            size,
            "expanded block"
        );
        Ok(AddressBlock {
            name: block.name.clone(),
            description: block.description.clone(),
            base_offset: block.base_offset,
            size,
            usage: block.usage,
            registers,
            arrays,
        })
    }

    fn expand_array(&self, array: &NormArray, cursor: u64) -> Result<RegisterArray> {
        let entries = match &array.body {
            ArrayBody::Inline(entries) => entries,
            ArrayBody::Template(name) => {
                &self
                    .templates
                    .get(name)
                    .ok_or_else(|| {
                        ResolveError::schema(
                            &array.path,
                            format!("unknown register template `{name}`"),
                        )
                    })?
                    .entries
            }
        };
        let registers = resolve_template(entries)?;
        let span = registers.iter().map(Register::end).max().unwrap_or(0);
        let stride = array
            .stride
            .unwrap_or_else(|| span.max(1).next_power_of_two());
        if array.stride.is_none() {
            tracing::debug!(array = %array.path, span, stride, "defaulted array stride");
        }
        let offset = array.offset.unwrap_or(cursor);
        let last_end = array
            .count
            .saturating_sub(1)
            .checked_mul(stride)
            .and_then(|base| base.checked_add(span))
            .and_then(|end| end.checked_add(offset));
        if last_end.is_none() {
            return Err(ResolveError::schema(
                &array.path,
                format!(
                    "{} instances at stride {stride:#x} from {offset:#x} run past the address space",
                    array.count
                ),
            ));
        }
        Ok(RegisterArray {
            name: array.name.clone(),
            offset,
            descriptor: ArrayDescriptor {
                count: array.count,
                stride,
                index_start: array.index_start,
                naming: array.naming.clone(),
                prefix: None,
            },
            registers,
        })
    }
}

/// Resolve an array body into template registers at offsets relative to
/// the instance base.
fn resolve_template(entries: &[RegisterEntry]) -> Result<Vec<Register>> {
    let mut registers = Vec::new();
    let mut cursor = 0u64;
    for entry in entries {
        match entry {
            RegisterEntry::Register(reg) => {
                let register = resolve_register(reg, cursor)?;
                cursor = register.end();
                registers.push(register);
            }
            RegisterEntry::Reserved { bytes, .. } => cursor = cursor.saturating_add(*bytes),
            RegisterEntry::Array(nested) => {
                return Err(ResolveError::schema(
                    &nested.path,
                    "nested register arrays are not supported",
                ))
            }
        }
    }
    Ok(registers)
}

/// Resolve a register's offset and its fields' bit positions.
pub fn resolve_register(reg: &NormRegister, cursor: u64) -> Result<Register> {
    let mut placer = FieldPlacer::new();
    let mut fields = Vec::with_capacity(reg.fields.len());
    for field in &reg.fields {
        let (bit_offset, bit_width) = placer.place(&field.placement, &field.path)?;
        fields.push(BitField {
            name: field.name.clone(),
            description: field.description.clone(),
            bit_offset,
            bit_width,
            access: field.access.unwrap_or(reg.access),
            reset_value: field.reset_value,
        });
    }
    Ok(Register {
        name: reg.name.clone(),
        description: reg.description.clone(),
        offset: reg.offset.unwrap_or(cursor),
        width: reg.width,
        access: reg.access,
        reset_value: reg.reset_value,
        fields,
        instance: None,
    })
}

/// Expand a bus interface, replicating it when it carries an array.
pub fn expand_interface(iface: &NormInterface) -> Vec<BusInterface> {
    let reference = |kind, name: &Option<String>| {
        name.as_ref().map(|n| NamedRef::new(kind, n.clone()))
    };
    let template = BusInterface {
        name: iface.name.clone(),
        physical_prefix: iface
            .physical_prefix
            .clone()
            .unwrap_or_else(|| format!("{}_", iface.name)),
        protocol: iface.protocol.clone(),
        mode: iface.mode,
        base_address: iface.base_address,
        instance: None,
        clock: reference(EntityKind::Clock, &iface.clock),
        reset: reference(EntityKind::Reset, &iface.reset),
        memory_map: reference(EntityKind::MemoryMap, &iface.memory_map),
    };

    let Some(array) = &iface.array else {
        return vec![template];
    };
    let descriptor = ArrayDescriptor {
        count: array.count,
        stride: array.stride,
        index_start: array.index_start,
        naming: array.naming.clone(),
        prefix: array.prefix.clone(),
    };
    let naming = descriptor
        .naming
        .clone()
        .unwrap_or_else(|| format!("{}_{{index}}", iface.name));
    let prefix = descriptor
        .prefix
        .clone()
        .unwrap_or_else(|| format!("{}_{{index}}_", iface.name));

    (0..descriptor.count)
        .map(|i| {
            let index = descriptor.index_of(i);
            BusInterface {
                name: expand_pattern(&naming, index),
                physical_prefix: expand_pattern(&prefix, index),
                base_address: iface
                    .base_address
                    .map(|base| base.saturating_add(descriptor.offset_of(i))),
                instance: Some(ArrayInstance {
                    array: iface.name.clone(),
                    index,
                }),
                ..template.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_sections;
    use crate::normalize::{normalize, NormalizedDocument};
    use regspace_model::AccessPolicy;

    fn norm(text: &str) -> NormalizedDocument {
        normalize(&parse_sections(text).unwrap(), &ResolveOptions::default()).unwrap()
    }

    fn expand(doc: &NormalizedDocument) -> Result<Vec<MemoryMap>> {
        let options = ResolveOptions::default();
        let ctx = ResolutionContext::new(&options, &doc.templates);
        doc.maps.iter().map(|m| ctx.expand_map(m)).collect()
    }

    #[test]
    fn byte_cursor_and_reserved() {
        let doc = norm(
            r#"
- name: soc
  addressBlocks:
    - name: uart
      offset: 0x1000
      registers:
        - name: DATA
        - name: STATUS
          size: 16
        - reserved: 2
        - name: CTRL
        - name: BAUD
          offset: 0x20
        - name: IRQ
"#,
        );
        let maps = expand(&doc).unwrap();
        let offsets: Vec<(String, u64)> = maps[0].blocks[0]
            .registers
            .iter()
            .map(|r| (r.name.clone(), r.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![
                ("DATA".into(), 0),
                ("STATUS".into(), 4),
                ("CTRL".into(), 8),
                ("BAUD".into(), 0x20),
                ("IRQ".into(), 0x24),
            ]
        );
        assert_eq!(maps[0].blocks[0].size, 64);
    }

    #[test]
    fn register_array_addresses() {
        let doc = norm(
            r#"
- name: soc
  addressBlocks:
    - name: dma
      offset: 0x100
      registers:
        - name: CH
          count: 4
          stride: 16
          registers:
            - name: CTRL
            - name: STATUS
"#,
        );
        let maps = expand(&doc).unwrap();
        let block = &maps[0].blocks[0];
        let ctrl: Vec<u64> = block
            .registers
            .iter()
            .filter(|r| r.name.ends_with("_CTRL"))
            .map(|r| block.base_offset + r.offset)
            .collect();
        assert_eq!(ctrl, vec![0x100, 0x110, 0x120, 0x130]);
        let names: Vec<&str> = block.registers.iter().take(3).map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["CH_0_CTRL", "CH_0_STATUS", "CH_1_CTRL"]);
        assert_eq!(block.registers[2].instance.as_ref().unwrap().index, 1);
        assert_eq!(block.arrays[0].descriptor.count, 4);
    }

    #[test]
    fn legacy_template_and_default_stride() {
        let doc = norm(
            r#"
registerTemplates:
  channel:
    - name: CTRL
    - name: SRC
    - name: DST
---
memoryMap:
  name: soc
  addressBlocks:
    - name: dma
      baseAddress: 0
      registers:
        - name: GLOBAL
        - generateArray:
            name: CH
            count: 2
            template: channel
            indexStart: 1
            naming: "chan{index}"
"#,
        );
        let maps = expand(&doc).unwrap();
        let block = &maps[0].blocks[0];
        let array = &block.arrays[0];
        // 12-byte template rounds up to a 16-byte stride.
        assert_eq!(array.descriptor.stride, 16);
        assert_eq!(array.offset, 4);
        let last = block.registers.last().unwrap();
        assert_eq!(last.name, "chan2_DST");
        assert_eq!(last.offset, 4 + 16 + 8);
    }

    #[test]
    fn unknown_template_is_schema_error() {
        let doc = norm(
            "memoryMap:\n  name: soc\n  addressBlocks:\n    - name: b\n      baseAddress: 0\n      registers:\n        - generateArray: {name: A, count: 2, template: nope}\n",
        );
        let err = expand(&doc).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn oversized_arrays_are_schema_errors() {
        let huge = "- name: m\n  addressBlocks:\n    - name: b\n      offset: 0\n      registers:\n        - {name: A, count: 0xFFFFFFFFFFFF, stride: 4, registers: [{name: R}]}\n";
        let err = normalize(&parse_sections(huge).unwrap(), &ResolveOptions::default())
            .unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("exceeds the limit"));

        let wrapping = "- name: m\n  addressBlocks:\n    - name: b\n      offset: 0\n      registers:\n        - {name: A, count: 2, stride: \"0x8000_0000_0000_0000\", offset: \"0x8000_0000_0000_0000\", registers: [{name: R}]}\n";
        let err = expand(&norm(wrapping)).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("m.b.A"));
    }

    #[test]
    fn field_access_inherits_register() {
        let doc = norm(
            r#"
- name: soc
  addressBlocks:
    - name: b
      offset: 0
      registers:
        - name: ISR
          access: write-1-to-clear
          fields:
            - {name: TX, bits: "[0]"}
            - {name: RX, bits: "[1]", access: read-only}
"#,
        );
        let maps = expand(&doc).unwrap();
        let isr = &maps[0].blocks[0].registers[0];
        assert_eq!(isr.fields[0].access, AccessPolicy::WriteOneToClear);
        assert_eq!(isr.fields[1].access, AccessPolicy::ReadOnly);
    }

    #[test]
    fn interface_array_names_and_prefixes() {
        let doc = norm(
            r#"
memoryMaps: []
busInterfaces:
  - name: s_axi
    clock: clk
    baseAddress: 0x4000
    array: {count: 3, indexStart: 2, stride: 0x1000, naming: "s_axi_{index}", prefix: "S_AXI"}
"#,
        );
        let ifaces = expand_interface(&doc.interfaces[0]);
        let names: Vec<&str> = ifaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["s_axi_2", "s_axi_3", "s_axi_4"]);
        assert_eq!(ifaces[0].physical_prefix, "S_AXI2");
        assert_eq!(ifaces[2].base_address, Some(0x6000));
        assert_eq!(ifaces[1].clock.as_ref().unwrap().name, "clk");
    }

    #[test]
    fn plain_interface_gets_default_prefix() {
        let doc = norm("memoryMaps: []\nbusInterfaces:\n  - name: apb\n");
        let ifaces = expand_interface(&doc.interfaces[0]);
        assert_eq!(ifaces.len(), 1);
        assert_eq!(ifaces[0].physical_prefix, "apb_");
        assert!(ifaces[0].instance.is_none());
    }
}
