//! The canonical model root and its read-only tree-walk API.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::block::{AddressBlock, MemoryMap};
use crate::hash::{content_hash, hash_hex};
use crate::interface::{BusInterface, Clock, EntityKind, NamedRef, Reset, Resolution};
use crate::register::{BitField, Register};

/// Name → declared kinds. A name may be declared once per kind.
type SymbolTable = BTreeMap<String, Vec<EntityKind>>;

/// The fully resolved register space.
///
/// Built once per resolution pass and never mutated afterwards, so it can be
/// shared between threads behind an `Arc` without locking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CanonicalModel {
    #[serde(default)]
    pub memory_maps: Vec<MemoryMap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clocks: Vec<Clock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resets: Vec<Reset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bus_interfaces: Vec<BusInterface>,
    #[serde(skip)]
    symbols: OnceLock<SymbolTable>,
}

impl PartialEq for CanonicalModel {
    fn eq(&self, other: &Self) -> bool {
        self.memory_maps == other.memory_maps
            && self.clocks == other.clocks
            && self.resets == other.resets
            && self.bus_interfaces == other.bus_interfaces
    }
}

impl Eq for CanonicalModel {}

/// A block together with the map that contains it.
#[derive(Debug, Clone, Copy)]
pub struct BlockEntry<'a> {
    pub map: &'a MemoryMap,
    pub block: &'a AddressBlock,
}

impl BlockEntry<'_> {
    /// Dotted path `map.block`.
    pub fn path(&self) -> String {
        format!("{}.{}", self.map.name, self.block.name)
    }
}

/// A register together with its enclosing map and block.
#[derive(Debug, Clone, Copy)]
pub struct RegisterEntry<'a> {
    pub map: &'a MemoryMap,
    pub block: &'a AddressBlock,
    pub register: &'a Register,
}

impl RegisterEntry<'_> {
    /// Dotted path `map.block.register`.
    pub fn path(&self) -> String {
        format!(
            "{}.{}.{}",
            self.map.name, self.block.name, self.register.name
        )
    }

    /// Byte address of the register within its memory map.
    pub fn address(&self) -> u64 {
        self.block.base_offset.saturating_add(self.register.offset)
    }
}

/// A bit field together with its ancestors.
#[derive(Debug, Clone, Copy)]
pub struct FieldEntry<'a> {
    pub map: &'a MemoryMap,
    pub block: &'a AddressBlock,
    pub register: &'a Register,
    pub field: &'a BitField,
}

impl FieldEntry<'_> {
    /// Dotted path `map.block.register.field`.
    pub fn path(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.map.name, self.block.name, self.register.name, self.field.name
        )
    }
}

impl CanonicalModel {
    pub fn new(
        memory_maps: Vec<MemoryMap>,
        clocks: Vec<Clock>,
        resets: Vec<Reset>,
        bus_interfaces: Vec<BusInterface>,
    ) -> Self {
        Self {
            memory_maps,
            clocks,
            resets,
            bus_interfaces,
            symbols: OnceLock::new(),
        }
    }

    pub fn memory_maps(&self) -> &[MemoryMap] {
        &self.memory_maps
    }

    pub fn memory_map(&self, name: &str) -> Option<&MemoryMap> {
        self.memory_maps.iter().find(|m| m.name == name)
    }

    pub fn clocks(&self) -> &[Clock] {
        &self.clocks
    }

    pub fn resets(&self) -> &[Reset] {
        &self.resets
    }

    pub fn bus_interfaces(&self) -> &[BusInterface] {
        &self.bus_interfaces
    }

    /// Every block, map by map, in declaration order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockEntry<'_>> {
        self.memory_maps
            .iter()
            .flat_map(|map| map.blocks.iter().map(move |block| BlockEntry { map, block }))
    }

    /// Every expanded register, in resolution order.
    pub fn registers(&self) -> impl Iterator<Item = RegisterEntry<'_>> {
        self.blocks().flat_map(|BlockEntry { map, block }| {
            block.registers.iter().map(move |register| RegisterEntry {
                map,
                block,
                register,
            })
        })
    }

    /// Every bit field of every expanded register.
    pub fn fields(&self) -> impl Iterator<Item = FieldEntry<'_>> {
        self.registers().flat_map(
            |RegisterEntry {
                 map,
                 block,
                 register,
             }| {
                register.fields.iter().map(move |field| FieldEntry {
                    map,
                    block,
                    register,
                    field,
                })
            },
        )
    }

    /// Find a block by `map.block` or, searching every map, by `block`.
    pub fn find_block(&self, path: &str) -> Option<BlockEntry<'_>> {
        match path.split_once('.') {
            Some((map_name, block_name)) => {
                let map = self.memory_map(map_name)?;
                let block = map.block(block_name)?;
                Some(BlockEntry { map, block })
            }
            None => self.blocks().find(|entry| entry.block.name == path),
        }
    }

    /// Find a register by `map.block.register` or `block.register`.
    pub fn find_register(&self, path: &str) -> Option<RegisterEntry<'_>> {
        let (block_path, register_name) = path.rsplit_once('.')?;
        let BlockEntry { map, block } = self.find_block(block_path)?;
        let register = block.register(register_name)?;
        Some(RegisterEntry {
            map,
            block,
            register,
        })
    }

    fn symbols(&self) -> &SymbolTable {
        self.symbols.get_or_init(|| {
            let mut table = SymbolTable::new();
            let declared = self
                .clocks
                .iter()
                .map(|c| (c.name.as_str(), EntityKind::Clock))
                .chain(self.resets.iter().map(|r| (r.name.as_str(), EntityKind::Reset)))
                .chain(
                    self.memory_maps
                        .iter()
                        .map(|m| (m.name.as_str(), EntityKind::MemoryMap)),
                )
                .chain(
                    self.bus_interfaces
                        .iter()
                        .map(|i| (i.name.as_str(), EntityKind::BusInterface)),
                );
            for (name, kind) in declared {
                let kinds = table.entry(name.to_string()).or_default();
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            table
        })
    }

    /// Kinds under which `name` is declared.
    pub fn lookup(&self, name: &str) -> &[EntityKind] {
        self.symbols()
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve a named reference against the symbol table.
    pub fn resolve(&self, reference: &NamedRef) -> Resolution {
        let kinds = self.lookup(&reference.name);
        if kinds.contains(&reference.kind) {
            Resolution::Resolved
        } else if kinds.is_empty() {
            Resolution::Missing
        } else {
            Resolution::WrongKind(kinds.to_vec())
        }
    }

    /// Whether `reference` resolves; the answer is cached on the reference.
    pub fn is_resolved(&self, reference: &NamedRef) -> bool {
        reference.is_present_with(|r| self.resolve(r) == Resolution::Resolved)
    }

    /// Hex SHA-256 fingerprint of the serialized model.
    pub fn fingerprint(&self) -> String {
        content_hash(self)
            .map(|hash| hash_hex(&hash))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessPolicy;
    use crate::block::Usage;

    fn sample() -> CanonicalModel {
        let register = Register {
            name: "CTRL".into(),
            description: None,
            offset: 4,
            width: 32,
            access: AccessPolicy::ReadWrite,
            reset_value: None,
            fields: vec![BitField {
                name: "EN".into(),
                description: None,
                bit_offset: 0,
                bit_width: 1,
                access: AccessPolicy::ReadWrite,
                reset_value: None,
            }],
            instance: None,
        };
        let block = AddressBlock {
            name: "timer".into(),
            description: None,
            base_offset: 0x2000,
            size: 0x40,
            usage: Usage::Register,
            registers: vec![register],
            arrays: vec![],
        };
        CanonicalModel::new(
            vec![MemoryMap {
                name: "soc".into(),
                description: None,
                blocks: vec![block],
            }],
            vec![Clock {
                name: "clk".into(),
                frequency_hz: Some(100_000_000),
            }],
            vec![],
            vec![],
        )
    }

    #[test]
    fn tree_walk() {
        let model = sample();
        assert_eq!(model.blocks().count(), 1);
        let regs: Vec<String> = model.registers().map(|r| r.path()).collect();
        assert_eq!(regs, vec!["soc.timer.CTRL"]);
        let fields: Vec<String> = model.fields().map(|f| f.path()).collect();
        assert_eq!(fields, vec!["soc.timer.CTRL.EN"]);
    }

    #[test]
    fn find_register_by_short_and_full_path() {
        let model = sample();
        let full = model.find_register("soc.timer.CTRL").unwrap();
        let short = model.find_register("timer.CTRL").unwrap();
        assert_eq!(full.address(), 0x2004);
        assert_eq!(short.path(), full.path());
        assert!(model.find_register("timer.MISSING").is_none());
        assert!(model.find_register("CTRL").is_none());
    }

    #[test]
    fn resolve_named_references() {
        let model = sample();
        assert_eq!(
            model.resolve(&NamedRef::new(EntityKind::Clock, "clk")),
            Resolution::Resolved
        );
        assert_eq!(
            model.resolve(&NamedRef::new(EntityKind::Clock, "soc")),
            Resolution::WrongKind(vec![EntityKind::MemoryMap])
        );
        assert_eq!(
            model.resolve(&NamedRef::new(EntityKind::Reset, "rst")),
            Resolution::Missing
        );
        assert!(model.is_resolved(&NamedRef::new(EntityKind::MemoryMap, "soc")));
    }

    #[test]
    fn fingerprint_is_stable_across_clones() {
        let model = sample();
        let _ = model.lookup("clk");
        let copy = model.clone();
        assert_eq!(model, copy);
        assert_eq!(model.fingerprint(), copy.fingerprint());
        assert_eq!(model.fingerprint().len(), 64);
    }

    #[test]
    fn serde_round_trip() {
        let model = sample();
        let json = serde_json::to_string(&model).unwrap();
        let back: CanonicalModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
