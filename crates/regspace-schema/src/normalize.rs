//! Schema normalization: both document shapes into one intermediate tree.
//!
//! The normalized tree is shape-agnostic. It still carries unresolved
//! pieces (bit-range strings, missing offsets, array nodes, template
//! references) that the bit-field resolver and array expansion engine
//! turn into canonical entities.

use std::collections::BTreeMap;

use regspace_model::{
    AccessPolicy, Clock, InterfaceMode, Register, Reset, ResetPolarity, Usage,
};
use serde_yaml::Value;

use crate::document::{detect_shape, DocumentShape, Node};
use crate::error::{ResolveError, Result};
use crate::options::ResolveOptions;

/// Register widths the runtime can address.
pub const SUPPORTED_WIDTHS: [u32; 4] = [8, 16, 32, 64];

/// Shape-agnostic document produced by [`normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    pub shape: DocumentShape,
    pub maps: Vec<NormMap>,
    /// Legacy register templates, by name.
    pub templates: BTreeMap<String, NormTemplate>,
    pub clocks: Vec<Clock>,
    pub resets: Vec<Reset>,
    pub interfaces: Vec<NormInterface>,
}

#[derive(Debug, Clone)]
pub struct NormMap {
    pub name: String,
    pub description: Option<String>,
    pub blocks: Vec<NormBlock>,
}

#[derive(Debug, Clone)]
pub struct NormBlock {
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    pub base_offset: u64,
    /// Explicit size; inferred after expansion when absent.
    pub size: Option<u64>,
    pub usage: Usage,
    pub entries: Vec<RegisterEntry>,
}

#[derive(Debug, Clone)]
pub struct NormTemplate {
    pub path: String,
    pub entries: Vec<RegisterEntry>,
}

/// One item of a block's (or template's) register list.
#[derive(Debug, Clone)]
pub enum RegisterEntry {
    Register(NormRegister),
    /// `{reserved: n}`: advances the offset cursor by `n` bytes.
    Reserved { path: String, bytes: u64 },
    Array(NormArray),
}

#[derive(Debug, Clone)]
pub struct NormRegister {
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    /// Explicit offset; the block cursor is used when absent.
    pub offset: Option<u64>,
    pub width: u32,
    pub access: AccessPolicy,
    pub reset_value: Option<u64>,
    pub fields: Vec<NormField>,
}

/// How a field's bit position was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPlacement {
    /// `bits: "[msb:lsb]"`, parsed by the bit-field resolver.
    Range(String),
    /// Legacy `bitOffset` / `bitWidth`.
    Explicit { offset: u32, width: u32 },
    /// No position; placed at the register's bit cursor.
    Auto { width: u32 },
}

#[derive(Debug, Clone)]
pub struct NormField {
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    pub placement: FieldPlacement,
    /// Inherits the register's policy when absent.
    pub access: Option<AccessPolicy>,
    pub reset_value: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum ArrayBody {
    Inline(Vec<RegisterEntry>),
    /// Name of a legacy register template.
    Template(String),
}

#[derive(Debug, Clone)]
pub struct NormArray {
    pub path: String,
    pub name: String,
    pub offset: Option<u64>,
    pub count: u64,
    /// Defaults to the template span rounded up to a power of two.
    pub stride: Option<u64>,
    pub index_start: u64,
    pub naming: Option<String>,
    pub body: ArrayBody,
}

#[derive(Debug, Clone)]
pub struct NormInterfaceArray {
    pub count: u64,
    pub stride: u64,
    pub index_start: u64,
    pub naming: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NormInterface {
    pub path: String,
    pub name: String,
    pub protocol: Option<String>,
    pub mode: InterfaceMode,
    pub base_address: Option<u64>,
    pub physical_prefix: Option<String>,
    pub clock: Option<String>,
    pub reset: Option<String>,
    pub memory_map: Option<String>,
    pub array: Option<NormInterfaceArray>,
}

/// Normalize the sections of a parsed document.
pub fn normalize(sections: &[Value], options: &ResolveOptions) -> Result<NormalizedDocument> {
    let shape = detect_shape(sections)?;
    let mut doc = NormalizedDocument {
        shape,
        maps: Vec::new(),
        templates: BTreeMap::new(),
        clocks: Vec::new(),
        resets: Vec::new(),
        interfaces: Vec::new(),
    };

    match shape {
        DocumentShape::Current => {
            let root = Node::root(&sections[0], "<root>");
            let maps = if root.is_mapping() {
                root.child("memoryMaps")
                    .map(|n| n.as_seq())
                    .transpose()?
                    .unwrap_or_default()
            } else {
                root.renamed("memoryMaps").as_seq()?
            };
            for map in maps {
                let map = normalize_map(&map, options)?;
                merge_map(&mut doc.maps, map, false)?;
            }
            if root.is_mapping() {
                normalize_shared_sections(&root, &mut doc, options)?;
            }
        }
        DocumentShape::Legacy => {
            for (i, section) in sections.iter().enumerate() {
                let root = Node::root(section, format!("<section {i}>"));
                if let Some(templates) = root.child("registerTemplates") {
                    for (name, body) in templates.entries()? {
                        let template = NormTemplate {
                            path: body.path().to_string(),
                            entries: normalize_entries(&body, body.path(), options, false)?,
                        };
                        if doc.templates.insert(name.to_string(), template).is_some() {
                            return Err(ResolveError::schema(
                                body.path(),
                                format!("register template `{name}` is defined more than once"),
                            ));
                        }
                    }
                }
                if let Some(maps) = root.child("memoryMap") {
                    for map in maps.as_seq_or_one()? {
                        let map = normalize_map(&map, options)?;
                        merge_map(&mut doc.maps, map, true)?;
                    }
                }
                normalize_shared_sections(&root, &mut doc, options)?;
            }
        }
    }

    tracing::debug!(
        shape = ?doc.shape,
        maps = doc.maps.len(),
        templates = doc.templates.len(),
        interfaces = doc.interfaces.len(),
        "normalized document"
    );
    Ok(doc)
}

/// Add `map`, concatenating blocks into an existing map of the same name
/// when sections are being merged.
fn merge_map(maps: &mut Vec<NormMap>, map: NormMap, merge: bool) -> Result<()> {
    match maps.iter_mut().find(|m| m.name == map.name) {
        Some(existing) if merge => {
            if existing.description.is_none() {
                existing.description = map.description;
            }
            existing.blocks.extend(map.blocks);
            Ok(())
        }
        Some(_) => Err(ResolveError::schema(
            &map.name,
            format!("memory map `{}` is declared more than once", map.name),
        )),
        None => {
            maps.push(map);
            Ok(())
        }
    }
}

fn normalize_shared_sections(
    root: &Node<'_>,
    doc: &mut NormalizedDocument,
    options: &ResolveOptions,
) -> Result<()> {
    if let Some(clocks) = root.child("clocks") {
        for clock in clocks.as_seq()? {
            doc.clocks.push(normalize_clock(&clock)?);
        }
    }
    if let Some(resets) = root.child("resets") {
        for reset in resets.as_seq()? {
            doc.resets.push(normalize_reset(&reset)?);
        }
    }
    if let Some(interfaces) = root.child("busInterfaces") {
        for iface in interfaces.as_seq()? {
            doc.interfaces.push(normalize_interface(&iface, options)?);
        }
    }
    Ok(())
}

fn normalize_map(node: &Node<'_>, options: &ResolveOptions) -> Result<NormMap> {
    node.expect_mapping("memory map")?;
    let name = node.name()?;
    let node = node.renamed(name.clone());
    let mut blocks = Vec::new();
    if let Some(list) = node.child("addressBlocks") {
        for block in list.as_seq()? {
            blocks.push(normalize_block(&block, &name, options)?);
        }
    }
    Ok(NormMap {
        description: node.opt_str("description")?,
        name,
        blocks,
    })
}

fn normalize_block(node: &Node<'_>, map: &str, options: &ResolveOptions) -> Result<NormBlock> {
    node.expect_mapping("address block")?;
    let name = node.name()?;
    let node = node.renamed(format!("{map}.{name}"));
    let base_offset = node
        .opt_u64(&["offset", "baseAddress"])?
        .ok_or_else(|| ResolveError::schema(node.path(), "missing required key `offset`"))?;
    let usage = match node.child("usage") {
        Some(usage) => parse_usage(&usage)?,
        None => Usage::Register,
    };
    let entries = match node.child("registers") {
        Some(list) => normalize_entries(&list, node.path(), options, true)?,
        None => Vec::new(),
    };
    Ok(NormBlock {
        path: node.path().to_string(),
        description: node.opt_str("description")?,
        base_offset,
        size: node.opt_u64(&["range", "size"])?,
        usage,
        entries,
        name,
    })
}

fn parse_usage(node: &Node<'_>) -> Result<Usage> {
    match node.as_str()?.trim().to_ascii_lowercase().as_str() {
        "register" | "registers" => Ok(Usage::Register),
        "memory" => Ok(Usage::Memory),
        "reserved" => Ok(Usage::Reserved),
        other => Err(ResolveError::schema(
            node.path(),
            format!("unrecognized block usage '{other}'"),
        )),
    }
}

fn parse_access(node: &Node<'_>) -> Result<AccessPolicy> {
    node.as_str()?
        .parse()
        .map_err(|e: regspace_model::UnknownAccessPolicy| {
            ResolveError::schema(node.path(), e.to_string())
        })
}

/// Normalize a register list. `parent` is the path registers are named under.
fn normalize_entries(
    list: &Node<'_>,
    parent: &str,
    options: &ResolveOptions,
    allow_arrays: bool,
) -> Result<Vec<RegisterEntry>> {
    let mut entries = Vec::new();
    for item in list.as_seq()? {
        item.expect_mapping("register entry")?;
        let is_array = item.has("generateArray") || item.has("count");
        if is_array && !allow_arrays {
            return Err(ResolveError::schema(
                item.path(),
                "nested register arrays are not supported",
            ));
        }
        let entry = if let Some(generate) = item.child("generateArray") {
            RegisterEntry::Array(normalize_legacy_array(&generate, parent, options)?)
        } else if item.has("count") {
            RegisterEntry::Array(normalize_array(&item, parent, options)?)
        } else if let Some(reserved) = item.child("reserved") {
            if item.keys().len() != 1 {
                return Err(ResolveError::schema(
                    item.path(),
                    "a `reserved` placeholder must not carry other keys",
                ));
            }
            RegisterEntry::Reserved {
                path: item.path().to_string(),
                bytes: reserved.as_u64()?,
            }
        } else {
            RegisterEntry::Register(normalize_register(&item, parent, options)?)
        };
        entries.push(entry);
    }
    Ok(entries)
}

fn normalize_register(
    node: &Node<'_>,
    parent: &str,
    options: &ResolveOptions,
) -> Result<NormRegister> {
    let name = node.name()?;
    let node = node.renamed(format!("{parent}.{name}"));
    let width = node
        .opt_u32(&["size"])?
        .unwrap_or(options.default_register_size);
    if !SUPPORTED_WIDTHS.contains(&width) {
        return Err(ResolveError::schema(
            node.path(),
            format!("register size {width} is not one of 8, 16, 32 or 64 bits"),
        ));
    }
    let access = match node.child("access") {
        Some(access) => parse_access(&access)?,
        None => options.default_access,
    };
    let mut fields = Vec::new();
    if let Some(list) = node.child("fields") {
        for field in list.as_seq()? {
            fields.push(normalize_field(&field, node.path())?);
        }
    }
    Ok(NormRegister {
        path: node.path().to_string(),
        description: node.opt_str("description")?,
        offset: node.opt_u64(&["offset", "addressOffset"])?,
        width,
        access,
        reset_value: node.opt_u64(&["resetValue", "reset"])?,
        fields,
        name,
    })
}

fn normalize_field(node: &Node<'_>, register: &str) -> Result<NormField> {
    node.expect_mapping("bit field")?;
    let name = node.name()?;
    let node = node.renamed(format!("{register}.{name}"));
    let placement = if let Some(bits) = node.child("bits") {
        FieldPlacement::Range(bits.as_str()?.to_string())
    } else if let Some(offset) = node.child("bitOffset") {
        FieldPlacement::Explicit {
            offset: offset.as_u32()?,
            width: node.opt_u32(&["bitWidth", "width"])?.unwrap_or(1),
        }
    } else {
        FieldPlacement::Auto {
            width: node.opt_u32(&["bitWidth", "width"])?.unwrap_or(1),
        }
    };
    let access = node.child("access").map(|a| parse_access(&a)).transpose()?;
    Ok(NormField {
        path: node.path().to_string(),
        description: node.opt_str("description")?,
        reset_value: node.opt_u64(&["resetValue", "reset"])?,
        placement,
        access,
        name,
    })
}

fn require_count(node: &Node<'_>, options: &ResolveOptions) -> Result<u64> {
    let count = node.require("count")?.as_u64()?;
    if count == 0 {
        return Err(ResolveError::schema(
            node.path(),
            "array count must be at least 1",
        ));
    }
    if count > options.max_array_count {
        return Err(ResolveError::schema(
            node.path(),
            format!(
                "array count {count} exceeds the limit of {}",
                options.max_array_count
            ),
        ));
    }
    Ok(count)
}

fn normalize_array(node: &Node<'_>, parent: &str, options: &ResolveOptions) -> Result<NormArray> {
    let name = node.name()?;
    let node = node.renamed(format!("{parent}.{name}"));
    let body = node.require("registers")?;
    Ok(NormArray {
        path: node.path().to_string(),
        offset: node.opt_u64(&["offset", "addressOffset"])?,
        count: require_count(&node, options)?,
        stride: node.opt_u64(&["stride"])?,
        index_start: node.opt_u64(&["indexStart"])?.unwrap_or(0),
        naming: node.opt_str("naming")?,
        body: ArrayBody::Inline(normalize_entries(&body, node.path(), options, false)?),
        name,
    })
}

fn normalize_legacy_array(
    node: &Node<'_>,
    parent: &str,
    options: &ResolveOptions,
) -> Result<NormArray> {
    node.expect_mapping("generateArray")?;
    let name = node.name()?;
    let node = node.renamed(format!("{parent}.{name}"));
    let template = node.require("template")?.as_str()?.to_string();
    Ok(NormArray {
        path: node.path().to_string(),
        offset: node.opt_u64(&["addressOffset", "offset"])?,
        count: require_count(&node, options)?,
        stride: node.opt_u64(&["stride"])?,
        index_start: node.opt_u64(&["indexStart"])?.unwrap_or(0),
        naming: node.opt_str("naming")?,
        body: ArrayBody::Template(template),
        name,
    })
}

fn normalize_clock(node: &Node<'_>) -> Result<Clock> {
    if let Ok(name) = node.as_str() {
        return Ok(Clock {
            name: name.to_string(),
            frequency_hz: None,
        });
    }
    node.expect_mapping("clock")?;
    Ok(Clock {
        name: node.name()?,
        frequency_hz: node.opt_u64(&["frequency", "frequencyHz"])?,
    })
}

fn normalize_reset(node: &Node<'_>) -> Result<Reset> {
    if let Ok(name) = node.as_str() {
        return Ok(Reset {
            name: name.to_string(),
            polarity: ResetPolarity::default(),
        });
    }
    node.expect_mapping("reset")?;
    let polarity = match node.child("polarity") {
        None => ResetPolarity::default(),
        Some(p) => match p.as_str()?.trim().to_ascii_lowercase().as_str() {
            "active-high" | "activehigh" | "high" => ResetPolarity::ActiveHigh,
            "active-low" | "activelow" | "low" => ResetPolarity::ActiveLow,
            other => {
                return Err(ResolveError::schema(
                    p.path(),
                    format!("unrecognized reset polarity '{other}'"),
                ))
            }
        },
    };
    Ok(Reset {
        name: node.name()?,
        polarity,
    })
}

fn normalize_interface(node: &Node<'_>, options: &ResolveOptions) -> Result<NormInterface> {
    node.expect_mapping("bus interface")?;
    let name = node.name()?;
    let node = node.renamed(name.clone());
    let mode = match node.child("mode") {
        None => InterfaceMode::Slave,
        Some(m) => match m.as_str()?.trim().to_ascii_lowercase().as_str() {
            "slave" | "target" | "subordinate" => InterfaceMode::Slave,
            "master" | "initiator" | "manager" => InterfaceMode::Master,
            other => {
                return Err(ResolveError::schema(
                    m.path(),
                    format!("unrecognized interface mode '{other}'"),
                ))
            }
        },
    };
    let array = match node.child("array") {
        Some(array) => {
            array.expect_mapping("interface array")?;
            Some(NormInterfaceArray {
                count: require_count(&array, options)?,
                stride: array.opt_u64(&["stride"])?.unwrap_or(0),
                index_start: array.opt_u64(&["indexStart"])?.unwrap_or(0),
                naming: array.opt_str("naming")?,
                prefix: array.opt_str("prefix")?,
            })
        }
        None => None,
    };
    Ok(NormInterface {
        path: node.path().to_string(),
        protocol: match node.opt_str("protocol")? {
            Some(p) => Some(p),
            None => node.opt_str("type")?,
        },
        mode,
        base_address: node.opt_u64(&["baseAddress", "offset"])?,
        physical_prefix: match node.opt_str("physicalPrefix")? {
            Some(p) => Some(p),
            None => node.opt_str("prefix")?,
        },
        clock: node.opt_str("clock")?,
        reset: node.opt_str("reset")?,
        memory_map: node.opt_str("memoryMap")?,
        array,
        name,
    })
}

/// Size for a block declared without `range`/`size`.
pub fn infer_block_size(registers: &[Register], options: &ResolveOptions) -> u64 {
    registers
        .iter()
        .map(Register::end)
        .max()
        .map(|end| end.max(options.min_block_size))
        .unwrap_or(options.empty_block_size)
}
