//! `regspace inspect`: human-readable register map.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{anyhow, Result};
use regspace_model::{CanonicalModel, Register};
use regspace_schema::ResolveOptions;

use super::load_model;

/// Render every map, block, register and field with absolute addresses.
pub fn render_tree(model: &CanonicalModel) -> String {
    let mut out = String::new();
    for map in model.memory_maps() {
        let _ = writeln!(out, "{}", map.name);
        for block in &map.blocks {
            let _ = writeln!(
                out,
                "  {} @ {:#010x} ({} bytes, {})",
                block.name,
                block.base_offset,
                block.size,
                block.usage.as_str()
            );
            for register in &block.registers {
                let address = block.base_offset.saturating_add(register.offset);
                let _ = writeln!(
                    out,
                    "    {:#010x} {:<16} {:>2}b {}",
                    address, register.name, register.width, register.access
                );
                for field in &register.fields {
                    let _ = writeln!(
                        out,
                        "      [{}:{}] {} {}",
                        field.bit_end() - 1,
                        field.bit_offset,
                        field.name,
                        field.access
                    );
                }
            }
        }
    }
    for interface in model.bus_interfaces() {
        let _ = write!(out, "interface {} ({}*)", interface.name, interface.physical_prefix);
        if let Some(map) = &interface.memory_map {
            let _ = write!(out, " -> {}", map.name);
        }
        let _ = writeln!(out);
    }
    out
}

/// Detailed view of a single register.
pub fn render_register(address: u64, path: &str, register: &Register) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{path} @ {address:#010x}");
    if let Some(description) = &register.description {
        let _ = writeln!(out, "  {description}");
    }
    let _ = writeln!(out, "  width:  {} bits", register.width);
    let _ = writeln!(out, "  access: {}", register.access);
    let _ = writeln!(out, "  reset:  {:#x}", register.composed_reset());
    if let Some(instance) = &register.instance {
        let _ = writeln!(out, "  array:  {}[{}]", instance.array, instance.index);
    }
    for field in &register.fields {
        let _ = writeln!(
            out,
            "  {:<12} [{}:{}] {} mask={:#x}",
            field.name,
            field.bit_end() - 1,
            field.bit_offset,
            field.access,
            field.mask()
        );
    }
    out
}

pub fn run(document: &Path, options: &ResolveOptions, register: Option<&str>) -> Result<()> {
    let model = load_model(document, options)?;
    match register {
        Some(path) => {
            let entry = model
                .find_register(path)
                .ok_or_else(|| anyhow!("no register '{path}' in {}", document.display()))?;
            print!("{}", render_register(entry.address(), &entry.path(), entry.register));
        }
        None => print!("{}", render_tree(&model)),
    }
    Ok(())
}
