//! `regspace fingerprint`: content hash of the resolved model.

use std::path::Path;

use anyhow::Result;
use regspace_schema::ResolveOptions;

use super::load_model;

pub fn run(document: &Path, options: &ResolveOptions) -> Result<()> {
    let model = load_model(document, options)?;
    println!("{}  {}", model.fingerprint(), document.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_does_not_change_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.yaml");
        let b = dir.path().join("b.yaml");
        std::fs::write(&a, "- name: soc\n  addressBlocks:\n    - {name: b, offset: 0x100}\n").unwrap();
        std::fs::write(
            &b,
            "# same map\n- name: soc\n  addressBlocks:\n    - name: b\n      offset: 256\n",
        )
        .unwrap();
        let options = ResolveOptions::default();
        let fa = load_model(&a, &options).unwrap().fingerprint();
        let fb = load_model(&b, &options).unwrap().fingerprint();
        assert_eq!(fa, fb);
        run(&a, &options).unwrap();
    }
}
