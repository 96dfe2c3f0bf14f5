//! Command-line front end for resolving, validating and inspecting register-space documents.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use manifest::RegspaceManifest;

#[derive(Parser)]
#[command(name = "regspace", version, about = "Register-space document toolkit")]
struct Cli {
    /// Log resolution and validation progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a document and print the canonical model
    Resolve {
        /// Input document (default: documents listed in regspace.toml)
        document: Option<PathBuf>,
        /// Output format (json, yaml)
        #[arg(long)]
        format: Option<String>,
    },
    /// Check a document against the model invariants
    Validate {
        /// Input document (default: documents listed in regspace.toml)
        document: Option<PathBuf>,
        /// Report format (human, json)
        #[arg(long)]
        report: Option<String>,
        /// Treat warnings as failures
        #[arg(long)]
        deny_warnings: bool,
    },
    /// Print the register map with absolute addresses
    Inspect {
        /// Input document (default: documents listed in regspace.toml)
        document: Option<PathBuf>,
        /// Show one register in detail (e.g. `soc.uart.CTRL`)
        #[arg(long)]
        register: Option<String>,
    },
    /// Print the content fingerprint of the resolved model
    Fingerprint {
        /// Input document (default: documents listed in regspace.toml)
        document: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (manifest, project_dir) = load_manifest_optional(&cwd)?;
    let project_dir = project_dir.unwrap_or(cwd);
    let options = manifest
        .as_ref()
        .map(|m| m.resolve.clone())
        .unwrap_or_default();

    match cli.command {
        Commands::Resolve { document, format } => {
            for path in documents(document, manifest.as_ref(), &project_dir)? {
                commands::resolve::run(&path, &options, format.as_deref())?;
            }
            Ok(())
        }

        Commands::Validate {
            document,
            report,
            deny_warnings,
        } => {
            let deny = deny_warnings || manifest.as_ref().is_some_and(|m| m.validate.deny_warnings);
            for path in documents(document, manifest.as_ref(), &project_dir)? {
                commands::validate::run(&path, &options, report.as_deref(), deny)?;
            }
            Ok(())
        }

        Commands::Inspect { document, register } => {
            for path in documents(document, manifest.as_ref(), &project_dir)? {
                commands::inspect::run(&path, &options, register.as_deref())?;
            }
            Ok(())
        }

        Commands::Fingerprint { document } => {
            for path in documents(document, manifest.as_ref(), &project_dir)? {
                commands::fingerprint::run(&path, &options)?;
            }
            Ok(())
        }
    }
}

/// The explicit document, or else every document the manifest lists.
fn documents(
    explicit: Option<PathBuf>,
    manifest: Option<&RegspaceManifest>,
    project_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(vec![path]);
    }
    match manifest {
        Some(m) if !m.project.documents.is_empty() => Ok(m.document_paths(project_dir)),
        Some(m) => anyhow::bail!("project '{}' lists no documents in regspace.toml", m.project.name),
        None => anyhow::bail!("no document given and no regspace.toml found"),
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(
    cwd: &Path,
) -> anyhow::Result<(Option<RegspaceManifest>, Option<PathBuf>)> {
    match RegspaceManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    const SOC: &str = r#"
memoryMaps:
  - name: soc
    addressBlocks:
      - name: dma
        offset: 0x1000
        registers:
          - name: CTRL
            size: 16
            fields:
              - {name: EN, bits: "[0]"}
          - name: CH
            count: 2
            stride: 0x10
            offset: 0x100
            registers:
              - {name: SRC, offset: 0}
              - {name: DST, offset: 4}
clocks:
  - {name: clk}
busInterfaces:
  - {name: s_axi, clock: clk, memoryMap: soc}
"#;

    fn project(manifest: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("regs")).unwrap();
        std::fs::write(dir.path().join("regs/soc.yaml"), SOC).unwrap();
        std::fs::write(dir.path().join(manifest::MANIFEST_FILE), manifest).unwrap();
        dir
    }

    /// Manifest → documents → resolve, validate, inspect, fingerprint.
    #[test]
    fn manifest_driven_workflow() {
        let dir = project(
            "[project]\nname = \"soc\"\ndocuments = [\"regs/soc.yaml\"]\n\n[validate]\ndeny-warnings = true\n",
        );
        let nested = dir.path().join("regs");
        let (manifest, project_dir) = load_manifest_optional(&nested).unwrap();
        let manifest = manifest.unwrap();
        assert_eq!(project_dir.as_deref(), Some(dir.path()));

        let paths = documents(None, Some(&manifest), dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("regs/soc.yaml")]);

        let options = manifest.resolve.clone();
        let model = commands::load_model(&paths[0], &options).unwrap();
        assert_eq!(model.registers().count(), 5);
        assert_eq!(
            model.find_register("dma.CH_1_DST").unwrap().address(),
            0x1114
        );

        commands::resolve::run(&paths[0], &options, Some("json")).unwrap();
        commands::validate::run(&paths[0], &options, None, manifest.validate.deny_warnings)
            .unwrap();
        commands::inspect::run(&paths[0], &options, Some("soc.dma.CTRL")).unwrap();
        commands::fingerprint::run(&paths[0], &options).unwrap();
    }

    #[test]
    fn manifest_options_apply() {
        let dir = project(
            "[project]\nname = \"soc\"\ndocuments = [\"regs/soc.yaml\"]\n\n[resolve]\ndefault-register-size = 16\n",
        );
        let (manifest, _) = load_manifest_optional(dir.path()).unwrap();
        let manifest = manifest.unwrap();
        let model =
            commands::load_model(&dir.path().join("regs/soc.yaml"), &manifest.resolve).unwrap();
        let src = model.find_register("dma.CH_0_SRC").unwrap();
        assert_eq!(src.register.width, 16);
    }

    #[test]
    fn explicit_document_wins() {
        let dir = project("[project]\nname = \"soc\"\n");
        let (manifest, _) = load_manifest_optional(dir.path()).unwrap();
        let explicit = PathBuf::from("other.yaml");
        let paths = documents(Some(explicit.clone()), manifest.as_ref(), dir.path()).unwrap();
        assert_eq!(paths, vec![explicit]);

        let err = documents(None, manifest.as_ref(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("lists no documents"));
        assert!(documents(None, None, dir.path()).is_err());
    }
}
