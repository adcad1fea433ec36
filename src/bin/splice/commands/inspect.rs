//! `splice inspect` command

use anyhow::{bail, Result};

use super::{read_attributes, unreadable_attributes};
use crate::cli::InspectArgs;
use splice::manifest::{self, Manifest};
use splice::util::diagnostic::emit;
use splice::UnitStore;

pub fn execute(args: InspectArgs, color: bool) -> Result<()> {
    let mut failed = 0;

    for path in &args.attrs {
        let name = path.display().to_string();
        let entries = match read_attributes(path) {
            Ok(entries) => entries,
            Err(err) => {
                emit(&unreadable_attributes(&name, &err), color);
                failed += 1;
                continue;
            }
        };

        let manifest = match manifest::deserialize(entries) {
            Ok(manifest) => manifest,
            Err(err) => {
                emit(&err.to_diagnostic(&name), color);
                failed += 1;
                continue;
            }
        };

        // A type declared twice in one manifest.
        match manifest.to_store() {
            Ok(store) => print_manifest(&name, &manifest, &store, args.units),
            Err(err) => {
                emit(&err.to_diagnostic().with_origin(&name), color);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} manifests could not be read", failed, args.attrs.len());
    }
    Ok(())
}

fn print_manifest(name: &str, manifest: &Manifest, store: &UnitStore, show_units: bool) {
    let meta = &manifest.metadata;

    println!("{}", name);
    println!(
        "  version:    {}",
        meta.version.as_ref().map_or("-".to_string(), |v| v.to_string())
    );
    println!(
        "  language:   {}",
        meta.language_level.map_or("-".to_string(), |l| l.to_string())
    );
    println!("  namespaces: {}", meta.namespaces.join(", "));
    println!("  units:      {}", store.len());

    if show_units {
        for unit in store.units() {
            println!("    {}", unit.id());
            for type_id in unit.declared_types() {
                println!("      declares {}", type_id);
            }
            for dep in store.deps(unit.id()) {
                println!("      needs    {}", dep);
            }
            for missing in store.missing_dependencies(unit.id()) {
                println!("      missing  {}", missing);
            }
        }
    }

    for cycle in store.cycles() {
        println!("  cycle:      {}", cycle.join(" -> "));
    }
}
