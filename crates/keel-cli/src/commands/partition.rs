//! Partition command - split rendered templates into an install plan

use std::collections::BTreeMap;
use std::path::Path;

use console::style;
use keel_core::{
    HookConfig, KindOrder, ManifestPartitioner, Partition, SortOrder, VersionSet,
    flatten_manifests, sort_hooks_by_weight,
};
use walkdir::WalkDir;

use crate::OutputFormat;
use crate::error::{CliError, Result};

pub fn run(dir: &Path, uninstall: bool, api_versions: &[String], output: OutputFormat) -> Result<()> {
    if !dir.is_dir() {
        return Err(CliError::input_with_help(
            format!("{} is not a directory", dir.display()),
            "pass the directory written by `helm template --output-dir`",
        ));
    }

    let files = read_rendered(dir)?;
    tracing::debug!("read {} rendered file(s) from {}", files.len(), dir.display());

    let order = if uninstall {
        SortOrder::UninstallOrder
    } else {
        SortOrder::InstallOrder
    };
    let apis = VersionSet::new(api_versions.iter().map(String::as_str));
    let hooks = HookConfig::default();
    let kinds = KindOrder::default();
    let partition = ManifestPartitioner::new(&hooks, &kinds).partition(&files, &apis, order)?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&partition)?),
        OutputFormat::Manifest => print!("{}", flatten_manifests(&partition.manifests)),
        OutputFormat::Text => print_summary(partition, order),
    }
    Ok(())
}

/// Rendered files keyed by their `/`-separated path relative to `dir`
fn read_rendered(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(key, std::fs::read_to_string(entry.path())?);
    }
    Ok(files)
}

fn print_summary(mut partition: Partition, order: SortOrder) {
    sort_hooks_by_weight(&mut partition.hooks);

    println!("{}", style("HOOKS").bold().underlined());
    if partition.hooks.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    for hook in &partition.hooks {
        let events = hook
            .events
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "  {} {}/{} [{}] weight {}",
            style("•").cyan(),
            hook.kind,
            style(&hook.name).cyan(),
            events,
            hook.weight
        );
    }

    let heading = match order {
        SortOrder::InstallOrder => "MANIFESTS (install order)",
        SortOrder::UninstallOrder => "MANIFESTS (uninstall order)",
    };
    println!();
    println!("{}", style(heading).bold().underlined());
    for (i, manifest) in partition.manifests.iter().enumerate() {
        println!(
            "  {:>3}. {} {} {}",
            i + 1,
            manifest.head.kind(),
            style(manifest.head.name()).cyan(),
            style(&manifest.name).dim()
        );
    }

    for (chart, notes) in partition.notes.iter() {
        println!();
        println!("{}", style(format!("NOTES ({})", chart)).bold().underlined());
        println!("{}", notes.trim_end());
    }

    if !partition.skipped.is_empty() {
        println!();
        for skipped in &partition.skipped {
            println!("{} {}", style("⚠").yellow(), skipped);
        }
    }
}
