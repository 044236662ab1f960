//! Output formatting utilities

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;
use crate::core::entity::Payload;
use crate::core::store::HierarchyNode;
use crate::core::version::Version;

const VERSION_HEADER: [&str; 8] = [
    "RECORD", "CODE", "NAME", "STATUS", "EFFECTIVE", "END", "CURRENT", "PATH",
];

const NODE_HEADER: [&str; 7] = [
    "DEPTH", "CODE", "NAME", "STATUS", "EFFECTIVE", "LEVEL", "PATH",
];

/// Determine the effective output format based on context
pub fn effective_format(format: OutputFormat, is_list: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if is_list {
                OutputFormat::Table
            } else {
                OutputFormat::Yaml
            }
        }
        other => other,
    }
}

fn version_row<P: Payload>(v: &Version<P>, blank: &str) -> Vec<String> {
    vec![
        v.record_id.to_string(),
        v.code.to_string(),
        v.payload.name().to_string(),
        v.status.to_string(),
        v.effective_date.to_string(),
        v.end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| blank.to_string()),
        if v.is_current { "*".to_string() } else { String::new() },
        v.hierarchy.name_path.clone(),
    ]
}

fn node_row(n: &HierarchyNode) -> Vec<String> {
    let indent = "  ".repeat(n.depth as usize);
    vec![
        n.depth.to_string(),
        format!("{}{}", indent, n.code),
        n.name.clone(),
        n.status.to_string(),
        n.effective_date.to_string(),
        n.hierarchy.level.to_string(),
        n.hierarchy.code_path.clone(),
    ]
}

fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut builder = Builder::default();
    builder.push_record(header.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    println!("{}", table);
}

fn print_csv(header: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record(header).into_diagnostic()?;
    for row in rows {
        wtr.write_record(&row).into_diagnostic()?;
    }
    wtr.flush().into_diagnostic()
}

fn print_serialized<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
        }
        _ => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
        }
    }
    Ok(())
}

/// Print a list of versions (a timeline, a history, or one row per code)
pub fn print_versions<P: Payload>(
    versions: &[Version<P>],
    format: OutputFormat,
    noun: &str,
) -> Result<()> {
    match effective_format(format, true) {
        OutputFormat::Json | OutputFormat::Yaml => print_serialized(versions, format),
        OutputFormat::Csv => print_csv(
            &VERSION_HEADER,
            versions.iter().map(|v| version_row(v, "")).collect(),
        ),
        OutputFormat::Id => {
            for v in versions {
                println!("{}", v.record_id);
            }
            Ok(())
        }
        _ => {
            if versions.is_empty() {
                println!("No {} found.", noun);
                return Ok(());
            }
            print_table(
                &VERSION_HEADER,
                versions.iter().map(|v| version_row(v, "-")).collect(),
            );
            println!();
            println!("{} {}(s)", style(versions.len()).cyan(), noun);
            Ok(())
        }
    }
}

/// Print one version in detail
pub fn print_version<P: Payload>(version: &Version<P>, format: OutputFormat) -> Result<()> {
    match effective_format(format, false) {
        OutputFormat::Table | OutputFormat::Csv => {
            print_versions(std::slice::from_ref(version), format, "version")
        }
        OutputFormat::Id => {
            println!("{}", version.record_id);
            Ok(())
        }
        other => print_serialized(version, other),
    }
}

/// Print a subtree, indenting codes by depth
pub fn print_nodes(nodes: &[HierarchyNode], format: OutputFormat) -> Result<()> {
    match effective_format(format, true) {
        OutputFormat::Json | OutputFormat::Yaml => print_serialized(nodes, format),
        OutputFormat::Csv => print_csv(&NODE_HEADER, nodes.iter().map(node_row).collect()),
        OutputFormat::Id => {
            for n in nodes {
                println!("{}", n.record_id);
            }
            Ok(())
        }
        _ => {
            print_table(&NODE_HEADER, nodes.iter().map(node_row).collect());
            Ok(())
        }
    }
}

/// Print anything serializable as YAML or JSON (tables fall back to YAML)
pub fn print_value<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    match effective_format(format, false) {
        OutputFormat::Json => print_serialized(value, OutputFormat::Json),
        _ => print_serialized(value, OutputFormat::Yaml),
    }
}
