//! # apx-tool - Node definition inspector
//!
//! A small demo binary over the `apx` library: parses a `.apx` node
//! definition file from disk, finalizes it, and prints the resulting port
//! layout (packed offsets, sizes, and optionally each port's canonical
//! signature string). Not a server/client runtime — running an actual
//! socket acceptor is out of scope for this crate.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, prelude::*, Layer};

use apx::cli::Args;
use apx::node;

mod logging;
use logging::ColorizedFormatter;

/// JSON report shape for `--json`, following the teacher's
/// `serde_json::to_string_pretty`-over-a-plain-struct pattern for result
/// output (`results.rs`'s `MessageLatencyRecord` dumps).
#[derive(Serialize)]
struct NodeReport {
    name: String,
    provide: Vec<PortReport>,
    require: Vec<PortReport>,
}

#[derive(Serialize)]
struct PortReport {
    id: usize,
    name: String,
    offset: usize,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let stdout_log = if !args.quiet {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .event_format(ColorizedFormatter)
                .with_filter(log_level),
        )
    } else {
        None
    };

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(log_level);

    tracing_subscriber::registry().with(stdout_log).with(stderr_log).init();

    if let Err(e) = run(&args) {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let text = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;

    let mut node = node::build_node(&text).map_err(|e| anyhow::anyhow!("{e}"))?;
    node.finalize().context("failed to finalize node")?;

    info!("parsed node \"{}\"", node.name);

    let (provide_layouts, provide_total) = apx::packed::compute_layout(&node.provide_ports)?;
    let (require_layouts, require_total) = apx::packed::compute_layout(&node.require_ports)?;

    if args.json {
        let report = NodeReport {
            name: node.name.clone(),
            provide: build_report(&node.provide_ports, &provide_layouts, args.signatures),
            require: build_report(&node.require_ports, &require_layouts, args.signatures),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("node \"{}\"", node.name);
    print_ports("provide", &node.provide_ports, &provide_layouts, provide_total, args.signatures);
    print_ports("require", &node.require_ports, &require_layouts, require_total, args.signatures);

    Ok(())
}

fn build_report(ports: &[node::Port], layouts: &[apx::packed::PortLayout], show_signatures: bool) -> Vec<PortReport> {
    ports
        .iter()
        .zip(layouts.iter())
        .map(|(port, layout)| PortReport {
            id: port.id,
            name: port.name.clone(),
            offset: layout.offset,
            size: layout.size,
            signature: show_signatures.then(|| port.effective_element.as_ref().map(|e| e.canonical()).unwrap_or_default()),
        })
        .collect()
}

fn print_ports(
    label: &str,
    ports: &[node::Port],
    layouts: &[apx::packed::PortLayout],
    total_size: usize,
    show_signatures: bool,
) {
    println!("  {label} ports ({} bytes total):", total_size);
    for (port, layout) in ports.iter().zip(layouts.iter()) {
        if show_signatures {
            let signature = port.effective_element.as_ref().map(|e| e.canonical()).unwrap_or_default();
            println!("    [{}] {} @ {}..{} ({})", port.id, port.name, layout.offset, layout.offset + layout.size, signature);
        } else {
            println!("    [{}] {} @ {}..{}", port.id, port.name, layout.offset, layout.offset + layout.size);
        }
    }
}
