use std::path::Path;

use procmap_core::{BuildOptions, EdgeKind, NodeKind, ProcessGraph};

use super::{print_json, Inputs};
use crate::config::Config;
use crate::error::CliError;
use crate::OutputFormat;

pub(crate) struct GraphArgs<'a> {
    pub dir: &'a Path,
    pub map: Option<&'a Path>,
    pub root: Option<&'a str>,
    pub write_back: bool,
}

pub(crate) fn cmd_graph(
    args: &GraphArgs<'_>,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    if args.write_back && args.map.is_none() {
        return Err(CliError::WriteBackWithoutMap);
    }

    let inputs = Inputs::load(args.dir, args.map, args.write_back)?;
    let root = args.root.map(str::to_string).or_else(|| config.tree.root.clone());
    let graph = procmap_core::build_graph(
        &inputs.corpus,
        &BuildOptions {
            reference_map: inputs.map.as_ref(),
            preferred_root: root,
            resolver: config.resolver_config(),
        },
    );

    let written = match (args.write_back, args.map, inputs.map) {
        (true, Some(path), Some(mut map)) => {
            let changed = map.apply(&graph.accepted_matches);
            if changed > 0 {
                crate::corpus::write_reference_map(path, &map)?;
                tracing::info!(path = %path.display(), changed, "reference map updated");
            }
            Some(changed)
        }
        _ => None,
    };

    if quiet {
        return Ok(());
    }
    match output {
        OutputFormat::Json => print_json(&graph),
        OutputFormat::Text => {
            print_summary(&graph);
            if let (Some(changed), Some(path)) = (written, args.map) {
                println!();
                println!(
                    "Reference map: {} entr{} written to {}",
                    changed,
                    if changed == 1 { "y" } else { "ies" },
                    path.display()
                );
            }
        }
    }
    Ok(())
}

fn print_summary(graph: &ProcessGraph) {
    let processes = graph
        .nodes
        .values()
        .filter(|n| n.kind == NodeKind::Process)
        .count();
    let invocations = graph
        .edges
        .values()
        .filter(|e| e.kind == EdgeKind::Invocation)
        .count();

    println!("Process Graph");
    println!("=============");
    println!();
    println!(
        "  Processes: {}, nodes: {}, edges: {} ({} invocation)",
        processes,
        graph.nodes.len(),
        graph.edges.len(),
        invocations
    );
    if graph.roots.is_empty() {
        println!("  Roots: none");
    } else {
        println!("  Roots: {}", graph.roots.join(", "));
    }

    if !graph.unresolved.is_empty() {
        println!();
        println!("Unresolved ({}):", graph.unresolved.len());
        for u in &graph.unresolved {
            println!("  {}  {}", u.node_id, u.to_diagnostic());
        }
    }

    if !graph.accepted_matches.is_empty() {
        println!();
        println!("Auto-accepted ({}):", graph.accepted_matches.len());
        for m in &graph.accepted_matches {
            println!(
                "  {}#{} -> {} (confidence {:.2})",
                m.file, m.invocation_point_id, m.target_file, m.confidence
            );
        }
    }

    if !graph.diagnostics.is_empty() {
        println!();
        println!("Diagnostics ({}):", graph.diagnostics.len());
        for d in &graph.diagnostics {
            println!("  {}", d);
        }
    }
}
