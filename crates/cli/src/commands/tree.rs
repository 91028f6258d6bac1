use std::path::Path;

use procmap_core::{BuildOptions, TreeNode, TreeOptions};

use super::{print_json, Inputs};
use crate::config::Config;
use crate::error::CliError;
use crate::OutputFormat;

pub(crate) fn cmd_tree(
    dir: &Path,
    map: Option<&Path>,
    root: Option<&str>,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let inputs = Inputs::load(dir, map, false)?;
    let root = root.or(config.tree.root.as_deref());

    let (graph, tree) = procmap_core::build_all(
        &inputs.corpus,
        &BuildOptions {
            reference_map: inputs.map.as_ref(),
            preferred_root: root.map(str::to_string),
            resolver: config.resolver_config(),
        },
        &TreeOptions {
            root_id: root,
            max_depth: config.tree.max_depth,
            artifact_hook: None,
        },
    );

    if quiet {
        return Ok(());
    }
    match output {
        OutputFormat::Json => print_json(&tree),
        OutputFormat::Text => {
            print_tree(&tree);
            if !graph.diagnostics.is_empty() {
                println!();
                println!("Diagnostics ({}):", graph.diagnostics.len());
                for d in &graph.diagnostics {
                    println!("  {}", d);
                }
            }
        }
    }
    Ok(())
}

fn print_tree(tree: &TreeNode) {
    if tree.is_empty() {
        println!("(empty tree)");
        for d in &tree.diagnostics {
            println!("  {}", d);
        }
        return;
    }

    for (depth, node) in procmap_core::flatten(tree) {
        let indent = "  ".repeat(depth);
        let position = match (node.order.order_index, node.order.branch_id.as_deref()) {
            (Some(i), Some(b)) if b != procmap_core::MAIN_BRANCH => format!("  #{} {}", i, b),
            (Some(i), _) => format!("  #{}", i),
            _ => String::new(),
        };
        println!("{}{} [{}]{}", indent, node.label, node.kind, position);
        for d in &node.diagnostics {
            println!("{}  ! {}", indent, d);
        }
    }
}
