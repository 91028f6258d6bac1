use std::path::Path;

use procmap_core::{resolve_invocations, BuildOptions};

use super::{print_json, Inputs};
use crate::config::Config;
use crate::error::CliError;
use crate::OutputFormat;

/// Print how every invocation point resolves. Rows come from the same
/// validated file set the graph is built from, so they agree with the
/// edges `graph` and `tree` show.
pub(crate) fn cmd_resolve(
    dir: &Path,
    map: Option<&Path>,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let inputs = Inputs::load(dir, map, false)?;
    let options = BuildOptions {
        reference_map: inputs.map.as_ref(),
        preferred_root: None,
        resolver: config.resolver_config(),
    };
    let rows = resolve_invocations(&inputs.corpus, &options);

    if quiet {
        return Ok(());
    }
    match output {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No invocation points found.");
                return Ok(());
            }
            for row in &rows {
                let target = row.resolution.target_file.as_deref().unwrap_or("-");
                let mut line = format!(
                    "{}#{}  {}  {}  {:.2}",
                    row.file,
                    row.invocation_point_id,
                    row.resolution.status.as_str(),
                    target,
                    row.resolution.confidence
                );
                if row.resolution.accepted {
                    line.push_str("  accepted");
                }
                if let Some(reason) = &row.resolution.reason {
                    line.push_str(&format!("  [{}]", reason.code()));
                }
                println!("{}", line);
            }
        }
    }
    Ok(())
}
