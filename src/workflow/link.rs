//! `alu link`: standalone repair pass over split documents.
use anyhow::{anyhow, Result};

use crate::cli::LinkArgs;
use crate::link::relink_document;
use crate::paths::OutputPaths;
use crate::store;
use crate::util::display_path;

pub fn run_link(args: &LinkArgs) -> Result<()> {
    let output = OutputPaths::new(args.output.clone());
    let docs = match &args.doc {
        Some(slug) => {
            let paths = output.document(slug);
            if !paths.dir().is_dir() {
                return Err(anyhow!(
                    "document folder {} does not exist",
                    paths.dir().display()
                ));
            }
            vec![paths]
        }
        None => store::discover_documents(&output)?,
    };

    let mut rewritten = 0;
    for paths in &docs {
        let summary = relink_document(paths)?;
        for id in &summary.unnumbered {
            println!("  warning: {id} has no numeric article number; sorted first");
        }
        for path in &summary.unreadable {
            println!(
                "  warning: {} could not be read; left out of the chain",
                display_path(path, Some(paths.dir()))
            );
        }
        println!(
            "  {}: {} unit(s), {} rewritten",
            paths.slug(),
            summary.units,
            summary.rewritten
        );
        rewritten += summary.rewritten;
    }
    println!("linked {} document(s), {rewritten} file(s) rewritten", docs.len());
    Ok(())
}
