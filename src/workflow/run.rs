//! `alu run`: split, then enrich, in one command.
//!
//! Config and the analysis backend are resolved before splitting so a
//! missing credential fails before any output is written.
use anyhow::Result;

use crate::cli::EnrichArgs;

use super::{build_service, enrich_all, resolve_config, split_all};

pub fn run_all(args: &EnrichArgs) -> Result<()> {
    let config = resolve_config(&args.settings)?;
    let service = build_service(&config)?;
    split_all(&args.input, &args.output, &config.segment_rules())?;
    enrich_all(&args.input, &args.output, &config, service.as_ref())?;
    Ok(())
}
