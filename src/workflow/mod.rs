//! Pipeline stages behind the CLI subcommands.
//!
//! Each stage reads and writes the output folder only, so stages can be run
//! separately and repeated.
mod enrich;
mod link;
mod report;
mod run;
mod settings;
mod split;

pub use enrich::{enrich_all, is_authorization, run_enrich};
pub use link::run_link;
pub use run::run_all;
pub use settings::{build_service, load_settings, resolve_config};
pub use split::{run_split, split_all};
