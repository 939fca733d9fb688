use std::path::Path;

use crate::commands::common::{
    format_report_lines, ingest_file, load_config, resolve_max_bytes, InspectReport,
};
use crate::error::CliError;

pub fn run_inspect(path: &Path, as_json: bool, max_bytes: Option<u64>) -> Result<(), CliError> {
    let config = load_config()?;
    let max_bytes = resolve_max_bytes(max_bytes, &config)?;
    let report = InspectReport::new(&ingest_file(path, max_bytes)?, max_bytes);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }

    Ok(())
}
