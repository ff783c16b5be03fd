use anyhow::bail;
use anyhow::Result;
use chip_tools::chips::convert_all;
use chip_tools::chips::ConversionJob;
use chip_tools::chips::DEFAULT_TABLES;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Converts chip tables (CSV) into deduplicated JSON documents
#[derive(Parser)]
#[command(name = "chips-to-json")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding the `{table}.csv` files
    #[arg(long, default_value = ".")]
    input_dir: PathBuf,

    /// Directory receiving the `{table}.json` documents
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Table to convert; repeat for several (default: Giga, Mega, Standard)
    #[arg(long = "table", value_name = "NAME")]
    tables: Vec<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    chip_tools::logging::init(cli.verbose);

    let tables: Vec<&str> = if cli.tables.is_empty() {
        DEFAULT_TABLES.to_vec()
    } else {
        cli.tables.iter().map(String::as_str).collect()
    };
    let jobs: Vec<ConversionJob> = tables.iter()
        .map(|table| ConversionJob::for_table(table, &cli.input_dir, &cli.output_dir))
        .collect();

    let results = convert_all(&jobs);
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    for (job, result) in &results {
        if let Ok(summary) = result {
            info!("{} -> {}: {summary}", job.input.display(), job.output.display());
        }
    }
    if failed > 0 {
        bail!("{failed} of {} conversions failed", results.len());
    }
    Ok(())
}
