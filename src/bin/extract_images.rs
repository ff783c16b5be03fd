use anyhow::Context;
use anyhow::Result;
use chip_tools::images::extract_images;
use chip_tools::images::ExtractCriteria;
use clap::Parser;
use std::path::PathBuf;

/// Saves the pictures embedded in a chip workbook, named after its Image column
#[derive(Parser)]
#[command(name = "extract-images")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Workbook to read
    #[arg(default_value = "chips.xlsx")]
    workbook: PathBuf,

    /// Directory receiving the images
    #[arg(long, default_value = "images")]
    output_dir: PathBuf,

    /// Number of sheets to process
    #[arg(long, default_value_t = chip_tools::images::criteria::DEFAULT_SHEET_LIMIT)]
    sheet_limit: usize,

    /// Header text of the column naming the images
    #[arg(long, default_value = chip_tools::images::criteria::DEFAULT_HEADER)]
    header: String,

    /// Only process sheets whose name matches this glob; repeat for several
    #[arg(long = "sheet", value_name = "GLOB")]
    sheets: Vec<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    chip_tools::logging::init(cli.verbose);

    let criteria = ExtractCriteria {
        sheet_limit: Some(cli.sheet_limit),
        header: cli.header,
        ..Default::default()
    }
    .with_sheet_patterns(&cli.sheets)
    .context("Invalid sheet pattern")?;

    extract_images(&cli.workbook, &cli.output_dir, &criteria)
        .with_context(|| format!("Extracting images from '{}' failed", cli.workbook.display()))?;
    Ok(())
}
