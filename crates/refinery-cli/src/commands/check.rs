//! Check command - run every quality check and report.

use std::path::PathBuf;

use colored::Colorize;
use refinery::{ColumnKind, ProcessorConfig, TableProcessor};

pub fn run(
    file: PathBuf,
    mut config: ProcessorConfig,
    json_output: bool,
    z_threshold: Option<f64>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }
    if let Some(z) = z_threshold {
        config.z_threshold = z;
    }

    let processor = TableProcessor::builder().path(&file).config(config).build()?;
    let report = processor.run_all_checks()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows, {} columns)",
        "Quality report for".cyan().bold(),
        file.display().to_string().white(),
        report.row_count,
        report.column_count
    );
    println!();

    println!("{}", "Columns:".yellow().bold());
    for (name, kind) in &report.dtypes {
        let missing = report.missing.per_column.get(name).copied().unwrap_or(0);
        let kind_label = match kind {
            ColumnKind::Numeric => kind.to_string().blue(),
            ColumnKind::Categorical => kind.to_string().magenta(),
            ColumnKind::Datetime => kind.to_string().green(),
        };
        let mut line = format!("  {:24} {:12}", name, kind_label);
        if let Some(distinct) = report.categorical.get(name) {
            line.push_str(&format!(" {} distinct", distinct));
        }
        if missing > 0 {
            line.push_str(&format!(" {}", format!("{} missing", missing).red()));
        }
        println!("{}", line);
    }
    println!();

    println!("{}", "Findings:".yellow().bold());
    let count = |n: usize| {
        if n == 0 {
            n.to_string().green()
        } else {
            n.to_string().red()
        }
    };
    println!("  Missing values:  {}", count(report.missing.total));
    println!("  Duplicate rows:  {}", count(report.duplicates.count));
    println!("  Outlier rows:    {}", count(report.outliers.total_rows()));
    if verbose {
        for (column, found) in report.outliers.flagged_columns() {
            println!("    {:22} {}", column, found.count);
        }
    }
    println!(
        "  Datetime index:  {}",
        if report.index_is_datetime { "yes" } else { "no" }
    );
    println!();

    if report.is_clean() {
        println!("{}", "No issues found.".green().bold());
    } else {
        println!(
            "Run {} to repair.",
            format!("refinery clean {}", file.display()).white().bold()
        );
    }

    Ok(())
}
