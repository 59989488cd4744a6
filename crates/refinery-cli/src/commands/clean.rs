//! Clean command - apply cleaning steps and save the result.

use std::io;
use std::path::{Path, PathBuf};

use colored::Colorize;
use refinery::{
    ColumnList, DateIndexOptions, DuplicateMethod, ImputeStrategy, PlotKind, ProcessorConfig,
    SaveFormat, TableProcessor, TextRenderer,
};

use crate::cli::CleanArgs;

pub fn run(
    args: CleanArgs,
    config: ProcessorConfig,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !args.file.exists() {
        return Err(format!("File not found: {}", args.file.display()).into());
    }

    // Parse every tag before loading, so a typo fails fast.
    let strategy = args
        .missing
        .as_deref()
        .map(str::parse::<ImputeStrategy>)
        .transpose()?;
    let method = args
        .duplicates
        .as_deref()
        .map(str::parse::<DuplicateMethod>)
        .transpose()?;
    let plot: PlotKind = args.plot.parse()?;
    let (output, format) = output_target(&args.file, args.output.as_deref(), args.format.as_deref())?;

    println!(
        "{} {}",
        "Cleaning".cyan().bold(),
        args.file.display().to_string().white()
    );

    let iqr_multiplier = args.iqr_multiplier.unwrap_or(config.iqr_multiplier);
    let mut processor = TableProcessor::builder()
        .path(&args.file)
        .config(config)
        .build()?;
    let before = processor.snapshot();

    if !args.drop.is_empty() {
        processor.drop_columns(args.drop.clone());
    }
    if let Some(column) = &args.index {
        processor.set_index_column(column)?;
    }
    if let Some(column) = &args.index_date {
        let mut options = DateIndexOptions::new()
            .force_plain_date(args.plain_date)
            .drop_invalid(!args.keep_invalid);
        if let Some(log) = &args.invalid_log {
            options = options.log_to(log);
        }
        processor.set_index_date(column, options)?;
    }
    if let Some(strategy) = strategy {
        let force_int: Vec<&str> = args.force_int.iter().map(String::as_str).collect();
        let report = processor.handle_missing_with_report(strategy, &force_int)?;
        if !report.unfillable.is_empty() {
            println!(
                "  {} no values to impute from: {}",
                "Warning:".yellow().bold(),
                report.unfillable.join(", ")
            );
        }
    }
    if let Some(method) = method {
        let subset = (!args.subset.is_empty()).then(|| ColumnList::from(args.subset.clone()));
        processor.resolve_duplicates_on(subset, method)?;
    }
    if let Some(z) = args.zscore {
        processor.remove_outliers_zscore(z);
    }
    if let Some(column) = &args.iqr {
        processor.remove_outliers_iqr(column, iqr_multiplier)?;
    }
    if args.normalize {
        processor.normalize_columns(None)?;
    }

    processor.save(&output, format)?;

    println!();
    println!("{}", "Applied:".yellow().bold());
    for change in processor.history().changes() {
        println!("  {:28} {}", change.operation.white(), change.description);
    }
    if processor.history().is_empty() {
        println!("  (no steps requested)");
    }
    println!();
    println!(
        "{} rows -> {} rows ({} removed)",
        before.row_count().to_string().white().bold(),
        processor.table().row_count().to_string().white().bold(),
        processor.history().rows_removed.to_string().red()
    );

    if let Some(path) = &args.history {
        processor.save_history(path)?;
        if verbose {
            println!("History written to {}", path.display().to_string().white());
        }
    }

    if let Some(column) = &args.compare {
        println!();
        let mut renderer = TextRenderer::new(io::stdout().lock());
        processor.visualize(&mut renderer, &before, column, plot)?;
    }

    println!();
    println!(
        "{} {}",
        "Saved".green().bold(),
        output.display().to_string().white()
    );

    Ok(())
}

/// Destination path and format. The format comes from `--format`, then the
/// output extension, then defaults to CSV.
fn output_target(
    input: &Path,
    output: Option<&Path>,
    format: Option<&str>,
) -> Result<(PathBuf, SaveFormat), Box<dyn std::error::Error>> {
    let format = match (format, output) {
        (Some(tag), _) => tag.parse::<SaveFormat>()?,
        (None, Some(path)) => SaveFormat::from_path(path)?,
        (None, None) => SaveFormat::Csv,
    };

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            input.with_file_name(format!("{}.clean.{}", stem, format.extension()))
        }
    };

    Ok((output, format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_target_defaults() {
        let (path, format) = output_target(Path::new("data/in.tsv"), None, None).unwrap();
        assert_eq!(path, PathBuf::from("data/in.clean.csv"));
        assert_eq!(format, SaveFormat::Csv);

        let (path, format) =
            output_target(Path::new("in.csv"), Some(Path::new("out.xlsx")), None).unwrap();
        assert_eq!(path, PathBuf::from("out.xlsx"));
        assert_eq!(format, SaveFormat::Xlsx);

        let (_, format) = output_target(Path::new("in.csv"), None, Some("xlsx")).unwrap();
        assert_eq!(format, SaveFormat::Xlsx);

        assert!(output_target(Path::new("in.csv"), None, Some("parquet")).is_err());
        assert!(output_target(Path::new("in.csv"), Some(Path::new("out.txt")), None).is_err());
    }
}
