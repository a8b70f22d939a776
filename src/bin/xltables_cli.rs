//! CLI tool for xltables - extracts tables from XLSX files and outputs JSON
//!
//! Usage:
//!   xltables_cli <input.xlsx>                      # Output JSON to stdout
//!   xltables_cli <input.xlsx> -o out.json          # Output JSON to file
//!   xltables_cli <input.xlsx> --date-format %Y-%m-%d --raw-blank-rows
//!
//! Diagnostics go to stderr; set `RUST_LOG` (default `warn`) to adjust.

#![allow(clippy::exit)]

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing_subscriber::EnvFilter;
use xltables::{process_xlsx, BlankRowRule, ExtractOptions};

const USAGE: &str = "Usage: xltables_cli <input.xlsx> [-o output.json] [--date-format PATTERN] \
                     [--raw-blank-rows] [--no-gap-split]";

struct Args {
    input: String,
    output: Option<String>,
    options: ExtractOptions,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut input = None;
    let mut output = None;
    let mut options = ExtractOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                output = Some(args.next().ok_or("missing value for -o")?);
            }
            "--date-format" => {
                let pattern = args.next().ok_or("missing value for --date-format")?;
                options = options.with_date_format(pattern);
            }
            "--raw-blank-rows" => options = options.with_blank_rows(BlankRowRule::Raw),
            "--no-gap-split" => options = options.with_row_gap_split(false),
            flag if flag.starts_with('-') => return Err(format!("unknown flag {flag}")),
            _ if input.is_none() => input = Some(arg),
            _ => return Err(format!("unexpected argument {arg}")),
        }
    }

    Ok(Args {
        input: input.ok_or("missing input file")?,
        output,
        options,
    })
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => fail(&format!("{e}\n{USAGE}")),
    };

    let data = match fs::read(&args.input) {
        Ok(d) => d,
        Err(e) => fail(&format!("Error reading {}: {e}", args.input)),
    };

    let file_name = Path::new(&args.input)
        .file_name()
        .map_or_else(|| args.input.clone(), |n| n.to_string_lossy().into_owned());

    let workbook = match process_xlsx(&file_name, &data, &args.options) {
        Ok(wb) => wb,
        Err(e) => fail(&format!("Error processing {}: {e}", args.input)),
    };

    let json = match serde_json::to_string_pretty(&workbook) {
        Ok(j) => j,
        Err(e) => fail(&format!("Error serializing JSON: {e}")),
    };

    match args.output {
        Some(path) => {
            if let Err(e) = fs::write(&path, &json) {
                fail(&format!("Error writing {path}: {e}"));
            }
            eprintln!(
                "Written: {path} ({} sheets, {} tables)",
                workbook.sheets.len(),
                workbook.table_count()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{json}") {
                fail(&format!("Error writing output: {e}"));
            }
        }
    }
}
