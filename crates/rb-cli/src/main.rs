//! RuleBridge CLI
//!
//! CLI tool for converting filter lists between dialects and inspecting the
//! compatibility table.

mod convert;

use std::fs;

use clap::{Parser, Subcommand};

use rb_converter::{Converter, ListOptions};
use rb_core::{CompatibilityTable, Dialect, NameKind, RuleClassification};

#[derive(Parser)]
#[command(name = "rb-cli")]
#[command(about = "RuleBridge scriptlet and redirect rule converter")]
struct Cli {
    /// Custom compatibility table (JSON) instead of the embedded one
    #[arg(long, global = true)]
    table: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert filter lists from one dialect to another
    Convert {
        /// Input filter list files (`-` for stdin)
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Source dialect (adg, ubo, abp)
        #[arg(long)]
        from: Dialect,

        /// Target dialect (adg, ubo, abp)
        #[arg(long)]
        to: Dialect,

        /// Leave out comments and lines that are not convertible rules
        #[arg(long)]
        drop_unrecognized: bool,

        /// Keep duplicate output rules
        #[arg(long)]
        keep_duplicates: bool,

        /// Print the conversion report as JSON on stderr
        #[arg(long)]
        stats_json: bool,
    },

    /// Classify rules by dialect and kind
    Classify {
        /// Rules to classify
        #[arg(required = true)]
        rules: Vec<String>,
    },

    /// Translate a scriptlet or redirect name between dialects
    Resolve {
        name: String,

        #[arg(long)]
        from: Dialect,

        #[arg(long)]
        to: Dialect,

        /// Name kind (scriptlet, redirect)
        #[arg(long, default_value = "scriptlet")]
        kind: NameKind,
    },

    /// Validate the compatibility table and print a summary
    CheckTable,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let custom = load_table(cli.table.as_deref())?;
    let table = custom.as_ref().unwrap_or_else(|| CompatibilityTable::global());
    let converter = Converter::new(table);

    match cli.command {
        Commands::Convert {
            input,
            output,
            from,
            to,
            drop_unrecognized,
            keep_duplicates,
            stats_json,
        } => {
            let options = ListOptions {
                keep_unrecognized: !drop_unrecognized,
                dedupe: !keep_duplicates,
            };
            cmd_convert(&converter, &input, output.as_deref(), from, to, &options, cli.verbose, stats_json)
        }
        Commands::Classify { rules } => cmd_classify(&converter, &rules),
        Commands::Resolve { name, from, to, kind } => cmd_resolve(&converter, &name, from, to, kind),
        Commands::CheckTable => cmd_check_table(table, cli.table.as_deref()),
    }
}

fn load_table(path: Option<&str>) -> Result<Option<CompatibilityTable>, String> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    let table = CompatibilityTable::from_json(&text)
        .map_err(|e| format!("Invalid compatibility table '{}': {}", path, e))?;
    Ok(Some(table))
}

#[allow(clippy::too_many_arguments)]
fn cmd_convert(
    converter: &Converter<'_>,
    inputs: &[String],
    output: Option<&str>,
    from: Dialect,
    to: Dialect,
    options: &ListOptions,
    verbose: bool,
    stats_json: bool,
) -> Result<(), String> {
    let (text, report) = convert::convert_inputs(converter, inputs, from, to, options, verbose)?;

    match output {
        Some(path) => fs::write(path, &text)
            .map_err(|e| format!("Failed to write '{}': {}", path, e))?,
        None => print!("{text}"),
    }

    if stats_json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;
        eprintln!("{json}");
    } else {
        let total = &report.total;
        eprintln!("Converted {} filter lists ({} -> {})", inputs.len(), from, to);
        eprintln!("  Lines:    {}", total.lines);
        eprintln!("  Rules:    {} converted -> {} written (dedupe removed {})", total.converted, total.emitted, total.deduped);
        eprintln!("  Other:    {} passed through, {} failed", total.passed_through, total.failed);
        eprintln!("  Time:     {:.1}ms", report.total_ms);
    }

    Ok(())
}

fn cmd_classify(converter: &Converter<'_>, rules: &[String]) -> Result<(), String> {
    for rule in rules {
        match converter.classify(rule) {
            RuleClassification::Rule { dialect, kind } => {
                println!("{}\t{:?}\t{}", dialect.as_str(), kind, rule);
            }
            RuleClassification::NotARule => println!("-\tNotARule\t{}", rule),
        }
    }
    Ok(())
}

fn cmd_resolve(converter: &Converter<'_>, name: &str, from: Dialect, to: Dialect, kind: NameKind) -> Result<(), String> {
    let resolution = converter
        .resolver()
        .resolve_name(name, from, to, kind)
        .map_err(|e| e.to_string())?;

    println!("{}", resolution.target);
    log::info!("canonical: {}", resolution.canonical());
    Ok(())
}

fn cmd_check_table(table: &CompatibilityTable, path: Option<&str>) -> Result<(), String> {
    // The embedded table falls back to an empty one when it fails to load
    if path.is_none() {
        CompatibilityTable::embedded().map_err(|e| format!("Invalid embedded table: {}", e))?;
    }

    println!("Compatibility table: {}", path.unwrap_or("<embedded>"));
    for kind in [NameKind::Scriptlet, NameKind::Redirect] {
        let entries = table.kind(kind);
        println!("  {:<10}  {} entries", format!("{kind}s:"), entries.len());
        for dialect in Dialect::ALL {
            let supported = entries.entries().iter().filter(|e| e.supports(dialect)).count();
            println!(
                "    {}:  {} supported, {} accepted names",
                dialect.as_str(),
                supported,
                entries.names(dialect).len()
            );
        }
    }

    Ok(())
}
