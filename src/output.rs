use std::io::{self, Write};

use crossterm::style::Stylize;
use serde::Serialize;

use crate::app::{ClearResult, ProgressEvent, ProgressSink, RunResult};
use crate::generator::{GenerateResult, RecordOrigin};
use crate::patcher::PatchResult;
use crate::sequencer::SequenceResult;
use crate::verify::AlignmentReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Silent progress; prints final results as pretty JSON on stdout.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable progress on stderr and summaries on stdout.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let message = match event.message.strip_prefix("phase=") {
            Some(phase) => format!("==> {phase}").cyan().bold().to_string(),
            None => event.message,
        };
        match event.elapsed {
            Some(elapsed) => eprintln!("{message} {}", format!("[{} ms]", elapsed.as_millis()).dim()),
            None => eprintln!("{message}"),
        }
    }
}

impl ConsoleOutput {
    pub fn print_sequence(result: &SequenceResult) {
        println!("{}", "Image sequencing".cyan().bold());
        println!("  found:   {}", result.found);
        println!("  {} {}", "copied: ".green(), result.copied.len());
        println!("  {} {}", "skipped:".yellow(), result.skipped.len());
        for skipped in &result.skipped {
            println!("    {} ({})", skipped.source, skipped.reason);
        }
        println!("  {} {}", "failed: ".red(), result.failed.len());
        for failed in &result.failed {
            println!("    {}: {}", failed.source, failed.message);
        }
        println!("  output:  {}", result.destination);
    }

    pub fn print_generate(result: &GenerateResult) {
        println!("{}", "Metadata generation".cyan().bold());
        println!("  considered:   {}", result.considered);
        println!("  {} {}", "from PokeAPI:".green(), result.from_api);
        println!("  {} {}", "placeholders:".yellow(), result.placeholders);
        for item in result
            .items
            .iter()
            .filter(|item| item.origin == RecordOrigin::Placeholder)
        {
            println!("    {}.json <- {}", item.number, item.source);
        }
        println!("  {} {}", "write errors:".red(), result.write_failures);
        println!("  output:       {} (1.json, 2.json, ...)", result.output_dir);
    }

    pub fn print_patch(result: &PatchResult) {
        println!("{}", "Image links".cyan().bold());
        println!("  {} {}", "updated:".green(), result.updated.len());
        println!("  {} {}", "skipped:".yellow(), result.skipped.len());
        for skipped in &result.skipped {
            println!("    {}: {}", skipped.path, skipped.message);
        }
        println!("  {} {}", "errors: ".red(), result.errors.len());
        for error in &result.errors {
            println!("    {}: {}", error.path, error.message);
        }
        if result.updated.is_empty() && result.errors.is_empty() {
            println!("  no JSON files required updating in {}", result.directory);
        }
    }

    pub fn print_alignment(report: &AlignmentReport) {
        println!("{}", "Alignment".cyan().bold());
        println!("  images:   {}", report.images);
        println!("  metadata: {}", report.metadata);
        if report.aligned {
            println!("  {}", "every image has matching metadata".green());
            return;
        }
        if !report.missing_metadata.is_empty() {
            println!(
                "  {} {}",
                "no metadata for:".red(),
                join_numbers(&report.missing_metadata)
            );
        }
        if !report.missing_images.is_empty() {
            println!(
                "  {} {}",
                "no image for:".red(),
                join_numbers(&report.missing_images)
            );
        }
        if !report.duplicate_images.is_empty() {
            println!(
                "  {} {}",
                "several images numbered:".red(),
                join_numbers(&report.duplicate_images)
            );
        }
    }

    pub fn print_run(result: &RunResult) {
        Self::print_sequence(&result.sequence);
        Self::print_generate(&result.generate);
        Self::print_patch(&result.patch);
        Self::print_alignment(&result.alignment);
    }

    pub fn print_clear(result: &ClearResult) {
        if result.cleared {
            println!("{} {}", "cleared".green(), result.cache_root);
        } else {
            println!("{} {}", "nothing to clear at".yellow(), result.cache_root);
        }
    }
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(|number| number.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
