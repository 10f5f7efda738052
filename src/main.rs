mod cli;

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::Parser;
use cli::{formatters, Cli, Commands};
use darf::config::TaxRules;
use darf::tax::{classify, TaxEngine};
use darf::{importers, persistence};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match &cli.command {
        Commands::Calculate {
            file,
            state,
            save,
            period,
        } => handle_calculate(&cli, file, state.as_deref(), *save, period.as_deref()),
        Commands::Classify { file } => handle_classify(file, cli.json),
        Commands::Positions { state } => handle_positions(state, cli.json),
    }
}

/// Handle calculate command
fn handle_calculate(
    cli: &Cli,
    file: &Path,
    state: Option<&Path>,
    save: bool,
    period: Option<&str>,
) -> Result<()> {
    let rules = TaxRules::resolve(cli.config.as_deref()).context("Failed to load tax rules")?;
    let period = period.map(parse_period).transpose()?;
    let transactions = importers::import_file(file)?;

    let mut engine = TaxEngine::new(rules);
    if let Some(state_path) = state {
        let snapshot = persistence::load_or_default(state_path)
            .with_context(|| format!("Failed to load state from {:?}", state_path))?;
        engine.restore(snapshot);
    }

    for tx in transactions {
        let id = tx.operation_id;
        if let Err(e) = engine.transactions_mut().add(tx) {
            warn!("Skipping transaction {}: {}", id, e);
        }
    }
    info!("Loaded {} transactions", engine.transactions().len());

    let assessment = engine
        .calculate_darf()
        .context("Error calculating the DARF")?;

    let payment = match period {
        Some((year, month)) => assessment.payment_for(year, month)?,
        None => None,
    };

    if cli.json {
        println!(
            "{}",
            formatters::format_run_json(&engine, &assessment, payment.as_ref())
        );
    } else {
        println!(
            "{}",
            formatters::format_run_table(&engine, &assessment, payment.as_ref())
        );
    }

    if save {
        if let Some(state_path) = state {
            persistence::save_snapshot(state_path, &engine.snapshot())
                .with_context(|| format!("Failed to save state to {:?}", state_path))?;
            if !cli.json {
                println!("State saved to {}", state_path.display());
            }
        }
    }

    Ok(())
}

/// Handle classify command
fn handle_classify(file: &Path, json_output: bool) -> Result<()> {
    let transactions = importers::import_file(file)?;
    let classification = classify(&transactions)?;

    if json_output {
        println!("{}", formatters::format_classification_json(&classification));
    } else {
        println!("{}", formatters::format_classification_table(&classification));
    }
    Ok(())
}

/// Handle positions command
fn handle_positions(state: &Path, json_output: bool) -> Result<()> {
    let snapshot = persistence::load_snapshot(state)
        .with_context(|| format!("Failed to load state from {:?}", state))?;

    if json_output {
        println!("{}", formatters::format_positions_json(&snapshot.positions));
    } else {
        println!("{}", formatters::format_positions_table(&snapshot.positions));
    }
    Ok(())
}

/// Parse a "YYYY-MM" tax period
fn parse_period(text: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", text.trim()), "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid period '{}'. Use YYYY-MM", text))?;
    Ok((date.year(), date.month()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("2024-03").unwrap(), (2024, 3));
        assert!(parse_period("2024-13").is_err());
        assert!(parse_period("03/2024").is_err());
    }
}
