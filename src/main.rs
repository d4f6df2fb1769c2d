use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use riskcast::analysis::{AnalysisResult, run_analysis};
use riskcast::config::{AnalysisParams, ReferenceCache, ReferenceSource};
use riskcast::types::Month;

const USAGE: &str = "\
usage: riskcast [options]
  --cargo-value <f64>     cargo value (default 100000)
  --route <name>          shipping route (default \"VN - EU\")
  --month <1-12>          shipment month (default 9)
  --profile <name>        cost-saving | balanced | max-safety
  --runs <n>              Monte Carlo runs per company (default 2000)
  --seed <u64>            simulator seed (default 42)
  --uncertainty <pct>     fuzzy uncertainty percent (default 15)
  --var-confidence <p>    VaR confidence level (default 0.95)
  --no-fuzzy | --no-arima | --no-mc | --no-var
  --reference <json>      load reference tables from a JSON file
  --table                 print a ranking table to stderr as well
  --quiet                 suppress JSON output";

/// Flags that take no value.
const SWITCHES: [&str; 6] = ["--no-fuzzy", "--no-arima", "--no-mc", "--no-var", "--table", "--quiet"];

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut params = AnalysisParams::default();
    let mut source = ReferenceSource::Canonical;
    let mut table = false;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || args.get(i + 1).map(String::as_str);
        let parsed = match flag {
            "--cargo-value" => parse(value(), flag).map(|v| params.cargo_value = v),
            "--route" => parse(value(), flag).map(|v| params.route = v),
            "--month" => parse(value(), flag).map(|v| params.month = Month(v)),
            "--profile" => parse(value(), flag).map(|v| params.priority_profile = v),
            "--runs" => parse(value(), flag).map(|v| params.mc_runs = v),
            "--seed" => parse(value(), flag).map(|v| params.seed = v),
            "--uncertainty" => parse(value(), flag).map(|v| params.fuzzy_uncertainty = v),
            "--var-confidence" => parse(value(), flag).map(|v| params.var_confidence = v),
            "--reference" => parse::<PathBuf>(value(), flag)
                .map(|v| source = ReferenceSource::JsonFile(v)),
            "--no-fuzzy" => {
                params.use_fuzzy = false;
                Ok(())
            }
            "--no-arima" => {
                params.use_arima = false;
                Ok(())
            }
            "--no-mc" => {
                params.use_monte_carlo = false;
                Ok(())
            }
            "--no-var" => {
                params.use_var = false;
                Ok(())
            }
            "--table" => {
                table = true;
                Ok(())
            }
            "--quiet" => {
                quiet = true;
                Ok(())
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            other => Err(format!("unknown argument {other}")),
        };
        if let Err(msg) = parsed {
            eprintln!("error: {msg}\n{USAGE}");
            return ExitCode::FAILURE;
        }
        i += if SWITCHES.contains(&flag) { 1 } else { 2 };
    }

    let cache = ReferenceCache::new(source);
    let result = cache
        .get()
        .map_err(riskcast::AnalysisError::from)
        .and_then(|reference| run_analysis(&params, &reference));

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "analysis failed");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if !quiet {
        match serde_json::to_string_pretty(&result) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: failed to serialize result: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    if table {
        print_ranking(&result, params.cargo_value);
    }
    ExitCode::SUCCESS
}

fn parse<T: std::str::FromStr>(value: Option<&str>, flag: &str) -> Result<T, String> {
    let raw = value.ok_or_else(|| format!("{flag} requires a value"))?;
    raw.parse().map_err(|_| format!("{flag}: cannot parse {raw:?}"))
}

fn print_ranking(result: &AnalysisResult, cargo_value: f64) {
    eprintln!(
        "\n=== Ranking: {} on {} (baseline climate risk {:.3}) ===",
        result.profile.display_name(),
        result.route,
        result.baseline_risk
    );
    eprintln!(
        "{:>4} | {:<10} | {:<6} | {:<8} | {:>7} | {:>10} | {:>6} | {:>6} | {:>5}",
        "Rank", "Company", "Tier", "Category", "Rate%", "Cost", "Score", "Risk", "Conf"
    );
    eprintln!("{}", "-".repeat(86));
    for r in &result.options {
        let o = &r.option;
        eprintln!(
            "{:>4} | {:<10} | {:<6} | {:<8} | {:>6.3}% | {:>10.2} | {:>6.4} | {:>6.3} | {:>5.2}",
            r.rank,
            o.company,
            o.tier,
            format!("{:?}", r.category),
            o.premium_rate * 100.0,
            o.estimated_cost,
            r.score,
            o.risk_mean(),
            r.confidence,
        );
    }

    eprintln!("\n--- Weights ---");
    for (criterion, w) in result.weights.iter() {
        eprintln!("  {:<18} {:>6.3}", criterion.label(), w);
    }
    if let Some(c) = result.most_uncertain {
        eprintln!("  most uncertain: {}", c.label());
    }

    if result.surcharge_applied {
        eprintln!("\nHigh-value surcharge applied (cargo value {cargo_value:.0}).");
    }
    if let Some(tail) = &result.tail_risk {
        eprintln!(
            "\nVaR {:.0}%: {:.2}   CVaR: {:.2}",
            tail.confidence * 100.0,
            tail.var,
            tail.cvar
        );
    }
    eprintln!(
        "Next-month climate risk: {:.3} ({})",
        result.forecast.next_value(),
        if result.forecast.used_arima() { "ARIMA(1,1,1)" } else { "trend" }
    );
}
