use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::{CheckEntry, PayFrequency, RawField};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPayFrequency {
    Weekly,
    Biweekly,
}

impl From<CliPayFrequency> for PayFrequency {
    fn from(value: CliPayFrequency) -> Self {
        match value {
            CliPayFrequency::Weekly => PayFrequency::Weekly,
            CliPayFrequency::Biweekly => PayFrequency::Biweekly,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "paybudget",
    about = "Paycheck estimator and account allocation planner"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP, persisting to the state directory.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, env = "PAYBUDGET_STATE_DIR", default_value = ".paybudget")]
        state_dir: PathBuf,
    },
    /// Estimate a single paycheck and print it as JSON.
    Check(CheckArgs),
    /// Print the derived totals for the stored snapshot as JSON.
    Summary {
        #[arg(long, env = "PAYBUDGET_STATE_DIR", default_value = ".paybudget")]
        state_dir: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(long, value_enum, default_value_t = CliPayFrequency::Weekly)]
    frequency: CliPayFrequency,
    #[arg(long, default_value_t = 0.0, help = "Hourly pay rate")]
    hourly_pay: f64,
    #[arg(long, default_value_t = 0.0)]
    regular_hours: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Overtime hours, paid at 1.5x the hourly rate"
    )]
    overtime_hours: f64,
    #[arg(long, default_value_t = 0.0)]
    bonus: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Pre-tax 401k contribution in percent of gross"
    )]
    k401_percent: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Benefits deducted per paycheck"
    )]
    benefits: f64,
    #[arg(
        long,
        help = "Net pay already known from a pay stub; skips the estimate"
    )]
    known_net: Option<f64>,
}

fn field(value: f64) -> RawField {
    RawField::from(value)
}

pub fn build_check(args: CheckArgs) -> Result<CheckEntry, String> {
    for (name, value) in [
        ("--hourly-pay", args.hourly_pay),
        ("--regular-hours", args.regular_hours),
        ("--overtime-hours", args.overtime_hours),
        ("--bonus", args.bonus),
        ("--benefits", args.benefits),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !(0.0..=100.0).contains(&args.k401_percent) {
        return Err("--k401-percent must be between 0 and 100".to_string());
    }

    if let Some(known_net) = args.known_net {
        if !known_net.is_finite() {
            return Err("--known-net must be a finite amount".to_string());
        }
    }

    Ok(CheckEntry {
        frequency: args.frequency.into(),
        hourly_pay: field(args.hourly_pay),
        regular_hours: field(args.regular_hours),
        overtime_hours: field(args.overtime_hours),
        bonus: field(args.bonus),
        k401_percent: field(args.k401_percent),
        benefits: field(args.benefits),
        known_net: args.known_net.map(field).unwrap_or_default(),
    })
}
