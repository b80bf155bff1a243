use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rebalance_core::numeric::uniform;
use rebalance_core::rebalance::forecast::{final_share, tracking_error};
use rebalance_core::rebalance::plan::{self, RebalanceInput};
use rebalance_core::rebalance::projection::{self, ProjectionInput};
use rebalance_core::rebalance::reference::compute_reference;
use rebalance_core::Period;

use crate::input;

/// Arguments for a full rebalance
#[derive(Args)]
pub struct RebalanceArgs {
    /// Path to a JSON file with a complete rebalance input
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated original targets (e.g. "28,22,15,25,10")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub targets: Option<Vec<Decimal>>,

    /// Comma-separated shares achieved so far
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub current: Option<Vec<Decimal>>,

    /// Allocation periods already consumed
    #[arg(long)]
    pub elapsed: Option<u32>,

    /// Allocation periods in the whole horizon
    #[arg(long)]
    pub total: Option<u32>,

    /// Lower bounds: one value for every category, or one per category
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub lower: Option<Vec<Decimal>>,

    /// Upper bounds: one value for every category, or one per category
    /// (default: the target sum)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub upper: Option<Vec<Decimal>>,

    /// Required total of the new targets (100 for percentages, 1 for proportions)
    #[arg(long, default_value = "100")]
    pub target_sum: Decimal,

    /// Relative tolerance on the total
    #[arg(long)]
    pub tolerance: Option<Decimal>,

    /// Comma-separated category names
    #[arg(long, value_delimiter = ',')]
    pub names: Option<Vec<String>>,
}

/// Arguments for the unconstrained catch-up reference
#[derive(Args)]
pub struct ReferenceArgs {
    /// Comma-separated original targets
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub targets: Vec<Decimal>,

    /// Comma-separated shares achieved so far
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub current: Vec<Decimal>,

    /// Allocation periods already consumed
    #[arg(long)]
    pub elapsed: u32,

    /// Allocation periods in the whole horizon
    #[arg(long)]
    pub total: u32,
}

/// Arguments for a standalone bounded projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to a JSON file with a projection input
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated vector to project
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub reference: Option<Vec<Decimal>>,

    /// Lower bounds: one value for every category, or one per category
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub lower: Option<Vec<Decimal>>,

    /// Upper bounds: one value for every category, or one per category
    /// (default: the target sum)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub upper: Option<Vec<Decimal>>,

    /// Required total of the projected vector
    #[arg(long, default_value = "100")]
    pub target_sum: Decimal,

    /// Relative tolerance on the total
    #[arg(long)]
    pub tolerance: Option<Decimal>,
}

/// Arguments for the end-of-horizon forecast
#[derive(Args)]
pub struct ForecastArgs {
    /// Comma-separated targets for the remaining period
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub new_targets: Vec<Decimal>,

    /// Comma-separated shares achieved so far
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub current: Vec<Decimal>,

    /// Allocation periods already consumed
    #[arg(long)]
    pub elapsed: u32,

    /// Allocation periods in the whole horizon
    #[arg(long)]
    pub total: u32,

    /// Original targets, to report the gap per category
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub targets: Option<Vec<Decimal>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReferenceOutput {
    reference: Vec<Decimal>,
    catch_up_factor: Decimal,
    remaining_periods: u32,
    total: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
struct ForecastOutput {
    final_shares: Vec<Decimal>,
    total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    gaps: Option<Vec<Decimal>>,
}

/// Expand a bound flag to one value per category. A single value is
/// broadcast; a missing flag falls back to `default`.
fn expand_bounds(
    flag: &str,
    values: Option<Vec<Decimal>>,
    n: usize,
    default: Decimal,
) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    match values {
        None => Ok(uniform(n, default)),
        Some(v) if v.len() == 1 => Ok(uniform(n, v[0])),
        Some(v) if v.len() == n => Ok(v),
        Some(v) => Err(format!(
            "--{} expects 1 or {} values, got {}",
            flag,
            n,
            v.len()
        )
        .into()),
    }
}

fn rebalance_input_from_flags(
    args: RebalanceArgs,
) -> Result<RebalanceInput, Box<dyn std::error::Error>> {
    let original_targets = args
        .targets
        .ok_or("--targets is required when --input is not given")?;
    let current_shares = args
        .current
        .ok_or("--current is required when --input is not given")?;
    let elapsed = args
        .elapsed
        .ok_or("--elapsed is required when --input is not given")?;
    let total = args
        .total
        .ok_or("--total is required when --input is not given")?;

    let n = original_targets.len();
    Ok(RebalanceInput {
        category_names: args.names,
        lower_bounds: expand_bounds("lower", args.lower, n, Decimal::ZERO)?,
        upper_bounds: expand_bounds("upper", args.upper, n, args.target_sum)?,
        original_targets,
        current_shares,
        elapsed,
        total,
        target_sum: args.target_sum,
        tolerance: args.tolerance,
    })
}

pub fn run_rebalance(args: RebalanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rb_input: RebalanceInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if args.targets.is_some() {
        rebalance_input_from_flags(args)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err(
            "Provide --targets/--current/--elapsed/--total, --input <file.json> or pipe JSON via stdin"
                .into(),
        );
    };
    let result = plan::rebalance_targets(&rb_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_reference(args: ReferenceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let reference = compute_reference(&args.targets, &args.current, args.elapsed, args.total)?;
    let period = Period::new(args.elapsed, args.total)?;

    let output = ReferenceOutput {
        total: reference.iter().sum(),
        reference,
        catch_up_factor: period.catch_up_factor(),
        remaining_periods: period.remaining(),
    };

    Ok(serde_json::to_value(output)?)
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let proj_input: ProjectionInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(reference) = args.reference {
        let n = reference.len();
        ProjectionInput {
            lower_bounds: expand_bounds("lower", args.lower, n, Decimal::ZERO)?,
            upper_bounds: expand_bounds("upper", args.upper, n, args.target_sum)?,
            reference,
            target_sum: args.target_sum,
            tolerance: args.tolerance,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("Provide --reference, --input <file.json> or pipe JSON via stdin".into());
    };
    let result = projection::project_allocation(&proj_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_forecast(args: ForecastArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let final_shares = final_share(&args.new_targets, &args.current, args.elapsed, args.total)?;
    let gaps = match args.targets {
        Some(ref targets) => Some(tracking_error(&final_shares, targets)?),
        None => None,
    };

    let output = ForecastOutput {
        total: final_shares.iter().sum(),
        final_shares,
        gaps,
    };

    Ok(serde_json::to_value(output)?)
}
