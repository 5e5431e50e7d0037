use crate::server;
use clap::{Args, Parser, Subcommand};
use scorecard::analysis::impact;
use scorecard::domain::{ImpactDirection, ImpactType, Kpi, KpiKind};
use scorecard::error::AppError;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(
    name = "Business Health Scorecard",
    about = "Serve the scorecard API or run what-if impact calculations from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// What-if impact tooling
    Impact {
        #[command(subcommand)]
        command: ImpactCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ImpactCommand {
    /// Project the revenue/EBITDA delta of moving a KPI to a new value
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve a seeded in-memory base instead of the live record store
    #[arg(long)]
    pub(crate) offline: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Current KPI value
    #[arg(long)]
    current_value: f64,
    /// Candidate KPI value
    #[arg(long)]
    new_value: f64,
    /// Annual revenue baseline the delta applies to
    #[arg(long)]
    baseline_revenue: f64,
    /// Fraction of the revenue delta that reaches EBITDA
    #[arg(long, default_value_t = 0.2)]
    ebitda_factor: f64,
    #[arg(long, default_value_t = 1.0)]
    impact_weight: f64,
    #[arg(long, default_value_t = 1.0)]
    category_weight: f64,
    #[arg(long, default_value_t = 1.0)]
    scaling_factor: f64,
    /// Use the exponential impact curve instead of linear
    #[arg(long)]
    exponential: bool,
    /// Treat increases as unfavorable (inverse KPI)
    #[arg(long)]
    inverse: bool,
}

fn run_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let kpi = Kpi {
        id: "cli".to_string(),
        name: "cli".to_string(),
        kind: KpiKind::Input,
        current_value: args.current_value,
        previous_value: None,
        final_score: 0.0,
        status: String::new(),
        functions: Vec::new(),
        impact_weight: args.impact_weight,
        category_weight: args.category_weight,
        scaling_factor: args.scaling_factor,
        impact_type: if args.exponential {
            ImpactType::Exponential
        } else {
            ImpactType::Linear
        },
        impact_direction: if args.inverse {
            ImpactDirection::Inverse
        } else {
            ImpactDirection::Direct
        },
        baseline_revenue: args.baseline_revenue,
        ebitda_factor: args.ebitda_factor,
        min_benchmark: None,
        max_benchmark: None,
    };

    let result = impact(&kpi, args.new_value);
    let payload = json!({
        "current_value": args.current_value,
        "new_value": args.new_value,
        "revenue": result.revenue,
        "ebitda": result.ebitda,
    });
    println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    Ok(())
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Impact {
            command: ImpactCommand::Simulate(args),
        } => run_simulate(args),
    }
}
