use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use monarch::{
    start_nodes, ActorSystem, ClusterSnapshot, ElectionConfig, ElectionResult, NodeId,
    ScenarioBuilder, ThreadedActorSystem,
};

#[derive(Parser)]
#[command(name = "monarch")]
#[command(about = "Run a king election among a fixed set of nodes")]
struct Cli {
    /// Number of nodes in the cluster
    #[arg(long, default_value_t = 4)]
    nodes: u32,

    /// Timeout unit T in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout: u64,

    /// Node to kill once `--kill-after` has elapsed
    #[arg(long, value_name = "ID")]
    kill: Option<u32>,

    /// Delay before the kill, in milliseconds
    #[arg(long, default_value_t = 5000)]
    kill_after: u64,

    /// How long to keep running after the kill, in milliseconds
    #[arg(long, default_value_t = 10000)]
    run_for: u64,

    /// Run on the virtual-time harness instead of real threads
    #[arg(long = "virtual")]
    virtual_time: bool,

    /// Virtual-time round length in milliseconds
    #[arg(long, default_value_t = 50)]
    step: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let cli = Cli::parse();
    let config = ElectionConfig::new(cli.nodes, cli.timeout);

    let outcome = if cli.virtual_time {
        run_virtual(&cli, &config)
    } else {
        run_threaded(&cli, &config)
    };

    match outcome {
        Ok((snapshot, failures)) => {
            println!("{}", snapshot);
            println!("{}", snapshot.to_json());
            if failures == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns the final snapshot and the number of failed nodes.
fn run_threaded(cli: &Cli, config: &ElectionConfig) -> ElectionResult<(ClusterSnapshot, usize)> {
    let sys = ThreadedActorSystem::new();
    start_nodes(&sys, config)?;
    sys.start()?;

    if let Some(victim) = cli.kill {
        sys.log(None, "waiting for kill");
        sys.sleep(cli.kill_after);
        sys.log(None, &format!("sending kill to {}", NodeId::new(victim)));
        sys.kill(NodeId::new(victim))?;
    }
    sys.sleep(cli.run_for);

    let report = sys.shutdown();
    for (id, err) in &report.failures {
        tracing::error!(node = %id, error = %err, "node failed");
    }
    Ok((report.snapshot(), report.failures.len()))
}

fn run_virtual(cli: &Cli, config: &ElectionConfig) -> ElectionResult<(ClusterSnapshot, usize)> {
    let step = cli.step.max(1);
    let mut builder = ScenarioBuilder::new(*config);
    let mut total = cli.run_for;
    if let Some(victim) = cli.kill {
        builder = builder.kill_at(victim, cli.kill_after);
        total = total.saturating_add(cli.kill_after);
    }

    let mut scenario = builder.build()?;
    scenario.run_rounds(total / step, step)?;
    Ok((scenario.snapshot(), 0))
}
