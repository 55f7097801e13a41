use clap::Subcommand;

pub mod analyze;
pub mod health;
pub mod rollback;
pub mod run;
pub mod status;
pub mod stop;
pub mod topology;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a chaos experiment from a config file
    Run(run::RunArgs),
    /// Show one experiment or list recent ones
    Status(status::StatusArgs),
    /// Drain the rollback stack for an experiment
    Rollback(rollback::RollbackArgs),
    /// Trigger the emergency stop
    Stop,
    /// Read infrastructure topology
    Topology(topology::TopologyArgs),
    /// Show the AI analysis recorded for an experiment
    Analyze(analyze::AnalyzeArgs),
    /// Check server health
    Health,
}
