use clap::Parser;

mod client;
mod commands;

use client::ApiClient;

#[derive(Parser)]
#[command(name = "chaos", about = "Command-line client for the chaos experiment API", version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Base URL of the chaos-api server
    #[arg(long, env = "CHAOS_API_URL", default_value = "http://localhost:8080", global = true)]
    server: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = ApiClient::new(cli.server);

    let result = match cli.command {
        commands::Commands::Run(args) => commands::run::execute(&client, args).await,
        commands::Commands::Status(args) => commands::status::execute(&client, args).await,
        commands::Commands::Rollback(args) => commands::rollback::execute(&client, args).await,
        commands::Commands::Stop => commands::stop::execute(&client).await,
        commands::Commands::Topology(args) => commands::topology::execute(&client, args).await,
        commands::Commands::Analyze(args) => commands::analyze::execute(&client, args).await,
        commands::Commands::Health => commands::health::execute(&client).await,
    };

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()));
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
