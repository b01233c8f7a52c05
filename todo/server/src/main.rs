use clap::Parser;
use todo_server::config::Config;
use tracing_subscriber::EnvFilter;

/// Task list web service.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Address to listen on, overrides `ADDRESS`
    address: Option<String>,
    /// Port to listen on, overrides `PORT`
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    let cli = Cli::parse();
    let config = Config::from_env()?.with_listen_overrides(cli.address, cli.port);
    todo_server::web::start_web_server(config).await
}
