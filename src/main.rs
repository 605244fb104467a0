use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storyfeed::app::AppContext;
use storyfeed::cli::{commands, Cli, Commands};
use storyfeed::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config, cli.db)?;

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
        } => {
            commands::register(&ctx, &name, &email, &password).await?;
        }
        Commands::Login { email, password } => {
            commands::login(&ctx, &email, &password).await?;
        }
        Commands::Logout => {
            commands::logout(&ctx).await?;
        }
        Commands::Status => {
            commands::status(&ctx)?;
        }
        Commands::Stories { pages } => {
            commands::list_stories(&ctx, pages).await?;
        }
        Commands::Browse => {
            commands::browse(&ctx).await?;
        }
        Commands::Map => {
            commands::list_map(&ctx).await?;
        }
        Commands::Upload {
            path,
            description,
            lat,
            lon,
        } => {
            commands::upload(&ctx, &path, &description, lat, lon).await?;
        }
    }

    Ok(())
}
