use anyhow::Result;
use clap::Parser;

mod app;
mod commands;
mod logging;
mod output;
mod signal;

use app::App;
use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = app::load_config(cli.config.as_deref())?;
    logging::init(&config);

    let app = App::new(config, cli.store);

    match cli.command {
        Commands::Publish(args) => commands::publish::run(&app, args).await,
        Commands::PublishOnce(args) => commands::publish::run_once(&app, args).await,
        Commands::Create(args) => commands::notes::create(&app, args).await,
        Commands::Refresh(args) => commands::notes::refresh(&app, args).await,
        Commands::Update(args) => commands::notes::update(&app, args).await,
        Commands::Show(args) => commands::notes::show(&app, args).await,
        Commands::Due(args) => commands::notes::due(&app, args).await,
        Commands::Delete(args) => commands::notes::delete(&app, args).await,
        Commands::Consume(args) => commands::consume::run(&app, args).await,
    }
}
