use color_eyre::Result;
use clap::Parser;
use hoshyar::{
    Config, Database, Profile, Session,
    assistant::{GeminiClient, OfflineAssistant, ProductivityAnalyzer, TaskParser},
    cli::{Cli, Commands, EditArgs},
    utils,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config = match &cli.config {
        Some(path) => Config::load_from_path(&utils::expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };

    // RUST_LOG wins over the configured filter
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path.to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?
    )?;

    let today = utils::today_key();
    let mut session = Session::load_on(db, &today, cli.date.as_deref().unwrap_or(&today))?;

    let gemini = match GeminiClient::from_env(config.assistant.clone()) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::info!(error = %e, "assistant not configured, running offline");
            None
        }
    };
    let offline = OfflineAssistant;
    let parser: &dyn TaskParser = match &gemini {
        Some(client) => client,
        None => &offline,
    };
    let analyzer: &dyn ProductivityAnalyzer = match &gemini {
        Some(client) => client,
        None => &offline,
    };

    // Dispatch to appropriate command handler
    match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => hoshyar::cli::handle_show(&session)?,
        Commands::Add { text } => hoshyar::cli::handle_add(&mut session, parser, &text)?,
        Commands::Status { id, status } => hoshyar::cli::handle_status(&mut session, &id, status.into())?,
        Commands::Toggle { id } => hoshyar::cli::handle_toggle(&mut session, &id)?,
        Commands::Edit { id, title, start, unscheduled, duration, description, category, priority, move_to } => {
            let args = EditArgs { title, start, unscheduled, duration, description, category, priority, move_to };
            hoshyar::cli::handle_edit(&mut session, &id, args)?;
        }
        Commands::Analyze => hoshyar::cli::handle_analyze(&mut session, analyzer)?,
    }

    Ok(())
}
