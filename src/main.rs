use kalenterivahti::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting kalenterivahti");

    // Load configuration
    let config = startup::load_config()?;

    // Start watching the calendar
    startup::start_watch(config).await
}
