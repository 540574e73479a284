use tracing::{error, info};

use hdrive::{Config, Database, DriveService, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = hdrive::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        hdrive::logging::init_console_only(&config.logging.level);
    }

    info!("HDrive starting");

    if let Err(e) = run(config).await {
        error!("HDrive stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> hdrive::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    let service = DriveService::from_config(db, &config.drive).await?;

    let server = WebServer::new(&config.web, service, config.drive.max_upload_bytes())?;
    info!(
        "Web API configured on {}:{}",
        config.web.host, config.web.port
    );

    server.run().await?;
    Ok(())
}
