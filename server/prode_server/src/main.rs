use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use prode_server::config::Config;
use prode_server::mailer::HttpMailer;
use prode_server::{db, reminder, routes, AppState};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on, overriding PRODE_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Email active users for rounds that close in about two hours
    SendReminders,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            serve(config, port).await?;
        }
        Commands::SendReminders => {
            let pool = db::connect(&config.database).await?;
            let mailer = HttpMailer::new(config.mail.clone());
            let sent =
                reminder::send_closing_reminders(&pool, &mailer, &config, chrono::Utc::now())
                    .await?;
            println!("Sent {} reminder(s)", sent);
        }
    }

    Ok(())
}

async fn serve(config: Config, port: u16) -> Result<()> {
    let pool = db::connect(&config.database).await?;
    db::run_migrations(&pool).await?;
    tokio::fs::create_dir_all(&config.upload.dir).await?;

    let state = AppState {
        pool,
        mailer: Arc::new(HttpMailer::new(config.mail.clone())),
        config: Arc::new(config),
    };
    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
