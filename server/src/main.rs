use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::game::GameState;
use server::network;

/// Main-method of the application.
/// Parses command-line arguments, binds the listener, then runs the match until Ctrl+C.
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();

    let listener = match network::bind(&config.address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let game_state = GameState::with_rng(config.match_config(), config.rng());
    info!(
        "Tick every {:?}, paddle step {}",
        config.tick_interval(),
        config.paddle_step
    );

    tokio::select! {
        result = network::serve(listener, game_state, config.tick_interval()) => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }
}
