#![deny(clippy::all)]
#![deny(rust_2018_idioms)]

use std::net::SocketAddr;

use clap::{Arg, Command};
use slog::info;

use marketplace::{
    application::{logger, Config},
    auth::Dummy,
    db::{migrations, postgres_connection},
    Application,
};

const CONNECTION_LIMIT: usize = 42;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Command::new("Marketplace")
        .version("0.1")
        .arg(
            Arg::new("auth")
                .short('a')
                .long("auth")
                .help("path to a JSON file of `token -> {uid, role}` entries for the dummy authenticator")
                .takes_value(true),
        )
        .get_matches();

    let config = Config::from_env()?;

    let authenticator = match cli.value_of("auth") {
        Some(path) => {
            let tokens = std::fs::read_to_string(path)?;
            Dummy::new(serde_json::from_str(&tokens)?)
        }
        None => Dummy::default(),
    };

    let logger = logger("marketplace");

    let pool = postgres_connection(CONNECTION_LIMIT, &config).await;
    migrations(&config).await;

    info!(&logger, "Migrations applied"; "env" => ?config.env);

    let socket_addr = SocketAddr::new(config.ip_addr, config.port);

    Application::new(authenticator, config, logger, pool)
        .run(socket_addr)
        .await;

    Ok(())
}
