use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slog::{error, info, o, Drain, Logger};

/// an error used when deserializing a [`Config`] instance from environment
/// variables, see [`Config::from_env()`]
pub use envy::Error as EnvError;

use crate::{auth::Authenticator, routes::routers::router, Application};

pub const DEFAULT_PORT: u16 = 8010;
pub const DEFAULT_IP_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Development
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Defaults to `Development`: [`Environment::default()`]
    #[serde(default)]
    pub env: Environment,
    /// The port on which the marketplace REST API will be accessible.
    /// Defaults to `8010`: [`DEFAULT_PORT`]
    #[serde(default = "default_port")]
    pub port: u16,
    /// The address on which the marketplace REST API will be accessible.
    /// `0.0.0.0` can be used for Docker.
    /// `127.0.0.1` can be used for locally running servers.
    /// Defaults to `0.0.0.0`: [`DEFAULT_IP_ADDR`]
    #[serde(default = "default_ip_addr")]
    pub ip_addr: IpAddr,
    #[serde(default = "default_postgres_user")]
    pub postgres_user: String,
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,
    #[serde(default)]
    pub postgres_db: Option<String>,
}

impl Config {
    /// Deserialize the application [`Config`] from Environment variables.
    pub fn from_env() -> Result<Self, EnvError> {
        envy::from_env()
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_ip_addr() -> IpAddr {
    DEFAULT_IP_ADDR
}

fn default_postgres_user() -> String {
    String::from("postgres")
}

fn default_postgres_password() -> String {
    String::from("postgres")
}

fn default_postgres_host() -> String {
    String::from("localhost")
}

fn default_postgres_port() -> u16 {
    5432
}

pub fn logger(prefix: &str) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!("prefix" => prefix.to_string()))
}

impl<A: Authenticator + 'static> Application<A> {
    /// Starts the server on the given socket address.
    pub async fn run(self, socket_addr: SocketAddr) {
        let logger = self.logger.clone();
        info!(&logger, "Listening on socket address: {}!", socket_addr);

        let router = router(Arc::new(self));

        let server = axum::Server::bind(&socket_addr).serve(router.into_make_service());

        if let Err(e) = server.await {
            error!(&logger, "server error: {}", e; "main" => "run");
        }
    }
}
