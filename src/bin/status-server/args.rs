use std::net::SocketAddr;

use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5100")]
    pub listen_addr: SocketAddr,

    #[arg(long, env = "MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}
