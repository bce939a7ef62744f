//! Server configuration.
//!
//! Every option can be given on the command line or through the environment, so the
//! same binary works under a process manager or a container runtime.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

pub const DEFAULT_PORT: u16 = 16770;

/// Storage backend wired behind the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Records live in process memory and vanish on restart.
    Memory,
    /// One file per record under `--data-dir`.
    Disk,
}

/// Redisflare - authenticated REST facade over a key-value store
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "REDISFLARE_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Token granting read-write access
    #[arg(long, env = "MASTER_TOKEN", hide_env_values = true)]
    pub master_token: Option<String>,

    /// Token granting read-only access
    #[arg(long, env = "PUBLIC_TOKEN", hide_env_values = true)]
    pub public_token: Option<String>,

    /// Storage backend
    #[arg(long, env = "REDISFLARE_BACKEND", value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,

    /// Directory used by the disk backend
    #[arg(long, env = "REDISFLARE_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            master_token: None,
            public_token: None,
            backend: Backend::Memory,
            data_dir: PathBuf::from("data"),
        }
    }
}
