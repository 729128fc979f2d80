use std::{env, net::IpAddr, net::Ipv4Addr, net::SocketAddr, path::PathBuf};

const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
}

impl Config {
    /// Reads `APP_DATA_PATH`, `HOST` and `PORT`, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        Self {
            data_path: resolve_data_path(),
            host: env::var("HOST")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

pub fn resolve_data_path() -> PathBuf {
    env::var("APP_DATA_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH))
}
