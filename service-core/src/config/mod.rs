use crate::error::AppError;
use config::{Config as Cfg, ConfigBuilder, File, builder::DefaultState};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Server settings shared by every service binary.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load from an optional `configuration` file and `APP__*` variables.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        Self::from_builder(
            Cfg::builder()
                .add_source(File::with_name("configuration").required(false))
                .add_source(config::Environment::with_prefix("APP").separator("__")),
        )
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_sources() {
        let config = Config::from_builder(Cfg::builder()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn overrides_take_precedence() {
        let builder = Cfg::builder()
            .set_override("port", 0)
            .unwrap()
            .set_override("host", "127.0.0.1")
            .unwrap();
        let config = Config::from_builder(builder).unwrap();
        assert_eq!(config.bind_address().to_string(), "127.0.0.1:0");
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let builder = Cfg::builder().set_override("port", "not-a-port").unwrap();
        let err = Config::from_builder(builder).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
