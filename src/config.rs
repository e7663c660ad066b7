//! Agent and fleet configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default community string for agents that do not name one.
pub const DEFAULT_COMMUNITY: &str = "public";

/// One agent entry in a fleet file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Agent name; defaults to `ip:port`.
    #[serde(default)]
    name: Option<String>,
    /// Device descriptor path; defaults to a device with no modifiers and
    /// no VLANs.
    #[serde(default)]
    pub device: Option<PathBuf>,
    /// Walk file backing this agent.
    pub walk: PathBuf,
    /// IP literal to bind (v4 or v6).
    pub ip: String,
    /// UDP port to bind.
    pub port: u16,
    /// Community string; defaults to `public`.
    #[serde(default)]
    community: Option<String>,
}

impl AgentConfig {
    /// The agent name, defaulting to `ip:port`.
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.ip, self.port))
    }

    /// The community string, defaulting to `public`.
    pub fn community(&self) -> &str {
        self.community.as_deref().unwrap_or(DEFAULT_COMMUNITY)
    }

    /// The UDP endpoint to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.ip.parse().map_err(|_| Error::Config {
            path: self.walk.clone(),
            message: format!("invalid agent IP literal \"{}\"", self.ip),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Load the fleet file: a YAML list of agent configurations.
pub fn load_fleet(path: &Path) -> Result<Vec<AgentConfig>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const FLEET_YAML: &str = "\
- name: edge-router
  walk: /opt/walks/router.walk
  device: /opt/devices/cisco.yaml
  ip: 127.0.0.1
  port: 16100
  community: myCom
- walk: /opt/walks/switch.walk
  ip: \"::1\"
  port: 16101
";

    #[test]
    fn test_load_fleet() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FLEET_YAML.as_bytes()).unwrap();

        let agents = load_fleet(file.path()).unwrap();
        assert_eq!(agents.len(), 2);

        let first = &agents[0];
        assert_eq!(first.name(), "edge-router");
        assert_eq!(first.community(), "myCom");
        assert_eq!(
            first.socket_addr().unwrap(),
            "127.0.0.1:16100".parse().unwrap()
        );

        let second = &agents[1];
        assert_eq!(second.name(), "::1:16101");
        assert_eq!(second.community(), "public");
        assert!(second.device.is_none());
        assert!(second.socket_addr().unwrap().is_ipv6());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"- ip: 127.0.0.1\n  port: 16100\n").unwrap();
        assert!(load_fleet(file.path()).is_err());
    }

    #[test]
    fn test_invalid_ip_literal() {
        let config: AgentConfig = serde_yaml::from_str(
            "{walk: /w, ip: not-an-ip, port: 161}",
        )
        .unwrap();
        assert!(config.socket_addr().is_err());
    }
}
