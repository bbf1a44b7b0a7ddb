//! Startup configuration: a JSON document replayed through the engine's
//! append path.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nat::SnatRule;
use crate::policy::Policy;
use crate::Firewall;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read the configuration file")]
    Read(#[from] io::Error),

    #[error("cannot parse the configuration file")]
    Parse(#[from] serde_json::Error),
}

/// The on-disk shape: `{ "policies": [...], "nat": [...] }`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub nat: Vec<SnatRule>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Replays the configured entries through the engine. A rejected entry
    /// is logged and skipped; the rest of the configuration still applies.
    pub fn apply(&self, firewall: &mut Firewall) {
        for rule in &self.nat {
            if let Err(err) = firewall.append_snat_rule(rule.clone()) {
                error!("cannot apply nat rule {:?}: {}", rule.description, err);
            }
        }

        for policy in &self.policies {
            if let Err(err) = firewall.append_policy(policy.clone()) {
                error!("cannot apply policy {:?}: {}", policy.name, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::Address;
    use crate::policy::PolicyAction;

    #[test]
    fn parses_a_full_document() {
        let raw = r#"{
            "policies": [
                {
                    "name": "allow-web",
                    "action": "accept",
                    "source": ["192.168.1.0/24"],
                    "destination": "servers",
                    "service": {
                        "name": "http",
                        "protocol": 6,
                        "destination_port_min": 80,
                        "destination_port_max": 80
                    }
                },
                { "name": "drop-rest", "action": "drop", "log": true }
            ],
            "nat": [
                { "description": "lan egress", "egress": "eth0", "target": "egress" }
            ]
        }"#;

        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.policies.len(), 2);
        assert_eq!(config.nat.len(), 1);

        let web = &config.policies[0];
        assert_eq!(web.action, PolicyAction::Accept);
        assert!(matches!(web.source, Some(Address::Immediate(ref r)) if r.len() == 1));
        assert!(matches!(web.destination, Some(Address::Ipset(ref name)) if name == "servers"));
        assert_eq!(web.service.as_ref().unwrap().destination_port_min, 80);

        assert!(config.nat[0].enabled);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.policies.is_empty());
        assert!(config.nat.is_empty());
    }
}
