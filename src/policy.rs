use serde::{Deserialize, Serialize};

use crate::addr::Address;
use crate::entry::{Entry, Resolver};
use crate::expr::{ExprBuilder, Register};
use crate::service::Service;
use crate::{Error, Rule, Set};

/// What a matching policy does with the packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Accept,
    Drop,
}

impl Default for PolicyAction {
    fn default() -> Self {
        PolicyAction::Accept
    }
}

/// A forwarding policy on the forward chain. Every criterion is optional;
/// the policy matches a packet when all of its present criteria do. The id
/// is assigned by the engine on first insert and never changes afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub action: PolicyAction,

    #[serde(default)]
    pub source: Option<Address>,
    #[serde(default)]
    pub source_zone: Option<String>,
    #[serde(default)]
    pub destination: Option<Address>,
    #[serde(default)]
    pub destination_zone: Option<String>,
    #[serde(default)]
    pub service: Option<Service>,

    #[serde(skip)]
    pub(crate) artifact: Option<PolicyArtifact>,
}

/// Kernel sets the policy's references resolved to.
#[derive(Debug, Clone)]
pub(crate) struct PolicyArtifact {
    source: Option<Set>,
    source_zone: Option<Set>,
    destination: Option<Set>,
    destination_zone: Option<Set>,
}

impl Entry for Policy {
    fn build_artifact(&mut self, resolver: &mut Resolver<'_>) -> Result<(), Error> {
        let mut artifact = PolicyArtifact {
            source: None,
            source_zone: None,
            destination: None,
            destination_zone: None,
        };

        if let Some(zone) = &self.source_zone {
            artifact.source_zone = Some(resolver.zone_set(zone)?);
        }

        if let Some(zone) = &self.destination_zone {
            artifact.destination_zone = Some(resolver.zone_set(zone)?);
        }

        if let Some(source) = &self.source {
            artifact.source = Some(resolver.address_set(source)?);
        }

        if let Some(destination) = &self.destination {
            artifact.destination = Some(resolver.address_set(destination)?);
        }

        self.artifact = Some(artifact);

        Ok(())
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn to_rules(&self) -> Result<Vec<Rule>, Error> {
        let mut builder = ExprBuilder::new();

        if let Some(artifact) = &self.artifact {
            if let Some(set) = &artifact.source_zone {
                builder = builder
                    .meta_ingress_interface(Register::Reg1)
                    .lookup_set(Register::Reg1, set)?;
            }

            if let Some(set) = &artifact.destination_zone {
                builder = builder
                    .meta_egress_interface(Register::Reg1)
                    .lookup_set(Register::Reg1, set)?;
            }

            if let Some(set) = &artifact.source {
                builder = builder
                    .payload_ip_source(Register::Reg1)
                    .lookup_set(Register::Reg1, set)?;
            }

            if let Some(set) = &artifact.destination {
                builder = builder
                    .payload_ip_destination(Register::Reg1)
                    .lookup_set(Register::Reg1, set)?;
            }
        }

        if let Some(service) = &self.service {
            builder = builder.extend(service.exprs());
        }

        if self.log {
            builder = builder.log_prefix("yafw-policy")?;
        }

        builder = match self.action {
            PolicyAction::Accept => builder.verdict_accept(),
            PolicyAction::Drop => builder.verdict_drop(),
        };

        Ok(vec![Rule {
            exprs: builder.build(),
            ..Default::default()
        }])
    }
}
