use serde::{Deserialize, Serialize};

use crate::addr::Address;
use crate::entry::{Entry, Resolver};
use crate::expr::{ExprBuilder, Register};
use crate::iface::Interface;
use crate::{Error, Rule, Set};

/// Where a source-NAT rule rewrites the source address to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnatTarget {
    /// Masquerade to the egress interface address.
    Egress,
    /// Rewrite to a specific address.
    Specific,
}

impl Default for SnatTarget {
    fn default() -> Self {
        SnatTarget::Egress
    }
}

fn enabled_default() -> bool {
    true
}

/// A post-routing source rewrite. Disabled rules keep their slot and id but
/// compile to a rule without a NAT statement, so they match nothing away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnatRule {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub source: Option<Address>,
    #[serde(default)]
    pub destination: Option<Address>,
    /// Name of the interface the rewritten packets leave through.
    #[serde(default)]
    pub egress: Option<String>,
    #[serde(default)]
    pub target: SnatTarget,
    #[serde(default)]
    pub target_address: Option<Address>,
    #[serde(default)]
    pub log: bool,

    #[serde(skip)]
    pub(crate) artifact: Option<SnatArtifact>,
}

impl Default for SnatRule {
    fn default() -> Self {
        SnatRule {
            id: 0,
            description: String::new(),
            enabled: true,
            source: None,
            destination: None,
            egress: None,
            target: SnatTarget::Egress,
            target_address: None,
            log: false,
            artifact: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SnatArtifact {
    source: Option<Set>,
    destination: Option<Set>,
    egress: Option<Interface>,
}

impl Entry for SnatRule {
    fn build_artifact(&mut self, resolver: &mut Resolver<'_>) -> Result<(), Error> {
        let mut artifact = SnatArtifact {
            source: None,
            destination: None,
            egress: None,
        };

        if let Some(source) = &self.source {
            artifact.source = Some(resolver.address_set(source)?);
        }

        if let Some(destination) = &self.destination {
            artifact.destination = Some(resolver.address_set(destination)?);
        }

        if let Some(egress) = &self.egress {
            artifact.egress = Some(resolver.interface(egress)?);
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
            if let Some(egress) = &artifact.egress {
                builder = builder
                    .meta_egress_interface(Register::Reg1)
                    .compare_interface_name(Register::Reg1, &egress.name)?;
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

        if self.enabled {
            if self.log {
                builder = builder.log_prefix("yafw-snat")?;
            }

            match self.target {
                SnatTarget::Egress => builder = builder.masquerade(),
                SnatTarget::Specific => return Err(Error::SnatTargetUnimplemented),
            }
        }

        Ok(vec![Rule {
            exprs: builder.build(),
            ..Default::default()
        }])
    }
}

/// Placeholder for destination NAT on the prerouting chain. The entry shape
/// mirrors [`SnatRule`]; rule emission is not implemented yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnatRule {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub source: Option<Address>,
    #[serde(default)]
    pub destination: Option<Address>,
    /// Name of the interface the translated packets arrive on.
    #[serde(default)]
    pub ingress: Option<String>,
    #[serde(default)]
    pub target_address: Option<Address>,

    #[serde(skip)]
    pub(crate) artifact: Option<SnatArtifact>,
}

impl Default for DnatRule {
    fn default() -> Self {
        DnatRule {
            id: 0,
            description: String::new(),
            enabled: true,
            source: None,
            destination: None,
            ingress: None,
            target_address: None,
            artifact: None,
        }
    }
}

impl Entry for DnatRule {
    fn build_artifact(&mut self, resolver: &mut Resolver<'_>) -> Result<(), Error> {
        let mut artifact = SnatArtifact {
            source: None,
            destination: None,
            egress: None,
        };

        if let Some(source) = &self.source {
            artifact.source = Some(resolver.address_set(source)?);
        }

        if let Some(destination) = &self.destination {
            artifact.destination = Some(resolver.address_set(destination)?);
        }

        if let Some(ingress) = &self.ingress {
            artifact.egress = Some(resolver.interface(ingress)?);
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
        Err(Error::DnatUnimplemented)
    }
}
