//! Typed output model for the generated compose manifest.
//!
//! Builders assemble these structs directly; serialization is a
//! single `serde_yaml` pass with nothing left to resolve. All maps
//! are `IndexMap`, so emission order follows insertion order and the
//! output is byte-reproducible for the same logical input.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};

/// The generated container-orchestration document.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub version: String,
    pub services: IndexMap<String, ManifestService>,
    pub networks: IndexMap<String, ManifestNetwork>,
    pub volumes: IndexMap<String, ManifestVolume>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub secrets: IndexMap<String, ManifestSecret>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: "3.9".to_string(),
            services: IndexMap::new(),
            networks: IndexMap::new(),
            volumes: IndexMap::new(),
            secrets: IndexMap::new(),
        }
    }

    /// Serialize to YAML. A serialization failure aborts generation;
    /// partial output is never produced.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::SerializeManifest)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

/// One service entry in the manifest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManifestService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expose: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_file: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<SecretMount>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthcheckEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_opt: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_drop: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tmpfs: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub ulimits: IndexMap<String, UlimitEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shm_size: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildEntry {
    pub context: String,
    pub dockerfile: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub args: IndexMap<String, String>,
}

/// Long-syntax secret attachment on a service.
#[derive(Debug, Clone, Serialize)]
pub struct SecretMount {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthcheckEntry {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
    pub start_period: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeployEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_config: Option<UpdateConfigEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicyEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesEntry>,
}

impl DeployEntry {
    /// A deploy block is only emitted when something is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.replicas.is_none()
            && self.update_config.is_none()
            && self.restart_policy.is_none()
            && self.resources.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateConfigEntry {
    pub order: String,
    pub parallelism: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failure_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestartPolicyEntry {
    pub condition: String,
    pub delay: String,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourcesEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceBound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservations: Option<ResourceBound>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceBound {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UlimitEntry {
    pub soft: i64,
    pub hard: i64,
}

/// One bridge network.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestNetwork {
    pub driver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal: Option<bool>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub driver_opts: IndexMap<String, String>,
}

/// One named volume; empty spec, platform-default backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManifestVolume {}

/// One top-level secret.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestSecret {
    pub external: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_key_omitted_when_empty() {
        let manifest = Manifest::new();
        let yaml = manifest.to_yaml().expect("serialize");

        assert!(yaml.contains("version:"));
        assert!(yaml.contains("services:"));
        assert!(!yaml.contains("secrets:"));
    }

    #[test]
    fn secrets_key_present_when_collected() {
        let mut manifest = Manifest::new();
        manifest.secrets.insert(
            "db_password".to_string(),
            ManifestSecret {
                external: false,
                file: Some("./secrets/db".to_string()),
            },
        );
        let yaml = manifest.to_yaml().expect("serialize");

        assert!(yaml.contains("secrets:"));
        assert!(yaml.contains("db_password:"));
        assert!(yaml.contains("file: ./secrets/db"));
    }

    #[test]
    fn empty_service_serializes_to_bare_entry() {
        let mut manifest = Manifest::new();
        manifest
            .services
            .insert("stub".to_string(), ManifestService::default());
        let yaml = manifest.to_yaml().expect("serialize");

        assert!(yaml.contains("stub:"));
        assert!(!yaml.contains("image:"));
        assert!(!yaml.contains("labels:"));
    }
}
