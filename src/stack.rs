//! Input data model: the declarative stack description.
//!
//! A [`Stack`] is parsed once from YAML and consumed read-only by the
//! builders. The polymorphic per-service `traefik` field (absent, bare
//! boolean, or structured object) is resolved at load time into the
//! [`ProxyConfig`] enum so the route synthesis never inspects untyped
//! values.

use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Root of the declarative stack description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default)]
    pub tls: Tls,
    #[serde(
        rename = "traefik",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub edge: Option<EdgeConfig>,
    #[serde(default)]
    pub observability: Observability,
    #[serde(default)]
    pub networks: IndexMap<String, Network>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

const fn default_version() -> u32 {
    1
}

impl Stack {
    /// Parse a stack description from YAML bytes.
    pub fn from_yaml(bytes: &[u8]) -> Result<Self> {
        let mut stack: Self =
            serde_yaml::from_slice(bytes).map_err(Error::ParseStack)?;
        stack.apply_defaults();
        Ok(stack)
    }

    /// Fill in the defaults the builders rely on: observability
    /// volumes and subdomains, the TLS resolver name, and both
    /// observability members enabled when neither was declared.
    pub fn apply_defaults(&mut self) {
        let lv = &mut self.observability.log_viewer;
        if lv.subdomain.is_empty() {
            lv.subdomain = "logs".to_string();
        }
        if lv.data_volume.is_empty() {
            lv.data_volume = "dozzle_data".to_string();
        }

        let mon = &mut self.observability.monitoring;
        if mon.subdomain.is_empty() {
            mon.subdomain = "monitor".to_string();
        }
        if mon.data_volume.is_empty() {
            mon.data_volume = "beszel_data".to_string();
        }
        if mon.socket_volume.is_empty() {
            mon.socket_volume = "beszel_socket".to_string();
        }

        if !self.observability.log_viewer.enabled && !self.observability.monitoring.enabled {
            self.observability.log_viewer.enabled = true;
            self.observability.monitoring.enabled = true;
        }

        if self.tls.resolver.is_empty() {
            self.tls.resolver = "le".to_string();
        }
    }

    /// Merge a per-service stack onto the server's base stack.
    ///
    /// Precedence: the base wins for domain, environment, TLS, the
    /// edge override, and observability (infrastructure already
    /// running); the service stack wins for its own project name,
    /// version, volumes, and services. Networks are merged base-first,
    /// service declarations overriding same-named entries.
    #[must_use]
    pub fn merge_onto_base(mut self, base: &Self) -> Self {
        self.domain = base.domain.clone();
        self.environment = base.environment.clone();
        self.tls = base.tls.clone();
        self.edge = base.edge.clone();
        self.observability = base.observability.clone();

        let mut networks = base.networks.clone();
        for (name, network) in self.networks {
            networks.insert(name, network);
        }
        self.networks = networks;

        self
    }
}

/// TLS issuance policy for the whole stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tls {
    #[serde(default)]
    pub mode: TlsMode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resolver: String,
    #[serde(
        rename = "dnsChallenge",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dns: Option<DnsChallenge>,
}

impl Default for Tls {
    fn default() -> Self {
        Self {
            mode: TlsMode::Disabled,
            email: String::new(),
            resolver: String::new(),
            dns: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    Acme,
    SelfSigned,
    #[default]
    Disabled,
}

/// ACME DNS-01 challenge configuration. `env` entries are
/// `KEY=VALUE` pairs handed to the edge proxy container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsChallenge {
    pub provider: String,
    #[serde(default)]
    pub env: Vec<String>,
}

/// Built-in observability add-ons.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observability {
    #[serde(rename = "dozzle", default)]
    pub log_viewer: LogViewer,
    #[serde(rename = "beszel", default)]
    pub monitoring: Monitoring,
    /// Custom container-runtime socket path shared by the log viewer
    /// and the monitoring agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_socket: Option<String>,
}

/// Log viewer (Dozzle) settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogViewer {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subdomain: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_volume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
}

/// Monitoring hub + agent (Beszel) settings. The hub performs its own
/// login, so no proxy-level basic auth is ever attached to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Monitoring {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subdomain: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_volume: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub socket_volume: String,
    /// Pre-generated public key the agent uses to trust the hub.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_key: String,
    /// Pre-generated agent registration token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// Custom hub URL for the agent; defaults to the in-network hub.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_url: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub user_creation: bool,
}

/// A named Docker network. `internal` networks get no internet
/// egress.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub internal: bool,
}

/// A named Docker volume; the storage backend is the platform
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
}

/// One deployable service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    #[serde(default)]
    pub expose: u16,
    #[serde(default)]
    pub replicas: u32,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_file: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<SecretRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeploySpec>,
    #[serde(rename = "traefik", default, skip_serializing_if = "ProxyConfig::is_disabled")]
    pub proxy: ProxyConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_access: Option<NetworkAccess>,
}

impl Service {
    /// Whether reverse-proxy routing is enabled for this service.
    #[must_use]
    pub const fn proxied(&self) -> bool {
        !matches!(self.proxy, ProxyConfig::Disabled)
    }

    /// The structured route override, if one was declared.
    #[must_use]
    pub const fn route(&self) -> Option<&ProxyRoute> {
        match &self.proxy {
            ProxyConfig::Custom(route) => Some(route),
            ProxyConfig::Disabled | ProxyConfig::Enabled => None,
        }
    }
}

/// Image build instructions, mutually exclusive with `image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSpec {
    pub context: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dockerfile: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub args: IndexMap<String, String>,
}

/// A `source:target` volume mount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
}

/// Reference to a Docker secret consumed by a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
}

/// Container resource limits and reservations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpus: String,
    /// GPU hint, e.g. `"1"` or `"all"`; enables the nvidia runtime.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gpus: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub shm_size: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub ulimits: IndexMap<String, Ulimit>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reserve_cpu: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reserve_mem: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ulimit {
    pub soft: i64,
    pub hard: i64,
}

/// Container health probe intent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retries: u32,
}

const fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Rollout strategy intent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploySpec {
    #[serde(default)]
    pub strategy: DeployStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStrategy {
    #[default]
    Rolling,
    Recreate,
}

/// Per-service reverse-proxy configuration, resolved from the
/// polymorphic YAML form.
#[derive(Debug, Clone, Default)]
pub enum ProxyConfig {
    /// No routing for this service.
    #[default]
    Disabled,
    /// Legacy boolean form: route with all defaults.
    Enabled,
    /// Structured form with overrides.
    Custom(ProxyRoute),
}

impl ProxyConfig {
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl<'de> Deserialize<'de> for ProxyConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Route(ProxyRoute),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Self::Enabled,
            Raw::Flag(false) => Self::Disabled,
            // A structured object means "routed" unless it opts out
            // with an explicit `enabled: false`.
            Raw::Route(route) => {
                if route.enabled == Some(false) {
                    Self::Disabled
                } else {
                    Self::Custom(route)
                }
            }
        })
    }
}

impl Serialize for ProxyConfig {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Disabled => serializer.serialize_bool(false),
            Self::Enabled => serializer.serialize_bool(true),
            Self::Custom(route) => route.serialize(serializer),
        }
    }
}

/// Structured route override for a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Custom match rule; overrides the synthesized `Host()` rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middlewares: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<RouteTls>,
    #[serde(
        rename = "loadBalancer",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub load_balancer: Option<LoadBalancer>,
    /// Free-form label overrides, applied last.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
}

/// Per-route TLS override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTls {
    #[serde(
        rename = "certResolver",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub cert_resolver: String,
    /// Named TLS options block configured on the edge.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub options: String,
}

/// Load-balancer tuning for a routed service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadBalancer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky: Option<Sticky>,
    #[serde(
        rename = "healthCheck",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub health_check: Option<LbHealthCheck>,
    #[serde(
        rename = "responseForwarding",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_forwarding: Option<ResponseForwarding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sticky {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<StickyCookie>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StickyCookie {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LbHealthCheck {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timeout: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseForwarding {
    #[serde(
        rename = "flushInterval",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub flush_interval: String,
}

/// HTTP basic-auth intent. Passwords are pre-hashed upstream; the
/// builders consume them verbatim (modulo `$` escaping for the
/// manifest format).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicAuth {
    #[serde(default)]
    pub enabled: bool,
    /// Legacy single-user form.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub users: IndexMap<String, String>,
    /// External htpasswd file reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub users_file: String,
}

/// Network-access policy for a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkAccess {
    /// Opt into the `public` network (internet egress).
    #[serde(default)]
    pub internet: bool,
    /// Force private-only placement, overriding `internet`.
    #[serde(default)]
    pub internal: bool,
    /// Extra networks, appended verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<String>,
}

/// Full override for the edge proxy's own manifest entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Raw startup arguments; replaces the synthesized defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub middlewares: IndexMap<String, EdgeMiddleware>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub plugins: IndexMap<String, EdgePlugin>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub entrypoints: IndexMap<String, EdgeEntryPoint>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub providers: IndexMap<String, EdgeProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<EdgeApi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<EdgeLog>,
    #[serde(
        rename = "accessLog",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub access_log: Option<EdgeAccessLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EdgeMetrics>,
}

/// Edge middleware declared at stack level, emitted as static
/// configuration arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeMiddleware {
    #[serde(
        rename = "addPrefix",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub add_prefix: Option<AddPrefix>,
    #[serde(
        rename = "stripPrefix",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub strip_prefix: Option<StripPrefix>,
    #[serde(
        rename = "replacePathRegex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub replace_path_regex: Option<ReplacePathRegex>,
    #[serde(
        rename = "rateLimit",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rate_limit: Option<RateLimit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddPrefix {
    pub prefix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StripPrefix {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
    #[serde(
        rename = "forceSlash",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub force_slash: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplacePathRegex {
    pub regex: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub average: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub period: String,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub burst: i64,
}

const fn is_zero_i64(n: &i64) -> bool {
    *n == 0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgePlugin {
    #[serde(rename = "moduleName")]
    pub module_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeEntryPoint {
    pub address: String,
    #[serde(
        rename = "asDefault",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub as_default: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileProvider>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileProvider {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub directory: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub watch: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EdgeApi {
    #[serde(default)]
    pub dashboard: bool,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeLog {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub level: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(
        rename = "filePath",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeAccessLog {
    #[serde(
        rename = "filePath",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub file_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<PrometheusMetrics>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PrometheusMetrics {
    #[serde(rename = "addEntryPointsLabels", default)]
    pub add_entry_points_labels: bool,
    #[serde(rename = "addServicesLabels", default)]
    pub add_services_labels: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(extra: &str) -> Stack {
        let yaml = format!(
            "project: demo\ndomain: example.com\nservices:\n  - name: web\n    image: nginx:alpine\n    expose: 80\n{extra}"
        );
        Stack::from_yaml(yaml.as_bytes()).expect("parse")
    }

    #[test]
    fn defaults_applied_on_load() {
        let stack = minimal("");

        assert_eq!(stack.version, 1);
        assert!(stack.observability.log_viewer.enabled);
        assert!(stack.observability.monitoring.enabled);
        assert_eq!(stack.observability.log_viewer.subdomain, "logs");
        assert_eq!(stack.observability.log_viewer.data_volume, "dozzle_data");
        assert_eq!(stack.observability.monitoring.data_volume, "beszel_data");
        assert_eq!(
            stack.observability.monitoring.socket_volume,
            "beszel_socket"
        );
        assert_eq!(stack.tls.resolver, "le");
        assert_eq!(stack.tls.mode, TlsMode::Disabled);
    }

    #[test]
    fn explicitly_enabled_member_disables_the_other_default() {
        let yaml = b"project: p\ndomain: d.com\nobservability:\n  dozzle:\n    enabled: true\n";
        let stack = Stack::from_yaml(yaml).expect("parse");

        assert!(stack.observability.log_viewer.enabled);
        assert!(!stack.observability.monitoring.enabled);
    }

    #[test]
    fn proxy_field_absent_is_disabled() {
        let stack = minimal("");
        assert!(!stack.services[0].proxied());
    }

    #[test]
    fn proxy_field_boolean_forms() {
        let on = minimal("    traefik: true\n");
        assert!(on.services[0].proxied());
        assert!(on.services[0].route().is_none());

        let off = minimal("    traefik: false\n");
        assert!(!off.services[0].proxied());
    }

    #[test]
    fn proxy_field_structured_form() {
        let stack = minimal(
            "    traefik:\n      rule: \"PathPrefix(`/api`)\"\n      entrypoints: [web]\n      priority: 42\n",
        );
        let route = stack.services[0].route().expect("structured route");

        assert!(stack.services[0].proxied());
        assert_eq!(route.rule.as_deref(), Some("PathPrefix(`/api`)"));
        assert_eq!(route.entrypoints, vec!["web"]);
        assert_eq!(route.priority, Some(42));
    }

    #[test]
    fn proxy_field_structured_opt_out() {
        let stack = minimal("    traefik:\n      enabled: false\n      rule: \"Host(`x`)\"\n");
        assert!(!stack.services[0].proxied());
    }

    #[test]
    fn tls_modes_parse() {
        let yaml = b"project: p\ndomain: d.com\ntls:\n  mode: acme\n  email: ops@d.com\n";
        let stack = Stack::from_yaml(yaml).expect("parse");
        assert_eq!(stack.tls.mode, TlsMode::Acme);
        assert_eq!(stack.tls.email, "ops@d.com");

        let yaml = b"project: p\ndomain: d.com\ntls:\n  mode: selfsigned\n";
        let stack = Stack::from_yaml(yaml).expect("parse");
        assert_eq!(stack.tls.mode, TlsMode::SelfSigned);
    }

    #[test]
    fn merge_onto_base_precedence() {
        let base = Stack::from_yaml(
            b"project: base\ndomain: prod.example.com\nenvironment: production\ntls:\n  mode: acme\n  email: ops@example.com\nnetworks:\n  public: {}\n  private:\n    internal: true\n",
        )
        .expect("base");

        let service = Stack::from_yaml(
            b"project: api\ndomain: wrong.local\nenvironment: local\nnetworks:\n  api_net: {}\nvolumes:\n  - name: api_data\nservices:\n  - name: api\n    image: api:1\n    expose: 8000\n",
        )
        .expect("service");

        let merged = service.merge_onto_base(&base);

        assert_eq!(merged.domain, "prod.example.com");
        assert_eq!(merged.environment.as_deref(), Some("production"));
        assert_eq!(merged.tls.mode, TlsMode::Acme);
        assert_eq!(merged.project, "api");
        assert_eq!(merged.services.len(), 1);
        assert_eq!(merged.volumes.len(), 1);
        assert!(merged.networks.contains_key("public"));
        assert!(merged.networks.contains_key("private"));
        assert!(merged.networks.contains_key("api_net"));
    }

    #[test]
    fn stack_round_trips_through_yaml() {
        let stack = minimal("    traefik: true\n");
        let yaml = serde_yaml::to_string(&stack).expect("serialize");
        let reparsed = Stack::from_yaml(yaml.as_bytes()).expect("reparse");

        assert_eq!(reparsed.project, "demo");
        assert!(reparsed.services[0].proxied());
    }
}
