//! Network, volume, and secret synthesis.

use indexmap::IndexMap;

use crate::manifest::{ManifestNetwork, ManifestSecret, ManifestVolume};
use crate::stack::{Network, Service, Volume};

/// Build bridge networks from the declared set. Internal networks
/// get no internet egress: IP masquerading is disabled and host
/// binding is pinned to loopback.
#[must_use]
pub fn networks(declared: &IndexMap<String, Network>) -> IndexMap<String, ManifestNetwork> {
    let mut result = IndexMap::new();

    for (name, spec) in declared {
        let mut driver_opts = IndexMap::new();
        let internal = if spec.internal {
            driver_opts.insert(
                "com.docker.network.bridge.enable_ip_masquerade".to_string(),
                "false".to_string(),
            );
            driver_opts.insert(
                "com.docker.network.bridge.enable_icc".to_string(),
                "true".to_string(),
            );
            driver_opts.insert(
                "com.docker.network.bridge.host_binding_ipv4".to_string(),
                "127.0.0.1".to_string(),
            );
            Some(true)
        } else {
            driver_opts.insert(
                "com.docker.network.bridge.enable_ip_masquerade".to_string(),
                "true".to_string(),
            );
            driver_opts.insert(
                "com.docker.network.bridge.enable_icc".to_string(),
                "true".to_string(),
            );
            None
        };

        result.insert(
            name.clone(),
            ManifestNetwork {
                driver: "bridge".to_string(),
                internal,
                driver_opts,
            },
        );
    }

    result
}

/// Inject the proxy network when the stack didn't declare it.
/// Services and the edge proxy rely on its presence for
/// cross-container routing.
pub fn ensure_proxy_network(networks: &mut IndexMap<String, ManifestNetwork>) {
    if !networks.contains_key("traefik") {
        networks.insert(
            "traefik".to_string(),
            ManifestNetwork {
                driver: "bridge".to_string(),
                internal: None,
                driver_opts: IndexMap::new(),
            },
        );
    }
}

/// Build named volumes; only the names carry information.
#[must_use]
pub fn volumes(declared: &[Volume]) -> IndexMap<String, ManifestVolume> {
    declared
        .iter()
        .map(|v| (v.name.clone(), ManifestVolume::default()))
        .collect()
}

/// Collect one manifest secret per distinct secret name across all
/// services. When two services declare the same name with different
/// sources, the first occurrence wins silently.
#[must_use]
pub fn collect_secrets(services: &[Service]) -> IndexMap<String, ManifestSecret> {
    let mut result: IndexMap<String, ManifestSecret> = IndexMap::new();

    for service in services {
        for secret in &service.secrets {
            if result.contains_key(&secret.name) {
                continue;
            }
            result.insert(
                secret.name.clone(),
                ManifestSecret {
                    external: secret.external,
                    file: (!secret.file.is_empty()).then(|| secret.file.clone()),
                },
            );
        }
    }

    result
}
