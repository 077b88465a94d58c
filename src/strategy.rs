//! Health-check and rollout-strategy translation.

use crate::manifest::{DeployEntry, HealthcheckEntry, RestartPolicyEntry, UpdateConfigEntry};
use crate::stack::{DeploySpec, DeployStrategy, HealthCheckSpec};

/// Translate a health-check intent into a concrete probe. Returns
/// `None` when the check is disabled.
#[must_use]
pub fn health_check(spec: &HealthCheckSpec, port: u16) -> Option<HealthcheckEntry> {
    if !spec.enabled {
        return None;
    }

    let path = if spec.path.is_empty() {
        "/health"
    } else {
        &spec.path
    };

    let probe = if port > 0 {
        format!("curl -f http://localhost:{port}{path} || exit 1")
    } else {
        format!("curl -f http://localhost{path} || exit 1")
    };

    Some(HealthcheckEntry {
        test: vec!["CMD-SHELL".to_string(), probe],
        interval: default_if_empty(&spec.interval, "30s"),
        timeout: default_if_empty(&spec.timeout, "10s"),
        retries: if spec.retries > 0 { spec.retries } else { 3 },
        start_period: "60s".to_string(),
    })
}

/// Translate a rollout-strategy intent into update and restart
/// policies. Replica count is emitted only when above one.
#[must_use]
pub fn deploy_block(spec: &DeploySpec, replicas: u32) -> DeployEntry {
    let update_config = match spec.strategy {
        DeployStrategy::Recreate => UpdateConfigEntry {
            order: "stop-first".to_string(),
            parallelism: 0,
            ..Default::default()
        },
        DeployStrategy::Rolling => UpdateConfigEntry {
            order: "start-first".to_string(),
            parallelism: 1,
            delay: Some("10s".to_string()),
            failure_action: Some("rollback".to_string()),
            monitor: Some("60s".to_string()),
            max_failure_ratio: Some(0.3),
        },
    };

    DeployEntry {
        replicas: (replicas > 1).then_some(replicas),
        update_config: Some(update_config),
        restart_policy: Some(RestartPolicyEntry {
            condition: "on-failure".to_string(),
            delay: "5s".to_string(),
            max_attempts: 3,
        }),
        resources: None,
    }
}

fn default_if_empty(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
