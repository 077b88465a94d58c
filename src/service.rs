//! Service Builder: one manifest entry per declared service, with
//! environment-aware routing, hardening, and placement.

use indexmap::IndexMap;

use crate::environment::Environment;
use crate::labels::{self, RouterLabels};
use crate::manifest::{
    BuildEntry, DeployEntry, ManifestService, ResourceBound, ResourcesEntry, SecretMount,
    UlimitEntry,
};
use crate::stack::{Resources, Service, Tls, TlsMode};
use crate::strategy;

/// Read-only stack context shared by every service build.
#[derive(Debug, Clone, Copy)]
pub struct ServiceContext<'a> {
    pub domain: &'a str,
    pub project: &'a str,
    pub environment: Environment,
    pub tls: &'a Tls,
}

impl ServiceContext<'_> {
    /// Compose prefixes network names with the project, and the
    /// discovery provider must match.
    #[must_use]
    pub fn proxy_network(&self) -> String {
        format!("{}_traefik", self.project)
    }
}

/// Build the manifest entry for one declared service.
#[must_use]
pub fn build(service: &Service, ctx: &ServiceContext) -> ManifestService {
    let mut entry = ManifestService {
        container_name: Some(service.name.clone()),
        restart: Some("unless-stopped".to_string()),
        ..Default::default()
    };

    if let Some(build) = &service.build {
        entry.build = Some(BuildEntry {
            context: build.context.clone(),
            dockerfile: if build.dockerfile.is_empty() {
                "Dockerfile".to_string()
            } else {
                build.dockerfile.clone()
            },
            args: build.args.clone(),
        });
    } else if let Some(image) = &service.image {
        entry.image = Some(image.clone());
    }

    if service.expose > 0 {
        entry.expose = vec![service.expose.to_string()];
    }

    entry.environment = service.env.clone();
    entry.env_file = service.env_file.clone();

    entry.volumes = service
        .volumes
        .iter()
        .map(|mount| format!("{}:{}", mount.source, mount.target))
        .collect();

    entry.secrets = service
        .secrets
        .iter()
        .map(|secret| SecretMount {
            source: secret.name.clone(),
            target: if secret.target.is_empty() {
                secret.name.clone()
            } else {
                secret.target.clone()
            },
        })
        .collect();

    if let Some(spec) = &service.health_check {
        entry.healthcheck = strategy::health_check(spec, service.expose);
    }

    entry.deploy = deploy_entry(service);

    if let Some(resources) = &service.resources {
        apply_runtime_resources(&mut entry, resources);
    }

    if service.proxied() {
        entry.labels = route_labels(service, ctx);
    }

    entry.networks = placement(service);

    if !ctx.environment.is_local() {
        harden(&mut entry, service.resources.as_ref());
    } else if let Some(resources) = &service.resources {
        // Custom ulimits still apply in local runs.
        for (name, limit) in &resources.ulimits {
            entry.ulimits.insert(
                name.clone(),
                UlimitEntry {
                    soft: limit.soft,
                    hard: limit.hard,
                },
            );
        }
    }

    entry
}

/// Synthesize the reverse-proxy labels for a routed service.
fn route_labels(service: &Service, ctx: &ServiceContext) -> IndexMap<String, String> {
    let name = &service.name;
    let route = service.route();
    let local = ctx.environment.is_local();

    let mut router = RouterLabels::new(name, &ctx.proxy_network());
    router.server_port(service.expose);

    // 1. Match rule: custom wins, else Host(subdomain.domain).
    let rule = route.and_then(|r| r.rule.clone()).unwrap_or_else(|| {
        let subdomain = service.subdomain.as_deref().unwrap_or(name);
        format!("Host(`{subdomain}.{}`)", ctx.domain)
    });
    router.rule(&rule);

    // 2. Entry points.
    let entry_points = route
        .filter(|r| !r.entrypoints.is_empty())
        .map_or_else(
            || vec![ctx.environment.entry_point().to_string()],
            |r| r.entrypoints.clone(),
        );
    router.entry_points(&entry_points);

    // 3. TLS is a production-only concern.
    if !local && ctx.tls.mode != TlsMode::Disabled {
        router.tls();
        let tls_override = route.and_then(|r| r.tls.as_ref());
        let custom_resolver = tls_override
            .map(|t| t.cert_resolver.as_str())
            .filter(|r| !r.is_empty());
        if let Some(resolver) = custom_resolver {
            router.cert_resolver(resolver);
        } else if ctx.tls.mode == TlsMode::Acme {
            router.cert_resolver(&ctx.tls.resolver);
        }
        if let Some(options) = tls_override
            .map(|t| t.options.as_str())
            .filter(|o| !o.is_empty())
        {
            router.tls_options(options);
        }
    }

    // 4. Middleware chain, in fixed order.
    let mut chain = route
        .filter(|r| !r.middlewares.is_empty())
        .map_or_else(
            || {
                if local {
                    Vec::new()
                } else {
                    vec![
                        "security-headers".to_string(),
                        "rate-limit".to_string(),
                        "request-size".to_string(),
                    ]
                }
            },
            |r| r.middlewares.clone(),
        );

    if let Some(auth) = &service.basic_auth {
        if auth.enabled {
            let middleware = format!("{name}-auth");
            let users = labels::basic_auth_users(auth);
            if !users.is_empty() {
                router.basic_auth_middleware(&middleware, &users);
            }
            if !auth.users_file.is_empty() {
                router.basic_auth_users_file(&middleware, &auth.users_file);
            }
            chain.push(middleware);
        }
    }

    if !local {
        let middleware = format!("{name}-timeout");
        router.circuit_breaker(&middleware, "NetworkErrorRatio() > 0.30");
        chain.push(middleware);
    }

    router.middlewares(&chain);

    // 5. Load balancing.
    let lb = route.and_then(|r| r.load_balancer.as_ref());
    let lb_check = lb.and_then(|l| l.health_check.as_ref());
    let flush = lb
        .and_then(|l| l.response_forwarding.as_ref())
        .map(|f| f.flush_interval.as_str())
        .filter(|f| !f.is_empty());

    if local {
        // No defaults in local runs; emit only what was asked for.
        if let Some(check) = lb_check {
            router.lb_health_check(
                &check.path,
                or_default(&check.interval, "30s"),
                or_default(&check.timeout, "10s"),
            );
        }
        if let Some(flush) = flush {
            router.flush_interval(flush);
        }
    } else {
        let path = lb_check.map_or("", |c| c.path.as_str());
        let interval = lb_check.map_or("30s", |c| or_default(&c.interval, "30s"));
        let timeout = lb_check.map_or("10s", |c| or_default(&c.timeout, "10s"));
        router.lb_health_check(path, interval, timeout);
        router.flush_interval(flush.unwrap_or("100ms"));
    }

    let sticky = lb.and_then(|l| l.sticky.as_ref());
    if service.replicas > 1 || sticky.is_some() {
        let cookie = sticky
            .and_then(|s| s.cookie.as_ref())
            .map(|c| c.name.as_str())
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("_{name}_server"), ToString::to_string);
        router.sticky_cookie(&cookie);
    }

    // 6. Priority only when explicitly set.
    if let Some(priority) = route.and_then(|r| r.priority) {
        router.priority(priority);
    }

    // Free-form overrides win over everything synthesized above.
    if let Some(route) = route {
        for (key, value) in &route.labels {
            router.set_raw(key, value);
        }
    }

    router.finish()
}

/// Network placement: private by default, the proxy network when
/// routed, public only on explicit opt-in.
fn placement(service: &Service) -> Vec<String> {
    let mut networks = vec!["private".to_string()];

    if service.proxied() {
        networks.push("traefik".to_string());
    }

    if let Some(access) = &service.network_access {
        if access.internet && !access.internal {
            networks.push("public".to_string());
        }
        networks.extend(access.custom.iter().cloned());
    }

    networks
}

fn deploy_entry(service: &Service) -> Option<DeployEntry> {
    let mut deploy = if let Some(spec) = &service.deploy {
        strategy::deploy_block(spec, service.replicas)
    } else if service.replicas > 1 {
        // No strategy declared: record the scale, leave rollout
        // behavior to the platform defaults.
        DeployEntry {
            replicas: Some(service.replicas),
            ..Default::default()
        }
    } else {
        DeployEntry::default()
    };

    if let Some(resources) = &service.resources {
        let limits = bound(&resources.cpus, &resources.memory);
        let reservations = bound(&resources.reserve_cpu, &resources.reserve_mem);
        if limits.is_some() || reservations.is_some() {
            deploy.resources = Some(ResourcesEntry {
                limits,
                reservations,
            });
        }
    }

    (!deploy.is_empty()).then_some(deploy)
}

fn bound(cpus: &str, memory: &str) -> Option<ResourceBound> {
    if cpus.is_empty() && memory.is_empty() {
        return None;
    }
    Some(ResourceBound {
        cpus: (!cpus.is_empty()).then(|| cpus.to_string()),
        memory: (!memory.is_empty()).then(|| memory.to_string()),
    })
}

/// Runtime-level resource settings that live outside the deploy
/// block.
fn apply_runtime_resources(entry: &mut ManifestService, resources: &Resources) {
    if !resources.gpus.is_empty() {
        entry.runtime = Some("nvidia".to_string());
        entry.environment.insert(
            "NVIDIA_VISIBLE_DEVICES".to_string(),
            resources.gpus.clone(),
        );
    }
    if !resources.shm_size.is_empty() {
        entry.shm_size = Some(resources.shm_size.clone());
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}

/// Production hardening: least-privilege capabilities, no privilege
/// escalation, capped scratch space, bounded descriptors and
/// processes, fixed non-root identity.
fn harden(entry: &mut ManifestService, resources: Option<&Resources>) {
    entry.security_opt = vec!["no-new-privileges:true".to_string()];
    entry.cap_drop = vec!["ALL".to_string()];
    entry.cap_add = vec![
        "CHOWN".to_string(),
        "SETGID".to_string(),
        "SETUID".to_string(),
    ];
    entry.tmpfs = vec![
        "/tmp:rw,noexec,nosuid,size=100m".to_string(),
        "/var/tmp:rw,noexec,nosuid,size=50m".to_string(),
    ];

    entry.ulimits.insert(
        "nofile".to_string(),
        UlimitEntry {
            soft: 65536,
            hard: 65536,
        },
    );
    entry.ulimits.insert(
        "nproc".to_string(),
        UlimitEntry {
            soft: 4096,
            hard: 4096,
        },
    );

    // Declared ulimits override the hardening defaults.
    if let Some(resources) = resources {
        for (name, limit) in &resources.ulimits {
            entry.ulimits.insert(
                name.clone(),
                UlimitEntry {
                    soft: limit.soft,
                    hard: limit.hard,
                },
            );
        }
    }

    entry.user = Some("1000:1000".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Stack;

    fn context<'a>(stack: &'a Stack, environment: Environment) -> ServiceContext<'a> {
        ServiceContext {
            domain: &stack.domain,
            project: &stack.project,
            environment,
            tls: &stack.tls,
        }
    }

    fn local_stack(extra: &str) -> Stack {
        let yaml = format!(
            "project: demo\ndomain: localhost\nservices:\n  - name: web\n    image: nginx:alpine\n    expose: 80\n{extra}"
        );
        Stack::from_yaml(yaml.as_bytes()).expect("parse")
    }

    #[test]
    fn image_and_build_are_exclusive_outputs() {
        let stack = local_stack("");
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));
        assert_eq!(entry.image.as_deref(), Some("nginx:alpine"));
        assert!(entry.build.is_none());

        let stack = Stack::from_yaml(
            b"project: p\ndomain: localhost\nservices:\n  - name: app\n    build:\n      context: ./app\n    expose: 3000\n",
        )
        .expect("parse");
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));
        assert!(entry.image.is_none());
        let build_entry = entry.build.expect("build");
        assert_eq!(build_entry.context, "./app");
        assert_eq!(build_entry.dockerfile, "Dockerfile");
    }

    #[test]
    fn unproxied_service_has_no_labels_and_stays_private() {
        let stack = local_stack("");
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));

        assert!(entry.labels.is_empty());
        assert_eq!(entry.networks, vec!["private"]);
    }

    #[test]
    fn proxied_service_joins_proxy_network() {
        let stack = local_stack("    traefik: true\n");
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));

        assert_eq!(entry.networks, vec!["private", "traefik"]);
        assert_eq!(
            entry.labels["traefik.http.routers.web.rule"],
            "Host(`web.localhost`)"
        );
        assert_eq!(entry.labels["traefik.http.routers.web.entrypoints"], "web");
        assert!(!entry.labels.contains_key("traefik.http.routers.web.tls"));
    }

    #[test]
    fn internet_opt_in_adds_public_unless_internal() {
        let stack = local_stack("    network_access:\n      internet: true\n");
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));
        assert!(entry.networks.contains(&"public".to_string()));

        let stack = local_stack(
            "    network_access:\n      internet: true\n      internal: true\n      custom: [backbone]\n",
        );
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));
        assert!(!entry.networks.contains(&"public".to_string()));
        assert!(entry.networks.contains(&"backbone".to_string()));
    }

    #[test]
    fn local_skips_hardening() {
        let stack = local_stack("");
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));

        assert!(entry.cap_drop.is_empty());
        assert!(entry.tmpfs.is_empty());
        assert!(entry.user.is_none());
        assert!(entry.ulimits.is_empty());
    }

    #[test]
    fn production_hardening_applied() {
        let stack = local_stack("");
        let entry = build(&stack.services[0], &context(&stack, Environment::Production));

        assert_eq!(entry.security_opt, vec!["no-new-privileges:true"]);
        assert_eq!(entry.cap_drop, vec!["ALL"]);
        assert_eq!(entry.cap_add, vec!["CHOWN", "SETGID", "SETUID"]);
        assert_eq!(entry.tmpfs.len(), 2);
        assert_eq!(entry.user.as_deref(), Some("1000:1000"));
        assert_eq!(entry.ulimits["nofile"].soft, 65536);
        assert_eq!(entry.ulimits["nproc"].hard, 4096);
    }

    #[test]
    fn gpu_hint_enables_nvidia_runtime_without_clobbering_env() {
        let stack = local_stack(
            "    env:\n      APP_MODE: worker\n    resources:\n      gpus: all\n",
        );
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));

        assert_eq!(entry.runtime.as_deref(), Some("nvidia"));
        assert_eq!(entry.environment["APP_MODE"], "worker");
        assert_eq!(entry.environment["NVIDIA_VISIBLE_DEVICES"], "all");
    }

    #[test]
    fn replicas_without_deploy_spec_still_scale() {
        let stack = local_stack("    replicas: 3\n");
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));

        let deploy = entry.deploy.expect("deploy");
        assert_eq!(deploy.replicas, Some(3));
        assert!(deploy.update_config.is_none());
    }

    #[test]
    fn resource_limits_and_reservations() {
        let stack = local_stack(
            "    resources:\n      cpus: \"0.5\"\n      memory: 512m\n      reserve_cpu: \"0.1\"\n      reserve_mem: 128m\n",
        );
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));

        let resources = entry.deploy.expect("deploy").resources.expect("resources");
        let limits = resources.limits.expect("limits");
        assert_eq!(limits.cpus.as_deref(), Some("0.5"));
        assert_eq!(limits.memory.as_deref(), Some("512m"));
        let reservations = resources.reservations.expect("reservations");
        assert_eq!(reservations.cpus.as_deref(), Some("0.1"));
        assert_eq!(reservations.memory.as_deref(), Some("128m"));
    }

    #[test]
    fn secret_target_defaults_to_name() {
        let stack = local_stack(
            "    secrets:\n      - name: db_password\n        file: ./secrets/db\n      - name: api_key\n        file: ./secrets/api\n        target: /run/secrets/key\n",
        );
        let entry = build(&stack.services[0], &context(&stack, Environment::Local));

        assert_eq!(entry.secrets[0].target, "db_password");
        assert_eq!(entry.secrets[1].target, "/run/secrets/key");
    }
}
