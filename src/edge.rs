//! Edge proxy (Traefik) manifest entry: synthesized defaults or a
//! stack-level override.

use indexmap::IndexMap;

use crate::environment::Environment;
use crate::manifest::{DeployEntry, ManifestService, ResourceBound, ResourcesEntry};
use crate::stack::{EdgeConfig, EdgeMiddleware, Stack, TlsMode};

const DEFAULT_IMAGE: &str = "traefik:v3.5";
const DOCKER_SOCKET_MOUNT: &str = "/var/run/docker.sock:/var/run/docker.sock:ro";
const ACME_VOLUME: &str = "traefik_acme:/letsencrypt";

/// Build the edge proxy entry. A declared `traefik:` block takes the
/// custom path; otherwise defaults are synthesized per environment.
#[must_use]
pub fn build(stack: &Stack, environment: Environment) -> ManifestService {
    stack.edge.as_ref().map_or_else(
        || build_default(stack, environment),
        |config| build_custom(stack, config, environment),
    )
}

fn build_default(stack: &Stack, environment: Environment) -> ManifestService {
    let mut entry = base_entry(DEFAULT_IMAGE.to_string());
    entry.command = default_args(stack, environment);

    if environment.is_local() {
        entry.ports = dashboard_ports();
    } else {
        entry.ports = vec!["80:80".to_string(), "443:443".to_string()];
    }

    // ACME material only exists on a production edge.
    if stack.tls.mode == TlsMode::Acme && !environment.is_local() {
        let resolver = &stack.tls.resolver;
        entry.command.push(format!(
            "--certificatesresolvers.{resolver}.acme.email={}",
            stack.tls.email
        ));
        entry.command.push(format!(
            "--certificatesresolvers.{resolver}.acme.storage=/letsencrypt/acme.json"
        ));

        if let Some(dns) = stack.tls.dns.as_ref().filter(|d| !d.provider.is_empty()) {
            entry.command.push(format!(
                "--certificatesresolvers.{resolver}.acme.dnschallenge=true"
            ));
            entry.command.push(format!(
                "--certificatesresolvers.{resolver}.acme.dnschallenge.provider={}",
                dns.provider
            ));
            for pair in &dns.env {
                if let Some((key, value)) = pair.split_once('=') {
                    entry
                        .environment
                        .insert(key.to_string(), value.to_string());
                }
            }
        } else {
            // HTTP-01 fallback needs the plain entry point open.
            entry.command.push(format!(
                "--certificatesresolvers.{resolver}.acme.httpchallenge=true"
            ));
            entry.command.push(format!(
                "--certificatesresolvers.{resolver}.acme.httpchallenge.entrypoint=web"
            ));
        }

        entry.volumes.push(ACME_VOLUME.to_string());
    }

    if !environment.is_local() {
        harden(&mut entry);
        entry.deploy = Some(DeployEntry {
            resources: Some(ResourcesEntry {
                limits: Some(ResourceBound {
                    cpus: Some("1.0".to_string()),
                    memory: Some("512M".to_string()),
                }),
                reservations: Some(ResourceBound {
                    cpus: Some("0.25".to_string()),
                    memory: Some("128M".to_string()),
                }),
            }),
            ..Default::default()
        });
    }

    entry
}

fn build_custom(stack: &Stack, config: &EdgeConfig, environment: Environment) -> ManifestService {
    let image = config
        .image
        .clone()
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
    let mut entry = base_entry(image);

    // Raw commands are a full override; no ACME arguments are
    // appended on this path.
    entry.command = if config.commands.is_empty() {
        default_args(stack, environment)
    } else {
        config.commands.clone()
    };

    for (name, entry_point) in &config.entrypoints {
        entry
            .command
            .push(format!("--entrypoints.{name}.address={}", entry_point.address));
        if entry_point.as_default {
            entry
                .command
                .push(format!("--entrypoints.{name}.asDefault=true"));
        }
    }

    for provider in config.providers.values() {
        if let Some(file) = &provider.file {
            if !file.directory.is_empty() {
                entry
                    .command
                    .push(format!("--providers.file.directory={}", file.directory));
            }
            if !file.filename.is_empty() {
                entry
                    .command
                    .push(format!("--providers.file.filename={}", file.filename));
            }
            if file.watch {
                entry.command.push("--providers.file.watch=true".to_string());
            }
        }
    }

    for (name, middleware) in &config.middlewares {
        entry.command.extend(middleware_args(name, middleware));
    }

    for (name, plugin) in &config.plugins {
        entry.command.push(format!(
            "--experimental.plugins.{name}.modulename={}",
            plugin.module_name
        ));
        if !plugin.version.is_empty() {
            entry.command.push(format!(
                "--experimental.plugins.{name}.version={}",
                plugin.version
            ));
        }
    }

    if let Some(api) = &config.api {
        if api.dashboard {
            entry.command.push("--api.dashboard=true".to_string());
        }
        if api.insecure {
            entry.command.push("--api.insecure=true".to_string());
        }
        if api.debug {
            entry.command.push("--api.debug=true".to_string());
        }
    }

    if let Some(log) = &config.log {
        if !log.level.is_empty() {
            entry.command.push(format!("--log.level={}", log.level));
        }
        if !log.format.is_empty() {
            entry.command.push(format!("--log.format={}", log.format));
        }
        if !log.file_path.is_empty() {
            entry
                .command
                .push(format!("--log.filepath={}", log.file_path));
        }
    }

    if let Some(access_log) = &config.access_log {
        entry.command.push("--accesslog=true".to_string());
        if !access_log.file_path.is_empty() {
            entry
                .command
                .push(format!("--accesslog.filepath={}", access_log.file_path));
        }
        if !access_log.format.is_empty() {
            entry
                .command
                .push(format!("--accesslog.format={}", access_log.format));
        }
    }

    if let Some(prometheus) = config.metrics.as_ref().and_then(|m| m.prometheus.as_ref()) {
        entry.command.push("--metrics.prometheus=true".to_string());
        if prometheus.add_entry_points_labels {
            entry
                .command
                .push("--metrics.prometheus.addentrypointslabels=true".to_string());
        }
        if prometheus.add_services_labels {
            entry
                .command
                .push("--metrics.prometheus.addserviceslabels=true".to_string());
        }
    }

    entry.ports = if config.ports.is_empty() {
        dashboard_ports()
    } else {
        config.ports.clone()
    };

    for (key, value) in &config.labels {
        entry.labels.insert(key.clone(), value.clone());
    }

    entry.volumes.extend(config.volumes.iter().cloned());
    entry.environment.extend(
        config
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    if !environment.is_local() {
        harden(&mut entry);
    }

    entry
}

/// The fields every edge entry shares, before any path-specific
/// additions.
fn base_entry(image: String) -> ManifestService {
    let mut labels = IndexMap::new();
    // The edge never routes to itself through discovery.
    labels.insert("traefik.enable".to_string(), "false".to_string());

    ManifestService {
        image: Some(image),
        labels,
        networks: vec![
            "public".to_string(),
            "private".to_string(),
            "traefik".to_string(),
        ],
        restart: Some("always".to_string()),
        volumes: vec![DOCKER_SOCKET_MOUNT.to_string()],
        ..Default::default()
    }
}

fn default_args(stack: &Stack, environment: Environment) -> Vec<String> {
    let mut args = vec![
        "--providers.docker=true".to_string(),
        "--providers.docker.exposedbydefault=false".to_string(),
        "--entrypoints.web.address=:80".to_string(),
        "--entrypoints.websecure.address=:443".to_string(),
    ];

    if environment.is_local() {
        args.push("--api.dashboard=true".to_string());
        args.push("--api.insecure=true".to_string());
        args.push("--log.level=INFO".to_string());
    } else {
        args.push("--entrypoints.websecure.http.tls=true".to_string());
        args.push("--entrypoints.web.http.redirections.entrypoint.to=websecure".to_string());
        args.push("--entrypoints.web.http.redirections.entrypoint.scheme=https".to_string());
        args.push("--entrypoints.web.http.redirections.entrypoint.permanent=true".to_string());
    }

    args.push(format!(
        "--providers.docker.network={}_traefik",
        stack.project
    ));
    args.push("--global.checknewversion=false".to_string());
    args.push("--global.sendanonymoususage=false".to_string());

    if !environment.is_local() {
        args.push(
            "--entrypoints.websecure.transport.respondingtimeouts.readtimeout=60s".to_string(),
        );
        args.push(
            "--entrypoints.websecure.transport.respondingtimeouts.writetimeout=60s".to_string(),
        );
        args.push(
            "--entrypoints.websecure.transport.respondingtimeouts.idletimeout=180s".to_string(),
        );
    }

    args
}

fn middleware_args(name: &str, middleware: &EdgeMiddleware) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(add_prefix) = &middleware.add_prefix {
        args.push(format!(
            "--http.middlewares.{name}.addprefix.prefix={}",
            add_prefix.prefix
        ));
    }

    if let Some(strip_prefix) = &middleware.strip_prefix {
        for prefix in &strip_prefix.prefixes {
            args.push(format!(
                "--http.middlewares.{name}.stripprefix.prefixes={prefix}"
            ));
        }
        if strip_prefix.force_slash {
            args.push(format!(
                "--http.middlewares.{name}.stripprefix.forceslash=true"
            ));
        }
    }

    if let Some(replace) = &middleware.replace_path_regex {
        args.push(format!(
            "--http.middlewares.{name}.replacepathregex.regex={}",
            replace.regex
        ));
        args.push(format!(
            "--http.middlewares.{name}.replacepathregex.replacement={}",
            replace.replacement
        ));
    }

    if let Some(rate_limit) = &middleware.rate_limit {
        if rate_limit.average > 0 {
            args.push(format!(
                "--http.middlewares.{name}.ratelimit.average={}",
                rate_limit.average
            ));
        }
        if !rate_limit.period.is_empty() {
            args.push(format!(
                "--http.middlewares.{name}.ratelimit.period={}",
                rate_limit.period
            ));
        }
        if rate_limit.burst > 0 {
            args.push(format!(
                "--http.middlewares.{name}.ratelimit.burst={}",
                rate_limit.burst
            ));
        }
    }

    args
}

fn dashboard_ports() -> Vec<String> {
    vec![
        "80:80".to_string(),
        "443:443".to_string(),
        "8080:8080".to_string(),
    ]
}

fn harden(entry: &mut ManifestService) {
    entry.security_opt = vec!["no-new-privileges:true".to_string()];
    entry.read_only = Some(true);
    entry.tmpfs = vec!["/tmp:rw,noexec,nosuid,size=100m".to_string()];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Stack;

    fn stack(yaml: &str) -> Stack {
        Stack::from_yaml(yaml.as_bytes()).expect("parse")
    }

    #[test]
    fn local_defaults_expose_dashboard_without_tls() {
        let stack = stack("project: demo\ndomain: localhost\n");
        let entry = build(&stack, Environment::Local);

        assert_eq!(entry.image.as_deref(), Some("traefik:v3.5"));
        assert_eq!(entry.ports, vec!["80:80", "443:443", "8080:8080"]);
        assert!(entry.command.contains(&"--api.insecure=true".to_string()));
        assert!(entry.command.contains(&"--providers.docker.network=demo_traefik".to_string()));
        assert!(!entry
            .command
            .iter()
            .any(|arg| arg.contains("redirections")));
        assert!(!entry.command.iter().any(|arg| arg.contains("acme")));
        assert_eq!(entry.labels["traefik.enable"], "false");
        assert!(entry.security_opt.is_empty());
    }

    #[test]
    fn production_defaults_redirect_and_time_out() {
        let stack = stack("project: demo\ndomain: example.com\n");
        let entry = build(&stack, Environment::Production);

        assert_eq!(entry.ports, vec!["80:80", "443:443"]);
        assert!(entry
            .command
            .contains(&"--entrypoints.web.http.redirections.entrypoint.to=websecure".to_string()));
        assert!(entry.command.contains(
            &"--entrypoints.websecure.transport.respondingtimeouts.idletimeout=180s".to_string()
        ));
        assert!(!entry.command.iter().any(|arg| arg.contains("api.insecure")));

        assert_eq!(entry.security_opt, vec!["no-new-privileges:true"]);
        assert_eq!(entry.read_only, Some(true));
        let resources = entry.deploy.expect("deploy").resources.expect("resources");
        assert_eq!(resources.limits.expect("limits").memory.as_deref(), Some("512M"));
    }

    #[test]
    fn acme_http_challenge_fallback() {
        let stack = stack(
            "project: demo\ndomain: example.com\ntls:\n  mode: acme\n  email: ops@example.com\n",
        );
        let entry = build(&stack, Environment::Production);

        assert!(entry
            .command
            .contains(&"--certificatesresolvers.le.acme.email=ops@example.com".to_string()));
        assert!(entry
            .command
            .contains(&"--certificatesresolvers.le.acme.httpchallenge.entrypoint=web".to_string()));
        assert!(entry.volumes.contains(&ACME_VOLUME.to_string()));
    }

    #[test]
    fn acme_dns_challenge_with_provider_env() {
        let stack = stack(
            "project: demo\ndomain: example.com\ntls:\n  mode: acme\n  email: ops@example.com\n  dnsChallenge:\n    provider: cloudflare\n    env:\n      - CF_API_TOKEN=abc123\n",
        );
        let entry = build(&stack, Environment::Production);

        assert!(entry
            .command
            .contains(&"--certificatesresolvers.le.acme.dnschallenge.provider=cloudflare".to_string()));
        assert!(!entry
            .command
            .iter()
            .any(|arg| arg.contains("httpchallenge")));
        assert_eq!(entry.environment["CF_API_TOKEN"], "abc123");
    }

    #[test]
    fn acme_skipped_in_local_runs() {
        let stack = stack(
            "project: demo\ndomain: localhost\ntls:\n  mode: acme\n  email: ops@example.com\n",
        );
        let entry = build(&stack, Environment::Local);

        assert!(!entry.command.iter().any(|arg| arg.contains("acme")));
        assert!(!entry.volumes.contains(&ACME_VOLUME.to_string()));
    }

    #[test]
    fn custom_commands_replace_defaults_without_acme() {
        let stack = stack(
            "project: demo\ndomain: example.com\ntls:\n  mode: acme\n  email: ops@example.com\ntraefik:\n  image: traefik:v3.6\n  commands:\n    - \"--providers.docker=true\"\n  ports:\n    - \"8443:443\"\n  labels:\n    custom.label: \"yes\"\n",
        );
        let entry = build(&stack, Environment::Production);

        assert_eq!(entry.image.as_deref(), Some("traefik:v3.6"));
        assert_eq!(entry.command, vec!["--providers.docker=true"]);
        assert_eq!(entry.ports, vec!["8443:443"]);
        assert_eq!(entry.labels["traefik.enable"], "false");
        assert_eq!(entry.labels["custom.label"], "yes");
        assert!(!entry.command.iter().any(|arg| arg.contains("acme")));
    }

    #[test]
    fn custom_extras_appended_to_default_commands() {
        let stack = stack(
            "project: demo\ndomain: localhost\ntraefik:\n  entrypoints:\n    metrics:\n      address: \":9100\"\n      asDefault: true\n  plugins:\n    geoblock:\n      moduleName: github.com/acme/geoblock\n      version: v1.2.0\n  middlewares:\n    api-prefix:\n      stripPrefix:\n        prefixes: [/api]\n        forceSlash: true\n  metrics:\n    prometheus:\n      addEntryPointsLabels: true\n",
        );
        let entry = build(&stack, Environment::Local);

        assert!(entry.command.contains(&"--providers.docker=true".to_string()));
        assert!(entry
            .command
            .contains(&"--entrypoints.metrics.address=:9100".to_string()));
        assert!(entry
            .command
            .contains(&"--entrypoints.metrics.asDefault=true".to_string()));
        assert!(entry
            .command
            .contains(&"--experimental.plugins.geoblock.modulename=github.com/acme/geoblock".to_string()));
        assert!(entry
            .command
            .contains(&"--experimental.plugins.geoblock.version=v1.2.0".to_string()));
        assert!(entry
            .command
            .contains(&"--http.middlewares.api-prefix.stripprefix.prefixes=/api".to_string()));
        assert!(entry
            .command
            .contains(&"--http.middlewares.api-prefix.stripprefix.forceslash=true".to_string()));
        assert!(entry.command.contains(&"--metrics.prometheus=true".to_string()));
        assert!(entry
            .command
            .contains(&"--metrics.prometheus.addentrypointslabels=true".to_string()));
    }
}
