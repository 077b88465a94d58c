//! Built-in observability add-ons: log viewer plus monitoring hub
//! and agent.

use crate::environment::Environment;
use crate::generate::GenerateOptions;
use crate::labels::{self, RouterLabels};
use crate::manifest::ManifestService;
use crate::stack::{Stack, TlsMode};

const LOG_VIEWER_IMAGE: &str = "amir20/dozzle:latest";
const HUB_IMAGE: &str = "henrygd/beszel:latest";
const AGENT_IMAGE: &str = "henrygd/beszel-agent:latest";

const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";
const HUB_PORT: &str = "8090";

// The agent refuses the hub until real credentials replace these, but
// generation still succeeds.
const PLACEHOLDER_TOKEN: &str = "CONFIGURE_TOKEN_IN_BESZEL_CONFIG";
const PLACEHOLDER_KEY: &str = "CONFIGURE_HUB_KEY_IN_BESZEL_CONFIG";

/// Build the enabled add-on entries, honoring the generation options'
/// kill switches.
pub fn build(
    stack: &Stack,
    environment: Environment,
    options: &GenerateOptions,
    services: &mut indexmap::IndexMap<String, ManifestService>,
) {
    if stack.observability.log_viewer.enabled && !options.disable_log_viewer {
        services.insert("dozzle".to_string(), log_viewer(stack, environment));
    }

    if stack.observability.monitoring.enabled && !options.disable_monitoring {
        services.insert("beszel-hub".to_string(), monitoring_hub(stack, environment));
        services.insert("beszel-agent".to_string(), monitoring_agent(stack));
    }
}

fn docker_socket(stack: &Stack) -> &str {
    stack
        .observability
        .docker_socket
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_DOCKER_SOCKET)
}

fn log_viewer(stack: &Stack, environment: Environment) -> ManifestService {
    let config = &stack.observability.log_viewer;

    let mut router = RouterLabels::new("dozzle", &format!("{}_traefik", stack.project));
    router.server_port(8080);
    router.rule(&format!("Host(`{}.{}`)", config.subdomain, stack.domain));
    router.entry_points(&[environment.entry_point().to_string()]);

    if !environment.is_local() && stack.tls.mode != TlsMode::Disabled {
        router.tls();
        if stack.tls.mode == TlsMode::Acme {
            router.cert_resolver(&stack.tls.resolver);
        }
    }

    if let Some(auth) = config.basic_auth.as_ref().filter(|a| a.enabled) {
        let users = labels::basic_auth_users(auth);
        if !users.is_empty() {
            router.basic_auth_middleware("dozzle-auth", &users);
        }
        if !auth.users_file.is_empty() {
            router.basic_auth_users_file("dozzle-auth", &auth.users_file);
        }
        router.middlewares(&["dozzle-auth".to_string()]);
    }

    let mut entry = ManifestService {
        container_name: Some("dozzle".to_string()),
        image: Some(LOG_VIEWER_IMAGE.to_string()),
        volumes: vec![
            format!("{}:/var/run/docker.sock:ro", docker_socket(stack)),
            format!("{}:/data", config.data_volume),
        ],
        networks: vec!["private".to_string(), "traefik".to_string()],
        restart: Some("unless-stopped".to_string()),
        labels: router.finish(),
        ..Default::default()
    };

    entry
        .environment
        .insert("DOZZLE_LEVEL".to_string(), "info".to_string());
    entry
        .environment
        .insert("DOZZLE_TAILSIZE".to_string(), "300".to_string());

    entry
}

/// The hub performs its own login, so no proxy-level basic auth is
/// ever attached; stacking both would lock users out.
fn monitoring_hub(stack: &Stack, environment: Environment) -> ManifestService {
    let config = &stack.observability.monitoring;
    let host = format!("{}.{}", config.subdomain, stack.domain);

    let mut router = RouterLabels::new("beszel-hub", &format!("{}_traefik", stack.project));
    router.server_port(8090);
    router.rule(&format!("Host(`{host}`)"));

    if environment.is_local() {
        router.entry_points(&[environment.entry_point().to_string()]);
    } else {
        // Serve both entry points so the agent's plain-HTTP hub URL
        // keeps working alongside the browser UI.
        router.entry_points(&["web".to_string(), "websecure".to_string()]);
        if stack.tls.mode != TlsMode::Disabled {
            router.tls();
            if stack.tls.mode == TlsMode::Acme {
                router.cert_resolver(&stack.tls.resolver);
            }
            router.tls_domain(&host);
        }
    }

    let mut entry = ManifestService {
        container_name: Some("beszel-hub".to_string()),
        image: Some(HUB_IMAGE.to_string()),
        volumes: vec![
            format!("{}:/beszel_data", config.data_volume),
            format!("{}:/beszel_socket", config.socket_volume),
        ],
        networks: vec!["private".to_string(), "traefik".to_string()],
        restart: Some("unless-stopped".to_string()),
        labels: router.finish(),
        ..Default::default()
    };

    entry
        .environment
        .insert("PORT".to_string(), HUB_PORT.to_string());
    if config.user_creation {
        entry
            .environment
            .insert("USER_CREATION".to_string(), "true".to_string());
    }

    entry
}

/// Host-network agent feeding the hub over the shared trust socket.
fn monitoring_agent(stack: &Stack) -> ManifestService {
    let config = &stack.observability.monitoring;

    let mut entry = ManifestService {
        container_name: Some("beszel-agent".to_string()),
        image: Some(AGENT_IMAGE.to_string()),
        volumes: vec![
            format!("{}:/var/run/docker.sock:ro", docker_socket(stack)),
            format!("{}:/beszel_socket", config.socket_volume),
            "./beszel_agent_data:/var/lib/beszel-agent".to_string(),
        ],
        // Host networking for host-level network statistics.
        network_mode: Some("host".to_string()),
        restart: Some("unless-stopped".to_string()),
        // Root for docker-socket access, but never privileged.
        user: Some("0".to_string()),
        privileged: Some(false),
        security_opt: vec!["no-new-privileges:true".to_string()],
        ..Default::default()
    };

    entry.environment.insert(
        "LISTEN".to_string(),
        "/beszel_socket/beszel.sock".to_string(),
    );
    entry.environment.insert(
        "HUB_URL".to_string(),
        if config.app_url.is_empty() {
            format!("http://beszel-hub:{HUB_PORT}")
        } else {
            config.app_url.clone()
        },
    );
    entry.environment.insert(
        "TOKEN".to_string(),
        if config.token.is_empty() {
            PLACEHOLDER_TOKEN.to_string()
        } else {
            config.token.clone()
        },
    );
    entry.environment.insert(
        "KEY".to_string(),
        if config.public_key.is_empty() {
            PLACEHOLDER_KEY.to_string()
        } else {
            config.public_key.clone()
        },
    );

    entry
}
