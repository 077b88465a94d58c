//! Stack validation, run before generation. Problems are collected
//! rather than short-circuited so one pass reports everything.

use std::collections::HashSet;

use crate::error::{Error, Problem, Result};
use crate::stack::{Service, Stack, Tls, TlsMode};

/// Check a stack for structural and conflicting declarations.
pub fn validate(stack: &Stack) -> Result<()> {
    let mut problems = Vec::new();

    if stack.version != 1 {
        problems.push(Problem::stack("version", "must be 1"));
    }
    if stack.project.is_empty() {
        problems.push(Problem::stack("project", "must not be empty"));
    }
    if stack.domain.is_empty() {
        problems.push(Problem::stack("domain", "must not be empty"));
    }

    check_tls(&stack.tls, &mut problems);

    // Services attach to these two by name; the generator does not
    // invent them.
    for required in ["public", "private"] {
        if !stack.networks.contains_key(required) {
            problems.push(Problem::stack(
                "networks",
                format!("network '{required}' must be declared"),
            ));
        }
    }

    if stack.services.is_empty() {
        problems.push(Problem::stack("services", "declare at least one service"));
    }

    let mut seen = HashSet::new();
    for service in &stack.services {
        if service.name.is_empty() {
            problems.push(Problem::stack("services", "service name must not be empty"));
            continue;
        }
        if !seen.insert(service.name.as_str()) {
            problems.push(Problem::service(
                &service.name,
                "name",
                "duplicate service name",
            ));
        }
        check_service(service, &mut problems);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidStack(problems))
    }
}

fn check_tls(tls: &Tls, problems: &mut Vec<Problem>) {
    if tls.mode == TlsMode::Acme && tls.email.is_empty() {
        problems.push(Problem::stack("tls.email", "required when tls.mode is acme"));
    }
}

fn check_service(service: &Service, problems: &mut Vec<Problem>) {
    let name = &service.name;

    match (&service.image, &service.build) {
        (None, None) => {
            problems.push(Problem::service(name, "image", "set image or build"));
        }
        (Some(_), Some(_)) => {
            problems.push(Problem::service(
                name,
                "image",
                "image and build are mutually exclusive",
            ));
        }
        _ => {}
    }

    // Portless workers are fine, but a routed service needs a port
    // for the proxy to forward to.
    if service.proxied() && service.expose == 0 {
        problems.push(Problem::service(
            name,
            "expose",
            "required when routing is enabled",
        ));
    }

    for mount in &service.volumes {
        if mount.source.is_empty() || mount.target.is_empty() {
            problems.push(Problem::service(
                name,
                "volumes",
                "mount needs both source and target",
            ));
        }
    }

    for secret in &service.secrets {
        if secret.name.is_empty() {
            problems.push(Problem::service(name, "secrets", "secret name is required"));
        } else if !secret.external && secret.file.is_empty() {
            problems.push(Problem::service(
                name,
                "secrets",
                format!("secret '{}' needs 'file' or 'external: true'", secret.name),
            ));
        }
    }

    if let Some(auth) = service.basic_auth.as_ref().filter(|a| a.enabled) {
        let legacy = !auth.username.is_empty() && !auth.password.is_empty();
        if !legacy && auth.users.is_empty() && auth.users_file.is_empty() {
            problems.push(Problem::service(
                name,
                "basic_auth",
                "enabled basic_auth needs credentials ('users', 'users_file', or username/password)",
            ));
        }
    }

    if let Some(resources) = &service.resources {
        if !resources.memory.is_empty() && !valid_memory(&resources.memory) {
            problems.push(Problem::service(
                name,
                "resources.memory",
                format!("invalid memory value '{}' (use e.g. 512m, 1g)", resources.memory),
            ));
        }
        if !resources.cpus.is_empty() && resources.cpus.parse::<f64>().is_err() {
            problems.push(Problem::service(
                name,
                "resources.cpus",
                format!("invalid cpu value '{}'", resources.cpus),
            ));
        }
    }
}

fn valid_memory(memory: &str) -> bool {
    // Suffix match, never a byte split: the value is user input and
    // may end in a multi-byte character.
    ["m", "M", "g", "G"]
        .into_iter()
        .find_map(|unit| memory.strip_suffix(unit))
        .is_some_and(|amount| !amount.is_empty() && amount.parse::<u64>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems(yaml: &str) -> Vec<String> {
        let stack = Stack::from_yaml(yaml.as_bytes()).expect("parse");
        match validate(&stack) {
            Ok(()) => Vec::new(),
            Err(Error::InvalidStack(problems)) => {
                problems.iter().map(ToString::to_string).collect()
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    const VALID: &str = "project: demo\ndomain: example.com\nnetworks:\n  public: {}\n  private:\n    internal: true\nservices:\n  - name: web\n    image: nginx:alpine\n    expose: 80\n";

    #[test]
    fn valid_stack_passes() {
        assert!(problems(VALID).is_empty());
    }

    #[test]
    fn missing_basics_all_reported() {
        let report = problems("project: \"\"\ndomain: \"\"\n");

        assert!(report.iter().any(|p| p.contains("project")));
        assert!(report.iter().any(|p| p.contains("domain")));
        assert!(report.iter().any(|p| p.contains("public")));
        assert!(report.iter().any(|p| p.contains("at least one service")));
    }

    #[test]
    fn acme_requires_email() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\ntls:\n  mode: acme\nservices:\n  - name: web\n    image: a:1\n    expose: 80\n",
        );
        assert!(report.iter().any(|p| p.contains("tls.email")));
    }

    #[test]
    fn image_build_conflicts() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\nservices:\n  - name: a\n    expose: 80\n  - name: b\n    image: b:1\n    build:\n      context: .\n    expose: 81\n",
        );

        assert!(report.iter().any(|p| p.contains("a") && p.contains("set image or build")));
        assert!(report.iter().any(|p| p.contains("b") && p.contains("mutually exclusive")));
    }

    #[test]
    fn duplicate_names_rejected() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\nservices:\n  - name: web\n    image: a:1\n    expose: 80\n  - name: web\n    image: b:1\n    expose: 81\n",
        );
        assert!(report.iter().any(|p| p.contains("duplicate")));
    }

    #[test]
    fn routed_service_needs_a_port() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\nservices:\n  - name: web\n    image: a:1\n    traefik: true\n",
        );
        assert!(report.iter().any(|p| p.contains("expose")));
    }

    #[test]
    fn portless_worker_is_fine() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\nservices:\n  - name: worker\n    image: a:1\n",
        );
        assert!(report.is_empty());
    }

    #[test]
    fn secret_needs_file_or_external() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\nservices:\n  - name: web\n    image: a:1\n    expose: 80\n    secrets:\n      - name: db_password\n",
        );
        assert!(report.iter().any(|p| p.contains("db_password")));
    }

    #[test]
    fn enabled_basic_auth_needs_credentials() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\nservices:\n  - name: web\n    image: a:1\n    expose: 80\n    basic_auth:\n      enabled: true\n",
        );
        assert!(report.iter().any(|p| p.contains("basic_auth")));
    }

    #[test]
    fn resource_formats_checked() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\nservices:\n  - name: web\n    image: a:1\n    expose: 80\n    resources:\n      memory: lots\n      cpus: many\n",
        );

        assert!(report.iter().any(|p| p.contains("resources.memory")));
        assert!(report.iter().any(|p| p.contains("resources.cpus")));
    }

    #[test]
    fn memory_units() {
        assert!(valid_memory("512m"));
        assert!(valid_memory("2048M"));
        assert!(valid_memory("1g"));
        assert!(valid_memory("4G"));
        assert!(!valid_memory("512"));
        assert!(!valid_memory("m"));
        assert!(!valid_memory("1.5g"));
        assert!(!valid_memory("1¢"));
        assert!(!valid_memory("¢"));
    }

    #[test]
    fn non_ascii_memory_is_reported_not_fatal() {
        let report = problems(
            "project: p\ndomain: d.com\nnetworks:\n  public: {}\n  private: {}\nservices:\n  - name: web\n    image: a:1\n    expose: 80\n    resources:\n      memory: \"1¢\"\n",
        );
        assert!(report.iter().any(|p| p.contains("resources.memory")));
    }
}
