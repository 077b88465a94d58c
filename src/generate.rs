//! Manifest generation: the single pipeline from a parsed stack to
//! YAML text.

use tracing::debug;

use crate::environment::Environment;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::stack::Stack;
use crate::{edge, observability, service, topology};

/// Feature kill switches applied at generation time. Either flag
/// fully suppresses the corresponding add-on, regardless of the
/// stack's own enabled flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub disable_log_viewer: bool,
    pub disable_monitoring: bool,
}

/// Build the full manifest for a stack.
#[must_use]
pub fn manifest(stack: &Stack, options: &GenerateOptions) -> Manifest {
    let environment = Environment::resolve(stack);
    debug!(project = %stack.project, ?environment, "generating manifest");

    let mut output = Manifest::new();

    output.networks = topology::networks(&stack.networks);
    topology::ensure_proxy_network(&mut output.networks);

    output.volumes = topology::volumes(&stack.volumes);

    let ctx = service::ServiceContext {
        domain: &stack.domain,
        project: &stack.project,
        environment,
        tls: &stack.tls,
    };
    for declared in &stack.services {
        debug!(service = %declared.name, routed = declared.proxied(), "building service");
        output
            .services
            .insert(declared.name.clone(), service::build(declared, &ctx));
    }

    output
        .services
        .insert("traefik".to_string(), edge::build(stack, environment));

    observability::build(stack, environment, options, &mut output.services);

    output.secrets = topology::collect_secrets(&stack.services);

    output
}

/// Generate the manifest and serialize it in one step.
pub fn render(stack: &Stack, options: &GenerateOptions) -> Result<String> {
    manifest(stack, options).to_yaml()
}
