//! Command-line interface: scaffold, validate, and render stacks.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::fs::FileStore;
use crate::generate::{self, GenerateOptions};
use crate::stack::{BasicAuth, Network, Observability, Stack, Tls, TlsMode, Volume};
use crate::validate;

#[derive(Parser)]
#[command(name = "slipway")]
#[command(about = "Stack description to container manifest generator")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new stack file
    Init {
        /// Project name
        project: String,

        /// Deployment domain
        #[arg(long)]
        domain: String,

        /// Contact email for certificate issuance
        #[arg(long)]
        email: Option<String>,

        /// Force the environment instead of inferring it
        #[arg(long)]
        environment: Option<String>,

        /// Output path
        #[arg(long, default_value = "stack.yml")]
        file: PathBuf,

        /// Skip the log-viewer add-on
        #[arg(long)]
        no_log_viewer: bool,

        /// Skip the monitoring add-on
        #[arg(long)]
        no_monitoring: bool,

        /// Protect the log viewer with basic auth (user:hash)
        #[arg(long, value_name = "USER:HASH")]
        log_viewer_auth: Option<String>,
    },

    /// Check a stack file for problems
    Validate {
        /// Stack file to check
        #[arg(long, default_value = "stack.yml")]
        file: PathBuf,

        /// Base stack to merge onto before checking
        #[arg(long)]
        base: Option<PathBuf>,
    },

    /// Generate the manifest from a stack file
    Render {
        /// Stack file to render
        #[arg(long, default_value = "stack.yml")]
        file: PathBuf,

        /// Base stack to merge onto before rendering
        #[arg(long)]
        base: Option<PathBuf>,

        /// Write the manifest here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Suppress the log-viewer entry
        #[arg(long)]
        no_log_viewer: bool,

        /// Suppress the monitoring entries
        #[arg(long)]
        no_monitoring: bool,
    },
}

impl Cli {
    /// Dispatch the parsed command.
    pub fn run(&self, fs: &impl FileStore) -> Result<()> {
        match &self.command {
            Command::Init {
                project,
                domain,
                email,
                environment,
                file,
                no_log_viewer,
                no_monitoring,
                log_viewer_auth,
            } => cmd_init(
                fs,
                file,
                &InitOptions {
                    project: project.clone(),
                    domain: domain.clone(),
                    email: email.clone(),
                    environment: environment.clone(),
                    log_viewer: !no_log_viewer,
                    monitoring: !no_monitoring,
                    log_viewer_auth: log_viewer_auth.clone(),
                },
            ),
            Command::Validate { file, base } => cmd_validate(fs, file, base.as_deref()),
            Command::Render {
                file,
                base,
                output,
                no_log_viewer,
                no_monitoring,
            } => cmd_render(
                fs,
                file,
                base.as_deref(),
                output.as_deref(),
                &GenerateOptions {
                    disable_log_viewer: *no_log_viewer,
                    disable_monitoring: *no_monitoring,
                },
            ),
        }
    }
}

/// Settings for a freshly scaffolded stack.
pub struct InitOptions {
    pub project: String,
    pub domain: String,
    pub email: Option<String>,
    pub environment: Option<String>,
    pub log_viewer: bool,
    pub monitoring: bool,
    /// `user:hash` credential pair for the log viewer.
    pub log_viewer_auth: Option<String>,
}

fn cmd_init(fs: &impl FileStore, path: &Path, options: &InitOptions) -> Result<()> {
    if fs.exists(path) {
        return Err(Error::AlreadyExists(path.display().to_string()));
    }

    let stack = scaffold(options);
    let yaml = serde_yaml::to_string(&stack).map_err(Error::SerializeManifest)?;
    fs.write(path, yaml.as_bytes())?;

    eprintln!("Created {}", path.display());
    eprintln!("Add services, then run:");
    eprintln!("  slipway render --file {}", path.display());
    Ok(())
}

/// Build the starter stack: both networks, the add-on volumes, TLS
/// wired per environment, no services yet.
#[must_use]
pub fn scaffold(options: &InitOptions) -> Stack {
    let environment = options.environment.clone().unwrap_or_else(|| {
        if local_domain(&options.domain) {
            "local".to_string()
        } else {
            "production".to_string()
        }
    });

    let tls = if environment == "local" {
        Tls::default()
    } else {
        Tls {
            mode: TlsMode::Acme,
            email: options.email.clone().unwrap_or_default(),
            resolver: "le".to_string(),
            dns: None,
        }
    };

    let mut networks = IndexMap::new();
    networks.insert("private".to_string(), Network { internal: true });
    networks.insert("public".to_string(), Network { internal: false });

    let mut stack = Stack {
        version: 1,
        project: options.project.clone(),
        domain: options.domain.clone(),
        environment: Some(environment),
        tls,
        edge: None,
        observability: Observability::default(),
        networks,
        volumes: vec![
            Volume {
                name: "traefik_acme".to_string(),
            },
            Volume {
                name: "dozzle_data".to_string(),
            },
            Volume {
                name: "beszel_data".to_string(),
            },
            Volume {
                name: "beszel_socket".to_string(),
            },
        ],
        services: Vec::new(),
    };

    stack.observability.log_viewer.enabled = options.log_viewer;
    stack.observability.monitoring.enabled = options.monitoring;

    let credential = options
        .log_viewer_auth
        .as_deref()
        .filter(|_| options.log_viewer)
        .and_then(|pair| pair.split_once(':'));
    if let Some((username, password)) = credential {
        stack.observability.log_viewer.basic_auth = Some(BasicAuth {
            enabled: true,
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        });
    }

    stack.apply_defaults();
    stack
}

fn local_domain(domain: &str) -> bool {
    domain == "localhost" || domain.ends_with(".local") || domain.ends_with(".localhost")
}

fn load_stack(fs: &impl FileStore, path: &Path, base: Option<&Path>) -> Result<Stack> {
    let stack = Stack::from_yaml(&fs.load(path)?)?;

    match base {
        Some(base_path) => {
            let base = Stack::from_yaml(&fs.load(base_path)?)?;
            Ok(stack.merge_onto_base(&base))
        }
        None => Ok(stack),
    }
}

fn cmd_validate(fs: &impl FileStore, path: &Path, base: Option<&Path>) -> Result<()> {
    let stack = load_stack(fs, path, base)?;
    validate::validate(&stack)?;

    eprintln!(
        "{}: ok ({} services)",
        path.display(),
        stack.services.len()
    );
    Ok(())
}

fn cmd_render(
    fs: &impl FileStore,
    path: &Path,
    base: Option<&Path>,
    output: Option<&Path>,
    options: &GenerateOptions,
) -> Result<()> {
    let stack = load_stack(fs, path, base)?;
    validate::validate(&stack)?;

    let yaml = generate::render(&stack, options)?;

    match output {
        Some(output_path) => {
            fs.write(output_path, yaml.as_bytes())?;
            eprintln!("Wrote {}", output_path.display());
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
