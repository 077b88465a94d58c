//! Declarative stack descriptions compiled to container manifests.
//!
//! Slipway reads a YAML stack file (project, domain, TLS policy,
//! services, observability add-ons) and generates a complete
//! docker-compose manifest: services, networks, volumes, secrets,
//! and the Traefik routing labels needed to expose each service
//! safely. One description, two targets: plain-HTTP local runs and
//! hardened TLS production deployments.
//!
//! # Overview
//!
//! Generation is a pure pipeline over a parsed [`Stack`]:
//!
//! 1. **Parse** — [`Stack::from_yaml`] reads the description and
//!    fills in defaults (add-on subdomains and volumes, TLS
//!    resolver).
//! 2. **Validate** — [`validate::validate`] collects every
//!    structural problem in one pass.
//! 3. **Generate** — [`generate::manifest`] resolves the
//!    [`Environment`], builds each service entry with its routing
//!    labels, adds the edge proxy and the enabled observability
//!    add-ons, and collects networks, volumes, and secrets.
//! 4. **Serialize** — [`Manifest::to_yaml`] emits the document in
//!    one deterministic pass.
//!
//! # Example
//!
//! ```
//! use slipway::generate::{self, GenerateOptions};
//! use slipway::Stack;
//!
//! fn main() -> anyhow::Result<()> {
//!     let stack = Stack::from_yaml(
//!         b"project: demo
//! domain: localhost
//! services:
//!   - name: web
//!     image: nginx:alpine
//!     expose: 80
//!     traefik: true
//! ",
//!     )?;
//!
//!     let yaml = generate::render(&stack, &GenerateOptions::default())?;
//!     assert!(yaml.contains("Host(`web.localhost`)"));
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// manifest-generation crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod edge;
pub mod environment;
pub mod error;
pub mod fs;
pub mod generate;
pub mod labels;
pub mod manifest;
pub mod observability;
pub mod service;
pub mod stack;
pub mod strategy;
pub mod topology;
pub mod validate;

pub use cli::Cli;
pub use environment::Environment;
pub use error::{Error, Problem, Result};
pub use generate::GenerateOptions;
pub use manifest::Manifest;
pub use stack::Stack;
