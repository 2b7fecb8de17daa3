//! driftlog-confcheck - DriftLog node configuration checker
//!
//! Parses the full node configuration surface, runs it through the settings
//! validator, and either prints the effective settings or reports the first
//! violation and exits nonzero. Operators run this before letting a node
//! join the cluster.

use anyhow::Context;
use clap::Parser;
use driftlog_settings::{ClusterNodeSettings, InstanceId};
use rustls::pki_types::CertificateDer;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod providers;

use config::Config;
use providers::{InternalAuthenticationFactory, InternalAuthorizationFactory};

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("driftlog_confcheck=info".parse().unwrap()),
        )
        .init();

    let config = Config::parse();

    info!(
        "driftlog-confcheck v{} - DriftLog node configuration checker",
        env!("CARGO_PKG_VERSION")
    );

    match check(config) {
        Ok(settings) => {
            info!("configuration valid");
            print!("{settings}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("configuration rejected: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn check(config: Config) -> anyhow::Result<ClusterNodeSettings> {
    let instance_id = match config.instance_id {
        Some(id) => id,
        None => {
            let id = InstanceId::generate();
            info!("minted instance id {id}");
            id
        }
    };

    let certificate = config
        .certificate_file
        .as_deref()
        .map(load_certificate)
        .transpose()?;
    let trusted_root_certs = if config.trusted_root_cert_files.is_empty() {
        None
    } else {
        Some(
            config
                .trusted_root_cert_files
                .iter()
                .map(|p| load_certificate(p))
                .collect::<anyhow::Result<Vec<_>>>()?,
        )
    };

    let options = config.into_options(instance_id, certificate, trusted_root_certs);
    let settings = options.build(
        Arc::new(InternalAuthenticationFactory),
        Arc::new(InternalAuthorizationFactory),
    )?;
    Ok(settings)
}

fn load_certificate(path: &Path) -> anyhow::Result<CertificateDer<'static>> {
    let der = std::fs::read(path)
        .with_context(|| format!("reading certificate {}", path.display()))?;
    Ok(CertificateDer::from(der))
}
