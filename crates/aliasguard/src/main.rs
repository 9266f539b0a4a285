//! `aliasguard` - self-verifying email aliases
//!
//! Mints aliases, manages the sender allow-list, and files inbound mail
//! into a verified or a failed-validation folder.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod imap;
mod logging;
mod spool;

use std::path::{Path, PathBuf};

use aliasguard_core::{
    AddressValidator, AliasCodec, AllowList, AllowListRepository, Checks, Classification, Config,
    DecisionEngine, DnsValidator, MailboxTransport, Monitor,
};
use aliasguard_mime::{HeaderExtractor, ParsedHeaders};
use anyhow::{Context, bail};
use clap::Parser;
use serde::Serialize;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use cli::{Cli, Command};
use imap::ImapTransport;
use spool::SpoolTransport;

/// Per-message diagnostics printed by `classify --json`.
#[derive(Serialize)]
struct ClassifyReport<'a> {
    classification: Classification,
    folder: &'a str,
    checks: Checks,
    headers: &'a ParsedHeaders,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            config_path.display()
        )
    })?;

    match cli.command {
        Command::Generate { domain, own_domain } => {
            generate(&config, &domain, own_domain.as_deref()).await?;
        }
        Command::Verify { alias } => verify(&config, &alias)?,
        Command::Allow { alias, domain } => {
            let repo = open_allow_list(&config).await?;
            let entry = repo.register(&alias, &domain).await?;
            println!("Allowed {} for {}", entry.domain, entry.alias);
        }
        Command::Allowed { alias } => {
            let repo = open_allow_list(&config).await?;
            for domain in repo.permitted_domains(&alias).await? {
                println!("{domain}");
            }
        }
        Command::Classify { file, json } => classify(&config, file.as_deref(), json).await?,
        Command::Watch => watch(&config).await?,
    }

    Ok(())
}

async fn generate(config: &Config, domain: &str, own_domain: Option<&str>) -> anyhow::Result<()> {
    let own_domain = own_domain.unwrap_or_else(|| config.primary_domain());
    if !config
        .user
        .own_domains
        .iter()
        .any(|d| d.eq_ignore_ascii_case(own_domain))
    {
        bail!("{own_domain} is not one of the configured own domains");
    }

    let codec = AliasCodec::new(config.shared_key()?, own_domain);
    let generated = codec.generate(domain)?;

    // The alias is printed either way; a resolver problem must not block minting.
    let validator = DnsValidator::system(config.validation.dns_timeout());
    if let Err(e) = validator.validate(&generated.alias).await {
        error!(alias = %generated.alias, error = %e, "Generated alias failed address validation");
    }

    println!("{}", generated.alias);
    Ok(())
}

fn verify(config: &Config, alias: &str) -> anyhow::Result<()> {
    let codec = AliasCodec::new(config.shared_key()?, config.primary_domain());
    let result = codec.extract(alias);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn classify(config: &Config, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let bytes = match file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut tokio::io::stdin(), &mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };
    let raw = String::from_utf8_lossy(&bytes);

    let headers = HeaderExtractor::new(&config.user.own_domains).extract(&raw);
    let engine = decision_engine(config).await?;
    let checks = engine.evaluate(&headers).await;
    let classification = checks.classify();
    let folders = config.target_folders();
    let folder = folders.for_classification(classification);

    if json {
        let report = ClassifyReport {
            classification,
            folder,
            checks,
            headers: &headers,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{folder}");
    }
    Ok(())
}

async fn watch(config: &Config) -> anyhow::Result<()> {
    if let Some(imap) = &config.imap {
        info!(
            host = %imap.host,
            port = imap.port,
            mailbox = %imap.mailbox,
            "Watching IMAP mailbox"
        );
        return run_monitor(config, ImapTransport::new(imap.clone())).await;
    }

    if let Some(spool) = &config.spool {
        info!(
            root = %spool.root.display(),
            mailbox = %spool.mailbox,
            "Watching spool"
        );
        let transport = SpoolTransport::new(&spool.root, &spool.mailbox, spool.poll_interval());
        return run_monitor(config, transport).await;
    }

    bail!("The watch command needs an [imap] or a [spool] section in the configuration");
}

async fn run_monitor<T: MailboxTransport>(config: &Config, transport: T) -> anyhow::Result<()> {
    let mut monitor = Monitor::new(
        transport,
        decision_engine(config).await?,
        HeaderExtractor::new(&config.user.own_domains),
        config.target_folders(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    monitor.run(shutdown_rx).await?;
    info!("Shutdown complete");
    Ok(())
}

async fn decision_engine(
    config: &Config,
) -> anyhow::Result<DecisionEngine<AllowListRepository, DnsValidator>> {
    let codec = AliasCodec::new(config.shared_key()?, config.primary_domain());
    let validator = DnsValidator::system(config.validation.dns_timeout());
    Ok(DecisionEngine::with_validator(
        codec,
        open_allow_list(config).await?,
        validator,
    ))
}

async fn open_allow_list(config: &Config) -> anyhow::Result<AllowListRepository> {
    let path = match &config.database.path {
        Some(path) => path.clone(),
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aliasguard")
            .join("aliasguard.db"),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let url_path = path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    AllowListRepository::new(url_path)
        .await
        .with_context(|| format!("Failed to open allow-list database {url_path}"))
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aliasguard")
        .join("config.toml")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal");
}
