use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pledge_ledger::{DeploymentConfig, LedgerSnapshot};
use pledge_storage::StorageConfig;
use pledge_types::{AdminId, AdminKind, Amount};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindFilter {
    Giver,
    Delegate,
    Project,
}

impl From<KindFilter> for AdminKind {
    fn from(kind: KindFilter) -> Self {
        match kind {
            KindFilter::Giver => AdminKind::Giver,
            KindFilter::Delegate => AdminKind::Delegate,
            KindFilter::Project => AdminKind::Project,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pledgectl", version, about = "Inspect a persisted pledge ledger store")]
struct Cli {
    /// JSON store file written by the ledger.
    #[arg(long, env = "PLEDGE_STORE")]
    store: Option<PathBuf>,
    /// Deployment config; its storage section is used when --store is absent.
    #[arg(long, env = "PLEDGE_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered admins.
    Admins {
        #[arg(long, value_enum)]
        kind: Option<KindFilter>,
    },
    /// List pledges, optionally only those owned by one admin.
    Pledges {
        #[arg(long)]
        owner: Option<u64>,
    },
    /// Record counts, the total pledged, and what the vault holds.
    Summary,
}

#[derive(Debug, Serialize)]
struct Summary {
    backend: &'static str,
    admins: usize,
    givers: usize,
    delegates: usize,
    projects: usize,
    pledges: usize,
    total_pledged: Amount,
    /// Absent when the store has no vault record
    vault_balance: Option<Amount>,
}

impl Summary {
    fn from_snapshot(backend: &'static str, snapshot: &LedgerSnapshot) -> anyhow::Result<Self> {
        let count_kind = |kind: AdminKind| snapshot.admins.iter().filter(|a| a.kind == kind).count();
        Ok(Self {
            backend,
            admins: snapshot.admins.len(),
            givers: count_kind(AdminKind::Giver),
            delegates: count_kind(AdminKind::Delegate),
            projects: count_kind(AdminKind::Project),
            pledges: snapshot.pledges.len(),
            total_pledged: snapshot.total_pledged().context("summing pledges")?,
            vault_balance: snapshot.custodied(),
        })
    }
}

fn resolve_storage(cli: &Cli) -> anyhow::Result<StorageConfig> {
    if let Some(path) = &cli.store {
        return Ok(StorageConfig::json_file(path.clone()));
    }

    let config_path = cli
        .config
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("either --store/PLEDGE_STORE or --config/PLEDGE_CONFIG is required"))?;
    let config = DeploymentConfig::from_json_file(config_path)
        .with_context(|| format!("loading deployment config {}", config_path.display()))?;

    if config.storage == StorageConfig::Memory {
        warn!("deployment config uses in-memory storage; nothing persisted to inspect");
    }
    Ok(config.storage)
}

fn render(cli: &Cli, storage: &StorageConfig) -> anyhow::Result<serde_json::Value> {
    let store = storage.open().context("opening pledge store")?;
    let snapshot = LedgerSnapshot::load(&*store).context("loading ledger records")?;

    info!(
        backend = store.backend_label(),
        admins = snapshot.admins.len(),
        pledges = snapshot.pledges.len(),
        "Loaded ledger records"
    );

    let value = match &cli.command {
        Command::Admins { kind } => {
            let admins: Vec<_> = snapshot
                .admins
                .iter()
                .filter(|admin| kind.map_or(true, |k| admin.kind == AdminKind::from(k)))
                .collect();
            serde_json::to_value(admins)?
        }
        Command::Pledges { owner } => {
            let pledges: Vec<_> = snapshot
                .pledges
                .iter()
                .filter(|pledge| owner.map_or(true, |o| pledge.owner == AdminId::new(o)))
                .collect();
            serde_json::to_value(pledges)?
        }
        Command::Summary => {
            serde_json::to_value(Summary::from_snapshot(store.backend_label(), &snapshot)?)?
        }
    };
    Ok(value)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pledgectl=info,warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = resolve_storage(&cli)?;
    let value = render(&cli, &storage)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledge_types::{AccountRef, CallContext, PledgeId, TokenSelector};
    use pledge_vault::{AccountBook, VaultConfig};
    use uuid::Uuid;

    fn seeded_store() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pledgectl-{}", Uuid::new_v4()));
        let path = dir.join("ledger.json");

        let config = DeploymentConfig {
            ledger_address: AccountRef::new("ledger"),
            vault: VaultConfig::new(
                AccountRef::new("owner"),
                AccountRef::new("escape"),
                AccountRef::new("dest"),
            ),
            storage: StorageConfig::json_file(&path),
        };
        let mut ledger = config.deploy().unwrap();

        ledger.add_giver(AccountRef::new("giver1"), "Giver1", "", 0).unwrap();
        let project = ledger
            .add_project(AccountRef::new("project1"), "Project1", "", None, 0)
            .unwrap();
        let ctx = CallContext::new(AccountRef::new("giver1")).with_value(Amount::new(300));
        ledger
            .donate(&ctx, PledgeId::UNATTRIBUTED, project, Amount::new(300))
            .unwrap();
        ledger
            .vault()
            .escape_funds(
                &AccountRef::new("escape"),
                &TokenSelector::Native,
                Amount::new(100),
                &mut AccountBook::new(),
            )
            .unwrap();
        path
    }

    #[test]
    fn store_flag_takes_precedence_over_config() {
        let cli = Cli::parse_from([
            "pledgectl",
            "--store",
            "/tmp/ledger.json",
            "--config",
            "/does/not/exist.json",
            "summary",
        ]);
        assert_eq!(
            resolve_storage(&cli).unwrap(),
            StorageConfig::json_file("/tmp/ledger.json")
        );
    }

    #[test]
    fn missing_storage_source_is_an_error() {
        let cli = Cli::parse_from(["pledgectl", "summary"]);
        if std::env::var_os("PLEDGE_STORE").is_none() && std::env::var_os("PLEDGE_CONFIG").is_none() {
            assert!(resolve_storage(&cli).is_err());
        }
    }

    #[test]
    fn summary_reports_totals() {
        let path = seeded_store();
        let cli = Cli::parse_from(["pledgectl", "--store", path.to_str().unwrap(), "summary"]);
        let value = render(&cli, &resolve_storage(&cli).unwrap()).unwrap();

        assert_eq!(value["backend"], "json-file");
        assert_eq!(value["admins"], 2);
        assert_eq!(value["projects"], 1);
        assert_eq!(value["pledges"], 1);
        assert_eq!(value["total_pledged"], 300);
        assert_eq!(value["vault_balance"], 200);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn filters_admins_and_pledges() {
        let path = seeded_store();
        let store = path.to_str().unwrap();

        let cli = Cli::parse_from(["pledgectl", "--store", store, "admins", "--kind", "giver"]);
        let admins = render(&cli, &resolve_storage(&cli).unwrap()).unwrap();
        assert_eq!(admins.as_array().unwrap().len(), 1);
        assert_eq!(admins[0]["name"], "Giver1");

        let cli = Cli::parse_from(["pledgectl", "--store", store, "pledges", "--owner", "1"]);
        let pledges = render(&cli, &resolve_storage(&cli).unwrap()).unwrap();
        assert!(pledges.as_array().unwrap().is_empty());

        let cli = Cli::parse_from(["pledgectl", "--store", store, "pledges", "--owner", "2"]);
        let pledges = render(&cli, &resolve_storage(&cli).unwrap()).unwrap();
        assert_eq!(pledges[0]["amount"], 300);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
