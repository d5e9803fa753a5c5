//! CLI entry point for Graphward: locks, merges, deletions, and counters.

mod services;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use graphward_core::Settings;
use graphward_editor::CounterKey;
use graphward_lock::{AcquireOutcome, LockHolder, LockStatus, ReleaseOutcome, ResourceLockManager};
use graphward_store::DatasetStore;

#[derive(Parser)]
#[command(name = "graphward")]
#[command(about = "Coordinated editing of a shared RDF dataset with provenance")]
struct Cli {
    /// Config file prefix (default: graphward).
    #[arg(short, long, default_value = "graphward")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect and manage advisory resource locks.
    Lock {
        #[command(subcommand)]
        action: LockAction,
    },
    /// Merge one entity into another and commit with provenance.
    Merge {
        keep: String,
        delete: String,
    },
    /// Delete an entity and every statement referencing it.
    Delete { entity: String },
    /// Mint a fresh identifier for an entity type (e.g. br, ra).
    Mint { short_type: String },
    /// Read or adjust identifier counters.
    Counter {
        #[command(subcommand)]
        action: CounterAction,
    },
}

#[derive(clap::Args)]
struct HolderArgs {
    /// Holder identifier (defaults to editor.resp_agent).
    #[arg(long)]
    holder_id: Option<String>,

    /// Holder display name.
    #[arg(long, default_value = "graphward-cli")]
    holder_name: String,
}

#[derive(Subcommand)]
enum LockAction {
    Status {
        resource: String,
        #[command(flatten)]
        holder: HolderArgs,
    },
    Acquire {
        resource: String,
        /// Linked resources; discovered from the dataset when omitted.
        #[arg(long = "link")]
        links: Vec<String>,
        #[command(flatten)]
        holder: HolderArgs,
    },
    Release {
        resource: String,
        #[command(flatten)]
        holder: HolderArgs,
    },
}

#[derive(Subcommand)]
enum CounterAction {
    Read { entity: String },
    Increment { entity: String },
    Set {
        entity: String,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    match cli.command {
        Command::Lock { action } => run_lock(&settings, action).await,
        Command::Merge { keep, delete } => run_merge(&settings, &keep, &delete).await,
        Command::Delete { entity } => run_delete(&settings, &entity).await,
        Command::Mint { short_type } => {
            let dataset = services::dataset(&settings)?;
            let editor = services::editor(&settings, dataset).await?;
            let iri = editor
                .mint_entity(&short_type, &settings.editor.base_iri)
                .await?;
            println!("{iri}");
            Ok(())
        }
        Command::Counter { action } => run_counter(&settings, action).await,
    }
}

fn holder(settings: &Settings, args: HolderArgs) -> LockHolder {
    let id = args
        .holder_id
        .unwrap_or_else(|| settings.editor.resp_agent.clone());
    LockHolder::new(id, args.holder_name)
}

async fn run_lock(settings: &Settings, action: LockAction) -> anyhow::Result<()> {
    let dataset = services::dataset(settings)?;
    let locks = services::locks(settings, dataset).await?;

    match action {
        LockAction::Status { resource, holder: args } => {
            let (status, lock) = locks
                .check_lock_status(&holder(settings, args), &resource)
                .await;
            println!(
                "{}",
                serde_json::json!({ "status": format!("{status:?}"), "lock": lock })
            );
            if status == LockStatus::Error {
                anyhow::bail!("Lock status of {resource} could not be determined");
            }
        }
        LockAction::Acquire {
            resource,
            links,
            holder: args,
        } => {
            let linked = (!links.is_empty()).then_some(links);
            match locks
                .acquire_lock(&holder(settings, args), &resource, linked)
                .await
            {
                AcquireOutcome::Acquired(lock) => println!("{}", serde_json::to_string_pretty(&lock)?),
                AcquireOutcome::Blocked(lock) => {
                    let by = lock.map(|l| format!("{} on {}", l.user_name, l.resource_uri));
                    anyhow::bail!("{resource} is locked by {}", by.unwrap_or_else(|| "another editor".into()));
                }
                AcquireOutcome::Failed(e) => anyhow::bail!("Lock backend unavailable: {e}"),
            }
        }
        LockAction::Release { resource, holder: args } => {
            match locks.release_lock(&holder(settings, args), &resource).await {
                ReleaseOutcome::Released => println!("released {resource}"),
                ReleaseOutcome::NotLocked => anyhow::bail!("{resource} is not locked"),
                ReleaseOutcome::HeldByOther(lock) => {
                    anyhow::bail!("{resource} is held by {}", lock.user_name)
                }
                ReleaseOutcome::Failed(e) => anyhow::bail!("Lock backend unavailable: {e}"),
            }
        }
    }
    Ok(())
}

/// Acquire every resource for the configured agent, releasing on failure.
async fn lock_all(
    locks: &ResourceLockManager,
    holder: &LockHolder,
    resources: &[&str],
) -> anyhow::Result<()> {
    for (i, resource) in resources.iter().enumerate() {
        if !locks.acquire_lock(holder, resource, None).await.is_acquired() {
            unlock_all(locks, holder, &resources[..i]).await;
            anyhow::bail!("{resource} is being edited by someone else");
        }
    }
    Ok(())
}

async fn unlock_all(locks: &ResourceLockManager, holder: &LockHolder, resources: &[&str]) {
    for resource in resources {
        if !locks.release_lock(holder, resource).await.is_released() {
            tracing::warn!(resource = %resource, "Lock was not released");
        }
    }
}

async fn run_merge(settings: &Settings, keep: &str, delete: &str) -> anyhow::Result<()> {
    let dataset = services::dataset(settings)?;
    let locks = services::locks(settings, dataset.clone()).await?;
    let mut editor = services::editor(settings, dataset).await?;
    let holder = LockHolder::new(settings.editor.resp_agent.clone(), "graphward-cli");

    let resources = [keep, delete];
    lock_all(&locks, &holder, &resources).await?;
    let result = editor.merge(keep, delete).await;
    unlock_all(&locks, &holder, &resources).await;

    let summary = result?;
    println!(
        "merged {delete} into {keep}: {} removed, {} added, {} snapshots",
        summary.removed,
        summary.added,
        summary.snapshots.len()
    );
    Ok(())
}

async fn run_delete(settings: &Settings, entity: &str) -> anyhow::Result<()> {
    let dataset = services::dataset(settings)?;
    let locks = services::locks(settings, dataset.clone()).await?;
    let referrers = dataset.linking_subjects(entity).await?;
    let mut editor = services::editor(settings, dataset).await?;
    let holder = LockHolder::new(settings.editor.resp_agent.clone(), "graphward-cli");

    lock_all(&locks, &holder, &[entity]).await?;
    let result = async {
        editor.import_entity(entity).await?;
        editor.import_entities(&referrers).await?;
        editor.delete(entity, None, None, None)?;
        editor.save().await
    }
    .await;
    unlock_all(&locks, &holder, &[entity]).await;

    let summary = result?;
    println!(
        "deleted {entity}: {} statements removed, {} snapshots",
        summary.removed,
        summary.snapshots.len()
    );
    Ok(())
}

async fn run_counter(settings: &Settings, action: CounterAction) -> anyhow::Result<()> {
    let counter = services::counter(settings).await?;
    let key = |entity: &str| {
        CounterKey::new(
            &settings.editor.counter_namespace,
            &settings.editor.supplier_prefix,
            entity,
        )
    };

    match action {
        CounterAction::Read { entity } => println!("{}", counter.read(&key(&entity)).await?),
        CounterAction::Increment { entity } => {
            println!("{}", counter.increment(&key(&entity)).await?)
        }
        CounterAction::Set { entity, value } => {
            counter.set(value, &key(&entity)).await?;
            println!("{value}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphward_lock::{LockConfig, MemoryLockBackend};

    use super::*;

    const FIRST: &str = "https://example/br/1";
    const SECOND: &str = "https://example/br/2";

    #[tokio::test]
    async fn lock_all_rolls_back_when_one_resource_is_taken() {
        let locks = ResourceLockManager::new(Arc::new(MemoryLockBackend::new()), LockConfig::default());
        let ada = LockHolder::new("0000-0002-0001", "Ada");
        let bob = LockHolder::new("0000-0002-0002", "Bob");
        assert!(locks.acquire_lock(&bob, SECOND, None).await.is_acquired());

        let err = lock_all(&locks, &ada, &[FIRST, SECOND]).await.unwrap_err();
        assert!(err.to_string().contains(SECOND));

        assert!(locks.get_lock_info(FIRST).await.is_none());
        assert_eq!(locks.get_lock_info(SECOND).await.unwrap().user_id, bob.id);
    }
}
