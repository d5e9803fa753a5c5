//! Construction of the stores and managers the commands run against.

use std::sync::Arc;

use graphward_core::config::CounterBackend;
use graphward_core::Settings;
use graphward_editor::{
    EditorConfig, FileCounter, GraphEditor, IdentifierCounter, MemoryCounter, RedisCounter,
};
use graphward_lock::{LockBackend, LockConfig, MemoryLockBackend, RedisLockBackend, ResourceLockManager};
use graphward_prov::SparqlProvenanceStore;
use graphward_store::{RetryPolicy, RetryingQueryClient, SparqlStore};

pub fn dataset(settings: &Settings) -> anyhow::Result<Arc<SparqlStore>> {
    let client = RetryingQueryClient::http(&settings.dataset, RetryPolicy::from(&settings.retry))?;
    Ok(Arc::new(SparqlStore::new(client, settings.dataset.quadstore)))
}

pub fn provenance(settings: &Settings) -> anyhow::Result<Arc<SparqlProvenanceStore>> {
    let client =
        RetryingQueryClient::http(&settings.provenance, RetryPolicy::from(&settings.retry))?;
    Ok(Arc::new(SparqlProvenanceStore::new(client)))
}

pub async fn counter(settings: &Settings) -> anyhow::Result<Arc<dyn IdentifierCounter>> {
    let counter: Arc<dyn IdentifierCounter> = match settings.counter.backend {
        CounterBackend::Memory => {
            tracing::warn!("Using in-process counters; identifiers restart on every run");
            Arc::new(MemoryCounter::new())
        }
        CounterBackend::File => Arc::new(FileCounter::new(&settings.counter.path)),
        CounterBackend::Redis => {
            let url = settings
                .counter
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("counter.redis_url is required for the redis backend"))?;
            Arc::new(RedisCounter::connect(url).await?)
        }
    };
    Ok(counter)
}

pub async fn locks(settings: &Settings, dataset: Arc<SparqlStore>) -> anyhow::Result<ResourceLockManager> {
    let backend: Arc<dyn LockBackend> = match settings.lock.redis_url.as_deref() {
        Some(url) => Arc::new(RedisLockBackend::connect(url).await?),
        None => {
            tracing::warn!("No lock.redis_url configured; locks are local to this process");
            Arc::new(MemoryLockBackend::new())
        }
    };
    Ok(ResourceLockManager::new(backend, LockConfig::from(&settings.lock)).with_discovery(dataset))
}

pub async fn editor(settings: &Settings, dataset: Arc<SparqlStore>) -> anyhow::Result<GraphEditor> {
    Ok(GraphEditor::new(
        dataset,
        provenance(settings)?,
        counter(settings).await?,
        EditorConfig::from(&settings.editor),
    ))
}
