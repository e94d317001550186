//! Capability discovery use case.
//!
//! Keeps a flat, cached catalog of every tool advertised by a connected
//! provider. The first access builds it; concurrent first accesses share the
//! same in-flight build. [`CapabilityDiscovery::refresh`] drops the cache so
//! the next access rebuilds it.
//!
//! A build is only cached once it has seen a connected provider and the
//! source is no longer waiting for a credential. Until then every access
//! rebuilds, so tools appear as soon as providers come up.

use crate::ports::capability_source::CapabilitySource;
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use toolhost_domain::discovery::{self, CatalogEntry};
use toolhost_domain::providers::ProviderName;
use tracing::{debug, info};

type Catalog = Arc<Vec<CatalogEntry>>;

/// A search result with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch {
    pub entry: CatalogEntry,
    pub score: f64,
}

/// A catalog built before providers were ready; returned but not cached.
struct Unsettled(Catalog);

pub struct CapabilityDiscovery {
    source: Arc<dyn CapabilitySource>,
    cache: RwLock<Arc<OnceCell<Catalog>>>,
}

impl CapabilityDiscovery {
    pub fn new(source: Arc<dyn CapabilitySource>) -> Self {
        Self {
            source,
            cache: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    fn current_cell(&self) -> Arc<OnceCell<Catalog>> {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The catalog, building it on first access.
    pub async fn catalog(&self) -> Catalog {
        let cell = self.current_cell();
        match cell.get_or_try_init(|| self.build()).await {
            Ok(catalog) => catalog.clone(),
            Err(Unsettled(catalog)) => catalog,
        }
    }

    async fn build(&self) -> Result<Catalog, Unsettled> {
        self.source.ensure_initialized().await;

        let states = self.source.provider_states().await;
        let any_connected = states.iter().any(|state| state.is_connected());
        let entries: Vec<CatalogEntry> = states
            .iter()
            .filter(|state| state.is_connected())
            .flat_map(|state| {
                state
                    .tools
                    .iter()
                    .map(|tool| CatalogEntry::from_remote(state.name(), tool))
            })
            .collect();

        let catalog = Arc::new(entries);
        if !any_connected || self.source.connection_summary().await.waiting_for_credential {
            debug!(entries = catalog.len(), "Providers not ready, catalog left uncached");
            return Err(Unsettled(catalog));
        }

        info!(entries = catalog.len(), "Capability catalog built");
        Ok(catalog)
    }

    /// Invalidate the cache; the next access rebuilds it.
    pub fn refresh(&self) {
        debug!("Capability catalog invalidated");
        *self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(OnceCell::new());
    }

    /// Rank catalog entries against `query`.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<CatalogMatch> {
        let catalog = self.catalog().await;
        discovery::search(&catalog, query, limit)
            .into_iter()
            .map(|hit| CatalogMatch {
                entry: hit.entry.clone(),
                score: hit.score,
            })
            .collect()
    }

    pub async fn server_tools(&self, provider: ProviderName) -> Vec<CatalogEntry> {
        self.catalog()
            .await
            .iter()
            .filter(|e| e.provider == provider)
            .cloned()
            .collect()
    }

    pub async fn tool(&self, provider: ProviderName, name: &str) -> Option<CatalogEntry> {
        self.catalog()
            .await
            .iter()
            .find(|e| e.provider == provider && e.name == name)
            .cloned()
    }

    pub async fn all_tools(&self) -> Vec<CatalogEntry> {
        self.catalog().await.as_ref().clone()
    }

    /// Provider-grouped listing sized for a system prompt.
    pub async fn compact_tool_list(&self) -> String {
        discovery::compact_tool_list(&self.catalog().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use toolhost_domain::providers::{
        ConnectionSummary, ProviderConfig, ProviderState, RemoteTool,
    };
    use toolhost_domain::tool::value_objects::ToolResult;

    struct FakeSource {
        states: Mutex<Vec<ProviderState>>,
        waiting: AtomicBool,
        builds: AtomicUsize,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                states: Mutex::new(Self::ready_states()),
                waiting: AtomicBool::new(false),
                builds: AtomicUsize::new(0),
            }
        }

        /// No key yet: every provider still pending.
        fn waiting_for_key() -> Self {
            let states: Vec<ProviderState> = [ProviderName::WebSearch, ProviderName::Zread]
                .into_iter()
                .map(|name| ProviderState::new(ProviderConfig::default_for(name)))
                .collect();
            Self {
                states: Mutex::new(states),
                waiting: AtomicBool::new(true),
                builds: AtomicUsize::new(0),
            }
        }

        fn connect_all(&self) {
            *self.states.lock().unwrap() = Self::ready_states();
            self.waiting.store(false, Ordering::SeqCst);
        }

        fn ready_states() -> Vec<ProviderState> {
            let mut search = ProviderState::new(ProviderConfig::default_for(ProviderName::WebSearch));
            search.mark_connected(vec![RemoteTool {
                name: "webSearchPrime".into(),
                description: "Search the web".into(),
                input_schema: json!({"type": "object"}),
            }]);

            let mut zread = ProviderState::new(ProviderConfig::default_for(ProviderName::Zread));
            zread.mark_connected(vec![
                RemoteTool {
                    name: "search_doc".into(),
                    description: "Search repository documentation".into(),
                    input_schema: json!({"type": "object"}),
                },
                RemoteTool {
                    name: "read_file".into(),
                    description: "Read a file from a GitHub repository".into(),
                    input_schema: json!({"type": "object"}),
                },
            ]);

            let mut vision = ProviderState::new(ProviderConfig::default_for(ProviderName::Vision));
            vision.mark_failed("node not found");

            vec![vision, search, zread]
        }
    }

    #[async_trait]
    impl CapabilitySource for FakeSource {
        async fn ensure_initialized(&self) {
            self.builds.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
        }

        async fn provider_states(&self) -> Vec<ProviderState> {
            self.states.lock().unwrap().clone()
        }

        async fn call_tool(&self, _: ProviderName, _: &str, _: Value) -> ToolResult {
            ToolResult::success("unused")
        }

        async fn find_tool_server(&self, _: &str) -> Option<ProviderName> {
            None
        }

        async fn connection_summary(&self) -> ConnectionSummary {
            ConnectionSummary {
                waiting_for_credential: self.waiting.load(Ordering::SeqCst),
                ..ConnectionSummary::default()
            }
        }
    }

    fn discovery() -> (Arc<FakeSource>, Arc<CapabilityDiscovery>) {
        let source = Arc::new(FakeSource::new());
        let discovery = Arc::new(CapabilityDiscovery::new(source.clone()));
        (source, discovery)
    }

    #[tokio::test]
    async fn test_catalog_contains_connected_providers_only() {
        let (_, discovery) = discovery();
        let all = discovery.all_tools().await;

        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|e| e.provider != ProviderName::Vision));
        assert_eq!(discovery.server_tools(ProviderName::Zread).await.len(), 2);
        assert!(discovery.tool(ProviderName::Zread, "read_file").await.is_some());
        assert!(discovery.tool(ProviderName::WebSearch, "read_file").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_first_access_builds_once() {
        let (source, discovery) = discovery();

        let (a, b) = tokio::join!(discovery.catalog(), discovery.catalog());
        assert_eq!(a.len(), b.len());
        assert_eq!(source.builds.load(Ordering::SeqCst), 1);

        discovery.catalog().await;
        assert_eq!(source.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_rebuilds() {
        let (source, discovery) = discovery();
        discovery.catalog().await;
        discovery.refresh();
        discovery.catalog().await;
        assert_eq!(source.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_search_and_compact_list() {
        let (_, discovery) = discovery();

        let hits = discovery.search("search web", 5).await;
        assert_eq!(hits[0].entry.name, "webSearchPrime");

        let list = discovery.compact_tool_list().await;
        assert!(list.starts_with("[web-search]\n  - webSearchPrime: Search the web\n"));
        assert!(list.contains("[zread]"));
    }

    #[tokio::test]
    async fn test_catalog_not_cached_while_waiting_for_credential() {
        let source = Arc::new(FakeSource::waiting_for_key());
        let discovery = CapabilityDiscovery::new(source.clone());

        assert!(discovery.search("search web", 5).await.is_empty());

        source.connect_all();
        let hits = discovery.search("search web", 5).await;
        assert_eq!(hits[0].entry.name, "webSearchPrime");

        let builds = source.builds.load(Ordering::SeqCst);
        discovery.catalog().await;
        assert_eq!(source.builds.load(Ordering::SeqCst), builds);
    }

    #[tokio::test]
    async fn test_catalog_without_connected_provider_is_rebuilt() {
        let source = Arc::new(FakeSource::waiting_for_key());
        source.waiting.store(false, Ordering::SeqCst);
        let discovery = CapabilityDiscovery::new(source.clone());

        assert!(discovery.all_tools().await.is_empty());
        assert!(discovery.all_tools().await.is_empty());
        assert_eq!(source.builds.load(Ordering::SeqCst), 2);
    }
}
