//! Adapter registries.
//!
//! A registry maps a lookup key to a constructor and builds a fresh adapter on every
//! [`resolve`](ExchangeRegistry::resolve). Registries are plain values built once at startup and
//! passed to whoever needs them; see [`crate::infra::default_exchange_registry`].
//!
//! Registering the same key twice is a wiring mistake and panics.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::domain::{
    AppError, Exchange, ExchangeConfig, Explorer, ExplorerConfig, NetworkType, RegistryKind,
};

pub type ExchangeConstructor =
    Arc<dyn Fn(ExchangeConfig) -> Result<Box<dyn Exchange>, AppError> + Send + Sync>;

pub type ExplorerConstructor =
    Arc<dyn Fn(ExplorerConfig) -> Result<Box<dyn Explorer>, AppError> + Send + Sync>;

/// Lock-guarded key to constructor table shared by both registries
struct ConstructorTable<K, C> {
    kind: RegistryKind,
    entries: RwLock<HashMap<K, C>>,
}

impl<K, C> ConstructorTable<K, C>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    C: Clone,
{
    fn new(kind: RegistryKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, key: K, constructor: C) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&key) {
            panic!("[{}] {} is already registered", key, self.kind);
        }
        debug!(key = %key, kind = %self.kind, "Registered adapter");
        entries.insert(key, constructor);
    }

    fn get(&self, key: &K) -> Result<C, AppError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotRegistered {
                kind: self.kind,
                key: key.to_string(),
            })
    }

    fn contains(&self, key: &K) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn keys(&self) -> Vec<K> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

// ============================================================================
// EXCHANGE REGISTRY
// ============================================================================

/// Exchange adapters keyed by lowercase vendor name
pub struct ExchangeRegistry {
    table: ConstructorTable<String, ExchangeConstructor>,
}

impl ExchangeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: ConstructorTable::new(RegistryKind::Exchange),
        }
    }

    /// # Panics
    /// If `name` is already registered.
    pub fn register<F>(&self, name: &str, constructor: F)
    where
        F: Fn(ExchangeConfig) -> Result<Box<dyn Exchange>, AppError> + Send + Sync + 'static,
    {
        self.table.insert(normalize(name), Arc::new(constructor));
    }

    /// Build a new adapter for `name`
    pub fn resolve(&self, name: &str, config: ExchangeConfig) -> Result<Box<dyn Exchange>, AppError> {
        let constructor = self.table.get(&normalize(name))?;
        constructor(config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains(&normalize(name))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names = self.table.keys();
        names.sort();
        names
    }
}

impl Default for ExchangeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// EXPLORER REGISTRY
// ============================================================================

/// Explorer adapters keyed by coin symbol, or by network type for token-standard explorers
pub struct ExplorerRegistry {
    symbols: ConstructorTable<String, ExplorerConstructor>,
    network_types: ConstructorTable<NetworkType, ExplorerConstructor>,
}

impl ExplorerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: ConstructorTable::new(RegistryKind::ExplorerSymbol),
            network_types: ConstructorTable::new(RegistryKind::ExplorerNetworkType),
        }
    }

    /// Register under a symbol, a network type, or both.
    ///
    /// # Panics
    /// If either key is already registered, or if neither key is given.
    pub fn register<F>(&self, symbol: Option<&str>, network_type: Option<NetworkType>, constructor: F)
    where
        F: Fn(ExplorerConfig) -> Result<Box<dyn Explorer>, AppError> + Send + Sync + 'static,
    {
        let constructor: ExplorerConstructor = Arc::new(constructor);
        match (symbol, network_type) {
            (None, None) => panic!("explorer registered without a symbol or network type"),
            (symbol, network_type) => {
                if let Some(symbol) = symbol {
                    self.symbols.insert(normalize(symbol), constructor.clone());
                }
                if let Some(network_type) = network_type {
                    self.network_types.insert(network_type, constructor);
                }
            }
        }
    }

    /// Build a new adapter for `config`.
    ///
    /// Uses the network-type keyspace when `config.network_type` is set, otherwise the symbol.
    pub fn resolve(&self, config: ExplorerConfig) -> Result<Box<dyn Explorer>, AppError> {
        let constructor = match config.network_type {
            Some(network_type) => self.network_types.get(&network_type)?,
            None => self.symbols.get(&normalize(&config.symbol))?,
        };
        constructor(config)
    }

    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.symbols.contains(&normalize(symbol))
    }

    pub fn contains_network_type(&self, network_type: NetworkType) -> bool {
        self.network_types.contains(&network_type)
    }

    /// Registered symbols, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols = self.symbols.keys();
        symbols.sort();
        symbols
    }

    pub fn network_types(&self) -> Vec<NetworkType> {
        let mut types = self.network_types.keys();
        types.sort_by_key(|t| t.as_str());
        types
    }
}

impl Default for ExplorerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockExchange, MockExplorer};

    fn mock_exchange(_config: ExchangeConfig) -> Result<Box<dyn Exchange>, AppError> {
        Ok(Box::new(MockExchange::new()))
    }

    fn mock_explorer(_config: ExplorerConfig) -> Result<Box<dyn Explorer>, AppError> {
        Ok(Box::new(MockExplorer::new()))
    }

    #[test]
    fn test_exchange_resolve_is_case_insensitive() {
        let registry = ExchangeRegistry::new();
        registry.register("MockSwap", mock_exchange);

        assert!(registry.contains("mockswap"));
        let exchange = registry.resolve("MOCKSWAP", ExchangeConfig::default());
        assert!(exchange.is_ok());
        assert_eq!(registry.names(), vec!["mockswap".to_string()]);
    }

    #[test]
    fn test_exchange_resolve_unknown_key() {
        let registry = ExchangeRegistry::new();
        let result = registry.resolve("nope", ExchangeConfig::default());
        match result {
            Err(AppError::NotRegistered { kind, key }) => {
                assert_eq!(kind, RegistryKind::Exchange);
                assert_eq!(key, "nope");
            }
            _ => panic!("Expected NotRegistered"),
        }
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_exchange_duplicate_registration_panics() {
        let registry = ExchangeRegistry::new();
        registry.register("mockswap", mock_exchange);
        registry.register("MOCKSWAP", mock_exchange);
    }

    #[test]
    fn test_explorer_keyspaces_are_independent() {
        let registry = ExplorerRegistry::new();
        registry.register(Some("LTC"), None, mock_explorer);
        registry.register(None, Some(NetworkType::Erc20), mock_explorer);

        assert!(registry.resolve(ExplorerConfig::new("ltc")).is_ok());
        assert!(
            registry
                .resolve(ExplorerConfig::new("USDT").with_network_type(NetworkType::Erc20))
                .is_ok()
        );

        // A symbol match is ignored once a network type is requested
        let err = registry
            .resolve(ExplorerConfig::new("ltc").with_network_type(NetworkType::Trc20))
            .err();
        assert!(matches!(
            err,
            Some(AppError::NotRegistered {
                kind: RegistryKind::ExplorerNetworkType,
                ..
            })
        ));

        // And the type keyspace is not consulted for plain symbols
        assert!(matches!(
            registry.resolve(ExplorerConfig::new("usdt")).err(),
            Some(AppError::NotRegistered {
                kind: RegistryKind::ExplorerSymbol,
                ..
            })
        ));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_explorer_duplicate_network_type_panics() {
        let registry = ExplorerRegistry::new();
        registry.register(None, Some(NetworkType::Erc20), mock_explorer);
        registry.register(None, Some(NetworkType::Erc20), mock_explorer);
    }

    #[test]
    #[should_panic(expected = "without a symbol or network type")]
    fn test_explorer_registration_needs_a_key() {
        let registry = ExplorerRegistry::new();
        registry.register(None, None, mock_explorer);
    }

    #[test]
    fn test_resolve_builds_a_new_instance_each_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let registry = ExplorerRegistry::new();
        registry.register(Some("dcr"), None, move |_config| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockExplorer::new()) as Box<dyn Explorer>)
        });

        for _ in 0..3 {
            assert!(registry.resolve(ExplorerConfig::new("dcr")).is_ok());
        }
        assert_eq!(built.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_constructor_errors_propagate() {
        let registry = ExchangeRegistry::new();
        registry.register("broken", |_config| {
            Err(AppError::Config(crate::domain::ConfigError::Missing(
                "api_key".to_string(),
            )))
        });
        assert!(matches!(
            registry.resolve("broken", ExchangeConfig::default()),
            Err(AppError::Config(_))
        ));
    }
}
