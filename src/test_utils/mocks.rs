//! Mock implementations for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::app::{AmountMatch, DEFAULT_HISTORY_LIMIT, verify_by_address, verify_transaction};
use crate::domain::{
    AddressHistory, AddressVerifyRequest, AppError, CreateOrder, CreateResultInfo, Currency,
    Exchange, ExchangeRateInfo, ExchangeRateRequest, Explorer, OrderInfoResult, StatusTable,
    Transaction, TxVerifyRequest, Verification, VerifyResult, status,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }

    fn check(&self, vendor: &str) -> Result<(), AppError> {
        if self.should_fail {
            let message = self
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AppError::Vendor {
                vendor: vendor.to_string(),
                message,
            });
        }
        Ok(())
    }
}

// ============================================================================
// MOCK EXPLORER
// ============================================================================

/// In-memory explorer serving canned transactions and address history
pub struct MockExplorer {
    transactions: Arc<Mutex<HashMap<String, Transaction>>>,
    history: Arc<Mutex<Vec<Transaction>>>,
    pushed: Arc<Mutex<Vec<String>>>,
    fetches: AtomicUsize,
    config: MockConfig,
}

impl MockExplorer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            transactions: Arc::new(Mutex::new(HashMap::new())),
            history: Arc::new(Mutex::new(Vec::new())),
            pushed: Arc::new(Mutex::new(Vec::new())),
            fetches: AtomicUsize::new(0),
            config,
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    #[must_use]
    pub fn with_transaction(self, transaction: Transaction) -> Self {
        self.insert_transaction(transaction);
        self
    }

    /// Address history in vendor order (newest first)
    #[must_use]
    pub fn with_history(self, txs: Vec<Transaction>) -> Self {
        *self.history.lock().unwrap() = txs;
        self
    }

    pub fn insert_transaction(&self, transaction: Transaction) {
        self.transactions
            .lock()
            .unwrap()
            .insert(transaction.hash.clone(), transaction);
    }

    /// Number of vendor fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Raw transactions passed to `push_tx` (for testing)
    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }
}

impl Default for MockExplorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Explorer for MockExplorer {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_transaction(&self, tx_id: &str) -> Result<Transaction, AppError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.config.check(self.name())?;
        self.transactions
            .lock()
            .unwrap()
            .get(tx_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", tx_id)))
    }

    async fn get_txs_for_address(
        &self,
        address: &str,
        limit: usize,
        _view_key: Option<&str>,
    ) -> Result<AddressHistory, AppError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.config.check(self.name())?;
        let txs = self
            .history
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect();
        Ok(AddressHistory {
            address: address.to_string(),
            txs,
        })
    }

    async fn verify_transaction(
        &self,
        request: &TxVerifyRequest,
    ) -> Result<Verification, AppError> {
        verify_transaction(self, request, DEFAULT_HISTORY_LIMIT).await
    }

    async fn verify_by_address(
        &self,
        request: &AddressVerifyRequest,
    ) -> Result<VerifyResult, AppError> {
        verify_by_address(self, request, AmountMatch::approximate(), DEFAULT_HISTORY_LIMIT).await
    }

    async fn push_tx(&self, raw_tx: &str) -> Result<String, AppError> {
        self.config.check(self.name())?;
        self.pushed.lock().unwrap().push(raw_tx.to_string());
        Ok(format!("mock-{}", self.pushed.lock().unwrap().len()))
    }
}

// ============================================================================
// MOCK EXCHANGE
// ============================================================================

/// In-memory exchange whose orders carry vendor status strings
pub struct MockExchange {
    orders: Arc<Mutex<HashMap<String, String>>>,
    statuses: &'static StatusTable,
    config: MockConfig,
}

impl MockExchange {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            orders: Arc::new(Mutex::new(HashMap::new())),
            statuses: &status::CHANGENOW,
            config,
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    /// Interpret order statuses with another vendor's vocabulary
    #[must_use]
    pub fn with_status_table(mut self, statuses: &'static StatusTable) -> Self {
        self.statuses = statuses;
        self
    }

    /// Set the vendor status string reported for `order_id`
    pub fn set_order_status(&self, order_id: &str, vendor_status: &str) {
        self.orders
            .lock()
            .unwrap()
            .insert(order_id.to_string(), vendor_status.to_string());
    }
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exchange for MockExchange {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_currencies(&self) -> Result<Vec<Currency>, AppError> {
        self.config.check(self.name())?;
        Ok(["btc", "ltc", "dcr"]
            .iter()
            .map(|symbol| Currency {
                name: symbol.to_uppercase(),
                symbol: symbol.to_string(),
                ..Default::default()
            })
            .collect())
    }

    async fn get_currencies_to_pair(&self, from: &str) -> Result<Vec<Currency>, AppError> {
        let currencies = self.get_currencies().await?;
        Ok(currencies
            .into_iter()
            .filter(|c| !c.symbol.eq_ignore_ascii_case(from))
            .collect())
    }

    async fn get_exchange_rate_info(
        &self,
        request: &ExchangeRateRequest,
    ) -> Result<ExchangeRateInfo, AppError> {
        self.config.check(self.name())?;
        Ok(ExchangeRateInfo {
            min: 0.001,
            max: 10.0,
            exchange_rate: 2.0,
            receive_amount: request.amount * 2.0,
            network_fee: None,
        })
    }

    async fn create_order(&self, order: &CreateOrder) -> Result<CreateResultInfo, AppError> {
        self.config.check(self.name())?;
        let mut orders = self.orders.lock().unwrap();
        let uuid = format!("order-{}", orders.len() + 1);
        orders.insert(uuid.clone(), "waiting".to_string());
        Ok(CreateResultInfo {
            uuid,
            deposit_address: "mock-deposit-address".to_string(),
            destination: order.destination.clone(),
            from_currency: order.from_currency.clone(),
            to_currency: order.to_currency.clone(),
            invoiced_amount: order.invoiced_amount,
            ordered_amount: order.invoiced_amount * 2.0,
            exchange_rate: 2.0,
            ..Default::default()
        })
    }

    async fn order_info(
        &self,
        order_id: &str,
        _extra_ids: &[String],
    ) -> Result<OrderInfoResult, AppError> {
        self.config.check(self.name())?;
        let status = self
            .orders
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("order {}", order_id)))?;
        Ok(OrderInfoResult {
            internal_status: self.statuses.map_status(&status),
            status,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;

    #[tokio::test]
    async fn test_mock_exchange_order_lifecycle() {
        let exchange = MockExchange::new();
        let order = exchange
            .create_order(&CreateOrder {
                from_currency: "ltc".to_string(),
                to_currency: "btc".to_string(),
                invoiced_amount: 1.0,
                destination: "bc1q".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let info = exchange.order_info(&order.uuid, &[]).await.unwrap();
        assert_eq!(info.internal_status, OrderStatus::WaitingForDeposit);

        exchange.set_order_status(&order.uuid, "FINISHED");
        let info = exchange.order_info(&order.uuid, &[]).await.unwrap();
        assert_eq!(info.internal_status, OrderStatus::Completed);
        assert_eq!(info.status, "FINISHED");
    }

    #[tokio::test]
    async fn test_mock_explorer_failing() {
        let explorer = MockExplorer::failing("down");
        assert!(explorer.get_transaction("x").await.is_err());
        assert_eq!(explorer.fetch_count(), 1);
    }
}
