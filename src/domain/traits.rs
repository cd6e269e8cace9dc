//! Capability traits every vendor adapter implements.

use async_trait::async_trait;

use super::error::AppError;
use super::transaction::{
    AddressHistory, AddressVerifyRequest, Transaction, TxVerifyRequest, Verification, VerifyResult,
};
use super::types::{
    CreateOrder, CreateResultInfo, Currency, ExchangeRateInfo, ExchangeRateRequest,
    OrderInfoResult, QueryLimits, UpdateOrder, UpdateOrderResult,
};

/// Instant-swap exchange adapter
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Vendor name, as registered
    fn name(&self) -> &'static str;

    /// List currencies the vendor can swap
    async fn get_currencies(&self) -> Result<Vec<Currency>, AppError>;

    /// List currencies `from` can be swapped into
    async fn get_currencies_to_pair(&self, from: &str) -> Result<Vec<Currency>, AppError>;

    /// Quote a swap
    async fn get_exchange_rate_info(
        &self,
        request: &ExchangeRateRequest,
    ) -> Result<ExchangeRateInfo, AppError>;

    /// Create a swap order
    async fn create_order(&self, order: &CreateOrder) -> Result<CreateResultInfo, AppError>;

    /// Fetch an order and map its status into [`crate::domain::OrderStatus`]
    async fn order_info(
        &self,
        order_id: &str,
        extra_ids: &[String],
    ) -> Result<OrderInfoResult, AppError>;

    /// Amend an existing order
    async fn update_order(&self, update: &UpdateOrder) -> Result<UpdateOrderResult, AppError> {
        let _ = update;
        Err(AppError::NotSupported(format!(
            "{}: update_order not implemented",
            self.name()
        )))
    }

    /// Cancel an existing order
    async fn cancel_order(&self, order_id: &str) -> Result<bool, AppError> {
        let _ = order_id;
        Err(AppError::NotSupported(format!(
            "{}: cancel_order not implemented",
            self.name()
        )))
    }

    /// Minimum and maximum swap amounts for a pair
    async fn query_limits(&self, from: &str, to: &str) -> Result<QueryLimits, AppError> {
        let _ = (from, to);
        Err(AppError::NotSupported(format!(
            "{}: query_limits not implemented",
            self.name()
        )))
    }
}

/// Block explorer adapter
#[async_trait]
pub trait Explorer: Send + Sync {
    /// Vendor name, as registered
    fn name(&self) -> &'static str;

    /// Fetch one transaction in canonical form
    async fn get_transaction(&self, tx_id: &str) -> Result<Transaction, AppError>;

    /// Fetch up to `limit` recent transactions touching `address`
    async fn get_txs_for_address(
        &self,
        address: &str,
        limit: usize,
        view_key: Option<&str>,
    ) -> Result<AddressHistory, AppError>;

    /// Verify a claimed payment, by transaction id when one is given, otherwise by address history
    async fn verify_transaction(&self, request: &TxVerifyRequest)
    -> Result<Verification, AppError>;

    /// Verify that `address` received roughly `amount`
    async fn verify_by_address(
        &self,
        request: &AddressVerifyRequest,
    ) -> Result<VerifyResult, AppError> {
        let _ = request;
        Err(AppError::NotSupported(format!(
            "{}: verify_by_address not implemented",
            self.name()
        )))
    }

    /// Broadcast a raw signed transaction, returning its hash
    async fn push_tx(&self, raw_tx: &str) -> Result<String, AppError> {
        let _ = raw_tx;
        Err(AppError::NotSupported(format!(
            "{}: push_tx not implemented",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal implementations for testing default methods
    struct MinimalExchange;

    #[async_trait]
    impl Exchange for MinimalExchange {
        fn name(&self) -> &'static str {
            "minimal"
        }

        async fn get_currencies(&self) -> Result<Vec<Currency>, AppError> {
            Ok(vec![])
        }

        async fn get_currencies_to_pair(&self, _from: &str) -> Result<Vec<Currency>, AppError> {
            Ok(vec![])
        }

        async fn get_exchange_rate_info(
            &self,
            _request: &ExchangeRateRequest,
        ) -> Result<ExchangeRateInfo, AppError> {
            Ok(ExchangeRateInfo::default())
        }

        async fn create_order(&self, _order: &CreateOrder) -> Result<CreateResultInfo, AppError> {
            Ok(CreateResultInfo::default())
        }

        async fn order_info(
            &self,
            _order_id: &str,
            _extra_ids: &[String],
        ) -> Result<OrderInfoResult, AppError> {
            Ok(OrderInfoResult::default())
        }
    }

    struct MinimalExplorer;

    #[async_trait]
    impl Explorer for MinimalExplorer {
        fn name(&self) -> &'static str {
            "minimal"
        }

        async fn get_transaction(&self, _tx_id: &str) -> Result<Transaction, AppError> {
            Ok(Transaction::default())
        }

        async fn get_txs_for_address(
            &self,
            address: &str,
            _limit: usize,
            _view_key: Option<&str>,
        ) -> Result<AddressHistory, AppError> {
            Ok(AddressHistory {
                address: address.to_string(),
                txs: vec![],
            })
        }

        async fn verify_transaction(
            &self,
            _request: &TxVerifyRequest,
        ) -> Result<Verification, AppError> {
            Err(AppError::NotFound("nothing".to_string()))
        }
    }

    #[tokio::test]
    async fn test_exchange_defaults_are_not_supported() {
        let exchange = MinimalExchange;
        let cancel = exchange.cancel_order("id").await;
        assert!(matches!(cancel, Err(AppError::NotSupported(ref m)) if m.contains("minimal")));
        assert!(matches!(
            exchange.update_order(&UpdateOrder::default()).await,
            Err(AppError::NotSupported(_))
        ));
        assert!(matches!(
            exchange.query_limits("btc", "eth").await,
            Err(AppError::NotSupported(_))
        ));
    }

    #[tokio::test]
    async fn test_explorer_defaults_are_not_supported() {
        let explorer = MinimalExplorer;
        assert!(matches!(
            explorer.push_tx("00").await,
            Err(AppError::NotSupported(_))
        ));
        assert!(matches!(
            explorer
                .verify_by_address(&AddressVerifyRequest::default())
                .await,
            Err(AppError::NotSupported(_))
        ));
    }
}
