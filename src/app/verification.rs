//! Payment verification against explorer data.
//!
//! Explorer adapters only know how to fetch transactions and address history. The scans here
//! decide whether a claimed payment (address, amount, optional time window) is present, deep
//! enough, and by how much it differs from what was ordered.
//!
//! Every scan is first-match: outputs are visited in the order the vendor returned them and the
//! first output paying the requested address settles the result. When a transaction pays the
//! same address more than once, later outputs are ignored even if their value is closer to the
//! ordered amount. Exhausting a scan without a match is always [`AppError::NotFound`].

use tracing::{debug, instrument};
use validator::Validate;

use crate::domain::{
    AddressVerifyRequest, Amount, AppError, Explorer, Transaction, TxVerifyRequest, Verification,
    VerifyResult,
};

/// History page size used when an adapter has no preference
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Relative tolerance for approximate amount matching
pub const DEFAULT_TOLERANCE: f64 = 0.0001;

/// How [`verify_by_address`] compares an output value with the requested amount
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountMatch {
    /// Atom-exact equality
    Exact,
    /// `|value - requested| <= tolerance * requested`
    Approximate { tolerance: f64 },
}

impl AmountMatch {
    pub fn approximate() -> Self {
        Self::Approximate {
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn matches(&self, value: Amount, requested: Amount) -> bool {
        match *self {
            Self::Exact => value == requested,
            Self::Approximate { tolerance } => {
                let requested = requested.to_coins();
                (value.to_coins() - requested).abs() <= tolerance * requested
            }
        }
    }
}

/// Difference between what arrived on chain and what was ordered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discrepancy {
    pub missing_amount: Amount,
    pub missing_percent: f64,
}

impl Discrepancy {
    /// `missing = received - ordered`, as a percentage of `received`.
    ///
    /// Both are exactly zero when the amounts are equal, and the percentage is zero when nothing
    /// was received.
    pub fn between(received: Amount, ordered: Amount) -> Self {
        if received == ordered {
            return Self {
                missing_amount: Amount::ZERO,
                missing_percent: 0.0,
            };
        }
        let missing_amount = received - ordered;
        let missing_percent = if received.is_zero() {
            0.0
        } else {
            missing_amount.to_coins() / received.to_coins() * 100.0
        };
        Self {
            missing_amount,
            missing_percent,
        }
    }
}

/// Runs verification by transaction id when the request has one, otherwise by address history.
pub async fn verify_transaction<E>(
    explorer: &E,
    request: &TxVerifyRequest,
    history_limit: usize,
) -> Result<Verification, AppError>
where
    E: Explorer + ?Sized,
{
    match request.tx_id() {
        Some(tx_id) => verify_by_tx_id(explorer, tx_id, request).await,
        None => verify_by_address_history(explorer, request, history_limit).await,
    }
}

/// Fetches `tx_id` and settles on its first output paying `request.address`.
#[instrument(skip(explorer, request), fields(explorer = explorer.name(), address = %request.address))]
pub async fn verify_by_tx_id<E>(
    explorer: &E,
    tx_id: &str,
    request: &TxVerifyRequest,
) -> Result<Verification, AppError>
where
    E: Explorer + ?Sized,
{
    request.validate()?;
    let transaction = explorer.get_transaction(tx_id).await?;

    let value = transaction
        .outputs
        .iter()
        .find(|output| output.pays_to(&request.address))
        .map(|output| output.value);

    match value {
        Some(value) => settle(transaction, value, request),
        None => Err(AppError::NotFound(format!(
            "transaction {} has no output to {}",
            tx_id, request.address
        ))),
    }
}

/// Scans recent history of `request.address`, skipping entries older than `request.created_at`.
#[instrument(skip(explorer, request), fields(explorer = explorer.name(), address = %request.address))]
pub async fn verify_by_address_history<E>(
    explorer: &E,
    request: &TxVerifyRequest,
    limit: usize,
) -> Result<Verification, AppError>
where
    E: Explorer + ?Sized,
{
    request.validate()?;
    let history = explorer
        .get_txs_for_address(&request.address, limit, request.view_key.as_deref())
        .await?;
    debug!(count = history.txs.len(), "Scanning address history");

    for transaction in history.txs {
        if request.created_at.is_some_and(|created_at| transaction.time < created_at) {
            continue;
        }
        let value = transaction
            .outputs
            .iter()
            .find(|output| output.pays_to(&request.address))
            .map(|output| output.value);
        if let Some(value) = value {
            return settle(transaction, value, request);
        }
    }

    Err(AppError::NotFound(format!(
        "no matching payment to {} in the last {} transactions",
        request.address, limit
    )))
}

/// Scans recent history for an output to `request.address` whose value matches `rule`.
#[instrument(skip(explorer, request), fields(explorer = explorer.name(), address = %request.address))]
pub async fn verify_by_address<E>(
    explorer: &E,
    request: &AddressVerifyRequest,
    rule: AmountMatch,
    limit: usize,
) -> Result<VerifyResult, AppError>
where
    E: Explorer + ?Sized,
{
    request.validate()?;
    let requested = Amount::from_coins(request.amount)?;
    let history = explorer
        .get_txs_for_address(&request.address, limit, request.view_key.as_deref())
        .await?;

    let found = history
        .txs
        .iter()
        .flat_map(|tx| tx.outputs.iter())
        .find(|output| output.pays_to(&request.address) && rule.matches(output.value, requested));

    match found {
        Some(output) => Ok(VerifyResult {
            seen: true,
            verified: true,
            ordered_amount: requested,
            block_explorer_amount: output.value,
            missing_amount: Amount::ZERO,
            missing_percent: 0.0,
        }),
        None => Err(AppError::NotFound(format!(
            "no payment of {} to {}",
            requested, request.address
        ))),
    }
}

/// Applies the confirmation threshold and fills in the verification fields.
fn settle(
    mut transaction: Transaction,
    value: Amount,
    request: &TxVerifyRequest,
) -> Result<Verification, AppError> {
    transaction.seen = true;

    if transaction.confirmations < request.confirms_required {
        debug!(
            hash = %transaction.hash,
            confirmations = transaction.confirmations,
            required = request.confirms_required,
            "Payment seen, waiting for confirmations"
        );
        let confirmations = transaction.confirmations;
        return Ok(Verification::AwaitingConfirmations {
            transaction,
            confirmations,
            required: request.confirms_required,
        });
    }

    let ordered = Amount::from_coins(request.amount)?;
    let discrepancy = Discrepancy::between(value, ordered);

    transaction.verified = true;
    transaction.ordered_amount = ordered;
    transaction.block_explorer_amount = value;
    transaction.missing_amount = discrepancy.missing_amount;
    transaction.missing_percent = discrepancy.missing_percent;

    debug!(
        hash = %transaction.hash,
        received = %value,
        missing = %discrepancy.missing_amount,
        "Payment verified"
    );
    Ok(Verification::Verified(transaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TxOutput;
    use crate::test_utils::MockExplorer;

    fn output(address: &str, coins: f64) -> TxOutput {
        TxOutput {
            addresses: vec![address.to_string()],
            value: Amount::from_coins(coins).unwrap(),
            ..Default::default()
        }
    }

    fn tx(hash: &str, confirmations: u64, outputs: Vec<TxOutput>) -> Transaction {
        Transaction {
            hash: hash.to_string(),
            confirmations,
            outputs,
            ..Default::default()
        }
    }

    #[test]
    fn test_discrepancy_is_exactly_zero_for_equal_amounts() {
        let a = Amount::from_coins(0.1 + 0.2).unwrap();
        let b = Amount::from_coins(0.3).unwrap();
        let d = Discrepancy::between(a, b);
        assert_eq!(d.missing_amount, Amount::ZERO);
        assert_eq!(d.missing_percent, 0.0);
    }

    #[test]
    fn test_discrepancy_percent_of_received() {
        let d = Discrepancy::between(
            Amount::from_coins(2.0).unwrap(),
            Amount::from_coins(1.5).unwrap(),
        );
        assert_eq!(d.missing_amount, Amount::from_coins(0.5).unwrap());
        assert!((d.missing_percent - 25.0).abs() < 1e-9);

        let under = Discrepancy::between(
            Amount::from_coins(1.0).unwrap(),
            Amount::from_coins(1.25).unwrap(),
        );
        assert_eq!(under.missing_amount, Amount::from_atoms(-25_000_000));
        assert!((under.missing_percent + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_discrepancy_zero_received() {
        let d = Discrepancy::between(Amount::ZERO, Amount::from_coins(1.0).unwrap());
        assert_eq!(d.missing_percent, 0.0);
    }

    #[test]
    fn test_amount_match_rules() {
        let requested = Amount::from_coins(100.0).unwrap();
        assert!(AmountMatch::Exact.matches(requested, requested));
        assert!(!AmountMatch::Exact.matches(Amount::from_coins(100.00001).unwrap(), requested));
        assert!(AmountMatch::approximate().matches(Amount::from_coins(100.009).unwrap(), requested));
        assert!(!AmountMatch::approximate().matches(Amount::from_coins(100.02).unwrap(), requested));
        assert!(!AmountMatch::approximate().matches(Amount::from_coins(200.0).unwrap(), requested));
    }

    #[tokio::test]
    async fn test_tx_id_strategy_verifies_exact_payment() {
        let explorer = MockExplorer::new().with_transaction(tx("t1", 1, vec![output("abc", 0.5)]));
        let request = TxVerifyRequest::new("abc", 0.5, 1).with_tx_id("t1");

        let verification = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap();

        let tx = verification.transaction();
        assert!(verification.is_verified());
        assert!(tx.seen);
        assert!(tx.verified);
        assert_eq!(tx.missing_amount, Amount::ZERO);
        assert_eq!(tx.missing_percent, 0.0);
    }

    #[tokio::test]
    async fn test_tx_id_strategy_waits_for_confirmations() {
        let explorer = MockExplorer::new().with_transaction(tx("t1", 0, vec![output("abc", 0.5)]));
        let request = TxVerifyRequest::new("abc", 0.5, 1).with_tx_id("t1");

        let verification = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap();

        assert!(verification.is_awaiting_confirmations());
        assert!(verification.transaction().seen);
        assert!(!verification.transaction().verified);
        assert!(verification.to_string().contains("(0/1)"));
    }

    #[tokio::test]
    async fn test_tx_id_strategy_takes_first_matching_output() {
        let explorer = MockExplorer::new().with_transaction(tx(
            "t1",
            3,
            vec![output("other", 9.0), output("abc", 0.4), output("abc", 0.5)],
        ));
        let request = TxVerifyRequest::new("abc", 0.5, 1).with_tx_id("t1");

        let tx = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap()
            .into_transaction();

        assert_eq!(tx.block_explorer_amount, Amount::from_coins(0.4).unwrap());
        assert!(tx.missing_amount.atoms() < 0);
    }

    #[tokio::test]
    async fn test_tx_id_strategy_no_matching_output() {
        let explorer = MockExplorer::new().with_transaction(tx("t1", 3, vec![output("other", 0.5)]));
        let request = TxVerifyRequest::new("abc", 0.5, 1).with_tx_id("t1");

        let result = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_history_strategy_respects_created_at() {
        let mut old = tx("old", 10, vec![output("abc", 0.5)]);
        old.time = 1_000;
        let mut fresh = tx("fresh", 2, vec![output("abc", 0.6)]);
        fresh.time = 2_000;
        // Newest first, as vendors return them
        let explorer = MockExplorer::new().with_history(vec![old.clone(), fresh.clone()]);

        let request = TxVerifyRequest::new("abc", 0.5, 1).with_created_at(1_500);
        let tx = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap()
            .into_transaction();
        assert_eq!(tx.hash, "fresh");

        let request = TxVerifyRequest::new("abc", 0.5, 1).with_created_at(5_000);
        let result = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_history_strategy_without_created_at_takes_first() {
        let explorer = MockExplorer::new().with_history(vec![
            tx("a", 0, vec![output("abc", 0.5)]),
            tx("b", 5, vec![output("abc", 0.5)]),
        ]);
        let request = TxVerifyRequest::new("abc", 0.5, 1);

        let verification = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap();
        assert!(verification.is_awaiting_confirmations());
        assert_eq!(verification.transaction().hash, "a");
    }

    #[tokio::test]
    async fn test_fetch_errors_propagate() {
        let explorer = MockExplorer::failing("explorer down");
        let request = TxVerifyRequest::new("abc", 0.5, 1).with_tx_id("t1");

        let result = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT).await;
        assert!(matches!(result, Err(AppError::Vendor { .. })));
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_fetch() {
        let explorer = MockExplorer::failing("must not be called");
        let request = TxVerifyRequest::new("", 0.5, 1).with_tx_id("t1");

        let result = verify_transaction(&explorer, &request, DEFAULT_HISTORY_LIMIT).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_verify_by_address_exact_and_approximate() {
        let explorer = MockExplorer::new().with_history(vec![tx(
            "a",
            1,
            vec![output("abc", 1.00005)],
        )]);
        let request = AddressVerifyRequest {
            address: "abc".to_string(),
            amount: 1.0,
            view_key: None,
        };

        let exact = verify_by_address(&explorer, &request, AmountMatch::Exact, 25).await;
        assert!(matches!(exact, Err(AppError::NotFound(_))));

        let approx = verify_by_address(&explorer, &request, AmountMatch::approximate(), 25)
            .await
            .unwrap();
        assert!(approx.seen && approx.verified);
        assert_eq!(approx.missing_amount, Amount::ZERO);
        assert_eq!(approx.missing_percent, 0.0);
        assert_eq!(approx.block_explorer_amount, Amount::from_coins(1.00005).unwrap());
    }
}
