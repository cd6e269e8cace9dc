//! Canonical transaction model and verification request/result types.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::amount::Amount;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TxInput {
    pub script: String,
    pub sequence: u64,
    pub prev_tx_id: String,
    pub prev_vout: u32,
    pub amount_in: Amount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TxOutput {
    pub addresses: Vec<String>,
    pub index: u32,
    pub value: Amount,
    pub spent: bool,
    pub script_type: String,
}

impl TxOutput {
    /// Whether any address on this output is `address`.
    ///
    /// `0x` hex addresses compare case-insensitively since their case only carries a checksum.
    pub fn pays_to(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| addresses_match(a, address))
    }
}

pub fn addresses_match(a: &str, b: &str) -> bool {
    if a.starts_with("0x") && b.starts_with("0x") {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

/// Vendor-neutral transaction with verification fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub hash: String,
    pub block_height: u64,
    pub lock_time: u64,
    /// Unix seconds; zero when the vendor does not report it
    pub time: i64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub confirmations: u64,

    pub seen: bool,
    pub verified: bool,
    pub ordered_amount: Amount,
    pub block_explorer_amount: Amount,
    pub missing_amount: Amount,
    pub missing_percent: f64,
}

/// Recent activity of one address, newest first as the vendor returns it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AddressHistory {
    pub address: String,
    pub txs: Vec<Transaction>,
}

/// Request to verify a claimed payment
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TxVerifyRequest {
    /// Selects verification by transaction id when present
    pub tx_id: Option<String>,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(range(min = 0.00000001, message = "Amount must be at least one atom"))]
    pub amount: f64,
    /// Unix seconds; history entries older than this are skipped
    pub created_at: Option<i64>,
    pub confirms_required: u64,
    pub view_key: Option<String>,
}

impl TxVerifyRequest {
    #[must_use]
    pub fn new(address: impl Into<String>, amount: f64, confirms_required: u64) -> Self {
        Self {
            address: address.into(),
            amount,
            confirms_required,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.tx_id = Some(tx_id.into());
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    #[must_use]
    pub fn with_view_key(mut self, view_key: impl Into<String>) -> Self {
        self.view_key = Some(view_key.into());
        self
    }

    /// Transaction id, treating an empty string as absent
    pub fn tx_id(&self) -> Option<&str> {
        self.tx_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

/// Request for address-only verification
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AddressVerifyRequest {
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(range(min = 0.00000001, message = "Amount must be at least one atom"))]
    pub amount: f64,
    pub view_key: Option<String>,
}

/// Outcome of address-only verification
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerifyResult {
    pub seen: bool,
    pub verified: bool,
    pub ordered_amount: Amount,
    pub block_explorer_amount: Amount,
    pub missing_amount: Amount,
    pub missing_percent: f64,
}

/// Outcome of transaction verification.
///
/// A payment that is visible but not deep enough is a normal intermediate state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Verification {
    Verified(Transaction),
    AwaitingConfirmations {
        transaction: Transaction,
        confirmations: u64,
        required: u64,
    },
}

impl Verification {
    pub fn transaction(&self) -> &Transaction {
        match self {
            Self::Verified(tx) => tx,
            Self::AwaitingConfirmations { transaction, .. } => transaction,
        }
    }

    pub fn into_transaction(self) -> Transaction {
        match self {
            Self::Verified(tx) => tx,
            Self::AwaitingConfirmations { transaction, .. } => transaction,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    pub fn is_awaiting_confirmations(&self) -> bool {
        matches!(self, Self::AwaitingConfirmations { .. })
    }
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified(tx) => write!(
                f,
                "verified {} (received {}, missing {})",
                tx.hash, tx.block_explorer_amount, tx.missing_amount
            ),
            Self::AwaitingConfirmations {
                transaction,
                confirmations,
                required,
            } => write!(
                f,
                "seen {}, waiting for confirmations ({}/{})",
                transaction.hash, confirmations, required
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pays_to_hex_addresses_ignore_case() {
        let output = TxOutput {
            addresses: vec!["0xAbCdef0123".to_string()],
            ..Default::default()
        };
        assert!(output.pays_to("0xabcdef0123"));
        assert!(!output.pays_to("0xabcdef0124"));
    }

    #[test]
    fn test_pays_to_base58_is_case_sensitive() {
        let output = TxOutput {
            addresses: vec!["LcHKx9a".to_string(), "Dsabc".to_string()],
            ..Default::default()
        };
        assert!(output.pays_to("Dsabc"));
        assert!(!output.pays_to("lchkx9a"));
    }

    #[test]
    fn test_verify_request_validation() {
        assert!(TxVerifyRequest::new("addr", 0.5, 1).validate().is_ok());
        assert!(TxVerifyRequest::new("", 0.5, 1).validate().is_err());
        assert!(TxVerifyRequest::new("addr", 0.0, 1).validate().is_err());
        assert!(TxVerifyRequest::new("addr", -1.0, 1).validate().is_err());
    }

    #[test]
    fn test_amount_below_one_atom_is_rejected() {
        assert!(TxVerifyRequest::new("addr", 0.000000001, 1).validate().is_err());
        assert!(TxVerifyRequest::new("addr", 0.00000001, 1).validate().is_ok());
        let request = AddressVerifyRequest {
            address: "addr".to_string(),
            amount: 0.000000001,
            view_key: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_blank_tx_id_is_absent() {
        let request = TxVerifyRequest::new("addr", 1.0, 0).with_tx_id("  ");
        assert_eq!(request.tx_id(), None);
        let request = TxVerifyRequest::new("addr", 1.0, 0).with_tx_id("abc");
        assert_eq!(request.tx_id(), Some("abc"));
    }

    #[test]
    fn test_waiting_condition_is_descriptive() {
        let verification = Verification::AwaitingConfirmations {
            transaction: Transaction {
                hash: "deadbeef".to_string(),
                seen: true,
                ..Default::default()
            },
            confirmations: 0,
            required: 1,
        };
        assert!(!verification.is_verified());
        assert_eq!(
            verification.to_string(),
            "seen deadbeef, waiting for confirmations (0/1)"
        );
    }
}
