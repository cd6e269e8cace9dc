//! Vendor status vocabularies mapped onto [`OrderStatus`].
//!
//! Each exchange contributes one static [`StatusTable`]. Lookups never fail: anything a table does
//! not list maps to [`OrderStatus::Unknown`].

use super::types::OrderStatus;

/// Case-insensitive lookup table from vendor status strings to [`OrderStatus`]
#[derive(Debug)]
pub struct StatusTable {
    vendor: &'static str,
    entries: &'static [(&'static str, OrderStatus)],
}

impl StatusTable {
    pub const fn new(vendor: &'static str, entries: &'static [(&'static str, OrderStatus)]) -> Self {
        Self { vendor, entries }
    }

    pub fn vendor(&self) -> &'static str {
        self.vendor
    }

    pub fn entries(&self) -> &'static [(&'static str, OrderStatus)] {
        self.entries
    }

    pub fn map_status(&self, vendor_status: &str) -> OrderStatus {
        let needle = vendor_status.trim();
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(needle))
            .map(|(_, status)| *status)
            .unwrap_or(OrderStatus::Unknown)
    }
}

use OrderStatus::*;

pub static CHANGENOW: StatusTable = StatusTable::new(
    "changenow",
    &[
        ("finished", Completed),
        ("waiting", WaitingForDeposit),
        ("confirming", DepositReceived),
        ("refunded", Refunded),
        ("expired", Expired),
        ("new", New),
        ("exchanging", Exchanging),
        ("sending", Sending),
        ("failed", Failed),
    ],
);

pub static COINSWITCH: StatusTable = StatusTable::new(
    "coinswitch",
    &[
        ("finished", Completed),
        ("complete", Completed),
        ("no_deposit", New),
        ("confirming", DepositReceived),
        ("refunded", Refunded),
        ("timeout", Expired),
        ("new", New),
        ("exchanging", Exchanging),
        ("sending", Sending),
        ("failed", Failed),
    ],
);

pub static EASYBIT: StatusTable = StatusTable::new(
    "easybit",
    &[
        ("Awaiting Deposit", WaitingForDeposit),
        ("Confirming Deposit", DepositReceived),
        ("Exchanging", Exchanging),
        ("Sending", Sending),
        ("Complete", Completed),
        ("Refund", Refunded),
        ("Failed", Failed),
        ("Volatility Protection", Exchanging),
        ("Action Request", Exchanging),
        ("Request Overdue", Expired),
    ],
);

pub static EXCHCX: StatusTable = StatusTable::new(
    "exchcx",
    &[
        ("CREATED", New),
        ("CANCELLED", Canceled),
        ("AWAITING_INPUT", WaitingForDeposit),
        ("CONFIRMING_INPUT", WaitingForDeposit),
        ("EXCHANGING", Exchanging),
        ("FUNDED", DepositConfirmed),
        ("BRIDGING", Sending),
        ("CONFIRMING_SEND", Sending),
        ("COMPLETE", Completed),
        ("REFUND_REQUEST", Refunded),
        ("REFUND_PENDING", Refunded),
        ("CONFIRMING_REFUND", Refunded),
        ("REFUNDED", Refunded),
    ],
);

pub static EXOLIX: StatusTable = StatusTable::new(
    "exolix",
    &[
        ("wait", WaitingForDeposit),
        ("confirmation", DepositReceived),
        ("confirmed", DepositConfirmed),
        ("exchanging", Exchanging),
        ("sending", Sending),
        ("success", Completed),
        ("overdue", Failed),
        ("refunded", Refunded),
    ],
);

pub static FIXEDFLOAT: StatusTable = StatusTable::new(
    "fixedfloat",
    &[
        ("NEW", WaitingForDeposit),
        ("PENDING", DepositReceived),
        ("EXCHANGE", Exchanging),
        ("WITHDRAW", Sending),
        ("DONE", Completed),
        ("EXPIRED", Expired),
        ("EMERGENCY", Failed),
    ],
);

pub static SIMPLESWAP: StatusTable = StatusTable::new(
    "simpleswap",
    &[
        ("closed", Canceled),
        ("confirming", DepositReceived),
        ("exchanging", Exchanging),
        ("expired", Expired),
        ("failed", Failed),
        ("finished", Completed),
        ("refunded", Refunded),
        ("sending", Sending),
        ("verifying", DepositReceived),
        ("waiting", WaitingForDeposit),
    ],
);

pub static STEALTHEX: StatusTable = StatusTable::new(
    "stealthex",
    &[
        ("waiting", WaitingForDeposit),
        ("confirming", DepositReceived),
        ("exchanging", Exchanging),
        ("sending", Sending),
        ("finished", Completed),
        ("failed", Failed),
        ("refunded", Refunded),
        ("verifying", DepositReceived),
    ],
);

pub static SWAPZONE: StatusTable = StatusTable::new(
    "swapzone",
    &[
        ("waiting", New),
        ("confirming", DepositReceived),
        ("exchanging", Exchanging),
        ("sending", Sending),
        ("finished", Completed),
        ("refunded", Refunded),
        ("failed", Failed),
        ("overdue", Expired),
    ],
);

pub static TROCADOR: StatusTable = StatusTable::new(
    "trocador",
    &[
        ("new", New),
        ("waiting", WaitingForDeposit),
        ("confirming", WaitingForDeposit),
        ("sending", Sending),
        ("finished", Completed),
        ("failed", Failed),
        ("expired", Expired),
        ("halted", Failed),
        ("refunded", Refunded),
    ],
);

pub static WIZARDSWAP: StatusTable = StatusTable::new(
    "wizardswap",
    &[
        ("waiting", WaitingForDeposit),
        ("confirming", DepositReceived),
        ("exchanging", Exchanging),
        ("sending", Sending),
        ("finished", Completed),
        ("failed", Failed),
        ("refunded", Refunded),
        ("verifying", DepositReceived),
    ],
);

pub static ALL_TABLES: &[&StatusTable] = &[
    &CHANGENOW,
    &COINSWITCH,
    &EASYBIT,
    &EXCHCX,
    &EXOLIX,
    &FIXEDFLOAT,
    &SIMPLESWAP,
    &STEALTHEX,
    &SWAPZONE,
    &TROCADOR,
    &WIZARDSWAP,
];

/// Finds a vendor's table by name, ignoring case
pub fn status_table(vendor: &str) -> Option<&'static StatusTable> {
    ALL_TABLES
        .iter()
        .copied()
        .find(|table| table.vendor.eq_ignore_ascii_case(vendor.trim()))
}
