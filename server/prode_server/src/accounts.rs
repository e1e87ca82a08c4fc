use serde::{Deserialize, Serialize};

/// A bank account entry fees get transferred to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepositAccount {
    pub bank: String,
    pub alias: String,
    pub cbu: String,
    pub holder: String,
}

impl DepositAccount {
    /// Placeholder accounts; real ones come from `PRODE_ACCOUNTS`.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                bank: "Banco Uno".to_string(),
                alias: "prode.cuenta.uno".to_string(),
                cbu: "0000000000000000000001".to_string(),
                holder: "Prode Cuenta 1".to_string(),
            },
            Self {
                bank: "Banco Dos".to_string(),
                alias: "prode.cuenta.dos".to_string(),
                cbu: "0000000000000000000002".to_string(),
                holder: "Prode Cuenta 2".to_string(),
            },
            Self {
                bank: "Banco Tres".to_string(),
                alias: "prode.cuenta.tres".to_string(),
                cbu: "0000000000000000000003".to_string(),
                holder: "Prode Cuenta 3".to_string(),
            },
        ]
    }
}

/// Pick which account to show, spreading transfer volume: one account per
/// `batch_size` processed proofs, sticking with the last account once the
/// list is exhausted. Monotonic in `processed_count`, never wraps.
pub fn active_account(
    accounts: &[DepositAccount],
    processed_count: i64,
    batch_size: i64,
) -> Option<&DepositAccount> {
    if accounts.is_empty() {
        return None;
    }
    let batch_size = batch_size.max(1);
    let index = (processed_count.max(0) / batch_size) as usize;
    Some(&accounts[index.min(accounts.len() - 1)])
}
