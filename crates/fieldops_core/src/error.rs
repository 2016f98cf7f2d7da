#![forbid(unsafe_code)]

use fieldops_contracts::workorder::WorkOrderStatus;
use fieldops_contracts::ContractViolation;
use fieldops_storage::StorageError;

/// Caller-facing error taxonomy. `Forbidden` and `MissingReason` are
/// recoverable policy outcomes (hide the action, re-prompt for a reason);
/// `NotFound` and `Transport` propagate for user-visible failure messaging.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    Forbidden {
        permission: &'static str,
    },
    MissingReason {
        requested: WorkOrderStatus,
    },
    NotFound {
        entity: &'static str,
        key: String,
    },
    Transport {
        detail: String,
    },
    Contract(ContractViolation),
    Storage(StorageError),
}

impl From<ContractViolation> for CoreError {
    fn from(v: ContractViolation) -> Self {
        CoreError::Contract(v)
    }
}

impl From<StorageError> for CoreError {
    fn from(v: StorageError) -> Self {
        CoreError::Storage(v)
    }
}
