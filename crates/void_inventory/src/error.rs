//! Error types for inventory operations

use crate::item::Item;
use std::fmt;
use thiserror::Error;

/// Result type for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Errors that can occur in the inventory storage layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Bad index, non-positive quantity, or an item that fails validation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Group full, slot full, or a pool at its strict limit
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Item type is not supported by the target group or slot
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Group, slot or item absent
    #[error("Not found: {0}")]
    NotFound(String),
}

impl InventoryError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        InventoryError::InvalidArgument(message.into())
    }

    /// Create a capacity exceeded error
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        InventoryError::CapacityExceeded(message.into())
    }

    /// Create a type mismatch error
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        InventoryError::TypeMismatch(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        InventoryError::NotFound(message.into())
    }

    /// The bare message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            InventoryError::InvalidArgument(msg)
            | InventoryError::CapacityExceeded(msg)
            | InventoryError::TypeMismatch(msg)
            | InventoryError::NotFound(msg) => msg,
        }
    }
}

/// An item that could not be stored, handed back to the caller.
///
/// For a stackable item that was partially merged before the failure, `item`
/// carries only the unplaced remainder.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Rejected {
    pub error: InventoryError,
    pub item: Item,
}

impl Rejected {
    pub fn new(error: InventoryError, item: Item) -> Self {
        Self { error, item }
    }

    /// Split into the error and the returned item
    pub fn into_parts(self) -> (InventoryError, Item) {
        (self.error, self.item)
    }
}

/// A cross-group transfer that did not complete
#[derive(Debug, Error)]
pub enum TransferError {
    /// The item is back in its source slot. If a destination stack absorbed
    /// part of it before the overflow was refused, those units stay in the
    /// destination and only the remainder went back.
    #[error("Transfer failed: {0}")]
    Failed(InventoryError),

    /// The destination refused the item and so did the source slot.
    /// The caller now holds the item.
    #[error("Transfer failed and rollback failed: {0}")]
    Stranded(Rejected),
}

impl TransferError {
    /// The underlying reason the destination refused the item
    pub fn error(&self) -> &InventoryError {
        match self {
            TransferError::Failed(error) => error,
            TransferError::Stranded(rejected) => &rejected.error,
        }
    }
}

/// Flat success/message outcome for collaborators that do not want typed errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    /// A successful outcome
    pub fn ok() -> Self {
        Self {
            success: true,
            message: "Success".to_string(),
        }
    }

    /// A failed outcome with a reason
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            message: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }
}

impl Default for OperationResult {
    fn default() -> Self {
        Self {
            success: false,
            message: String::new(),
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "ok: {}", self.message)
        } else {
            write!(f, "failed: {}", self.message)
        }
    }
}

impl<T, E: fmt::Display> From<&std::result::Result<T, E>> for OperationResult {
    fn from(result: &std::result::Result<T, E>) -> Self {
        match result {
            Ok(_) => OperationResult::ok(),
            Err(e) => OperationResult::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_from_result() {
        let ok: Result<u32> = Ok(3);
        let outcome = OperationResult::from(&ok);
        assert!(outcome.is_ok());
        assert_eq!(outcome.message, "Success");

        let err: Result<u32> = Err(InventoryError::not_found("Slot 4"));
        let outcome = OperationResult::from(&err);
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Not found: Slot 4");
    }

    #[test]
    fn test_error_message() {
        let err = InventoryError::capacity_exceeded("Inventory is full");
        assert_eq!(err.message(), "Inventory is full");
        assert_eq!(err.to_string(), "Capacity exceeded: Inventory is full");
    }
}
