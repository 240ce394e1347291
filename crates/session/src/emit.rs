// This file is part of Delegator.
//
// Delegator is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Delegator is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Delegator.
// If not, see https://www.gnu.org/licenses/.

use std::fmt::Display;

use alloy_primitives::{Address, TxHash};
use delegator_types::{CallId, DelegationStatus};
use tracing::Level;

/// Session operations, as reported in events and metrics
#[derive(Clone, Copy, Debug, PartialEq, Eq, parse_display::Display)]
#[display(style = "kebab-case")]
pub enum Operation {
    /// Bind an account
    Connect,
    /// Apply an account change reported by the wallet
    SwitchAccount,
    /// Re-read the delegation status
    RefreshStatus,
    /// Read the account balance
    ReadBalance,
    /// Edit the pending call list
    EditCalls,
    /// Delegate the account's code to a contract
    CreateDelegation,
    /// Execute the pending calls from the account
    ExecuteBatch,
    /// Execute the pending calls through a sponsor
    ExecuteSponsoredBatch,
    /// Clear the account's delegation
    RevokeDelegation,
}

/// Event type for the session
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// An account was bound
    Connected {
        /// Bound account
        account: Address,
        /// Its delegation status at connect time
        status: DelegationStatus,
        /// Chain the session operates on
        chain_id: u64,
    },
    /// The wallet switched to another account, all session data was reset
    AccountChanged {
        /// Newly active account
        account: Address,
    },
    /// The wallet disconnected, all session data was reset
    Disconnected,
    /// The delegation status was read from chain
    StatusResolved {
        /// Account whose code was read
        account: Address,
        /// Classified status
        status: DelegationStatus,
    },
    /// A call was appended to the pending list
    CallAdded {
        /// Id of the new call
        id: CallId,
    },
    /// A pending call was edited
    CallUpdated {
        /// Id of the edited call
        id: CallId,
    },
    /// A call was removed from the pending list
    CallRemoved {
        /// Id of the removed call
        id: CallId,
    },
    /// A transaction was accepted by the node
    TransactionSubmitted {
        /// Operation that produced the transaction
        operation: Operation,
        /// Transaction sender
        from: Address,
        /// Transaction hash
        tx_hash: TxHash,
    },
    /// A submitted transaction was mined
    TransactionMined {
        /// Transaction hash
        tx_hash: TxHash,
        /// Block it was included in
        block_number: Option<u64>,
        /// Whether execution succeeded
        success: bool,
    },
    /// An operation failed. Session state is unchanged.
    OperationFailed {
        /// Failed operation
        operation: Operation,
        /// Rendered error
        error: String,
    },
}

impl SessionEvent {
    /// Level the event is logged at
    pub fn level(&self) -> Level {
        match self {
            SessionEvent::OperationFailed { .. }
            | SessionEvent::TransactionMined { success: false, .. } => Level::WARN,
            SessionEvent::CallAdded { .. }
            | SessionEvent::CallUpdated { .. }
            | SessionEvent::CallRemoved { .. } => Level::DEBUG,
            _ => Level::INFO,
        }
    }
}

impl Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Connected {
                account,
                status,
                chain_id,
            } => write!(
                f,
                concat!(
                    "Connected.",
                    "    Account: {:?}",
                    "    Status: {}",
                    "    Chain id: {}"
                ),
                account, status, chain_id,
            ),
            SessionEvent::AccountChanged { account } => {
                write!(f, concat!("Account changed.", "    Account: {:?}"), account)
            }
            SessionEvent::Disconnected => write!(f, "Disconnected."),
            SessionEvent::StatusResolved { account, status } => write!(
                f,
                concat!("Resolved status.", "    Account: {:?}", "    Status: {}"),
                account, status,
            ),
            SessionEvent::CallAdded { id } => write!(f, "Added call {id}."),
            SessionEvent::CallUpdated { id } => write!(f, "Updated call {id}."),
            SessionEvent::CallRemoved { id } => write!(f, "Removed call {id}."),
            SessionEvent::TransactionSubmitted {
                operation,
                from,
                tx_hash,
            } => write!(
                f,
                concat!(
                    "Submitted transaction.",
                    "    Operation: {}",
                    "    From: {:?}",
                    "    Tx hash: {:?}"
                ),
                operation, from, tx_hash,
            ),
            SessionEvent::TransactionMined {
                tx_hash,
                block_number,
                success,
            } => write!(
                f,
                concat!(
                    "Transaction mined.",
                    "    Tx hash: {:?}",
                    "    Block: {}",
                    "    Success: {}"
                ),
                tx_hash,
                block_number.map_or_else(|| "pending".to_string(), |n| n.to_string()),
                success,
            ),
            SessionEvent::OperationFailed { operation, error } => write!(
                f,
                concat!("Operation failed.", "    Operation: {}", "    Error: {}"),
                operation, error,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::CreateDelegation.to_string(), "create-delegation");
        assert_eq!(
            Operation::ExecuteSponsoredBatch.to_string(),
            "execute-sponsored-batch"
        );
    }

    #[test]
    fn test_event_level() {
        let failed = SessionEvent::OperationFailed {
            operation: Operation::RevokeDelegation,
            error: "busy".to_string(),
        };
        assert_eq!(failed.level(), Level::WARN);
        let reverted = SessionEvent::TransactionMined {
            tx_hash: TxHash::ZERO,
            block_number: Some(1),
            success: false,
        };
        assert_eq!(reverted.level(), Level::WARN);
        assert_eq!(SessionEvent::CallAdded { id: CallId(0) }.level(), Level::DEBUG);
        assert_eq!(SessionEvent::Disconnected.level(), Level::INFO);
    }

    #[test]
    fn test_event_display() {
        let event = SessionEvent::OperationFailed {
            operation: Operation::RevokeDelegation,
            error: "session is not connected".to_string(),
        };
        assert_eq!(
            event.to_string(),
            "Operation failed.    Operation: revoke-delegation    Error: session is not connected"
        );
    }
}
