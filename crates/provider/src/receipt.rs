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

use std::time::Duration;

use alloy_primitives::TxHash;
use anyhow::anyhow;

use crate::{EvmProvider, MinedTransaction, ProviderError, ProviderResult};

/// Receipt polling settings
#[derive(Clone, Copy, Debug)]
pub struct ReceiptPollSettings {
    /// Delay between two receipt queries
    pub poll_interval: Duration,
    /// Number of queries before giving up
    pub max_polls: u64,
}

impl Default for ReceiptPollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: 90,
        }
    }
}

/// Wait for a transaction to be mined.
///
/// Errors are returned as soon as a receipt query fails. Exhausting the poll
/// budget yields `Ok(None)`; the transaction may still land later.
pub async fn wait_for_txn<P: EvmProvider>(
    provider: &P,
    tx_hash: TxHash,
    settings: ReceiptPollSettings,
) -> ProviderResult<Option<MinedTransaction>> {
    if settings.max_polls == 0 {
        return Err(ProviderError::Other(anyhow!("max_polls must be positive")));
    }

    for attempt in 1..=settings.max_polls {
        if let Some(mined) = provider.get_transaction_receipt(tx_hash).await? {
            tracing::debug!("transaction {tx_hash} mined after {attempt} polls");
            return Ok(Some(mined));
        }
        if attempt < settings.max_polls {
            tokio::time::sleep(settings.poll_interval).await;
        }
    }

    tracing::warn!(
        "transaction {tx_hash} not mined after {} polls",
        settings.max_polls
    );
    Ok(None)
}
