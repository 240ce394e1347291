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

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use alloy_primitives::{Address, Bytes, TxHash, U256};
use anyhow::Context;
use delegator_contracts::delegate::{
    decode_nonce, encode_execute, encode_execute_with_signature, encode_nonce,
    sponsored_execution_hash, Call,
};
use delegator_provider::{wait_for_txn, EvmProvider, MinedTransaction, ReceiptPollSettings};
use delegator_signer::Wallet;
use delegator_types::{CallField, CallId, DelegationStatus, PendingCall, TransactionDescriptor};
use delegator_utils::log::LogOnError;
use parking_lot::Mutex;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::{
    assembler::BatchCallAssembler,
    authorization::{AuthorizationBuilder, DelegateTarget, SignedDelegation},
    binder::{active_account, WalletBinder},
    emit::{Operation, SessionEvent},
    metrics::SessionMetrics,
    resolver::DelegationStatusResolver,
    SessionError, SessionResult,
};

/// Session settings
#[derive(Clone, Debug, Default)]
pub struct SessionSettings {
    /// Chain id to sign for. Asked from the wallet when unset.
    pub chain_id: Option<u64>,
    /// Receipt polling used after every submission
    pub receipt_poll: ReceiptPollSettings,
    /// Delegate bundled with a batch executed from an undelegated account
    /// when the caller does not name one
    pub default_delegate: Option<Address>,
}

/// Observable session state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No account bound
    Disconnected,
    /// An account is bound
    Connected {
        /// Bound account
        account: Address,
        /// Last resolved delegation status
        status: DelegationStatus,
    },
}

/// Result of a mined submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Inclusion details
    pub receipt: MinedTransaction,
    /// Delegation status read after inclusion. `None` for sponsored
    /// executions, which leave the status to a manual refresh, and when the
    /// read failed.
    pub status: Option<DelegationStatus>,
}

#[derive(Clone, Copy, Debug)]
struct Binding {
    account: Address,
    chain_id: u64,
    status: DelegationStatus,
}

#[derive(Debug, Default)]
struct SessionState {
    // bumped on every account change, results of older operations are dropped
    epoch: u64,
    binding: Option<Binding>,
    calls: BatchCallAssembler,
}

/// Snapshot of the binding an operation runs against
#[derive(Clone, Copy, Debug)]
struct Bound {
    account: Address,
    chain_id: u64,
    status: DelegationStatus,
    epoch: u64,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Tracks one account's EIP-7702 delegation lifecycle.
///
/// State changing operations (create, execute, revoke) are serialized by a
/// busy latch: a request made while another is in flight fails with
/// [`SessionError::Busy`] instead of waiting. Every failure leaves the session
/// state as it was, is logged and is published as
/// [`SessionEvent::OperationFailed`]. Nothing is retried.
pub struct DelegationSession<P, W> {
    settings: SessionSettings,
    provider: P,
    wallet: Arc<W>,
    binder: WalletBinder<Arc<W>>,
    resolver: DelegationStatusResolver<P>,
    authorizer: AuthorizationBuilder<P, Arc<W>>,
    sponsor: Option<Arc<dyn Wallet>>,
    state: Mutex<SessionState>,
    busy: AtomicBool,
    event_sender: broadcast::Sender<SessionEvent>,
}

impl<P, W> DelegationSession<P, W>
where
    P: EvmProvider + Clone,
    W: Wallet,
{
    /// Create a disconnected session
    pub fn new(
        provider: P,
        wallet: W,
        settings: SessionSettings,
        event_sender: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let wallet = Arc::new(wallet);
        Self {
            settings,
            binder: WalletBinder::new(Arc::clone(&wallet)),
            resolver: DelegationStatusResolver::new(provider.clone()),
            authorizer: AuthorizationBuilder::new(provider.clone(), Arc::clone(&wallet)),
            provider,
            wallet,
            sponsor: None,
            state: Mutex::new(SessionState::default()),
            busy: AtomicBool::new(false),
            event_sender,
        }
    }

    /// Use `sponsor` to submit sponsored batch executions
    pub fn with_sponsor(mut self, sponsor: Arc<dyn Wallet>) -> Self {
        self.sponsor = Some(sponsor);
        self
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }

    /// Current session state
    pub fn phase(&self) -> SessionPhase {
        match self.state.lock().binding {
            Some(binding) => SessionPhase::Connected {
                account: binding.account,
                status: binding.status,
            },
            None => SessionPhase::Disconnected,
        }
    }

    /// True while a state changing operation is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Bind the wallet's active account and resolve its delegation status
    pub async fn connect(&self) -> SessionResult<SessionPhase> {
        self.tracked(Operation::Connect, self.do_connect()).await
    }

    /// Drop the bound account and every piece of session data
    pub async fn disconnect(&self) -> SessionResult<()> {
        self.handle_accounts_changed(vec![]).await
    }

    /// Apply an account list reported by the wallet.
    ///
    /// Any change of the active account resets the session first. An empty
    /// list leaves it disconnected, otherwise the new account is bound and
    /// resolved.
    pub async fn handle_accounts_changed(&self, accounts: Vec<Address>) -> SessionResult<()> {
        self.tracked(
            Operation::SwitchAccount,
            self.do_handle_accounts_changed(accounts),
        )
        .await
    }

    /// Re-read the bound account's delegation status
    pub async fn refresh_status(&self) -> SessionResult<DelegationStatus> {
        self.tracked(Operation::RefreshStatus, async {
            let bound = self.bound()?;
            self.resolve_for(&bound).await
        })
        .await
    }

    /// Native balance of the bound account
    pub async fn account_balance(&self) -> SessionResult<U256> {
        self.tracked(Operation::ReadBalance, async {
            let bound = self.bound()?;
            self.resolver.balance(bound.account).await
        })
        .await
    }

    /// Validate raw input and append a call to the pending list
    pub fn add_call(&self, target: &str, value: &str, data: &str) -> SessionResult<CallId> {
        let metrics = self.start(Operation::EditCalls);
        let result = self.state.lock().calls.add(target, value, data);
        if let Ok(id) = &result {
            self.emit(SessionEvent::CallAdded { id: *id });
        }
        self.finish(Operation::EditCalls, &metrics, result)
    }

    /// Replace one field of a pending call
    pub fn update_call(&self, id: CallId, field: CallField, raw: &str) -> SessionResult<()> {
        let metrics = self.start(Operation::EditCalls);
        let result = self.state.lock().calls.update(id, field, raw);
        if result.is_ok() {
            self.emit(SessionEvent::CallUpdated { id });
        }
        self.finish(Operation::EditCalls, &metrics, result)
    }

    /// Remove a pending call. Unknown ids are ignored.
    pub fn remove_call(&self, id: CallId) -> Option<PendingCall> {
        let removed = self.state.lock().calls.remove(id);
        if removed.is_some() {
            self.emit(SessionEvent::CallRemoved { id });
        }
        removed
    }

    /// Pending calls in execution order
    pub fn calls(&self) -> Vec<(CallId, PendingCall)> {
        self.state.lock().calls.list().to_vec()
    }

    /// Delegate the undelegated bound account to `delegate`.
    ///
    /// Submits a self-addressed type-4 transaction with empty calldata whose
    /// authorization list holds the single authorization.
    pub async fn create_delegation(&self, delegate: Address) -> SessionResult<SubmissionOutcome> {
        self.exclusive(
            Operation::CreateDelegation,
            self.do_create_delegation(delegate),
        )
        .await
    }

    /// Execute the pending calls from the bound account.
    ///
    /// An undelegated account bundles the delegation to `delegate` (or the
    /// configured default) with the execution in one type-4 transaction. A
    /// delegated account calls its own code directly.
    pub async fn execute_batch(
        &self,
        delegate: Option<Address>,
    ) -> SessionResult<SubmissionOutcome> {
        self.exclusive(Operation::ExecuteBatch, self.do_execute_batch(delegate))
            .await
    }

    /// Sign the pending calls as an EIP-712 `BatchExecution` and let the
    /// sponsor wallet submit them to the delegated account.
    ///
    /// The delegation status is left untouched, see [`Self::refresh_status`].
    pub async fn execute_sponsored_batch(&self) -> SessionResult<SubmissionOutcome> {
        self.exclusive(
            Operation::ExecuteSponsoredBatch,
            self.do_execute_sponsored_batch(),
        )
        .await
    }

    /// Clear the bound account's delegation
    pub async fn revoke_delegation(&self) -> SessionResult<SubmissionOutcome> {
        self.exclusive(Operation::RevokeDelegation, self.do_revoke_delegation())
            .await
    }

    async fn do_connect(&self) -> SessionResult<SessionPhase> {
        let account = self.binder.connect().await?;
        let chain_id = self.chain_id().await?;
        let status = self.resolver.resolve(account).await?;

        {
            let mut state = self.state.lock();
            if state.binding.map(|b| b.account) != Some(account) {
                state.epoch += 1;
                state.calls.clear();
            }
            state.binding = Some(Binding {
                account,
                chain_id,
                status,
            });
        }

        tracing::info!("connected {account} on chain {chain_id}: {status}");
        self.emit(SessionEvent::Connected {
            account,
            status,
            chain_id,
        });
        Ok(SessionPhase::Connected { account, status })
    }

    async fn do_handle_accounts_changed(&self, accounts: Vec<Address>) -> SessionResult<()> {
        let active = active_account(&accounts);
        let epoch = {
            let mut state = self.state.lock();
            if state.binding.map(|b| b.account) == active {
                return Ok(());
            }
            state.epoch += 1;
            state.binding = None;
            state.calls.clear();
            state.epoch
        };

        let Some(account) = active else {
            tracing::info!("wallet disconnected, session reset");
            self.emit(SessionEvent::Disconnected);
            return Ok(());
        };

        tracing::info!("wallet switched to {account}, session reset");
        self.emit(SessionEvent::AccountChanged { account });

        let chain_id = self.chain_id().await?;
        let status = self.resolver.resolve(account).await?;
        let bound = {
            let mut state = self.state.lock();
            if state.epoch == epoch {
                state.binding = Some(Binding {
                    account,
                    chain_id,
                    status,
                });
                true
            } else {
                false
            }
        };
        if bound {
            self.emit(SessionEvent::StatusResolved { account, status });
        }
        Ok(())
    }

    async fn do_create_delegation(&self, delegate: Address) -> SessionResult<SubmissionOutcome> {
        let target = DelegateTarget::contract(delegate)?;
        let bound = self.bound()?;
        if bound.status != DelegationStatus::Undelegated {
            return Err(SessionError::InvalidState {
                operation: "create a delegation",
                status: bound.status,
            });
        }

        let signed = self
            .authorizer
            .build(bound.account, target, bound.chain_id)
            .await?;
        self.submit_authorized(Operation::CreateDelegation, &bound, signed, Bytes::new())
            .await
    }

    async fn do_execute_batch(
        &self,
        delegate: Option<Address>,
    ) -> SessionResult<SubmissionOutcome> {
        let bound = self.bound()?;
        let calls = self.pending_calls()?;

        match bound.status {
            DelegationStatus::Undelegated => {
                let delegate = delegate
                    .or(self.settings.default_delegate)
                    .ok_or_else(|| {
                        SessionError::InvalidDelegateAddress(
                            "no delegate to bundle with the batch".to_string(),
                        )
                    })?;
                let target = DelegateTarget::contract(delegate)?;
                let signed = self
                    .authorizer
                    .build(bound.account, target, bound.chain_id)
                    .await?;
                self.submit_authorized(
                    Operation::ExecuteBatch,
                    &bound,
                    signed,
                    encode_execute(calls),
                )
                .await
            }
            DelegationStatus::DelegatedTo(current) => {
                if let Some(requested) = delegate.filter(|d| *d != current) {
                    tracing::warn!(
                        "ignoring delegate {requested}, {} is already delegated to {current}",
                        bound.account
                    );
                }
                let tx = TransactionDescriptor {
                    from: bound.account,
                    to: bound.account,
                    value: U256::ZERO,
                    data: encode_execute(calls),
                    nonce: None,
                    authorization_list: vec![],
                };
                self.submit(Operation::ExecuteBatch, &bound, &*self.wallet, tx, true)
                    .await
            }
            DelegationStatus::OtherCode => Err(SessionError::InvalidState {
                operation: "execute a batch",
                status: bound.status,
            }),
        }
    }

    async fn do_execute_sponsored_batch(&self) -> SessionResult<SubmissionOutcome> {
        let bound = self.bound()?;
        if !bound.status.is_delegated() {
            return Err(SessionError::InvalidState {
                operation: "execute a sponsored batch",
                status: bound.status,
            });
        }
        let sponsor = self.sponsor.as_ref().ok_or(SessionError::SponsorUnavailable)?;
        let calls = self.pending_calls()?;

        let sponsor_account = active_account(&sponsor.request_accounts().await?)
            .ok_or(SessionError::SponsorUnavailable)?;
        let nonce = self.executor_nonce(&bound).await?;
        let signing_hash =
            sponsored_execution_hash(bound.chain_id, bound.account, nonce, calls.clone());
        let signature = self
            .wallet
            .sign_typed_hash(bound.account, signing_hash)
            .await?;

        let tx = TransactionDescriptor {
            from: sponsor_account,
            to: bound.account,
            value: U256::ZERO,
            data: encode_execute_with_signature(
                calls,
                Bytes::copy_from_slice(&signature.as_bytes()),
            ),
            nonce: None,
            authorization_list: vec![],
        };
        self.submit(
            Operation::ExecuteSponsoredBatch,
            &bound,
            sponsor.as_ref(),
            tx,
            false,
        )
        .await
    }

    async fn do_revoke_delegation(&self) -> SessionResult<SubmissionOutcome> {
        let bound = self.bound()?;
        if !bound.status.is_delegated() {
            return Err(SessionError::InvalidState {
                operation: "revoke a delegation",
                status: bound.status,
            });
        }

        let signed = self
            .authorizer
            .build(bound.account, DelegateTarget::Revoke, bound.chain_id)
            .await?;
        self.submit_authorized(Operation::RevokeDelegation, &bound, signed, Bytes::new())
            .await
    }

    async fn submit_authorized(
        &self,
        operation: Operation,
        bound: &Bound,
        signed: SignedDelegation,
        data: Bytes,
    ) -> SessionResult<SubmissionOutcome> {
        if let Err(error) = self.authorizer.ensure_current(bound.account, &signed).await {
            if error.requires_status_refresh() {
                self.refresh_after_failure(bound).await;
            }
            return Err(error);
        }
        let tx = TransactionDescriptor {
            from: bound.account,
            to: bound.account,
            value: U256::ZERO,
            data,
            nonce: Some(signed.tx_nonce),
            authorization_list: vec![signed.authorization],
        };
        self.submit(operation, bound, &*self.wallet, tx, true).await
    }

    /// Send `tx` through `wallet` and wait for it to be mined. When
    /// `resolve_status` is set the delegation status is read again afterwards,
    /// whatever the outcome. A failed read leaves `status` empty.
    async fn submit<S: Wallet + ?Sized>(
        &self,
        operation: Operation,
        bound: &Bound,
        wallet: &S,
        tx: TransactionDescriptor,
        resolve_status: bool,
    ) -> SessionResult<SubmissionOutcome> {
        let from = tx.from;
        let tx_hash = match wallet.send_transaction(tx).await {
            Ok(tx_hash) => tx_hash,
            Err(error) => {
                let error = SessionError::from(error);
                if resolve_status && error.requires_status_refresh() {
                    self.refresh_after_failure(bound).await;
                }
                return Err(error);
            }
        };

        SessionMetrics::new_with_labels(&[("operation", operation.to_string())])
            .transactions_submitted
            .increment(1);
        tracing::info!("{operation}: submitted {tx_hash} from {from}");
        self.emit(SessionEvent::TransactionSubmitted {
            operation,
            from,
            tx_hash,
        });

        let mined = wait_for_txn(&self.provider, tx_hash, self.settings.receipt_poll)
            .await
            .map_err(SessionError::from_read);
        let status = if resolve_status {
            self.resolve_for(bound)
                .await
                .log_on_error("failed to resolve status after submission")
                .ok()
        } else {
            None
        };

        let Some(receipt) = mined? else {
            return Err(SessionError::ReceiptTimeout(tx_hash));
        };
        self.emit(SessionEvent::TransactionMined {
            tx_hash,
            block_number: receipt.block_number,
            success: receipt.success,
        });
        if !receipt.success {
            return Err(SessionError::SubmissionReverted(tx_hash));
        }

        Ok(SubmissionOutcome {
            tx_hash,
            receipt,
            status,
        })
    }

    async fn resolve_for(&self, bound: &Bound) -> SessionResult<DelegationStatus> {
        let status = self.resolver.resolve(bound.account).await?;
        let applied = {
            let mut state = self.state.lock();
            let epoch = state.epoch;
            match state.binding.as_mut() {
                Some(binding) if epoch == bound.epoch => {
                    binding.status = status;
                    true
                }
                _ => false,
            }
        };

        if applied {
            self.emit(SessionEvent::StatusResolved {
                account: bound.account,
                status,
            });
        } else {
            tracing::debug!(
                "account changed, dropping resolved status of {}",
                bound.account
            );
        }
        Ok(status)
    }

    async fn refresh_after_failure(&self, bound: &Bound) {
        let _ = self
            .resolve_for(bound)
            .await
            .log_on_error("failed to refresh status after a failed submission");
    }

    async fn executor_nonce(&self, bound: &Bound) -> SessionResult<U256> {
        let request = TransactionDescriptor {
            from: bound.account,
            to: bound.account,
            data: encode_nonce(),
            ..Default::default()
        }
        .into_request(bound.chain_id);
        let ret = self
            .provider
            .call(&request, None)
            .await
            .map_err(SessionError::from_read)?;
        Ok(decode_nonce(&ret).context("failed to decode executor nonce")?)
    }

    async fn chain_id(&self) -> SessionResult<u64> {
        match self.settings.chain_id {
            Some(chain_id) => Ok(chain_id),
            None => self.binder.chain_id().await,
        }
    }

    fn bound(&self) -> SessionResult<Bound> {
        let state = self.state.lock();
        let binding = state.binding.ok_or(SessionError::NotConnected)?;
        Ok(Bound {
            account: binding.account,
            chain_id: binding.chain_id,
            status: binding.status,
            epoch: state.epoch,
        })
    }

    fn pending_calls(&self) -> SessionResult<Vec<Call>> {
        let state = self.state.lock();
        if state.calls.is_empty() {
            return Err(SessionError::EmptyBatch);
        }
        Ok(state.calls.contract_calls())
    }

    fn start(&self, operation: Operation) -> SessionMetrics {
        let metrics = SessionMetrics::new_with_labels(&[("operation", operation.to_string())]);
        metrics.operations_started.increment(1);
        metrics
    }

    fn finish<T>(
        &self,
        operation: Operation,
        metrics: &SessionMetrics,
        result: SessionResult<T>,
    ) -> SessionResult<T> {
        if let Err(error) = &result {
            metrics.operations_failed.increment(1);
            self.emit(SessionEvent::OperationFailed {
                operation,
                error: error.to_string(),
            });
        }
        result.log_on_error(format!("{operation} failed"))
    }

    async fn tracked<T>(
        &self,
        operation: Operation,
        fut: impl Future<Output = SessionResult<T>>,
    ) -> SessionResult<T> {
        let metrics = self.start(operation);
        let result = fut.await;
        self.finish(operation, &metrics, result)
    }

    async fn exclusive<T>(
        &self,
        operation: Operation,
        fut: impl Future<Output = SessionResult<T>>,
    ) -> SessionResult<T> {
        let metrics = self.start(operation);
        let result = match BusyGuard::acquire(&self.busy) {
            Some(_guard) => fut.await,
            None => {
                metrics.busy_rejections.increment(1);
                Err(SessionError::Busy)
            }
        };
        self.finish(operation, &metrics, result)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_sender.send(event);
    }
}

impl<P, W> DelegationSession<P, W>
where
    P: EvmProvider + Clone + 'static,
    W: Wallet + 'static,
{
    /// Follow the wallet's account changes until its notification channel
    /// closes.
    pub fn spawn_account_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let mut rx = self.binder.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(accounts) => {
                        let _ = session.handle_accounts_changed(accounts).await;
                    }
                    Err(RecvError::Lagged(count)) => {
                        tracing::warn!("account watcher lagged, missed {count} account changes");
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("wallet account stream closed");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use alloy_primitives::{address, utils::parse_ether, PrimitiveSignature, B256};
    use alloy_signer::{Signer, SignerSync};
    use alloy_signer_local::PrivateKeySigner;
    use delegator_contracts::delegate::{decode_execute, decode_execute_with_signature};
    use delegator_provider::{
        BlockId, MockEvmProvider, ProviderError, ProviderResult, TransactionRequest,
    };
    use delegator_signer::{MockWallet, WalletError, WalletResult};
    use delegator_types::{authorization::authorization_signing_hash, delegation_designator_code};
    use delegator_utils::emit::EVENT_CHANNEL_CAPACITY;
    use mockall::Sequence;
    use tokio::sync::Notify;

    use super::*;

    const CHAIN_ID: u64 = 31337;
    const DELEGATE: Address = address!("dddddddddddddddddddddddddddddddddddddddd");
    const TARGET: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    /// In-memory chain applying the EIP-7702 rules the session relies on
    #[derive(Default)]
    struct FakeChain {
        code: Mutex<HashMap<Address, Bytes>>,
        nonces: Mutex<HashMap<Address, u64>>,
        receipts: Mutex<HashMap<TxHash, MinedTransaction>>,
        sent: Mutex<Vec<TransactionDescriptor>>,
        executor_nonce: Mutex<U256>,
        revert_next: AtomicBool,
        withhold_receipts: AtomicBool,
        drop_code_reads_after_include: AtomicBool,
        code_unreachable: AtomicBool,
    }

    impl FakeChain {
        fn set_nonce(&self, account: Address, nonce: u64) {
            self.nonces.lock().insert(account, nonce);
        }

        fn set_code(&self, account: Address, code: Bytes) {
            self.code.lock().insert(account, code);
        }

        fn sent(&self) -> Vec<TransactionDescriptor> {
            self.sent.lock().clone()
        }

        fn include(&self, tx: TransactionDescriptor) -> TxHash {
            {
                let mut nonces = self.nonces.lock();
                *nonces.entry(tx.from).or_default() += 1;

                // authorizations apply even when execution reverts
                for auth in &tx.authorization_list {
                    let Some(authority) = auth.recover_authority() else {
                        continue;
                    };
                    let current = nonces.get(&authority).copied().unwrap_or_default();
                    if auth.chain_id != CHAIN_ID || auth.nonce != current {
                        continue;
                    }
                    nonces.insert(authority, current + 1);
                    let mut code = self.code.lock();
                    if auth.is_revocation() {
                        code.remove(&authority);
                    } else {
                        code.insert(authority, delegation_designator_code(auth.address));
                    }
                }
            }

            if self.drop_code_reads_after_include.load(Ordering::SeqCst) {
                self.code_unreachable.store(true, Ordering::SeqCst);
            }

            let mut sent = self.sent.lock();
            sent.push(tx);
            let tx_hash = B256::from(U256::from(sent.len()));
            self.receipts.lock().insert(
                tx_hash,
                MinedTransaction {
                    tx_hash,
                    block_number: Some(sent.len() as u64),
                    success: !self.revert_next.swap(false, Ordering::SeqCst),
                    gas_used: 50_000,
                },
            );
            tx_hash
        }
    }

    #[async_trait::async_trait]
    impl EvmProvider for FakeChain {
        async fn get_chain_id(&self) -> ProviderResult<u64> {
            Ok(CHAIN_ID)
        }

        async fn get_code(&self, address: Address, _: Option<BlockId>) -> ProviderResult<Bytes> {
            if self.code_unreachable.load(Ordering::SeqCst) {
                return Err(ProviderError::Transport("connection refused".to_string()));
            }
            Ok(self.code.lock().get(&address).cloned().unwrap_or_default())
        }

        async fn get_balance(&self, _: Address, _: Option<BlockId>) -> ProviderResult<U256> {
            Ok(parse_ether("1.5").unwrap())
        }

        async fn get_transaction_count(&self, address: Address) -> ProviderResult<u64> {
            Ok(self.nonces.lock().get(&address).copied().unwrap_or_default())
        }

        async fn call(
            &self,
            tx: &TransactionRequest,
            _: Option<BlockId>,
        ) -> ProviderResult<Bytes> {
            let is_nonce_call = tx
                .input
                .input()
                .is_some_and(|data| data.as_ref() == encode_nonce().as_ref());
            if !is_nonce_call {
                return Err(ProviderError::Rpc {
                    code: 3,
                    message: "execution reverted".to_string(),
                });
            }
            Ok(Bytes::from(
                self.executor_nonce.lock().to_be_bytes::<32>().to_vec(),
            ))
        }

        async fn estimate_gas(&self, _: &TransactionRequest) -> ProviderResult<u64> {
            Ok(100_000)
        }

        async fn get_gas_price(&self) -> ProviderResult<u128> {
            Ok(1)
        }

        async fn get_max_priority_fee(&self) -> ProviderResult<u128> {
            Ok(1)
        }

        async fn send_raw_transaction(&self, _: Bytes) -> ProviderResult<TxHash> {
            Err(ProviderError::Other(anyhow::anyhow!("raw transactions unsupported")))
        }

        async fn get_transaction_receipt(
            &self,
            tx_hash: TxHash,
        ) -> ProviderResult<Option<MinedTransaction>> {
            if self.withhold_receipts.load(Ordering::SeqCst) {
                return Ok(None);
            }
            Ok(self.receipts.lock().get(&tx_hash).cloned())
        }
    }

    /// Wallet holding one key that submits straight into a [`FakeChain`]
    struct FakeWallet {
        chain: Arc<FakeChain>,
        signer: PrivateKeySigner,
        accounts_tx: broadcast::Sender<Vec<Address>>,
        fail_next_send: Mutex<Option<WalletError>>,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl FakeWallet {
        fn new(chain: Arc<FakeChain>) -> Self {
            Self {
                chain,
                signer: PrivateKeySigner::random(),
                accounts_tx: broadcast::channel(16).0,
                fail_next_send: Mutex::new(None),
                gate: None,
            }
        }

        fn address(&self) -> Address {
            self.signer.address()
        }
    }

    #[async_trait::async_trait]
    impl Wallet for FakeWallet {
        async fn request_accounts(&self) -> WalletResult<Vec<Address>> {
            Ok(vec![self.signer.address()])
        }

        async fn chain_id(&self) -> WalletResult<u64> {
            Ok(CHAIN_ID)
        }

        async fn sign_authorization(
            &self,
            _account: Address,
            chain_id: u64,
            delegate: Address,
            nonce: u64,
        ) -> WalletResult<PrimitiveSignature> {
            Ok(self
                .signer
                .sign_hash(&authorization_signing_hash(chain_id, delegate, nonce))
                .await?)
        }

        async fn sign_typed_hash(
            &self,
            _account: Address,
            signing_hash: B256,
        ) -> WalletResult<PrimitiveSignature> {
            Ok(self.signer.sign_hash(&signing_hash).await?)
        }

        async fn send_transaction(&self, tx: TransactionDescriptor) -> WalletResult<TxHash> {
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if let Some(error) = self.fail_next_send.lock().take() {
                return Err(error);
            }
            Ok(self.chain.include(tx))
        }

        fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<Address>> {
            self.accounts_tx.subscribe()
        }
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            chain_id: None,
            receipt_poll: ReceiptPollSettings {
                poll_interval: Duration::from_millis(1),
                max_polls: 3,
            },
            default_delegate: None,
        }
    }

    fn session(
        chain: &Arc<FakeChain>,
        wallet: FakeWallet,
    ) -> DelegationSession<Arc<FakeChain>, FakeWallet> {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        DelegationSession::new(Arc::clone(chain), wallet, settings(), event_sender)
    }

    async fn connected() -> (
        Arc<FakeChain>,
        Address,
        DelegationSession<Arc<FakeChain>, FakeWallet>,
    ) {
        let chain = Arc::new(FakeChain::default());
        let wallet = FakeWallet::new(Arc::clone(&chain));
        let account = wallet.address();
        let session = session(&chain, wallet);
        session.connect().await.unwrap();
        (chain, account, session)
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = vec![];
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let chain = Arc::new(FakeChain::default());
        let wallet = FakeWallet::new(Arc::clone(&chain));
        let account = wallet.address();
        let session = session(&chain, wallet);

        assert_eq!(session.phase(), SessionPhase::Disconnected);
        assert_eq!(
            session.connect().await.unwrap(),
            SessionPhase::Connected {
                account,
                status: DelegationStatus::Undelegated
            }
        );

        session.add_call(TARGET, "0.1", "0x").unwrap();

        let outcome = session.create_delegation(DELEGATE).await.unwrap();
        assert!(outcome.receipt.success);
        assert_eq!(outcome.status, Some(DelegationStatus::DelegatedTo(DELEGATE)));
        assert_eq!(
            session.phase(),
            SessionPhase::Connected {
                account,
                status: DelegationStatus::DelegatedTo(DELEGATE)
            }
        );

        let delegation_tx = &chain.sent()[0];
        assert_eq!(delegation_tx.to, account);
        assert!(delegation_tx.data.is_empty());
        assert_eq!(delegation_tx.nonce, Some(0));
        assert_eq!(delegation_tx.authorization_list.len(), 1);
        assert_eq!(delegation_tx.authorization_list[0].nonce, 1);
        assert_eq!(delegation_tx.authorization_list[0].address, DELEGATE);

        session.execute_batch(None).await.unwrap();
        let batch_tx = &chain.sent()[1];
        assert_eq!(batch_tx.to, account);
        assert!(batch_tx.authorization_list.is_empty());
        let calls = decode_execute(&batch_tx.data).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].to,
            address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
        );
        assert_eq!(calls[0].value, parse_ether("0.1").unwrap());
        assert!(calls[0].data.is_empty());
    }

    #[tokio::test]
    async fn test_authorization_nonce_follows_count() {
        let chain = Arc::new(FakeChain::default());
        let wallet = FakeWallet::new(Arc::clone(&chain));
        chain.set_nonce(wallet.address(), 5);
        let session = session(&chain, wallet);
        session.connect().await.unwrap();

        session.create_delegation(DELEGATE).await.unwrap();
        let tx = &chain.sent()[0];
        assert_eq!(tx.nonce, Some(5));
        assert_eq!(tx.authorization_list[0].nonce, 6);
    }

    #[tokio::test]
    async fn test_revoke() {
        let (chain, account, session) = connected().await;
        session.create_delegation(DELEGATE).await.unwrap();

        let outcome = session.revoke_delegation().await.unwrap();
        assert_eq!(outcome.status, Some(DelegationStatus::Undelegated));

        let revoke_tx = &chain.sent()[1];
        assert!(revoke_tx.data.is_empty());
        assert!(revoke_tx.authorization_list[0].is_revocation());
        assert_eq!(revoke_tx.authorization_list[0].nonce, 3);
        assert_eq!(
            session.phase(),
            SessionPhase::Connected {
                account,
                status: DelegationStatus::Undelegated
            }
        );
    }

    #[tokio::test]
    async fn test_execute_bundles_delegation() {
        let (chain, _, session) = connected().await;
        session.add_call(TARGET, "1", "0xdeadbeef").unwrap();

        let outcome = session.execute_batch(Some(DELEGATE)).await.unwrap();
        assert_eq!(outcome.status, Some(DelegationStatus::DelegatedTo(DELEGATE)));

        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].authorization_list.len(), 1);
        assert_eq!(decode_execute(&sent[0].data).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_uses_default_delegate() {
        let chain = Arc::new(FakeChain::default());
        let wallet = FakeWallet::new(Arc::clone(&chain));
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session = DelegationSession::new(
            Arc::clone(&chain),
            wallet,
            SessionSettings {
                default_delegate: Some(DELEGATE),
                ..settings()
            },
            event_sender,
        );
        session.connect().await.unwrap();
        session.add_call(TARGET, "1", "0x").unwrap();

        session.execute_batch(None).await.unwrap();
        assert_eq!(chain.sent()[0].authorization_list[0].address, DELEGATE);
    }

    #[tokio::test]
    async fn test_execute_requires_delegate_when_undelegated() {
        let chain = Arc::new(FakeChain::default());
        let account = PrivateKeySigner::random().address();
        let mut wallet = MockWallet::new();
        wallet
            .expect_request_accounts()
            .returning(move || Ok(vec![account]));
        wallet.expect_chain_id().returning(|| Ok(CHAIN_ID));
        wallet.expect_sign_authorization().never();
        wallet.expect_send_transaction().never();

        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session = DelegationSession::new(Arc::clone(&chain), wallet, settings(), event_sender);
        session.connect().await.unwrap();
        session.add_call(TARGET, "1", "0x").unwrap();

        assert!(matches!(
            session.execute_batch(None).await,
            Err(SessionError::InvalidDelegateAddress(_))
        ));
        assert!(matches!(
            session.execute_batch(Some(Address::ZERO)).await,
            Err(SessionError::InvalidDelegateAddress(_))
        ));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (chain, _, session) = connected().await;
        assert!(matches!(
            session.execute_batch(Some(DELEGATE)).await,
            Err(SessionError::EmptyBatch)
        ));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_operations_follow_status() {
        let (_, _, session) = connected().await;
        assert!(matches!(
            session.revoke_delegation().await,
            Err(SessionError::InvalidState { .. })
        ));

        session.create_delegation(DELEGATE).await.unwrap();
        assert!(matches!(
            session.create_delegation(DELEGATE).await,
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_other_code_is_dead_end() {
        let chain = Arc::new(FakeChain::default());
        let wallet = FakeWallet::new(Arc::clone(&chain));
        chain.set_code(wallet.address(), Bytes::from_static(&[0x60, 0x80]));
        let session = session(&chain, wallet);

        let phase = session.connect().await.unwrap();
        assert!(matches!(
            phase,
            SessionPhase::Connected {
                status: DelegationStatus::OtherCode,
                ..
            }
        ));
        session.add_call(TARGET, "1", "0x").unwrap();

        assert!(matches!(
            session.create_delegation(DELEGATE).await,
            Err(SessionError::InvalidState { .. })
        ));
        assert!(matches!(
            session.execute_batch(Some(DELEGATE)).await,
            Err(SessionError::InvalidState { .. })
        ));
        assert!(matches!(
            session.revoke_delegation().await,
            Err(SessionError::InvalidState { .. })
        ));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let chain = Arc::new(FakeChain::default());
        let session = session(&chain, FakeWallet::new(Arc::clone(&chain)));

        assert!(matches!(
            session.create_delegation(DELEGATE).await,
            Err(SessionError::NotConnected)
        ));
        assert!(matches!(
            session.refresh_status().await,
            Err(SessionError::NotConnected)
        ));
        assert!(matches!(
            session.account_balance().await,
            Err(SessionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_busy_latch_rejects_second_operation() {
        let chain = Arc::new(FakeChain::default());
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mut wallet = FakeWallet::new(Arc::clone(&chain));
        wallet.gate = Some((Arc::clone(&entered), Arc::clone(&release)));
        let session = Arc::new(session(&chain, wallet));
        session.connect().await.unwrap();
        session.add_call(TARGET, "1", "0x").unwrap();
        let mut events = session.subscribe();

        let in_flight = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.create_delegation(DELEGATE).await })
        };
        entered.notified().await;
        assert!(session.is_busy());

        assert!(matches!(
            session.execute_batch(Some(DELEGATE)).await,
            Err(SessionError::Busy)
        ));
        assert!(matches!(
            session.revoke_delegation().await,
            Err(SessionError::Busy)
        ));

        release.notify_one();
        in_flight.await.unwrap().unwrap();
        assert!(!session.is_busy());

        // only the first operation reached the chain
        assert_eq!(chain.sent().len(), 1);
        let failures = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::OperationFailed { .. }))
            .count();
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn test_latch_released_after_failure() {
        let (chain, _, session) = connected().await;
        assert!(session.revoke_delegation().await.is_err());
        assert!(!session.is_busy());
        session.create_delegation(DELEGATE).await.unwrap();
        assert_eq!(chain.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_account_change_resets_session() {
        let (chain, _, session) = connected().await;
        session.add_call(TARGET, "1", "0x").unwrap();
        let other = PrivateKeySigner::random().address();
        chain.set_code(other, delegation_designator_code(DELEGATE));
        let mut events = session.subscribe();

        session.handle_accounts_changed(vec![other]).await.unwrap();
        assert!(session.calls().is_empty());
        assert_eq!(
            session.phase(),
            SessionPhase::Connected {
                account: other,
                status: DelegationStatus::DelegatedTo(DELEGATE)
            }
        );

        session.disconnect().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Disconnected);
        assert!(matches!(
            session.create_delegation(DELEGATE).await,
            Err(SessionError::NotConnected)
        ));

        let events = drain(&mut events);
        assert!(matches!(events[0], SessionEvent::AccountChanged { account } if account == other));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Disconnected)));
    }

    #[tokio::test]
    async fn test_same_account_notification_keeps_state() {
        let (_, account, session) = connected().await;
        let id = session.add_call(TARGET, "1", "0x").unwrap();

        session.handle_accounts_changed(vec![account]).await.unwrap();
        assert_eq!(session.calls()[0].0, id);
    }

    #[tokio::test]
    async fn test_account_watcher() {
        let chain = Arc::new(FakeChain::default());
        let wallet = FakeWallet::new(Arc::clone(&chain));
        let accounts_tx = wallet.accounts_tx.clone();
        let session = Arc::new(session(&chain, wallet));
        session.connect().await.unwrap();
        let mut events = session.subscribe();

        let watcher = session.spawn_account_watcher();
        accounts_tx.send(vec![]).unwrap();

        loop {
            if let SessionEvent::Disconnected = events.recv().await.unwrap() {
                break;
            }
        }
        assert_eq!(session.phase(), SessionPhase::Disconnected);
        watcher.abort();
    }

    #[tokio::test]
    async fn test_node_rejects_nonce() {
        let chain = Arc::new(FakeChain::default());
        let wallet = FakeWallet::new(Arc::clone(&chain));
        *wallet.fail_next_send.lock() = Some(WalletError::ProviderError(ProviderError::Rpc {
            code: -32000,
            message: "nonce too low".to_string(),
        }));
        let session = session(&chain, wallet);
        session.connect().await.unwrap();
        let mut events = session.subscribe();

        assert!(matches!(
            session.create_delegation(DELEGATE).await,
            Err(SessionError::StaleNonce(_))
        ));
        assert!(chain.sent().is_empty());

        let events = drain(&mut events);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::StatusResolved { .. })));
        assert!(matches!(
            events.last(),
            Some(SessionEvent::OperationFailed {
                operation: Operation::CreateDelegation,
                ..
            })
        ));

        // an explicit retry reads a fresh nonce
        session.create_delegation(DELEGATE).await.unwrap();
    }

    #[tokio::test]
    async fn test_reverted_batch_still_resolves_status() {
        let (chain, account, session) = connected().await;
        session.add_call(TARGET, "1", "0x").unwrap();
        chain.revert_next.store(true, Ordering::SeqCst);

        assert!(matches!(
            session.execute_batch(Some(DELEGATE)).await,
            Err(SessionError::SubmissionReverted(_))
        ));
        // the authorization applied although execution reverted
        assert_eq!(
            session.phase(),
            SessionPhase::Connected {
                account,
                status: DelegationStatus::DelegatedTo(DELEGATE)
            }
        );
    }

    #[tokio::test]
    async fn test_mined_batch_reported_when_status_read_fails() {
        let (chain, account, session) = connected().await;
        session.add_call(TARGET, "1", "0x").unwrap();
        chain
            .drop_code_reads_after_include
            .store(true, Ordering::SeqCst);

        let outcome = session.execute_batch(Some(DELEGATE)).await.unwrap();
        assert!(outcome.receipt.success);
        assert_eq!(outcome.status, None);
        assert_eq!(chain.sent().len(), 1);
        assert_eq!(outcome.tx_hash, B256::from(U256::from(1)));
        assert_eq!(
            session.phase(),
            SessionPhase::Connected {
                account,
                status: DelegationStatus::Undelegated
            }
        );
    }

    #[tokio::test]
    async fn test_receipt_timeout() {
        let (chain, _, session) = connected().await;
        chain.withhold_receipts.store(true, Ordering::SeqCst);

        assert!(matches!(
            session.create_delegation(DELEGATE).await,
            Err(SessionError::ReceiptTimeout(_))
        ));
        // the status was read again after giving up on the receipt
        assert!(matches!(
            session.phase(),
            SessionPhase::Connected {
                status: DelegationStatus::DelegatedTo(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_sponsored_batch() {
        let chain = Arc::new(FakeChain::default());
        let wallet = FakeWallet::new(Arc::clone(&chain));
        let sponsor = FakeWallet::new(Arc::clone(&chain));
        let sponsor_account = sponsor.address();
        let account = wallet.address();
        *chain.executor_nonce.lock() = U256::from(3);

        let session = session(&chain, wallet).with_sponsor(Arc::new(sponsor));
        session.connect().await.unwrap();
        session.create_delegation(DELEGATE).await.unwrap();
        session.add_call(TARGET, "0.5", "0x").unwrap();

        let outcome = session.execute_sponsored_batch().await.unwrap();
        assert_eq!(outcome.status, None);

        let tx = &chain.sent()[1];
        assert_eq!(tx.from, sponsor_account);
        assert_eq!(tx.to, account);
        assert!(tx.authorization_list.is_empty());

        let (calls, signature) = decode_execute_with_signature(&tx.data).unwrap();
        let signature = PrimitiveSignature::try_from(signature.as_ref()).unwrap();
        let hash = sponsored_execution_hash(CHAIN_ID, account, U256::from(3), calls);
        assert_eq!(
            signature.recover_address_from_prehash(&hash).unwrap(),
            account
        );
    }

    #[tokio::test]
    async fn test_sponsored_batch_requirements() {
        let (_, _, session) = connected().await;
        session.add_call(TARGET, "1", "0x").unwrap();
        assert!(matches!(
            session.execute_sponsored_batch().await,
            Err(SessionError::InvalidState { .. })
        ));

        session.create_delegation(DELEGATE).await.unwrap();
        assert!(matches!(
            session.execute_sponsored_batch().await,
            Err(SessionError::SponsorUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_call_edits_emit_events() {
        let (_, _, session) = connected().await;
        let mut events = session.subscribe();

        let id = session.add_call(TARGET, "1", "0x").unwrap();
        session.update_call(id, CallField::Value, "2").unwrap();
        assert!(session.add_call(TARGET, "two", "0x").is_err());
        assert!(session.remove_call(id).is_some());
        assert!(session.remove_call(id).is_none());

        let events = drain(&mut events);
        assert!(matches!(events[0], SessionEvent::CallAdded { .. }));
        assert!(matches!(events[1], SessionEvent::CallUpdated { .. }));
        assert!(matches!(
            events[2],
            SessionEvent::OperationFailed {
                operation: Operation::EditCalls,
                ..
            }
        ));
        assert!(matches!(events[3], SessionEvent::CallRemoved { .. }));
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn test_balance() {
        let (_, _, session) = connected().await;
        assert_eq!(
            session.account_balance().await.unwrap(),
            parse_ether("1.5").unwrap()
        );
    }

    #[tokio::test]
    async fn test_nonce_moved_before_submission() {
        let signer = PrivateKeySigner::random();
        let account = signer.address();

        // another transaction from the account delegated it elsewhere
        let other = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
        let mut provider = MockEvmProvider::new();
        let mut code_seq = Sequence::new();
        provider
            .expect_get_code()
            .once()
            .in_sequence(&mut code_seq)
            .returning(|_, _| Ok(Bytes::new()));
        provider
            .expect_get_code()
            .once()
            .in_sequence(&mut code_seq)
            .returning(move |_, _| Ok(delegation_designator_code(other)));
        let mut seq = Sequence::new();
        provider
            .expect_get_transaction_count()
            .once()
            .in_sequence(&mut seq)
            .returning(|_| Ok(5));
        provider
            .expect_get_transaction_count()
            .once()
            .in_sequence(&mut seq)
            .returning(|_| Ok(6));

        let mut wallet = MockWallet::new();
        wallet
            .expect_request_accounts()
            .returning(move || Ok(vec![account]));
        wallet.expect_chain_id().returning(|| Ok(CHAIN_ID));
        wallet
            .expect_sign_authorization()
            .returning(move |_, chain_id, delegate, nonce| {
                Ok(signer
                    .sign_hash_sync(&authorization_signing_hash(chain_id, delegate, nonce))
                    .unwrap())
            });
        wallet.expect_send_transaction().never();

        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session = DelegationSession::new(Arc::new(provider), wallet, settings(), event_sender);
        session.connect().await.unwrap();
        let mut events = session.subscribe();

        assert!(matches!(
            session.create_delegation(DELEGATE).await,
            Err(SessionError::StaleNonce(_))
        ));
        assert_eq!(
            session.phase(),
            SessionPhase::Connected {
                account,
                status: DelegationStatus::DelegatedTo(other)
            }
        );
        assert!(drain(&mut events).iter().any(|event| matches!(
            event,
            SessionEvent::StatusResolved {
                status: DelegationStatus::DelegatedTo(delegate),
                ..
            } if *delegate == other
        )));
    }
}
