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

//! Batch executor ABI.
//!
//! The delegate executes an ordered list of calls from the delegating
//! account, either when invoked by the account itself or when given an
//! EIP-712 signature of the account over a `BatchExecution`.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{eip712_domain, sol, Eip712Domain, SolCall, SolStruct};

sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    struct Call {
        address to;
        uint256 value;
        bytes data;
    }

    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    struct BatchExecution {
        uint256 nonce;
        Call[] calls;
    }

    #[allow(missing_docs)]
    interface IBatchExecutor {
        function execute(Call[] calldata calls) external payable;
        function execute(Call[] calldata calls, bytes calldata signature) external payable;
        function nonce() external view returns (uint256);
    }
}

/// EIP-712 domain name of the batch executor
pub const DOMAIN_NAME: &str = "BatchCallAndSponsor";
/// EIP-712 domain version of the batch executor
pub const DOMAIN_VERSION: &str = "1";

/// Create a call
pub fn create_call(to: Address, value: U256, data: Bytes) -> Call {
    Call { to, value, data }
}

/// Calldata for a self-invoked batch execution
pub fn encode_execute(calls: Vec<Call>) -> Bytes {
    IBatchExecutor::execute_0Call { calls }.abi_encode().into()
}

/// Calldata for a sponsored batch execution carrying the account's signature
pub fn encode_execute_with_signature(calls: Vec<Call>, signature: Bytes) -> Bytes {
    IBatchExecutor::execute_1Call { calls, signature }
        .abi_encode()
        .into()
}

/// Calldata for reading the executor's replay nonce
pub fn encode_nonce() -> Bytes {
    IBatchExecutor::nonceCall {}.abi_encode().into()
}

/// Decode the return data of a `nonce()` call
pub fn decode_nonce(data: &[u8]) -> Result<U256, alloy_sol_types::Error> {
    IBatchExecutor::nonceCall::abi_decode_returns(data, true).map(|ret| ret._0)
}

/// Decode calldata produced by [`encode_execute`]
pub fn decode_execute(data: &[u8]) -> Result<Vec<Call>, alloy_sol_types::Error> {
    IBatchExecutor::execute_0Call::abi_decode(data, true).map(|call| call.calls)
}

/// Decode calldata produced by [`encode_execute_with_signature`]
pub fn decode_execute_with_signature(
    data: &[u8],
) -> Result<(Vec<Call>, Bytes), alloy_sol_types::Error> {
    IBatchExecutor::execute_1Call::abi_decode(data, true).map(|call| (call.calls, call.signature))
}

/// Signing domain of the executor living at `account` on `chain_id`
pub fn domain(chain_id: u64, account: Address) -> Eip712Domain {
    eip712_domain! {
        name: DOMAIN_NAME,
        version: DOMAIN_VERSION,
        chain_id: chain_id,
        verifying_contract: account,
    }
}

/// Digest the account signs to let a sponsor submit `calls` on its behalf
pub fn sponsored_execution_hash(
    chain_id: u64,
    account: Address,
    nonce: U256,
    calls: Vec<Call>,
) -> alloy_primitives::B256 {
    BatchExecution { nonce, calls }.eip712_signing_hash(&domain(chain_id, account))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, bytes};

    use super::*;

    #[test]
    fn test_execute_roundtrip_keeps_order() {
        let calls = vec![
            create_call(
                address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
                U256::from(1),
                Bytes::new(),
            ),
            create_call(
                address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
                U256::ZERO,
                bytes!("a9059cbb"),
            ),
        ];
        let data = encode_execute(calls.clone());
        assert_eq!(decode_execute(&data).unwrap(), calls);
        // the two overloads have distinct selectors
        assert!(decode_execute_with_signature(&data).is_err());
    }

    #[test]
    fn test_nonce_return() {
        let ret = U256::from(42).to_be_bytes::<32>();
        assert_eq!(decode_nonce(&ret).unwrap(), U256::from(42));
    }

    #[test]
    fn test_sponsored_hash_binds_domain() {
        let account = address!("1111111111111111111111111111111111111111");
        let calls = vec![create_call(account, U256::from(1), Bytes::new())];

        let hash = sponsored_execution_hash(1, account, U256::ZERO, calls.clone());
        assert_ne!(
            hash,
            sponsored_execution_hash(2, account, U256::ZERO, calls.clone())
        );
        assert_ne!(
            hash,
            sponsored_execution_hash(1, account, U256::from(1), calls)
        );
    }
}
