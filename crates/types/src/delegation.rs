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

use alloy_primitives::Address;

use crate::constants::{EIP7702_DELEGATION_CODE_LENGTH, EIP7702_DELEGATION_DESIGNATOR};

/// Delegation state of an account, derived from its on-chain code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, parse_display::Display)]
pub enum DelegationStatus {
    /// No code at the account
    #[display("undelegated")]
    Undelegated,
    /// Code is a delegation designator pointing at the given contract
    #[display("delegated to {0}")]
    DelegatedTo(Address),
    /// Some other code is deployed at the account
    #[display("other code present")]
    OtherCode,
}

impl DelegationStatus {
    /// Classify raw account code.
    ///
    /// Only an exact `0xef0100 || address` designator counts as a delegation,
    /// anything else non-empty is [`DelegationStatus::OtherCode`].
    pub fn from_code(code: &[u8]) -> Self {
        if code.is_empty() {
            return Self::Undelegated;
        }

        match code.strip_prefix(&EIP7702_DELEGATION_DESIGNATOR) {
            Some(delegate) if code.len() == EIP7702_DELEGATION_CODE_LENGTH => {
                Self::DelegatedTo(Address::from_slice(delegate))
            }
            _ => Self::OtherCode,
        }
    }

    /// The delegate contract, if delegated
    pub fn delegate(&self) -> Option<Address> {
        match self {
            Self::DelegatedTo(address) => Some(*address),
            _ => None,
        }
    }

    /// True if the account currently carries delegated code
    pub fn is_delegated(&self) -> bool {
        matches!(self, Self::DelegatedTo(_))
    }
}

/// Code the protocol installs on an account delegated to `delegate`
#[cfg(any(test, feature = "test-utils"))]
pub fn delegation_designator_code(delegate: Address) -> alloy_primitives::Bytes {
    let mut code = Vec::with_capacity(EIP7702_DELEGATION_CODE_LENGTH);
    code.extend_from_slice(&EIP7702_DELEGATION_DESIGNATOR);
    code.extend_from_slice(delegate.as_slice());
    code.into()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, bytes, hex};

    use super::*;

    #[test]
    fn test_empty_code() {
        assert_eq!(DelegationStatus::from_code(&[]), DelegationStatus::Undelegated);
    }

    #[test]
    fn test_designator() {
        let code = bytes!("ef0100dddddddddddddddddddddddddddddddddddddddd");
        assert_eq!(
            DelegationStatus::from_code(&code),
            DelegationStatus::DelegatedTo(address!("dddddddddddddddddddddddddddddddddddddddd"))
        );
    }

    #[test]
    fn test_other_code() {
        // regular contract runtime code
        let code = hex!("6080604052348015600e575f5ffd5b50");
        assert_eq!(DelegationStatus::from_code(&code), DelegationStatus::OtherCode);

        // designator prefix with a truncated address
        let code = hex!("ef0100dddd");
        assert_eq!(DelegationStatus::from_code(&code), DelegationStatus::OtherCode);

        // designator followed by trailing bytes
        let code = hex!("ef0100dddddddddddddddddddddddddddddddddddddddd00");
        assert_eq!(DelegationStatus::from_code(&code), DelegationStatus::OtherCode);

        // wrong prefix with the right length
        let code = hex!("ef0200dddddddddddddddddddddddddddddddddddddddd");
        assert_eq!(DelegationStatus::from_code(&code), DelegationStatus::OtherCode);
    }

    #[test]
    fn test_designator_code_classifies_as_delegated() {
        let delegate = address!("1111111111111111111111111111111111111111");
        let code = delegation_designator_code(delegate);
        assert_eq!(code, bytes!("ef01001111111111111111111111111111111111111111"));
        assert_eq!(
            DelegationStatus::from_code(&code),
            DelegationStatus::DelegatedTo(delegate)
        );
    }

    #[test]
    fn test_accessors() {
        let delegate = address!("dddddddddddddddddddddddddddddddddddddddd");
        let status = DelegationStatus::DelegatedTo(delegate);
        assert!(status.is_delegated());
        assert_eq!(status.delegate(), Some(delegate));
        assert_eq!(DelegationStatus::OtherCode.delegate(), None);
        assert_eq!(DelegationStatus::Undelegated.to_string(), "undelegated");
    }
}
