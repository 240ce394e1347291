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

use delegator_contracts::delegate::{create_call, Call};
use delegator_types::{CallField, CallId, PendingCall};

use crate::{SessionError, SessionResult};

/// Ordered list of calls waiting to be executed as one batch.
///
/// Ids are never reused within a session. Duplicate calls are allowed.
#[derive(Debug, Default)]
pub struct BatchCallAssembler {
    next_id: u64,
    calls: Vec<(CallId, PendingCall)>,
}

impl BatchCallAssembler {
    /// Validate raw input and append the call to the end of the list
    pub fn add(&mut self, target: &str, value: &str, data: &str) -> SessionResult<CallId> {
        let call = PendingCall::parse(target, value, data)?;
        let id = CallId(self.next_id);
        self.next_id += 1;
        self.calls.push((id, call));
        Ok(id)
    }

    /// Replace one field of a call. The call is left untouched when the new
    /// value does not validate.
    pub fn update(&mut self, id: CallId, field: CallField, raw: &str) -> SessionResult<()> {
        let (_, call) = self
            .calls
            .iter_mut()
            .find(|(call_id, _)| *call_id == id)
            .ok_or(SessionError::UnknownCall(id))?;
        call.set_field(field, raw)?;
        Ok(())
    }

    /// Remove a call, returning it if it was present
    pub fn remove(&mut self, id: CallId) -> Option<PendingCall> {
        let pos = self.calls.iter().position(|(call_id, _)| *call_id == id)?;
        Some(self.calls.remove(pos).1)
    }

    /// The calls in execution order
    pub fn list(&self) -> &[(CallId, PendingCall)] {
        &self.calls
    }

    /// Number of pending calls
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// True if there are no pending calls
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Drop every pending call
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// The calls in the delegate contract's ABI shape
    pub fn contract_calls(&self) -> Vec<Call> {
        self.calls
            .iter()
            .map(|(_, call)| create_call(call.target, call.value, call.data.clone()))
            .collect()
    }
}
