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

//! Middleware that applies a timeout to requests.
//!
//! If the response does not complete within the specified timeout, the response
//! will be aborted.

use std::{
    task::{Context, Poll},
    time::Duration,
};

use alloy_json_rpc::{RequestPacket, ResponsePacket};
use alloy_transport::{TransportError, TransportFut};
use tower::{Layer, Service};

/// Applies a timeout to requests via the supplied inner service.
#[derive(Debug, Clone)]
pub(crate) struct ProviderTimeoutLayer {
    timeout: Duration,
}

impl ProviderTimeoutLayer {
    /// Create a timeout from a duration
    pub(crate) fn new(timeout: Duration) -> Self {
        ProviderTimeoutLayer { timeout }
    }
}

impl<S> Layer<S> for ProviderTimeoutLayer
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError> + Sync,
{
    type Service = ProviderTimeout<S>;

    fn layer(&self, service: S) -> Self::Service {
        ProviderTimeout::new(service, self.timeout)
    }
}

/// Applies a timeout to requests.
#[derive(Debug, Clone)]
pub(crate) struct ProviderTimeout<S> {
    service: S,
    timeout: Duration,
}

impl<S> ProviderTimeout<S> {
    pub(crate) const fn new(service: S, timeout: Duration) -> Self {
        ProviderTimeout { service, timeout }
    }
}

impl<S> Service<RequestPacket> for ProviderTimeout<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Sync
        + Send
        + Clone
        + 'static,
    S::Future: Send,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: RequestPacket) -> Self::Future {
        let response = self.service.call(request);
        let timeout = self.timeout;
        Box::pin(async move {
            match tokio::time::timeout(timeout, response).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::local_usage_str(
                    "provider request timeout from client side",
                )),
            }
        })
    }
}
