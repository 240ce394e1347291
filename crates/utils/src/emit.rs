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

//! Background consumers of event broadcast channels

use std::fmt::Display;

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::Level;

use crate::log::log_at_level;

/// Capacity of the event channels.
///
/// A session emits a handful of small events per operation, so a slow
/// consumer has to fall far behind before events are dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Spawn a task passing every event from `rx` to `handler` until all senders
/// are dropped. A lagging consumer skips the dropped events and carries on.
pub fn receive_events<T>(
    description: &'static str,
    mut rx: broadcast::Receiver<T>,
    mut handler: impl FnMut(T) + Send + 'static,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => handler(event),
                Err(RecvError::Lagged(count)) => {
                    tracing::warn!("{description} consumer fell behind, {count} events dropped")
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("{description} event stream closed");
                    break;
                }
            }
        }
    })
}

/// Log every event from `rx` at the level `level_of` picks for it
pub fn receive_and_log_events<T>(
    rx: broadcast::Receiver<T>,
    level_of: impl Fn(&T) -> Level + Send + 'static,
) -> JoinHandle<()>
where
    T: Clone + Display + Send + 'static,
{
    receive_events("log", rx, move |event| {
        log_at_level(level_of(&event), &event.to_string())
    })
}
