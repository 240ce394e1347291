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

use metrics::Counter;
use metrics_derive::Metrics;

#[derive(Metrics)]
#[metrics(scope = "delegator_session")]
pub(crate) struct SessionMetrics {
    #[metric(describe = "the count of operations started.")]
    pub(crate) operations_started: Counter,
    #[metric(describe = "the count of operations that failed.")]
    pub(crate) operations_failed: Counter,
    #[metric(describe = "the count of transactions accepted by the node.")]
    pub(crate) transactions_submitted: Counter,
    #[metric(describe = "the count of operations rejected while another was in flight.")]
    pub(crate) busy_rejections: Counter,
}
