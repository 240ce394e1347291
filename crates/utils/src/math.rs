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

//! Math utilities

/// Increases a u64 by a percentage, saturating at `u64::MAX`
pub fn increase_by_percent(n: u64, percent: u64) -> u64 {
    let increased = u128::from(n) * (100 + u128::from(percent)) / 100;
    u64::try_from(increased).unwrap_or(u64::MAX)
}
