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

use std::{fs, path::Path, str::FromStr};

use anyhow::{bail, Context};
use serde::Deserialize;

/// Raw call input, validated by the session when added
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CallInput {
    pub target: String,
    #[serde(default = "zero")]
    pub value: String,
    #[serde(default = "empty_data")]
    pub data: String,
}

fn zero() -> String {
    "0".to_string()
}

fn empty_data() -> String {
    "0x".to_string()
}

impl FromStr for CallInput {
    type Err = anyhow::Error;

    /// `target[,value[,data]]`, value in ether
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);
        let Some(target) = parts.next().filter(|t| !t.is_empty()) else {
            bail!("call is missing a target");
        };
        let call = CallInput {
            target: target.to_string(),
            value: parts.next().map_or_else(zero, str::to_string),
            data: parts.next().map_or_else(empty_data, str::to_string),
        };
        if parts.next().is_some() {
            bail!("call has more than three fields: {s}");
        }
        Ok(call)
    }
}

/// Read calls from a JSON file holding `[{"target", "value", "data"}]`
pub fn read_calls_file(path: &Path) -> anyhow::Result<Vec<CallInput>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("should read calls file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("should parse calls file {}", path.display()))
}
