// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Validation of an update against the current configuration, and its application.

use crate::{
    config::CHANNEL_GROUP,
    consortium_proto::{Config, ConfigGroup, ConfigPolicy, ConfigUpdate, ConfigValue},
    error::{Error, Result},
    policy::{PolicyEvaluator, PolicyRef},
    signature::Signer,
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// A modified item and the policy its modification requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta {
    pub item: String,
    pub policy: PolicyRef,
}

/// Checks the read set against `config` and lists the modifications of existing items.
///
/// Fails with `StaleConfig` when any version the update depends on has moved since the update was
/// computed.
pub fn validate_update(config: &Config, update: &ConfigUpdate) -> Result<Vec<Delta>> {
    let current = config.root()?;
    let read = update
        .read_set
        .as_ref()
        .ok_or_else(|| Error::Rejected("the update has no read set".to_string()))?;
    let write = update
        .write_set
        .as_ref()
        .ok_or_else(|| Error::Rejected("the update has no write set".to_string()))?;

    let mut path = vec![CHANNEL_GROUP.to_string()];
    verify_read_set(current, read, &mut path)?;

    let mut deltas = Vec::new();
    collect_group_deltas(Some(current), Some(read), write, &mut path, &mut deltas)?;
    if deltas.is_empty() {
        return Err(Error::NoOpUpdate);
    }
    debug!(
        "Update of channel '{}' modifies {} existing item(s)",
        update.channel_id,
        deltas.len()
    );
    Ok(deltas)
}

/// Requires the modification policy of every delta.
pub fn authorize(config: &Config, deltas: &[Delta], signers: &[Signer]) -> Result<()> {
    let evaluator = PolicyEvaluator::new(config.root()?)?;
    for delta in deltas {
        trace!("Checking {} against {}", delta.item, delta.policy.path());
        evaluator.require(&delta.policy, signers)?;
    }
    Ok(())
}

/// Merges the write set into `config` and advances its sequence.
///
/// The update must have been validated against `config`.
pub fn apply_update(config: &Config, update: &ConfigUpdate) -> Result<Config> {
    let current = config.root()?;
    let write = update
        .write_set
        .as_ref()
        .ok_or_else(|| Error::Rejected("the update has no write set".to_string()))?;
    Ok(Config {
        sequence: config.sequence + 1,
        channel_group: Some(merge_group(current, write)),
    })
}

fn item_path(path: &[String], key: Option<&str>) -> String {
    match key {
        Some(key) => format!("/{}/{key}", path.join("/")),
        None => format!("/{}", path.join("/")),
    }
}

fn verify_read_set(current: &ConfigGroup, read: &ConfigGroup, path: &mut Vec<String>) -> Result<()> {
    if current.version != read.version {
        return Err(stale(&item_path(path, None), current.version, read.version));
    }
    verify_versions(&current.values, &read.values, path, |v| v.version)?;
    verify_versions(&current.policies, &read.policies, path, |p| p.version)?;
    for (key, read_group) in &read.groups {
        let Some(current_group) = current.groups.get(key) else {
            return Err(Error::StaleConfig(format!(
                "{} no longer exists",
                item_path(path, Some(key))
            )));
        };
        path.push(key.clone());
        verify_read_set(current_group, read_group, path)?;
        path.pop();
    }
    Ok(())
}

fn verify_versions<T>(
    current: &BTreeMap<String, T>,
    read: &BTreeMap<String, T>,
    path: &[String],
    version: impl Fn(&T) -> u64,
) -> Result<()> {
    for (key, read_item) in read {
        match current.get(key) {
            None => {
                return Err(Error::StaleConfig(format!(
                    "{} no longer exists",
                    item_path(path, Some(key))
                )))
            }
            Some(item) if version(item) != version(read_item) => {
                return Err(stale(
                    &item_path(path, Some(key)),
                    version(item),
                    version(read_item),
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn stale(item: &str, current: u64, read: u64) -> Error {
    Error::StaleConfig(format!(
        "{item} is at version {current} but the update was computed at version {read}"
    ))
}

/// Checks the version rules of one write-set item and returns whether it is a delta of an
/// existing item.
fn check_item(
    item: &str,
    current: Option<u64>,
    read: Option<u64>,
    written: u64,
    mod_policy: &str,
) -> Result<bool> {
    if read == Some(written) {
        return Ok(false);
    }
    if mod_policy.is_empty() {
        return Err(Error::Rejected(format!(
            "{item} is modified without a modification policy"
        )));
    }
    match current {
        None if written != 0 => Err(Error::Rejected(format!(
            "{item} does not exist but is written at version {written}"
        ))),
        None => Ok(false),
        Some(current) if written != current + 1 => Err(stale(item, current, written.saturating_sub(1))),
        Some(_) => Ok(true),
    }
}

fn collect_group_deltas(
    current: Option<&ConfigGroup>,
    read: Option<&ConfigGroup>,
    write: &ConfigGroup,
    path: &mut Vec<String>,
    deltas: &mut Vec<Delta>,
) -> Result<()> {
    let item = item_path(path, None);
    if check_item(
        &item,
        current.map(|g| g.version),
        read.map(|g| g.version),
        write.version,
        &write.mod_policy,
    )? {
        if let Some(current) = current {
            deltas.push(Delta {
                item,
                policy: PolicyRef::resolve(path, &current.mod_policy),
            });
        }
    }

    for (key, value) in &write.values {
        let existing = current.and_then(|g| g.values.get(key));
        let item = item_path(path, Some(key));
        if check_item(
            &item,
            existing.map(|v| v.version),
            read.and_then(|g| g.values.get(key)).map(|v| v.version),
            value.version,
            &value.mod_policy,
        )? {
            if let Some(existing) = existing {
                deltas.push(Delta {
                    item,
                    policy: PolicyRef::resolve(path, &existing.mod_policy),
                });
            }
        }
    }

    for (key, policy) in &write.policies {
        let existing = current.and_then(|g| g.policies.get(key));
        let item = item_path(path, Some(key));
        if check_item(
            &item,
            existing.map(|p| p.version),
            read.and_then(|g| g.policies.get(key)).map(|p| p.version),
            policy.version,
            &policy.mod_policy,
        )? {
            if let Some(existing) = existing {
                deltas.push(Delta {
                    item,
                    policy: PolicyRef::resolve(path, &existing.mod_policy),
                });
            }
        }
    }

    for (key, group) in &write.groups {
        path.push(key.clone());
        collect_group_deltas(
            current.and_then(|g| g.groups.get(key)),
            read.and_then(|g| g.groups.get(key)),
            group,
            path,
            deltas,
        )?;
        path.pop();
    }
    Ok(())
}

fn merge_value(current: &ConfigValue, write: &ConfigValue) -> ConfigValue {
    if write.version == current.version {
        current.clone()
    } else {
        write.clone()
    }
}

fn merge_policy(current: &ConfigPolicy, write: &ConfigPolicy) -> ConfigPolicy {
    if write.version == current.version {
        current.clone()
    } else {
        write.clone()
    }
}

/// A group written at its current version keeps its members and only the listed existing members
/// are merged. A bumped group has exactly the members of the write set.
fn merge_group(current: &ConfigGroup, write: &ConfigGroup) -> ConfigGroup {
    if write.version == current.version {
        let mut merged = current.clone();
        for (key, value) in &write.values {
            if let Some(existing) = current.values.get(key) {
                merged.values.insert(key.clone(), merge_value(existing, value));
            }
        }
        for (key, policy) in &write.policies {
            if let Some(existing) = current.policies.get(key) {
                merged.policies.insert(key.clone(), merge_policy(existing, policy));
            }
        }
        for (key, group) in &write.groups {
            if let Some(existing) = current.groups.get(key) {
                merged.groups.insert(key.clone(), merge_group(existing, group));
            }
        }
        return merged;
    }

    ConfigGroup {
        version: write.version,
        mod_policy: write.mod_policy.clone(),
        values: write
            .values
            .iter()
            .map(|(key, value)| {
                let merged = match current.values.get(key) {
                    Some(existing) => merge_value(existing, value),
                    None => value.clone(),
                };
                (key.clone(), merged)
            })
            .collect(),
        policies: write
            .policies
            .iter()
            .map(|(key, policy)| {
                let merged = match current.policies.get(key) {
                    Some(existing) => merge_policy(existing, policy),
                    None => policy.clone(),
                };
                (key.clone(), merged)
            })
            .collect(),
        groups: write
            .groups
            .iter()
            .map(|(key, group)| {
                let merged = match current.groups.get(key) {
                    Some(existing) => merge_group(existing, group),
                    None => group.clone(),
                };
                (key.clone(), merged)
            })
            .collect(),
    }
}
