// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Structural diff of two configurations into a read set and a write set.
//!
//! The read set lists the versions the update depends on. The write set carries changed items
//! at their current version plus one and new items at version zero. A group whose membership
//! changed is bumped and lists all of its members; untouched members appear with their version
//! only. Unchanged subtrees are left out entirely.

use crate::{
    consortium_proto::{Config, ConfigGroup, ConfigPolicy, ConfigUpdate, ConfigValue},
    error::{Error, Result},
};
use std::collections::BTreeMap;
use tracing::debug;

/// Result of diffing one map of group members.
struct MapUpdate<T> {
    read: BTreeMap<String, T>,
    write: BTreeMap<String, T>,
    same: BTreeMap<String, T>,
    members_changed: bool,
}

impl<T> Default for MapUpdate<T> {
    fn default() -> Self {
        Self {
            read: BTreeMap::new(),
            write: BTreeMap::new(),
            same: BTreeMap::new(),
            members_changed: false,
        }
    }
}

impl<T: Clone> MapUpdate<T> {
    fn has_changes(&self) -> bool {
        !self.read.is_empty() || !self.write.is_empty()
    }

    /// Once the group is bumped, untouched members are listed on both sides.
    fn include_same(&mut self) {
        for (key, item) in std::mem::take(&mut self.same) {
            self.read.insert(key.clone(), item.clone());
            self.write.insert(key, item);
        }
    }
}

fn values_update(
    original: &BTreeMap<String, ConfigValue>,
    updated: &BTreeMap<String, ConfigValue>,
) -> MapUpdate<ConfigValue> {
    let mut update = MapUpdate::default();
    for (key, before) in original {
        match updated.get(key) {
            None => update.members_changed = true,
            Some(after) if after.mod_policy == before.mod_policy && after.value == before.value => {
                update.same.insert(
                    key.clone(),
                    ConfigValue {
                        version: before.version,
                        ..Default::default()
                    },
                );
            }
            Some(after) => {
                update.write.insert(
                    key.clone(),
                    ConfigValue {
                        version: before.version + 1,
                        value: after.value.clone(),
                        mod_policy: after.mod_policy.clone(),
                    },
                );
            }
        }
    }
    for (key, after) in updated {
        if !original.contains_key(key) {
            update.members_changed = true;
            update.write.insert(
                key.clone(),
                ConfigValue {
                    version: 0,
                    value: after.value.clone(),
                    mod_policy: after.mod_policy.clone(),
                },
            );
        }
    }
    update
}

fn policies_update(
    original: &BTreeMap<String, ConfigPolicy>,
    updated: &BTreeMap<String, ConfigPolicy>,
) -> MapUpdate<ConfigPolicy> {
    let mut update = MapUpdate::default();
    for (key, before) in original {
        match updated.get(key) {
            None => update.members_changed = true,
            Some(after) if after.mod_policy == before.mod_policy && after.policy == before.policy => {
                update.same.insert(
                    key.clone(),
                    ConfigPolicy {
                        version: before.version,
                        ..Default::default()
                    },
                );
            }
            Some(after) => {
                update.write.insert(
                    key.clone(),
                    ConfigPolicy {
                        version: before.version + 1,
                        policy: after.policy.clone(),
                        mod_policy: after.mod_policy.clone(),
                    },
                );
            }
        }
    }
    for (key, after) in updated {
        if !original.contains_key(key) {
            update.members_changed = true;
            update.write.insert(
                key.clone(),
                ConfigPolicy {
                    version: 0,
                    policy: after.policy.clone(),
                    mod_policy: after.mod_policy.clone(),
                },
            );
        }
    }
    update
}

fn groups_update(
    original: &BTreeMap<String, ConfigGroup>,
    updated: &BTreeMap<String, ConfigGroup>,
) -> MapUpdate<ConfigGroup> {
    let mut update = MapUpdate::default();
    for (key, before) in original {
        let Some(after) = updated.get(key) else {
            update.members_changed = true;
            continue;
        };
        let child = group_update(before, after);
        if child.changed {
            update.read.insert(key.clone(), child.read);
            update.write.insert(key.clone(), child.write);
        } else {
            update.same.insert(key.clone(), child.read);
        }
    }
    for (key, after) in updated {
        if !original.contains_key(key) {
            update.members_changed = true;
            update.write.insert(key.clone(), new_group(after));
        }
    }
    update
}

/// A group absent from the original: every item it holds is new, hence at version zero.
fn new_group(group: &ConfigGroup) -> ConfigGroup {
    let write = group_update(&ConfigGroup::default(), group).write;
    ConfigGroup {
        version: 0,
        mod_policy: group.mod_policy.clone(),
        ..write
    }
}

struct GroupUpdate {
    read: ConfigGroup,
    write: ConfigGroup,
    changed: bool,
}

fn group_update(original: &ConfigGroup, updated: &ConfigGroup) -> GroupUpdate {
    let mut policies = policies_update(&original.policies, &updated.policies);
    let mut values = values_update(&original.values, &updated.values);
    let mut groups = groups_update(&original.groups, &updated.groups);

    let membership_changed = policies.members_changed
        || values.members_changed
        || groups.members_changed
        || original.mod_policy != updated.mod_policy;

    if !membership_changed {
        if !(policies.has_changes() || values.has_changes() || groups.has_changes()) {
            let version_only = ConfigGroup {
                version: original.version,
                ..Default::default()
            };
            return GroupUpdate {
                read: version_only.clone(),
                write: version_only,
                changed: false,
            };
        }
        // members changed in place: the group itself keeps its version
        return GroupUpdate {
            read: ConfigGroup {
                version: original.version,
                policies: policies.read,
                values: values.read,
                groups: groups.read,
                mod_policy: String::new(),
            },
            write: ConfigGroup {
                version: original.version,
                policies: policies.write,
                values: values.write,
                groups: groups.write,
                mod_policy: String::new(),
            },
            changed: true,
        };
    }

    policies.include_same();
    values.include_same();
    groups.include_same();
    GroupUpdate {
        read: ConfigGroup {
            version: original.version,
            policies: policies.read,
            values: values.read,
            groups: groups.read,
            mod_policy: String::new(),
        },
        write: ConfigGroup {
            version: original.version + 1,
            policies: policies.write,
            values: values.write,
            groups: groups.write,
            mod_policy: updated.mod_policy.clone(),
        },
        changed: true,
    }
}

/// Computes the update turning `original` into `updated`.
///
/// Fails with `NoOpUpdate` when both configurations hold the same items.
pub fn compute_update(channel_id: &str, original: &Config, updated: &Config) -> Result<ConfigUpdate> {
    let before = original
        .channel_group
        .as_ref()
        .ok_or_else(|| Error::Diff("original configuration has no channel group".to_string()))?;
    let after = updated
        .channel_group
        .as_ref()
        .ok_or_else(|| Error::Diff("updated configuration has no channel group".to_string()))?;

    let update = group_update(before, after);
    if !update.changed {
        return Err(Error::NoOpUpdate);
    }
    debug!(
        "Computed update for channel '{channel_id}': root version {} -> {}",
        update.read.version, update.write.version
    );
    Ok(ConfigUpdate {
        channel_id: channel_id.to_string(),
        read_set: Some(update.read),
        write_set: Some(update.write),
    })
}
