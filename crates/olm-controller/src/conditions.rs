//! Status condition vocabulary.
//!
//! Every reconcile pass produces a value for each [`ConditionType`] and
//! writes the whole set. A [`ConditionSet`] starts with every type Unknown
//! and is filled in as the pass progresses, so nothing from a previous pass
//! leaks into the next one.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Resolved,
    Unpacked,
    Installed,
    Progressing,
    Healthy,
    Deprecated,
    PackageDeprecated,
    ChannelDeprecated,
    BundleDeprecated,
}

impl ConditionType {
    /// The full vocabulary in the order it is written
    pub const ALL: [ConditionType; 9] = [
        ConditionType::Resolved,
        ConditionType::Unpacked,
        ConditionType::Installed,
        ConditionType::Progressing,
        ConditionType::Healthy,
        ConditionType::Deprecated,
        ConditionType::PackageDeprecated,
        ConditionType::ChannelDeprecated,
        ConditionType::BundleDeprecated,
    ];

    pub const DEPRECATION: [ConditionType; 4] = [
        ConditionType::Deprecated,
        ConditionType::PackageDeprecated,
        ConditionType::ChannelDeprecated,
        ConditionType::BundleDeprecated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Resolved => "Resolved",
            ConditionType::Unpacked => "Unpacked",
            ConditionType::Installed => "Installed",
            ConditionType::Progressing => "Progressing",
            ConditionType::Healthy => "Healthy",
            ConditionType::Deprecated => "Deprecated",
            ConditionType::PackageDeprecated => "PackageDeprecated",
            ConditionType::ChannelDeprecated => "ChannelDeprecated",
            ConditionType::BundleDeprecated => "BundleDeprecated",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    Success,
    ResolutionFailed,
    InstallationFailed,
    InstallationStatusUnknown,
    UnpackPending,
    Unpacking,
    UnpackSuccess,
    UnpackFailed,
    Deprecated,
    Gated,
    Paused,
    Succeeded,
    Reconciling,
    Failed,
    Healthy,
    Unhealthy,
    Unverifiable,
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    pub reason: Reason,
    pub message: String,
    pub observed_generation: i64,
    pub last_transition_time: DateTime<Utc>,
}

/// Insert or update a condition, keeping the existing transition time when
/// the status does not change
pub fn set_status_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions
        .iter_mut()
        .find(|c| c.condition_type == condition.condition_type)
    {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

pub fn find_condition(conditions: &[Condition], condition_type: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.condition_type == condition_type)
}

/// Status, reason and message of one condition, before it is stamped with a
/// generation and transition time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionValue {
    pub status: ConditionStatus,
    pub reason: Reason,
    pub message: String,
}

/// The conditions computed by one reconcile pass
#[derive(Debug, Clone)]
pub struct ConditionSet {
    generation: i64,
    values: IndexMap<ConditionType, ConditionValue>,
}

impl ConditionSet {
    /// All conditions Unknown, reason `NotAttempted`
    pub fn new(generation: i64) -> Self {
        let values = ConditionType::ALL
            .iter()
            .map(|t| {
                (
                    *t,
                    ConditionValue {
                        status: ConditionStatus::Unknown,
                        reason: Reason::NotAttempted,
                        message: String::new(),
                    },
                )
            })
            .collect();
        Self { generation, values }
    }

    pub fn set(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: Reason,
        message: impl Into<String>,
    ) {
        self.values.insert(
            condition_type,
            ConditionValue {
                status,
                reason,
                message: message.into(),
            },
        );
    }

    /// Set every condition to the same value
    pub fn set_all(&mut self, status: ConditionStatus, reason: Reason, message: &str) {
        for t in ConditionType::ALL {
            self.set(t, status, reason, message);
        }
    }

    pub fn get(&self, condition_type: ConditionType) -> Option<&ConditionValue> {
        self.values.get(&condition_type)
    }

    pub fn generation(&self) -> i64 {
        self.generation
    }

    /// Merge into persisted conditions, written in vocabulary order
    pub fn apply(&self, conditions: &mut Vec<Condition>, now: DateTime<Utc>) {
        let mut merged: Vec<Condition> = Vec::with_capacity(ConditionType::ALL.len());
        for t in ConditionType::ALL {
            if let Some(existing) = find_condition(conditions, t) {
                merged.push(existing.clone());
            }
        }
        for (t, value) in &self.values {
            set_status_condition(
                &mut merged,
                Condition {
                    condition_type: *t,
                    status: value.status,
                    reason: value.reason,
                    message: value.message.clone(),
                    observed_generation: self.generation,
                    last_transition_time: now,
                },
            );
        }
        merged.sort_by_key(|c| ConditionType::ALL.iter().position(|t| *t == c.condition_type));
        *conditions = merged;
    }
}
