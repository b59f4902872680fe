//! Status sub-resource model: lifecycle conditions and related objects.
//!
//! Conditions are keyed by type. [`set_status_condition`] upserts, so a
//! condition list never holds two entries of the same type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::meta::{ObjectReference, same_object};
use crate::object::{DynamicObject, DynamicObjectExt};

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    /// Canonical string form (`"True"`, `"False"`, `"Unknown"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis of health a condition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Available,
    Progressing,
    Degraded,
    Upgradeable,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Available => "Available",
            Self::Progressing => "Progressing",
            Self::Degraded => "Degraded",
            Self::Upgradeable => "Upgradeable",
        };
        f.write_str(name)
    }
}

/// Machine-readable reason attached to a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusReason {
    /// Everything applied and all dependents are ready.
    Reconciling,
    /// A hard failure: an apply, observation or readiness error.
    Failing,
    /// Dependents exist but have not become ready yet.
    Initializing,
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reconciling => "Reconciling",
            Self::Failing => "Failing",
            Self::Initializing => "Initializing",
        };
        f.write_str(name)
    }
}

/// A typed, timestamped status entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,
    #[serde(default)]
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
    pub last_heartbeat_time: DateTime<Utc>,
}

impl Condition {
    /// Create a condition stamped with the current time.
    pub fn new(
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: StatusReason,
        message: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            condition_type,
            status,
            reason: Some(reason),
            message: message.into(),
            last_transition_time: now,
            last_heartbeat_time: now,
        }
    }

    /// Whether the condition status is `True`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Upsert `condition` into `conditions` by type.
///
/// A new type is appended with fresh timestamps. For an existing type the
/// transition time only moves when the status changes; reason, message and
/// heartbeat always refresh.
pub fn set_status_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    let now = Utc::now();
    match conditions
        .iter_mut()
        .find(|c| c.condition_type == condition.condition_type)
    {
        None => conditions.push(Condition {
            last_transition_time: now,
            last_heartbeat_time: now,
            ..condition
        }),
        Some(existing) => {
            if existing.status != condition.status {
                existing.status = condition.status;
                existing.last_transition_time = now;
            }
            existing.reason = condition.reason;
            existing.message = condition.message;
            existing.last_heartbeat_time = now;
        }
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_status_condition(conditions: &[Condition], condition_type: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.condition_type == condition_type)
}

/// Remove a condition by type. Returns whether one was removed.
pub fn remove_status_condition(conditions: &mut Vec<Condition>, condition_type: ConditionType) -> bool {
    let before = conditions.len();
    conditions.retain(|c| c.condition_type != condition_type);
    conditions.len() != before
}

/// Status shared by every managed instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonStatus {
    /// Reconciliation conditions, merge key `type`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Objects that are related to this instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_objects: Vec<ObjectReference>,
}

impl CommonStatus {
    /// Create an empty status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a condition by type.
    pub fn set_condition(&mut self, condition: Condition) {
        set_status_condition(&mut self.conditions, condition);
    }

    /// Find a condition by type.
    #[must_use]
    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        find_status_condition(&self.conditions, condition_type)
    }

    /// Upsert a related object reference.
    pub fn set_related_object(&mut self, reference: ObjectReference) {
        match self
            .related_objects
            .iter_mut()
            .find(|r| same_object(r, &reference))
        {
            Some(slot) => *slot = reference,
            None => self.related_objects.push(reference),
        }
    }

    /// Remove a related object reference. Returns whether one was removed.
    pub fn remove_related_object(&mut self, reference: &ObjectReference) -> bool {
        let before = self.related_objects.len();
        self.related_objects.retain(|r| !same_object(r, reference));
        self.related_objects.len() != before
    }

    /// Record `object` as related to this instance.
    pub fn update_related_objects(&mut self, object: &DynamicObject) {
        self.set_related_object(object.object_reference());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::object::new_object;

    fn available(status: ConditionStatus, reason: StatusReason, message: &str) -> Condition {
        Condition::new(ConditionType::Available, status, reason, message)
    }

    #[test]
    fn test_set_condition_appends_new_type() {
        let mut conditions = Vec::new();
        set_status_condition(&mut conditions, available(ConditionStatus::False, StatusReason::Initializing, "wait"));
        set_status_condition(
            &mut conditions,
            Condition::new(ConditionType::Degraded, ConditionStatus::False, StatusReason::Reconciling, ""),
        );
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_set_condition_upserts_by_type() {
        let mut conditions = Vec::new();
        set_status_condition(&mut conditions, available(ConditionStatus::False, StatusReason::Initializing, "wait"));
        set_status_condition(&mut conditions, available(ConditionStatus::True, StatusReason::Reconciling, "ok"));

        assert_eq!(conditions.len(), 1);
        let condition = find_status_condition(&conditions, ConditionType::Available).unwrap();
        assert!(condition.is_true());
        assert_eq!(condition.reason, Some(StatusReason::Reconciling));
        assert_eq!(condition.message, "ok");
    }

    #[test]
    fn test_transition_time_only_moves_on_status_change() {
        let mut conditions = Vec::new();
        set_status_condition(&mut conditions, available(ConditionStatus::False, StatusReason::Failing, "a"));
        let first = find_status_condition(&conditions, ConditionType::Available)
            .unwrap()
            .last_transition_time;

        set_status_condition(&mut conditions, available(ConditionStatus::False, StatusReason::Initializing, "b"));
        let same = find_status_condition(&conditions, ConditionType::Available).unwrap();
        assert_eq!(same.last_transition_time, first);
        assert_eq!(same.message, "b");
        assert!(same.last_heartbeat_time >= first);
    }

    #[test]
    fn test_remove_condition() {
        let mut conditions = vec![available(ConditionStatus::True, StatusReason::Reconciling, "")];
        assert!(remove_status_condition(&mut conditions, ConditionType::Available));
        assert!(!remove_status_condition(&mut conditions, ConditionType::Available));
    }

    #[test]
    fn test_related_objects_upsert() {
        let mut status = CommonStatus::new();
        let mut obj = new_object("apps/v1", "Deployment", "web").within("ns");
        status.update_related_objects(&obj);

        obj.metadata.resource_version = Some("42".to_string());
        status.update_related_objects(&obj);

        assert_eq!(status.related_objects.len(), 1);
        assert_eq!(
            status.related_objects.first().and_then(|r| r.resource_version.as_deref()),
            Some("42")
        );

        assert!(status.remove_related_object(&obj.object_reference()));
        assert!(status.related_objects.is_empty());
    }

    #[test]
    fn test_condition_serializes_type_key() {
        let json = serde_json::to_value(available(ConditionStatus::True, StatusReason::Reconciling, "ok")).unwrap();
        assert_eq!(json["type"], "Available");
        assert_eq!(json["status"], "True");
        assert_eq!(json["reason"], "Reconciling");
        assert!(json.get("lastTransitionTime").is_some());
    }
}
