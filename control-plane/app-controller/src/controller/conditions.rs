//! Condition bookkeeping for [`ApplicationStatus`].
//!
//! Conditions are keyed by type. `lastTransitionTime` moves only when the
//! status flips; `lastUpdateTime` moves on any change; restating a condition
//! with the same status, reason and message leaves it untouched.

use chrono::{DateTime, Utc};

use crate::crd::{ApplicationStatus, Condition, ConditionStatus, ConditionType};

pub const REASON_COMPONENTS_READY: &str = "ComponentsReady";
pub const REASON_COMPONENTS_NOT_READY: &str = "ComponentsNotReady";
pub const REASON_COMPONENTS_SETTLED: &str = "ComponentsSettled";
pub const REASON_COMPONENTS_IN_PROGRESS: &str = "ComponentsInProgress";
pub const REASON_ERROR_SEEN: &str = "ErrorSeen";
pub const REASON_NO_ERROR: &str = "NoError";
pub const REASON_INIT: &str = "Init";

impl ApplicationStatus {
    /// Returns `true` if the condition list changed.
    pub fn set_condition(
        &mut self,
        type_: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let ts = now.to_rfc3339();
        match self.conditions.iter_mut().find(|c| c.type_ == type_) {
            Some(c) => {
                if c.status == status
                    && c.reason.as_deref() == Some(reason)
                    && c.message.as_deref() == Some(message)
                {
                    return false;
                }
                if c.status != status {
                    c.status = status;
                    c.last_transition_time = Some(ts.clone());
                }
                c.reason = Some(reason.to_string());
                c.message = Some(message.to_string());
                c.last_update_time = Some(ts);
            }
            None => self.conditions.push(Condition {
                type_,
                status,
                reason: Some(reason.to_string()),
                message: Some(message.to_string()),
                last_update_time: Some(ts.clone()),
                last_transition_time: Some(ts),
            }),
        }
        true
    }

    pub fn ready(&mut self, reason: &str, message: &str, now: DateTime<Utc>) -> bool {
        self.set_condition(ConditionType::Ready, ConditionStatus::True, reason, message, now)
    }

    pub fn not_ready(&mut self, reason: &str, message: &str, now: DateTime<Utc>) -> bool {
        self.set_condition(ConditionType::Ready, ConditionStatus::False, reason, message, now)
    }

    pub fn set_error(&mut self, reason: &str, message: &str, now: DateTime<Utc>) -> bool {
        self.set_condition(ConditionType::Error, ConditionStatus::True, reason, message, now)
    }

    pub fn clear_error(&mut self, now: DateTime<Utc>) -> bool {
        self.set_condition(
            ConditionType::Error,
            ConditionStatus::False,
            REASON_NO_ERROR,
            "No error seen",
            now,
        )
    }

    pub fn settled(&mut self, reason: &str, message: &str, now: DateTime<Utc>) -> bool {
        self.set_condition(ConditionType::Settled, ConditionStatus::True, reason, message, now)
    }

    pub fn not_settled(&mut self, reason: &str, message: &str, now: DateTime<Utc>) -> bool {
        self.set_condition(ConditionType::Settled, ConditionStatus::False, reason, message, now)
    }

    /// Adds `type_` as `Unknown` if it is not present yet.
    pub fn ensure_condition(&mut self, type_: ConditionType, now: DateTime<Utc>) -> bool {
        if self.get_condition(type_.clone()).is_some() {
            return false;
        }
        self.set_condition(type_, ConditionStatus::Unknown, REASON_INIT, "Not Observed", now)
    }

    pub fn ensure_standard_conditions(&mut self, now: DateTime<Utc>) -> bool {
        [ConditionType::Ready, ConditionType::Settled, ConditionType::Error]
            .into_iter()
            .fold(false, |changed, t| self.ensure_condition(t, now) || changed)
    }

    pub fn remove_condition(&mut self, type_: ConditionType) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| c.type_ != type_);
        self.conditions.len() != before
    }

    pub fn get_condition(&self, type_: ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub fn is_condition_true(&self, type_: ConditionType) -> bool {
        self.get_condition(type_)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    pub fn is_ready(&self) -> bool {
        self.is_condition_true(ConditionType::Ready)
    }
}
