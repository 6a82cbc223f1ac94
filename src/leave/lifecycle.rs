use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::role::Role;

/// Request lifecycle: `pending` is the only non-terminal state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        self != LeaveStatus::Pending
    }

    /// Parse a status column value; unknown strings indicate a corrupt row.
    pub fn parse(value: &str) -> AppResult<Self> {
        value
            .parse()
            .map_err(|_| AppError::InvalidState(format!("unknown leave status '{value}'")))
    }
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if start > end {
        return Err(AppError::invalid_input("startDate cannot be after endDate"));
    }
    Ok(())
}

/// Two inclusive date ranges collide when each starts no later than the
/// other ends.
pub fn ranges_overlap(
    start: NaiveDate,
    end: NaiveDate,
    other_start: NaiveDate,
    other_end: NaiveDate,
) -> bool {
    start <= other_end && other_start <= end
}

pub fn ensure_positive_days(days: f64) -> AppResult<()> {
    if days <= 0.0 {
        return Err(AppError::invalid_input(
            "the requested range contains no working days",
        ));
    }
    Ok(())
}

/// approve/reject may only be taken from `pending`.
pub fn ensure_pending(status: LeaveStatus) -> AppResult<()> {
    if status.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "leave request is already {status}"
        )));
    }
    Ok(())
}

/// Approved requests are never hard-deleted; they are the paid-time-off
/// audit trail.
pub fn ensure_deletable(status: LeaveStatus) -> AppResult<()> {
    if status == LeaveStatus::Approved {
        return Err(AppError::InvalidState(
            "approved leave requests cannot be deleted".into(),
        ));
    }
    Ok(())
}

/// Approval/rejection authority: the requester's manager, or admin/HR.
pub fn can_decide(actor_role: Role, actor_id: u64, requester_manager_id: Option<u64>) -> bool {
    match actor_role {
        Role::Admin | Role::Hr => true,
        _ => requester_manager_id == Some(actor_id),
    }
}

pub fn ensure_can_decide(
    actor_role: Role,
    actor_id: u64,
    requester_manager_id: Option<u64>,
) -> AppResult<()> {
    if can_decide(actor_role, actor_id, requester_manager_id) {
        Ok(())
    } else {
        Err(AppError::unauthorized(
            "only the requester's manager or HR/admin may decide this request",
        ))
    }
}

pub fn ensure_owner(actor_id: u64, owner_id: u64) -> AppResult<()> {
    if actor_id == owner_id {
        Ok(())
    } else {
        Err(AppError::unauthorized("not the owner of this leave request"))
    }
}

pub fn ensure_owner_or_admin(actor_role: Role, actor_id: u64, owner_id: u64) -> AppResult<()> {
    if actor_role == Role::Admin || actor_id == owner_id {
        Ok(())
    } else {
        Err(AppError::unauthorized("not the owner of this leave request"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_the_only_non_terminal_state() {
        assert!(!LeaveStatus::Pending.is_terminal());
        assert!(LeaveStatus::Approved.is_terminal());
        assert!(LeaveStatus::Rejected.is_terminal());
        assert!(LeaveStatus::Cancelled.is_terminal());
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        assert!(ensure_pending(LeaveStatus::Pending).is_ok());
        for status in [
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Cancelled,
        ] {
            let err = ensure_pending(status).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
        }
    }

    #[test]
    fn approved_requests_cannot_be_deleted() {
        assert!(ensure_deletable(LeaveStatus::Pending).is_ok());
        assert!(ensure_deletable(LeaveStatus::Rejected).is_ok());
        assert!(ensure_deletable(LeaveStatus::Cancelled).is_ok());
        assert!(ensure_deletable(LeaveStatus::Approved).is_err());
    }

    #[test]
    fn manager_and_hr_may_decide_but_peers_may_not() {
        assert!(can_decide(Role::Admin, 9, None));
        assert!(can_decide(Role::Hr, 9, Some(1)));
        assert!(can_decide(Role::Manager, 7, Some(7)));
        assert!(!can_decide(Role::Manager, 7, Some(8)));
        // a plain employee who happens to be the listed manager still decides
        assert!(can_decide(Role::Employee, 7, Some(7)));
        assert!(!can_decide(Role::Employee, 7, None));
    }

    #[test]
    fn inverted_ranges_and_zero_days_are_invalid_input() {
        let a = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert!(matches!(validate_range(a, b), Err(AppError::InvalidInput(_))));
        assert!(validate_range(b, a).is_ok());
        assert!(matches!(ensure_positive_days(0.0), Err(AppError::InvalidInput(_))));
        assert!(ensure_positive_days(0.5).is_ok());
    }

    #[test]
    fn overlap_is_symmetric_and_inclusive() {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        // 07-03..07-06 collides with an existing 07-01..07-05
        assert!(ranges_overlap(d(7, 3), d(7, 6), d(7, 1), d(7, 5)));
        assert!(ranges_overlap(d(7, 1), d(7, 5), d(7, 3), d(7, 6)));
        // sharing a single boundary day still collides
        assert!(ranges_overlap(d(7, 5), d(7, 8), d(7, 1), d(7, 5)));
        // fully contained
        assert!(ranges_overlap(d(7, 2), d(7, 3), d(7, 1), d(7, 5)));
        // disjoint
        assert!(!ranges_overlap(d(7, 6), d(7, 8), d(7, 1), d(7, 5)));
        assert!(!ranges_overlap(d(6, 1), d(6, 2), d(7, 1), d(7, 5)));
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            LeaveStatus::Pending,
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Cancelled,
        ] {
            assert_eq!(LeaveStatus::parse(&status.to_string()).unwrap(), status);
        }
        assert!(LeaveStatus::parse("archived").is_err());
    }
}
