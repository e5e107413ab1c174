use serde::Serialize;
use std::fmt;

use crate::models::{ExistingOverride, OverrideRequest, QuizTarget};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    NotVisible,
    NoCapability,
    AlreadyHasOverrideNoUpdateFlag,
    MatchesDefault,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NotVisible => "quiz is hidden",
            SkipReason::NoCapability => "no permission to manage overrides for this quiz",
            SkipReason::AlreadyHasOverrideNoUpdateFlag => {
                "user already has an override and updating existing overrides was not requested"
            }
            SkipReason::MatchesDefault => "requested time limit matches the quiz default",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Skip(SkipReason),
}

/// Rules that need nothing but the target itself. Checked before any override lookup.
pub fn access_skip(target: &QuizTarget) -> Option<SkipReason> {
    if !target.visible {
        Some(SkipReason::NotVisible)
    } else if !target.can_manage_overrides {
        Some(SkipReason::NoCapability)
    } else {
        None
    }
}

/// First matching rule wins: visibility, capability, existing override, default match.
pub fn evaluate(
    target: &QuizTarget,
    request: &OverrideRequest,
    existing: Option<&ExistingOverride>,
) -> Decision {
    if let Some(reason) = access_skip(target) {
        return Decision::Skip(reason);
    }
    if existing.is_some() && !request.update_existing {
        return Decision::Skip(SkipReason::AlreadyHasOverrideNoUpdateFlag);
    }
    // Exact comparison, "no limit" included.
    if request.timelimit == target.timelimit {
        return Decision::Skip(SkipReason::MatchesDefault);
    }
    Decision::Proceed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timelimit::TimeLimit;
    use uuid::Uuid;

    fn quiz(visible: bool, can_manage: bool, mins: u64) -> QuizTarget {
        QuizTarget {
            id: Uuid::new_v4(),
            name: "Quiz".into(),
            timelimit: TimeLimit::from_mins(mins),
            visible,
            can_manage_overrides: can_manage,
        }
    }

    fn request(mins: u64, update_existing: bool) -> OverrideRequest {
        OverrideRequest {
            user_id: Uuid::new_v4(),
            timelimit: TimeLimit::from_mins(mins),
            update_existing,
        }
    }

    fn existing() -> ExistingOverride {
        ExistingOverride {
            id: Uuid::new_v4(),
            timelimit: Some(TimeLimit::from_mins(20)),
            timeopen: None,
            timeclose: None,
            attempts: Some(2),
        }
    }

    #[test]
    fn hidden_wins_over_missing_capability() {
        let d = evaluate(&quiz(false, false, 30), &request(45, false), None);
        assert_eq!(d, Decision::Skip(SkipReason::NotVisible));
    }

    #[test]
    fn missing_capability_wins_over_existing_override() {
        let d = evaluate(&quiz(true, false, 30), &request(45, false), Some(&existing()));
        assert_eq!(d, Decision::Skip(SkipReason::NoCapability));
    }

    #[test]
    fn existing_override_without_update_flag_is_skipped() {
        let d = evaluate(&quiz(true, true, 30), &request(30, false), Some(&existing()));
        assert_eq!(d, Decision::Skip(SkipReason::AlreadyHasOverrideNoUpdateFlag));
    }

    #[test]
    fn existing_override_with_update_flag_still_checks_default() {
        let q = quiz(true, true, 30);
        assert_eq!(
            evaluate(&q, &request(30, true), Some(&existing())),
            Decision::Skip(SkipReason::MatchesDefault)
        );
        assert_eq!(evaluate(&q, &request(45, true), Some(&existing())), Decision::Proceed);
    }

    #[test]
    fn unlimited_request_against_unlimited_default_is_skipped() {
        let d = evaluate(&quiz(true, true, 0), &request(0, false), None);
        assert_eq!(d, Decision::Skip(SkipReason::MatchesDefault));
    }

    #[test]
    fn different_limit_proceeds() {
        assert_eq!(evaluate(&quiz(true, true, 0), &request(45, false), None), Decision::Proceed);
    }
}
