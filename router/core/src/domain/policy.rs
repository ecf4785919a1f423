// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Route Access Evaluator
//!
//! Pure decision function over a route snapshot, the principal's role set and
//! an instant. Nothing here reads a clock, touches storage or fails: every
//! [`Route`] that could be constructed is evaluable.
//!
//! ## Rule set precedence
//!
//! 1. any held role in `disallowed` → deny (`explicit deny`)
//! 2. `allow_all` → allow (`allow-all`)
//! 3. any held role in `allowed` → allow (`explicit allow`)
//! 4. otherwise → deny (`not in allow-list`)
//!
//! ## Conditional gate
//!
//! Only consulted when the rule set allows, the route is `conditional` and
//! at least one condition is attached. A satisfied role-based override
//! condition opens the gate on its own; otherwise every condition must hold
//! and the first failing one (in attachment order) is reported.
//!
//! Route status is not an input: an inactive route still evaluates. Callers
//! that serve traffic filter on status themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::condition::ConditionId;
use crate::domain::role::RoleSet;
use crate::domain::route::{Route, RouteRules};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
    ExplicitDeny { role: String },
    AllowAll,
    ExplicitAllow { role: String },
    NotInAllowList,
    ConditionNotMet { condition_id: ConditionId, condition_name: String },
    OverrideGranted { condition_id: ConditionId, condition_name: String },
    ConditionsSatisfied,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::ExplicitDeny { .. } => f.write_str("explicit deny"),
            DecisionReason::AllowAll => f.write_str("allow-all"),
            DecisionReason::ExplicitAllow { .. } => f.write_str("explicit allow"),
            DecisionReason::NotInAllowList => f.write_str("not in allow-list"),
            DecisionReason::ConditionNotMet { condition_name, .. } => {
                write!(f, "condition not met: {condition_name}")
            }
            DecisionReason::OverrideGranted { condition_name, .. } => {
                write!(f, "override condition satisfied: {condition_name}")
            }
            DecisionReason::ConditionsSatisfied => f.write_str("all conditions satisfied"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl AccessDecision {
    fn allow(reason: DecisionReason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self { allowed: false, reason }
    }
}

/// Result of a single condition check, kept for dry runs and audit output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCheck {
    pub condition_id: ConditionId,
    pub name: String,
    pub condition_type: String,
    pub satisfied: bool,
    pub is_override: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub decision: AccessDecision,
    pub rules: AccessDecision,
    /// Empty when the gate was not consulted.
    pub checks: Vec<ConditionCheck>,
}

pub fn evaluate_rules(rules: &RouteRules, roles: &RoleSet) -> AccessDecision {
    if let Some(role) = roles.first_match(&rules.disallowed) {
        return AccessDecision::deny(DecisionReason::ExplicitDeny { role: role.to_string() });
    }
    if rules.allow_all {
        return AccessDecision::allow(DecisionReason::AllowAll);
    }
    match roles.first_match(&rules.allowed) {
        Some(role) => AccessDecision::allow(DecisionReason::ExplicitAllow { role: role.to_string() }),
        None => AccessDecision::deny(DecisionReason::NotInAllowList),
    }
}

pub fn evaluate_access(route: &Route, roles: &RoleSet, at: DateTime<Utc>) -> AccessDecision {
    explain_access(route, roles, at).decision
}

pub fn explain_access(route: &Route, roles: &RoleSet, at: DateTime<Utc>) -> Evaluation {
    let rules = evaluate_rules(&route.rules, roles);
    if !rules.allowed || !route.conditional || route.conditions.is_empty() {
        return Evaluation {
            decision: rules.clone(),
            rules,
            checks: Vec::new(),
        };
    }

    let checks: Vec<ConditionCheck> = route
        .conditions
        .iter()
        .map(|condition| ConditionCheck {
            condition_id: condition.id,
            name: condition.name.clone(),
            condition_type: condition.rule.type_name().to_string(),
            satisfied: condition.is_satisfied(roles, at),
            is_override: condition.is_override(),
        })
        .collect();

    let decision = if let Some(check) = checks.iter().find(|c| c.is_override && c.satisfied) {
        AccessDecision::allow(DecisionReason::OverrideGranted {
            condition_id: check.condition_id,
            condition_name: check.name.clone(),
        })
    } else if let Some(failed) = checks.iter().find(|c| !c.satisfied) {
        AccessDecision::deny(DecisionReason::ConditionNotMet {
            condition_id: failed.condition_id,
            condition_name: failed.name.clone(),
        })
    } else {
        AccessDecision::allow(DecisionReason::ConditionsSatisfied)
    };

    Evaluation { decision, rules, checks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentId;
    use crate::domain::condition::{Condition, ConditionSpec, ROLE_BASED, TIME_BASED};
    use crate::domain::feature::FeatureId;
    use crate::domain::route::RouteDraft;
    use chrono::TimeZone;
    use serde_json::json;

    fn roles(names: &[&str]) -> RoleSet {
        names.iter().copied().collect()
    }

    fn route(rules: RouteRules, conditional: bool) -> Route {
        Route::new(
            RouteDraft {
                feature_id: FeatureId::new(),
                agent_id: AgentId::new(),
                rules,
                conditional,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn weekday_hours() -> Condition {
        Condition::new(
            ConditionSpec {
                name: "Business Hours".into(),
                description: None,
                condition_type: TIME_BASED.into(),
                condition_data: json!({
                    "start_time": "09:00",
                    "end_time": "17:00",
                    "timezone": "UTC",
                    "days_of_week": ["monday", "tuesday", "wednesday", "thursday", "friday"]
                }),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn role_gate(allowed: &[&str], override_time: bool) -> Condition {
        Condition::new(
            ConditionSpec {
                name: "Role gate".into(),
                description: None,
                condition_type: ROLE_BASED.into(),
                condition_data: json!({
                    "allowed_roles": allowed,
                    "override_time_restrictions": override_time
                }),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn wednesday_10() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap()
    }

    fn saturday_10() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 6, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_deny_list_beats_allow_all() {
        let rules = RouteRules::allow_all().denying(["Guest"]);
        let decision = evaluate_rules(&rules, &roles(&["Guest", "Manager"]));
        assert!(!decision.allowed);
        assert_eq!(decision.reason.to_string(), "explicit deny");
        assert_eq!(decision.reason, DecisionReason::ExplicitDeny { role: "Guest".into() });
    }

    #[test]
    fn test_deny_list_beats_allow_list() {
        let rules = RouteRules::allow_only(["Manager"]).denying(["Manager"]);
        assert!(!evaluate_rules(&rules, &roles(&["Manager"])).allowed);
    }

    #[test]
    fn test_allow_all_admits_unknown_roles() {
        let decision = evaluate_rules(&RouteRules::allow_all(), &roles(&["Anyone"]));
        assert_eq!(decision, AccessDecision::allow(DecisionReason::AllowAll));
    }

    #[test]
    fn test_allow_all_admits_empty_role_set() {
        let rules = RouteRules::allow_all().denying(["Guest"]);
        assert!(evaluate_rules(&rules, &RoleSet::new()).allowed);
    }

    #[test]
    fn test_allow_list_requires_membership() {
        let rules = RouteRules::allow_only(["Manager"]);
        assert_eq!(
            evaluate_rules(&rules, &roles(&["Learner"])),
            AccessDecision::deny(DecisionReason::NotInAllowList)
        );
        assert_eq!(
            evaluate_rules(&rules, &RoleSet::new()),
            AccessDecision::deny(DecisionReason::NotInAllowList)
        );
        assert_eq!(
            evaluate_rules(&rules, &roles(&["Manager"])).reason.to_string(),
            "explicit allow"
        );
    }

    #[test]
    fn test_role_matching_is_case_sensitive() {
        let rules = RouteRules::allow_only(["Manager"]);
        assert!(!evaluate_rules(&rules, &roles(&["manager"])).allowed);
    }

    #[test]
    fn test_wildcard_role_name_not_expanded() {
        let rules = RouteRules::allow_only(["*"]);
        assert!(!evaluate_rules(&rules, &roles(&["Admin"])).allowed);
    }

    #[test]
    fn test_unconditional_route_ignores_conditions() {
        let mut r = route(RouteRules::allow_only(["Manager"]), false);
        r.attach(weekday_hours(), Utc::now());
        assert!(evaluate_access(&r, &roles(&["Manager"]), saturday_10()).allowed);
    }

    #[test]
    fn test_conditional_route_without_conditions_passes() {
        let r = route(RouteRules::allow_only(["Manager"]), true);
        let decision = evaluate_access(&r, &roles(&["Manager"]), saturday_10());
        assert_eq!(decision.reason, DecisionReason::ExplicitAllow { role: "Manager".into() });
    }

    #[test]
    fn test_time_gate() {
        let mut r = route(RouteRules::allow_only(["Manager"]), true);
        let hours = weekday_hours();
        r.attach(hours.clone(), Utc::now());

        assert!(evaluate_access(&r, &roles(&["Manager"]), wednesday_10()).allowed);

        let weekend = evaluate_access(&r, &roles(&["Manager"]), saturday_10());
        assert!(!weekend.allowed);
        assert_eq!(
            weekend.reason,
            DecisionReason::ConditionNotMet {
                condition_id: hours.id,
                condition_name: "Business Hours".into()
            }
        );
        assert!(weekend.reason.to_string().starts_with("condition not met"));
    }

    #[test]
    fn test_override_short_circuits_time_gate() {
        let mut r = route(RouteRules::allow_only(["Manager", "Admin"]), true);
        r.attach(weekday_hours(), Utc::now());
        r.attach(role_gate(&["Admin"], true), Utc::now());

        let admin = evaluate_access(&r, &roles(&["Admin"]), saturday_10());
        assert!(admin.allowed);
        assert!(matches!(admin.reason, DecisionReason::OverrideGranted { .. }));

        assert!(!evaluate_access(&r, &roles(&["Manager"]), saturday_10()).allowed);
    }

    #[test]
    fn test_override_cannot_rescue_rule_deny() {
        let mut r = route(RouteRules::allow_only(["Manager"]), true);
        r.attach(role_gate(&["Admin"], true), Utc::now());
        let decision = evaluate_access(&r, &roles(&["Admin"]), wednesday_10());
        assert_eq!(decision, AccessDecision::deny(DecisionReason::NotInAllowList));
    }

    #[test]
    fn test_non_override_role_gate_is_conjunctive() {
        let mut r = route(RouteRules::allow_all(), true);
        r.attach(weekday_hours(), Utc::now());
        r.attach(role_gate(&["Reviewer"], false), Utc::now());

        let during_hours = evaluate_access(&r, &roles(&["Reviewer"]), wednesday_10());
        assert_eq!(during_hours.reason, DecisionReason::ConditionsSatisfied);
        assert!(!evaluate_access(&r, &roles(&["Reviewer"]), saturday_10()).allowed);
        assert!(!evaluate_access(&r, &roles(&["Learner"]), wednesday_10()).allowed);
    }

    #[test]
    fn test_first_failing_condition_reported() {
        let mut r = route(RouteRules::allow_all(), true);
        let gate = role_gate(&["Reviewer"], false);
        r.attach(gate.clone(), Utc::now());
        r.attach(weekday_hours(), Utc::now());

        let decision = evaluate_access(&r, &roles(&["Learner"]), saturday_10());
        assert!(matches!(
            decision.reason,
            DecisionReason::ConditionNotMet { condition_id, .. } if condition_id == gate.id
        ));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let mut r = route(RouteRules::allow_only(["Manager"]), true);
        r.attach(weekday_hours(), Utc::now());
        let held = roles(&["Manager"]);
        assert_eq!(
            explain_access(&r, &held, saturday_10()),
            explain_access(&r, &held, saturday_10())
        );
    }

    #[test]
    fn test_explain_reports_every_check() {
        let mut r = route(RouteRules::allow_only(["Admin"]), true);
        r.attach(weekday_hours(), Utc::now());
        r.attach(role_gate(&["Admin"], true), Utc::now());

        let evaluation = explain_access(&r, &roles(&["Admin"]), saturday_10());
        assert_eq!(evaluation.checks.len(), 2);
        assert!(!evaluation.checks[0].satisfied);
        assert!(evaluation.checks[1].satisfied && evaluation.checks[1].is_override);
        assert!(evaluation.rules.allowed);
    }
}
