//! Permission engine
//!
//! Decides whether the resolved actor may perform a check. Only deny rules
//! exist: the human is never restricted, an agent without rules can do
//! anything, and any single matching rule denies.

use serde::{Deserialize, Serialize};

use super::check::PermissionCheck;
use super::path::DenyRule;
use crate::config::PmConfig;
use crate::core::{PmError, PmResult};
use crate::identity::{resolve_actor, ActorResolution, ActorSource, InvocationEnv};
use crate::transport::PaneTransport;

/// Result of a permission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOutcome {
    pub allowed: bool,
    pub actor: String,
    pub source: ActorSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Canonical path of the check
    pub path: String,
    /// First matching deny rule, in config order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_by: Option<String>,
}

impl PermissionOutcome {
    /// Turn a denial into `PmError::PermissionDenied`
    pub fn into_result(self) -> PmResult<Self> {
        if self.allowed {
            return Ok(self);
        }
        Err(PmError::PermissionDenied {
            actor: self.actor,
            basis: self.source,
            path: self.path,
            rule: self.denied_by,
            warning: self.warning,
        })
    }
}

/// Evaluate `check` for an already resolved actor
pub fn evaluate(
    resolution: ActorResolution,
    rules: &[DenyRule],
    check: &PermissionCheck,
) -> PermissionOutcome {
    let path = check.canonical_path();

    // Deny lists never apply to the human operator
    let denied_by = if resolution.is_human() {
        None
    } else {
        rules.iter().find(|rule| rule.matches(check))
    };

    let outcome = PermissionOutcome {
        allowed: denied_by.is_none(),
        actor: resolution.actor,
        source: resolution.source,
        warning: resolution.warning,
        path,
        denied_by: denied_by.map(ToString::to_string),
    };

    if outcome.allowed {
        tracing::debug!("Allowed {} for {}", outcome.path, outcome.actor);
    } else {
        tracing::info!(
            "Denied {} for {} (source: {}, rule: {:?})",
            outcome.path,
            outcome.actor,
            outcome.source,
            outcome.denied_by
        );
    }
    outcome
}

/// Resolve the current actor and check `check` against its deny rules
///
/// Reads nothing but its arguments; config and live pane state are
/// consulted fresh on every call.
pub async fn check_permission(
    config: &PmConfig,
    env: &InvocationEnv,
    transport: &dyn PaneTransport,
    check: &PermissionCheck,
) -> PermissionOutcome {
    let resolution = resolve_actor(config.registry(), env, transport).await;
    let rules = config.deny_rules(&resolution.actor);
    evaluate(resolution, rules, check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Resource;
    use crate::transport::testing::MockTransport;

    fn config_with_deny(agent: &str, patterns: &[&str]) -> PmConfig {
        let mut config = PmConfig::default();
        config.agents.insert("codex", "10.1");
        for pattern in patterns {
            config.add_deny(agent, DenyRule::parse(pattern));
        }
        config
    }

    fn status_update() -> PermissionCheck {
        PermissionCheck::update(Resource::Task, ["status"]).unwrap()
    }

    #[tokio::test]
    async fn test_human_always_allowed() {
        let mut config = config_with_deny("human", &["pm:task:update", "pm:task:list"]);
        config.add_deny("codex", DenyRule::parse("pm:task:update"));
        let transport = MockTransport::new();

        let outcome = check_permission(
            &config,
            &InvocationEnv::outside(None),
            &transport,
            &status_update(),
        )
        .await;

        assert!(outcome.allowed);
        assert_eq!(outcome.actor, "human");
        assert_eq!(outcome.source, ActorSource::Default);
        assert!(outcome.denied_by.is_none());
    }

    #[tokio::test]
    async fn test_agent_without_rules_allowed() {
        let config = config_with_deny("claude", &["pm:task:update"]);
        let transport = MockTransport::new().with_pane("%1", "10.1");

        let outcome = check_permission(
            &config,
            &InvocationEnv::in_pane("%1", None),
            &transport,
            &status_update(),
        )
        .await;

        assert!(outcome.allowed);
        assert_eq!(outcome.actor, "codex");
    }

    #[tokio::test]
    async fn test_pane_identity_rules_apply_despite_spoofed_env() {
        let config = config_with_deny("codex", &["pm:task:update(status)"]);
        let transport = MockTransport::new().with_pane("%1", "10.1");

        // codex claims to be the human via the environment
        let outcome = check_permission(
            &config,
            &InvocationEnv::in_pane("%1", Some("human")),
            &transport,
            &status_update(),
        )
        .await;

        assert!(!outcome.allowed);
        assert_eq!(outcome.actor, "codex");
        assert_eq!(outcome.source, ActorSource::Pane);
        assert!(outcome.warning.is_some());
        assert_eq!(outcome.denied_by.as_deref(), Some("pm:task:update(status)"));
        assert_eq!(outcome.path, "pm:task:update(status)");
    }

    #[tokio::test]
    async fn test_unregistered_pane_advisory_rules_enforced() {
        let config = config_with_deny("someone", &["pm:task:delete"]);
        let transport = MockTransport::new().with_pane("%9", "99.9");

        let outcome = check_permission(
            &config,
            &InvocationEnv::in_pane("%9", Some("someone")),
            &transport,
            &PermissionCheck::delete(Resource::Task),
        )
        .await;

        assert!(!outcome.allowed);
        assert_eq!(outcome.source, ActorSource::Env);
        assert!(outcome.warning.unwrap().contains("unregistered pane"));
    }

    #[test]
    fn test_rules_are_or_combined_independent_of_order() {
        let resolution = ActorResolution {
            actor: "codex".into(),
            source: ActorSource::Pane,
            warning: None,
        };
        let mut rules = vec![
            DenyRule::parse("pm:doc:create"),
            DenyRule::parse("not a pattern"),
            DenyRule::parse("pm:task:update(assignee)"),
            DenyRule::parse("pm:task:update(*)"),
        ];
        let checks = [
            status_update(),
            PermissionCheck::update(Resource::Task, ["assignee"]).unwrap(),
            PermissionCheck::update(Resource::Task, Vec::<String>::new()).unwrap(),
            PermissionCheck::create(Resource::Doc),
            PermissionCheck::list(Resource::Doc),
        ];

        let forward: Vec<bool> = checks
            .iter()
            .map(|c| evaluate(resolution.clone(), &rules, c).allowed)
            .collect();
        rules.reverse();
        let backward: Vec<bool> = checks
            .iter()
            .map(|c| evaluate(resolution.clone(), &rules, c).allowed)
            .collect();

        assert_eq!(forward, vec![false, false, true, false, true]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_malformed_rules_never_deny() {
        let resolution = ActorResolution {
            actor: "codex".into(),
            source: ActorSource::Pane,
            warning: None,
        };
        let rules = vec![DenyRule::parse("pm:*"), DenyRule::parse("pm:task:update()")];

        assert!(evaluate(resolution.clone(), &rules, &status_update()).allowed);
        assert!(evaluate(resolution, &rules, &PermissionCheck::list(Resource::Task)).allowed);
    }

    #[test]
    fn test_into_result_carries_basis() {
        let resolution = ActorResolution {
            actor: "codex".into(),
            source: ActorSource::Pane,
            warning: Some("identity mismatch".into()),
        };
        let rules = vec![DenyRule::parse("pm:task:update")];

        let err = evaluate(resolution, &rules, &status_update())
            .into_result()
            .unwrap_err();
        match err {
            PmError::PermissionDenied {
                actor,
                basis,
                rule,
                warning,
                ..
            } => {
                assert_eq!(actor, "codex");
                assert_eq!(basis, ActorSource::Pane);
                assert_eq!(rule.as_deref(), Some("pm:task:update"));
                assert_eq!(warning.as_deref(), Some("identity mismatch"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
