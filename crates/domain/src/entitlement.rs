use procura_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Company-level feature switches gating the copilot subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    /// Single-action planning and approval.
    AiActionsEnabled,
    /// Multi-step workflows.
    AiWorkflowsEnabled,
    /// Chat conversations with tool calls.
    AiChatEnabled,
}

impl FeatureKey {
    /// Returns a stable storage value. Also used as the plan field name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiActionsEnabled => "ai_actions_enabled",
            Self::AiWorkflowsEnabled => "ai_workflows_enabled",
            Self::AiChatEnabled => "ai_chat_enabled",
        }
    }

    /// Returns the stable code surfaced when the feature is off.
    #[must_use]
    pub fn disabled_code(&self) -> &'static str {
        match self {
            Self::AiActionsEnabled => "ai_actions_disabled",
            Self::AiWorkflowsEnabled => "ai_workflows_disabled",
            Self::AiChatEnabled => "ai_chat_disabled",
        }
    }

    /// Returns all known keys.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::AiActionsEnabled,
            Self::AiWorkflowsEnabled,
            Self::AiChatEnabled,
        ]
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown feature key '{value}'")))
    }
}

/// Layer that decided an entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementSource {
    /// Per-company feature flag.
    Override,
    /// Company plan field.
    Plan,
    /// Global default.
    Default,
}

impl EntitlementSource {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Plan => "plan",
            Self::Default => "default",
        }
    }
}

/// Resolved entitlement with the layer that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementResolution {
    /// Evaluated feature.
    pub feature: FeatureKey,
    /// Whether the feature is enabled.
    pub enabled: bool,
    /// Deciding layer.
    pub source: EntitlementSource,
}

/// Interprets a stored flag or plan value.
///
/// Accepts booleans, `1`/`0`, `"true"`/`"false"` (also `"1"`/`"0"`), and objects
/// carrying an `enabled` or `active` member in any of those forms. Anything else
/// is undecided.
#[must_use]
pub fn flag_value_enabled(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(enabled) => Some(*enabled),
        Value::Number(number) => match number.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Object(object) => object
            .get("enabled")
            .and_then(flag_value_enabled)
            .or_else(|| object.get("active").and_then(flag_value_enabled)),
        _ => None,
    }
}

/// Resolves a feature: a decisive override wins, then a decisive plan value,
/// then the global default.
#[must_use]
pub fn resolve_entitlement(
    feature: FeatureKey,
    override_value: Option<&Value>,
    plan_value: Option<&Value>,
    default_enabled: bool,
) -> EntitlementResolution {
    if let Some(enabled) = override_value.and_then(flag_value_enabled) {
        return EntitlementResolution {
            feature,
            enabled,
            source: EntitlementSource::Override,
        };
    }

    if let Some(enabled) = plan_value.and_then(flag_value_enabled) {
        return EntitlementResolution {
            feature,
            enabled,
            source: EntitlementSource::Plan,
        };
    }

    EntitlementResolution {
        feature,
        enabled: default_enabled,
        source: EntitlementSource::Default,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{Value, json};

    use super::{EntitlementSource, FeatureKey, flag_value_enabled, resolve_entitlement};

    fn flag_form(enabled: bool) -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(json!(enabled)),
            Just(json!(i64::from(enabled))),
            Just(json!(enabled.to_string())),
            Just(json!({ "enabled": enabled })),
            Just(json!({ "active": enabled })),
        ]
    }

    fn feature() -> impl Strategy<Value = FeatureKey> {
        prop_oneof![
            Just(FeatureKey::AiActionsEnabled),
            Just(FeatureKey::AiWorkflowsEnabled),
            Just(FeatureKey::AiChatEnabled),
        ]
    }

    proptest! {
        #[test]
        fn override_wins_over_plan_and_default(
            feature in feature(),
            plan_enabled in any::<bool>(),
            default_enabled in any::<bool>(),
            (override_enabled, override_value) in any::<bool>()
                .prop_flat_map(|enabled| (Just(enabled), flag_form(enabled))),
        ) {
            let plan = json!(plan_enabled);
            let resolution = resolve_entitlement(feature, Some(&override_value), Some(&plan), default_enabled);

            prop_assert_eq!(resolution.enabled, override_enabled);
            prop_assert_eq!(resolution.source, EntitlementSource::Override);
        }

        #[test]
        fn plan_applies_without_override(
            feature in feature(),
            plan_enabled in any::<bool>(),
            default_enabled in any::<bool>(),
        ) {
            let plan = json!(plan_enabled);
            let resolution = resolve_entitlement(feature, None, Some(&plan), default_enabled);

            prop_assert_eq!(resolution.enabled, plan_enabled);
            prop_assert_eq!(resolution.source, EntitlementSource::Plan);
        }

        #[test]
        fn default_applies_when_nothing_is_decisive(
            feature in feature(),
            default_enabled in any::<bool>(),
        ) {
            let undecided = json!("maybe");
            let resolution = resolve_entitlement(feature, Some(&undecided), None, default_enabled);

            prop_assert_eq!(resolution.enabled, default_enabled);
            prop_assert_eq!(resolution.source, EntitlementSource::Default);
        }
    }

    #[test]
    fn false_override_disables_enabled_plan() {
        let resolution = resolve_entitlement(
            FeatureKey::AiWorkflowsEnabled,
            Some(&json!({"enabled": false})),
            Some(&json!(true)),
            true,
        );

        assert!(!resolution.enabled);
        assert_eq!(resolution.source, EntitlementSource::Override);
    }

    #[test]
    fn unrecognized_values_are_undecided() {
        assert_eq!(flag_value_enabled(&json!(2)), None);
        assert_eq!(flag_value_enabled(&json!(null)), None);
        assert_eq!(flag_value_enabled(&json!({"on": true})), None);
        assert_eq!(flag_value_enabled(&json!("TRUE")), Some(true));
    }

    #[test]
    fn disabled_codes_are_stable() {
        assert_eq!(
            FeatureKey::AiWorkflowsEnabled.disabled_code(),
            "ai_workflows_disabled"
        );
    }
}
