//! Resolver strategies, checked in priority order (lower = first):
//!
//! - 10: [`OptionRowResolver`] typed option row (both strategies)
//! - 20: [`LegacyTriggerResolver`] `direct_trigger_config` (direct)
//! - 20: [`LegacyOptionConfigResolver`] `option_actions` JSON (dynamic)
//! - 30: [`FallbackActionResolver`] campaign `fallback_action` (dynamic)

use serde_json::Value;

use super::action::{ActionKind, ActionParams, ActionType, ResolutionOrigin, ResolvedAction};
use super::legacy::LegacyActionConfig;
use super::{ActionResolver, ResolutionRequest, ResolverOutcome};
use crate::constants::{option_keys, LEGACY_DO_NOTHING};
use crate::models::CampaignStrategy;

/// Enabled typed option row. Direct campaigns always use key `"0"`.
#[derive(Debug, Default)]
pub struct OptionRowResolver;

impl ActionResolver for OptionRowResolver {
    fn resolver_name(&self) -> &str {
        "OptionRowResolver"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn can_resolve(&self, _strategy: CampaignStrategy) -> bool {
        true
    }

    fn resolve(&self, request: &ResolutionRequest<'_>) -> ResolverOutcome {
        let key = if request.campaign.is_direct() {
            option_keys::DIRECT_TRIGGER
        } else {
            match request.option_key {
                Some(key) => key,
                None => return ResolverOutcome::NotApplicable,
            }
        };

        match request.campaign.option(key) {
            Some(option) if option.enabled => match ResolvedAction::from_option_row(option) {
                Ok(action) => ResolverOutcome::Resolved(action),
                Err(reason) => ResolverOutcome::Invalid(reason),
            },
            _ => ResolverOutcome::NotApplicable,
        }
    }
}

/// Top-level legacy trigger of a direct campaign
#[derive(Debug, Default)]
pub struct LegacyTriggerResolver;

impl ActionResolver for LegacyTriggerResolver {
    fn resolver_name(&self) -> &str {
        "LegacyTriggerResolver"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn can_resolve(&self, strategy: CampaignStrategy) -> bool {
        strategy == CampaignStrategy::Direct
    }

    fn resolve(&self, request: &ResolutionRequest<'_>) -> ResolverOutcome {
        match request.campaign.direct_trigger_config.as_ref() {
            Some(value) if !value.is_null() => {
                resolve_legacy_value(value, ResolutionOrigin::LegacyTrigger)
            }
            _ => ResolverOutcome::NotApplicable,
        }
    }
}

/// Legacy `option_actions` JSON keyed by option string
#[derive(Debug, Default)]
pub struct LegacyOptionConfigResolver;

impl ActionResolver for LegacyOptionConfigResolver {
    fn resolver_name(&self) -> &str {
        "LegacyOptionConfigResolver"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn can_resolve(&self, strategy: CampaignStrategy) -> bool {
        strategy == CampaignStrategy::Dynamic
    }

    fn resolve(&self, request: &ResolutionRequest<'_>) -> ResolverOutcome {
        let Some(key) = request.option_key else {
            return ResolverOutcome::NotApplicable;
        };
        match request.campaign.legacy_option_config(key) {
            Some(value) => resolve_legacy_value(value, ResolutionOrigin::LegacyOptionConfig),
            None => ResolverOutcome::NotApplicable,
        }
    }
}

/// Campaign-wide fallback action type, without parameters
#[derive(Debug, Default)]
pub struct FallbackActionResolver;

impl ActionResolver for FallbackActionResolver {
    fn resolver_name(&self) -> &str {
        "FallbackActionResolver"
    }

    fn priority(&self) -> u32 {
        30
    }

    fn can_resolve(&self, strategy: CampaignStrategy) -> bool {
        strategy == CampaignStrategy::Dynamic
    }

    fn resolve(&self, request: &ResolutionRequest<'_>) -> ResolverOutcome {
        let Some(fallback) = request
            .campaign
            .fallback_action
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
        else {
            return ResolverOutcome::NotApplicable;
        };

        match fallback.parse::<ActionType>() {
            Ok(action_type) => ResolverOutcome::Resolved(ResolvedAction::new(
                ActionKind::build(action_type, ActionParams::default()),
                ResolutionOrigin::CampaignFallback,
            )),
            Err(reason) => ResolverOutcome::Invalid(reason),
        }
    }
}

fn resolve_legacy_value(value: &Value, origin: ResolutionOrigin) -> ResolverOutcome {
    let config = match LegacyActionConfig::from_value(value) {
        Ok(config) => config,
        Err(e) => return ResolverOutcome::Invalid(format!("Malformed legacy action config: {e}")),
    };

    if config.is_disabled() {
        return ResolverOutcome::Declined("legacy action disabled".to_string());
    }

    let action_name = match config.action_name() {
        None => return ResolverOutcome::Declined("legacy action missing".to_string()),
        Some(LEGACY_DO_NOTHING) => {
            return ResolverOutcome::Declined("legacy action is do_nothing".to_string())
        }
        Some(name) => name,
    };

    match action_name.parse::<ActionType>() {
        Ok(action_type) => ResolverOutcome::Resolved(
            ResolvedAction::new(ActionKind::build(action_type, config.params()), origin)
                .with_delay(config.delay_seconds.unwrap_or(0)),
        ),
        Err(reason) => ResolverOutcome::Invalid(reason),
    }
}
