//! # Option Action Resolver
//!
//! Turns a campaign plus the lead's selected option into a
//! [`ResolvedAction`] by consulting configuration sources in priority order.
//!
//! ```text
//! (campaign, option_selected)
//!          │
//!   ┌──────▼──────┐  dynamic without option
//!   │ Strategy    ├──────────────────────────► None (invariant violation)
//!   └──────┬──────┘
//!          │ iterate resolvers by priority
//!   ┌──────▼──────────────────────────────┐
//!   │ Resolved      → return action       │
//!   │ NotApplicable → try next resolver   │
//!   │ Declined      → None (configured    │
//!   │                 to take no action)  │
//!   │ Invalid       → None (logged)       │
//!   └─────────────────────────────────────┘
//! ```
//!
//! Resolution is pure with respect to the campaign passed in, so retries
//! simply resolve again.

pub mod action;
pub mod legacy;
pub mod strategies;

pub use action::{ActionKind, ActionParams, ActionType, ResolutionOrigin, ResolvedAction};
pub use legacy::LegacyActionConfig;
pub use strategies::{
    FallbackActionResolver, LegacyOptionConfigResolver, LegacyTriggerResolver, OptionRowResolver,
};

use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::models::{Campaign, CampaignStrategy};

/// Inputs for one resolution
#[derive(Debug, Clone, Copy)]
pub struct ResolutionRequest<'a> {
    pub campaign: &'a Campaign,
    /// Normalized option key; `None` when the lead selected nothing
    pub option_key: Option<&'a str>,
}

/// Result of asking a single resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverOutcome {
    Resolved(ResolvedAction),
    /// This source has nothing for the request; keep looking
    NotApplicable,
    /// This source explicitly says "no action"; stop
    Declined(String),
    /// This source holds an unusable action; stop
    Invalid(String),
}

/// A configuration source the chain can consult
pub trait ActionResolver: Send + Sync + fmt::Debug {
    fn resolver_name(&self) -> &str;

    /// Lower values are checked first
    fn priority(&self) -> u32;

    /// Whether this resolver handles campaigns with the given strategy
    fn can_resolve(&self, strategy: CampaignStrategy) -> bool;

    fn resolve(&self, request: &ResolutionRequest<'_>) -> ResolverOutcome;
}

/// A priority-ordered chain of action resolvers
#[derive(Debug, Default, Clone)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn ActionResolver>>,
}

impl ResolverChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Option row, legacy JSON and campaign fallback resolvers
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_resolver(Arc::new(OptionRowResolver))
            .with_resolver(Arc::new(LegacyTriggerResolver))
            .with_resolver(Arc::new(LegacyOptionConfigResolver))
            .with_resolver(Arc::new(FallbackActionResolver))
    }

    /// Add a resolver; the chain stays sorted by priority
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ActionResolver>) -> Self {
        self.resolvers.push(resolver);
        // stable sort keeps registration order among equal priorities
        self.resolvers.sort_by_key(|r| r.priority());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Get resolver names in priority order
    #[must_use]
    pub fn resolver_names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.resolver_name()).collect()
    }

    fn resolve_by_priority(&self, request: &ResolutionRequest<'_>) -> Option<ResolvedAction> {
        let strategy = request.campaign.strategy;

        for resolver in &self.resolvers {
            let resolver_name = resolver.resolver_name();
            if !resolver.can_resolve(strategy) {
                trace!(resolver = resolver_name, %strategy, "Resolver does not handle strategy");
                continue;
            }

            match resolver.resolve(request) {
                ResolverOutcome::Resolved(action) => {
                    debug!(
                        resolver = resolver_name,
                        campaign_id = request.campaign.id,
                        option = ?request.option_key,
                        action_type = %action.action_type(),
                        "Resolved option action"
                    );
                    return Some(action);
                }
                ResolverOutcome::NotApplicable => {
                    trace!(resolver = resolver_name, "Nothing configured, trying next resolver");
                }
                ResolverOutcome::Declined(reason) => {
                    debug!(
                        resolver = resolver_name,
                        campaign_id = request.campaign.id,
                        option = ?request.option_key,
                        reason = %reason,
                        "Option configured to take no action"
                    );
                    return None;
                }
                ResolverOutcome::Invalid(reason) => {
                    warn!(
                        resolver = resolver_name,
                        campaign_id = request.campaign.id,
                        option = ?request.option_key,
                        reason = %reason,
                        "Invalid action configuration"
                    );
                    return None;
                }
            }
        }

        match strategy {
            CampaignStrategy::Direct => warn!(
                campaign_id = request.campaign.id,
                "Missing configuration: direct campaign has no trigger action"
            ),
            CampaignStrategy::Dynamic => warn!(
                campaign_id = request.campaign.id,
                option = ?request.option_key,
                "Unmapped option: no action configured"
            ),
        }
        None
    }
}

/// Entry point used by the orchestrator
#[derive(Debug, Clone)]
pub struct OptionActionResolver {
    chain: ResolverChain,
}

impl Default for OptionActionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionActionResolver {
    pub fn new() -> Self {
        Self {
            chain: ResolverChain::standard(),
        }
    }

    pub fn with_chain(chain: ResolverChain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &ResolverChain {
        &self.chain
    }

    /// Resolve the action for `campaign`; `None` means "no action to run"
    pub fn resolve(
        &self,
        campaign: &Campaign,
        option_selected: Option<&str>,
    ) -> Option<ResolvedAction> {
        let option_key = option_selected.map(str::trim).filter(|o| !o.is_empty());

        if campaign.strategy == CampaignStrategy::Dynamic && option_key.is_none() {
            warn!(
                campaign_id = campaign.id,
                "Invariant violation: dynamic campaign resolved without a selected option"
            );
            return None;
        }

        let option_key = match campaign.strategy {
            CampaignStrategy::Direct => None,
            CampaignStrategy::Dynamic => option_key,
        };

        self.chain.resolve_by_priority(&ResolutionRequest {
            campaign,
            option_key,
        })
    }
}
