// ── Entity eligibility ──
//
// Decides whether an entity may be exposed on a bridge. Registry state is
// checked first, then the user's include/exclude rules. All reasons are
// collected so callers can explain an exclusion, not just detect it.

use std::fmt;

use regex::Regex;

use crate::model::{Entity, EntityFilter, FeatureFlags, Matcher};

/// Why an entity was excluded from a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    DisabledBy(String),
    HiddenBy(String),
    NotIncluded,
    /// 1-based position of the matching exclude rule.
    ExcludedByFilter(usize),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisabledBy(by) => write!(f, "disabled_by: {by}"),
            Self::HiddenBy(by) => write!(f, "hidden_by: {by}"),
            Self::NotIncluded => write!(f, "not included"),
            Self::ExcludedByFilter(position) => write!(f, "excluded by filter: {position}"),
        }
    }
}

/// Evaluate an entity against the registry checks and the user filter.
///
/// An empty result means the entity is eligible.
pub fn evaluate(entity: &Entity, filter: &EntityFilter, flags: &FeatureFlags) -> Vec<ExclusionReason> {
    let mut reasons = registry_reasons(entity, flags);
    reasons.extend(filter_reasons(entity, filter));
    reasons
}

pub fn is_eligible(entity: &Entity, filter: &EntityFilter, flags: &FeatureFlags) -> bool {
    evaluate(entity, filter, flags).is_empty()
}

fn registry_reasons(entity: &Entity, flags: &FeatureFlags) -> Vec<ExclusionReason> {
    let mut reasons = Vec::new();
    let Some(registry) = &entity.registry else {
        return reasons;
    };
    if let Some(by) = &registry.disabled_by {
        reasons.push(ExclusionReason::DisabledBy(by.clone()));
    }
    if let Some(by) = &registry.hidden_by {
        if !flags.include_hidden_entities {
            reasons.push(ExclusionReason::HiddenBy(by.clone()));
        }
    }
    reasons
}

fn filter_reasons(entity: &Entity, filter: &EntityFilter) -> Vec<ExclusionReason> {
    let mut reasons = Vec::new();
    if !filter.include.is_empty() && !filter.include.iter().any(|m| matches(entity, m)) {
        reasons.push(ExclusionReason::NotIncluded);
    }
    reasons.extend(
        filter
            .exclude
            .iter()
            .enumerate()
            .filter(|(_, m)| matches(entity, m))
            .map(|(idx, _)| ExclusionReason::ExcludedByFilter(idx + 1)),
    );
    reasons
}

/// Test a single matcher against an entity.
pub fn matches(entity: &Entity, matcher: &Matcher) -> bool {
    let registry = entity.registry.as_ref();
    match matcher {
        Matcher::Domain(domain) => entity.domain() == domain,
        Matcher::Label(label) => registry.is_some_and(|r| r.labels.contains(label)),
        Matcher::EntityCategory(category) => {
            registry.and_then(|r| r.entity_category.as_deref()) == Some(category.as_str())
        }
        Matcher::Platform(platform) => {
            registry.and_then(|r| r.platform.as_deref()) == Some(platform.as_str())
        }
        Matcher::Pattern(pattern) => glob_to_regex(pattern).is_some_and(|re| re.is_match(&entity.entity_id)),
        Matcher::Area(area) => entity.area_id() == Some(area.as_str()),
    }
}

/// Compile a shell glob into an anchored regex.
///
/// `*` matches any run of characters; every other character is literal.
pub fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).ok()
}
