use crate::models::{ExportRule, IntentionKind, IntentionStatus};

/// Decide whether a lead with this intention is exported under `rule`.
///
/// Only finalized intentions are ever exported. Anything other than
/// interested / not interested is never exported.
pub fn should_export(rule: ExportRule, intention: Option<&str>, status: IntentionStatus) -> bool {
    if status != IntentionStatus::Finalized {
        return false;
    }

    match (rule, IntentionKind::classify(intention)) {
        (ExportRule::None, _) | (_, IntentionKind::Other) => false,
        (ExportRule::InterestedOnly, kind) => kind == IntentionKind::Interested,
        (ExportRule::NotInterestedOnly, kind) => kind == IntentionKind::NotInterested,
        (ExportRule::Both, _) => true,
    }
}

/// Same decision for a rule still in its stored string form
pub fn should_export_raw(rule: &str, intention: Option<&str>, status: IntentionStatus) -> bool {
    should_export(ExportRule::parse_lenient(rule), intention, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: [ExportRule; 4] = [
        ExportRule::None,
        ExportRule::InterestedOnly,
        ExportRule::NotInterestedOnly,
        ExportRule::Both,
    ];

    #[test]
    fn test_export_matrix() {
        let intentions = [Some("interested"), Some("not_interested"), Some("callback"), None];
        let expected = [
            // none
            [false, false, false, false],
            // interested_only
            [true, false, false, false],
            // not_interested_only
            [false, true, false, false],
            // both
            [true, true, false, false],
        ];

        for (rule, row) in RULES.iter().zip(expected) {
            for (intention, want) in intentions.iter().zip(row) {
                assert_eq!(
                    should_export(*rule, *intention, IntentionStatus::Finalized),
                    want,
                    "rule={rule} intention={intention:?}"
                );
            }
        }
    }

    #[test]
    fn test_requires_finalized_status() {
        for rule in RULES {
            for status in [IntentionStatus::Pending, IntentionStatus::SentToClient] {
                assert!(!should_export(rule, Some("interested"), status));
                assert!(!should_export(rule, Some("not_interested"), status));
            }
        }
    }

    #[test]
    fn test_unknown_rule_behaves_as_interested_only() {
        assert!(should_export_raw("legacy_value", Some("interested"), IntentionStatus::Finalized));
        assert!(!should_export_raw(
            "legacy_value",
            Some("not_interested"),
            IntentionStatus::Finalized
        ));
    }
}
