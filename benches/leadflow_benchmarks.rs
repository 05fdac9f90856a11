use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use leadflow_core::models::{Campaign, CampaignOption, CampaignStrategy, ExportRule, IntentionStatus};
use leadflow_core::services::should_export;
use leadflow_core::OptionActionResolver;

fn dynamic_campaign() -> Campaign {
    let now = Utc::now();
    let mut campaign = Campaign::new(1, "Benchmark", CampaignStrategy::Dynamic, now);
    for key in ["1", "2", "3"] {
        let mut option = CampaignOption::new(key.len() as i64, 1, key, "whatsapp", now);
        option.message = Some("hello".to_string());
        campaign.options.push(option);
    }
    campaign.option_actions = Some(json!({
        "4": { "action": "call_ai", "agent_id": "agent-1" },
        "5": "manual_review",
    }));
    campaign.fallback_action = Some("skip".to_string());
    campaign
}

fn benchmark_option_resolution(c: &mut Criterion) {
    let resolver = OptionActionResolver::new();
    let campaign = dynamic_campaign();

    c.bench_function("resolve_option_row", |b| {
        b.iter(|| resolver.resolve(black_box(&campaign), black_box(Some("2"))))
    });
    c.bench_function("resolve_legacy_option", |b| {
        b.iter(|| resolver.resolve(black_box(&campaign), black_box(Some("4"))))
    });
    c.bench_function("resolve_fallback", |b| {
        b.iter(|| resolver.resolve(black_box(&campaign), black_box(Some("9"))))
    });
}

fn benchmark_export_rules(c: &mut Criterion) {
    c.bench_function("should_export", |b| {
        b.iter(|| {
            should_export(
                black_box(ExportRule::Both),
                black_box(Some(" Not Interested ")),
                black_box(IntentionStatus::Finalized),
            )
        })
    });
}

criterion_group!(benches, benchmark_option_resolution, benchmark_export_rules);
criterion_main!(benches);
