use std::rc::Rc;

use ragdoll_site::analytics::consent::{Consent, MemoryFlags};
use ragdoll_site::analytics::engagement::{self, MilestoneTracker};
use ragdoll_site::analytics::reporter::{Command, RecordingReporter, Reporter};
use ragdoll_site::analytics::{Analytics, CommerceAction, CommerceData};
use ragdoll_site::config::SiteConfig;
use ragdoll_site::game::{Effect, Failure, GameLoader, Phase};
use serde_json::json;

fn recording() -> (Rc<RecordingReporter>, Analytics) {
    let reporter = Rc::new(RecordingReporter::new());
    let analytics = Analytics::new(reporter.clone(), "G-TEST");
    (reporter, analytics)
}

/// Reports `Track` effects the way the embed driver does and returns the rest.
fn forward(analytics: &Analytics, effects: Vec<Effect>) -> Vec<Effect> {
    effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Track(name, value) => {
                analytics.track_event(name, value);
                None
            }
            other => Some(other),
        })
        .collect()
}

#[test]
fn slow_game_then_successful_retry() {
    let config = SiteConfig::default();
    let (reporter, analytics) = recording();
    let mut loader = GameLoader::new(config.loader, config.tips.len());

    assert_eq!(forward(&analytics, loader.start(0.0)), vec![Effect::ShowLoading]);

    let effects = forward(&analytics, loader.tick(30_000.0));
    assert_eq!(
        effects.last(),
        Some(&Effect::ShowError(Failure::Timeout.message().to_string()))
    );

    let effects = forward(&analytics, loader.retry(45_000.0));
    assert_eq!(
        effects,
        vec![Effect::RemoveOverlay, Effect::ShowLoading, Effect::ClearSource]
    );
    assert_eq!(forward(&analytics, loader.tick(45_100.0)), vec![Effect::RestoreSource]);

    forward(&analytics, loader.on_load(47_000.0));
    forward(&analytics, loader.tick(48_000.0));
    assert_eq!(forward(&analytics, loader.tick(48_500.0)), vec![Effect::RemoveOverlay]);
    assert_eq!(loader.phase(), Phase::Loaded);

    assert_eq!(
        reporter.event_names(),
        vec![
            "game_load_error",
            "game_retry_attempted",
            "game_iframe_loaded",
            "game_loaded_successfully",
        ]
    );
    let (_, error) = &reporter.events()[0];
    assert_eq!(error["event_category"], json!("engagement"));
    assert_eq!(error["value"], json!(Failure::Timeout.message()));
}

#[test]
fn short_timeouts_from_config() {
    let config =
        SiteConfig::from_json(r#"{"loader":{"loadTimeoutMs":2000,"tipStartMs":500}}"#).unwrap();
    let mut loader = GameLoader::new(config.loader, config.tips.len());
    loader.start(0.0);
    assert_eq!(loader.next_deadline(), Some(500.0));
    assert!(loader
        .tick(2_000.0)
        .contains(&Effect::ShowError(Failure::Timeout.message().to_string())));
}

#[test]
fn ecommerce_from_page_payload() {
    let (reporter, analytics) = recording();
    let data: CommerceData = serde_json::from_value(json!({
        "transactionId": "T-100",
        "value": 2.5,
        "items": [{"item_id": "golden_bow", "quantity": 1}]
    }))
    .unwrap();

    analytics.commerce(CommerceAction::parse("purchase").unwrap(), &data);
    analytics.commerce(CommerceAction::parse("add_to_cart").unwrap(), &data);

    let events = reporter.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].1["currency"], json!("USD"));
    assert_eq!(events[0].1["transaction_id"], json!("T-100"));
    assert_eq!(events[1].1["currency"], json!("USD"));
    assert!(!events[1].1.contains_key("transaction_id"));
}

#[test]
fn opt_out_persists_across_page_views() {
    let consent = Consent::new(MemoryFlags::default(), "analytics_disabled");

    let reporter = Rc::new(RecordingReporter::new());
    let shared = reporter.clone();
    let first = Analytics::for_consent(&consent, "G-TEST", move || -> Rc<dyn Reporter> { shared });
    first.track_event("first_view", None);

    // disableAnalytics: flag written and the current view muted.
    consent.opt_out();
    first.mute();
    first.track_event("after_opt_out", None);

    let second = Analytics::for_consent(&consent, "G-TEST", || -> Rc<dyn Reporter> {
        panic!("opted-out visitor must not connect")
    });
    second.track_event("second_view", None);

    assert_eq!(reporter.event_names(), vec!["first_view"]);
    assert!(!second.is_enabled());
}

#[test]
fn scroll_milestones_report_once_each() {
    let (reporter, analytics) = recording();
    let mut milestones = MilestoneTracker::default();

    for (scroll_top, viewport, height) in [
        (0.0, 800.0, 4000.0),
        (400.0, 800.0, 4000.0),
        (2400.0, 800.0, 4000.0),
        (1000.0, 800.0, 4000.0),
        (3200.0, 800.0, 4000.0),
    ] {
        let Some(depth) = engagement::viewport_depth(scroll_top, viewport, height) else {
            continue;
        };
        for milestone in milestones.observe(depth) {
            analytics.track_event(&engagement::milestone_event_name(milestone), None);
        }
    }

    assert_eq!(
        reporter.event_names(),
        vec!["scroll_depth_25", "scroll_depth_50", "scroll_depth_75"]
    );
    assert_eq!(milestones.max_depth(), 100);
    assert!(matches!(reporter.commands()[0], Command::Event { .. }));
}
