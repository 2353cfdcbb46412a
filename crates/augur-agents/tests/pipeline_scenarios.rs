//! End-to-end pipeline runs against in-memory collaborators.
//!
//! Each test wires the real stages through `test_support::pipeline_with`
//! and drives a full supervisor loop for one user.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use augur_agents::test_support::{
    market_detail, pipeline_with, search_result, trade, FakeCompletion, FakeMarketData, FakeNews,
    FakePersistence,
};
use augur_agents::Persistence;
use augur_models::decision::Signal;
use augur_models::profile::{RiskProfile, Source, UserConfig};
use augur_models::{Node, PipelineState};
use augur_store::SqliteStore;
use rust_decimal_macros::dec;

const ADVISOR_REPLY: &str = r#"[
  {"market_question": "Will the Fed cut in March?", "market_slug": "fed-cut-march",
   "signal": "BUY_YES", "confidence": 0.82, "reasoning": "Whales accumulating ahead of CPI.",
   "key_factors": ["Tracked wallet bought 10k YES", "Dovish minutes"], "risk_level": "medium"},
  {"market_question": "Will BTC close above $100k?", "market_slug": "btc-100k",
   "signal": "SKIP", "confidence": 1.7, "reasoning": "Too noisy.", "key_factors": [],
   "risk_level": "high"}
]"#;

fn user_config() -> UserConfig {
    UserConfig {
        risk_profile: RiskProfile::Conservative,
        sources: vec![Source::Watchlists, Source::Squads, Source::News],
        ..UserConfig::default()
    }
}

fn seeded_persistence() -> FakePersistence {
    FakePersistence::default()
        .with_config("user-1", user_config())
        .with_watchlist("user-1", &["fed-cut-march", "0xbtc"])
        .with_wallets("user-1", &["0x1234567890abcdef1234567890abcdef12345678"])
}

fn seeded_market_data() -> FakeMarketData {
    FakeMarketData::default()
        .with_market(
            "fed-cut-march",
            market_detail("0xfed", "fed-cut-march", &[("Yes", "fed-yes"), ("No", "fed-no")]),
        )
        .with_market(
            "0xbtc",
            market_detail("0xbtc", "btc-100k", &[("Yes", "btc-yes"), ("No", "btc-no")]),
        )
        .with_price("fed-yes", 0.62)
        .with_price("btc-yes", 0.35)
        .with_trades(
            "0x1234567890abcdef1234567890abcdef12345678",
            vec![trade(Some("buy"), 10000.0, 0.6, "fed-cut-march")],
        )
}

fn seeded_news() -> FakeNews {
    FakeNews::default()
        .with_search(vec![search_result("Fed minutes lean dovish")])
        .with_general(vec![search_result("Crypto markets rally")])
}

#[tokio::test]
async fn full_run_produces_decisions() {
    let completion = FakeCompletion::returning(ADVISOR_REPLY);
    let prompts = completion.prompts.clone();
    let pipeline = pipeline_with(
        Arc::new(seeded_persistence()),
        Arc::new(seeded_market_data()),
        Arc::new(seeded_news()),
        Arc::new(completion),
    )
    .unwrap();

    let state = pipeline
        .run(PipelineState::proactive_scan("user-1"))
        .await
        .unwrap();

    assert_eq!(state.next_node, Some(Node::End));
    assert_eq!(state.watchlist_markets().len(), 2);
    assert_eq!(state.market_snapshots()[0].yes_price, 0.62);
    assert_eq!(state.smart_money_trades().len(), 1);
    assert_eq!(state.news_items().len(), 3);

    let decisions = state.decisions();
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0].signal, Signal::BuyYes);
    assert_eq!(decisions[0].confidence, dec!(0.82));
    assert_eq!(decisions[1].signal, Signal::Skip);
    assert_eq!(decisions[1].confidence, dec!(1));

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let (system, user) = &prompts[0];
    assert!(system.contains("risk profile is: conservative"));
    assert!(user.contains("## SMART MONEY ACTIVITY"));
    assert!(user.contains("0x1234...5678"));
    assert!(user.contains("## NEWS & RESEARCH"));
    assert!(user.contains("[HIGH] Fed minutes lean dovish"));
}

#[tokio::test]
async fn empty_watchlist_never_calls_the_model() {
    let completion = FakeCompletion::returning(ADVISOR_REPLY);
    let calls = completion.calls.clone();
    let pipeline = pipeline_with(
        Arc::new(FakePersistence::default().with_config("user-1", user_config())),
        Arc::new(FakeMarketData::default()),
        Arc::new(seeded_news()),
        Arc::new(completion),
    )
    .unwrap();

    let response = pipeline.analyze("user-1", "proactive_scan").await.unwrap();

    assert!(response.decisions.is_empty());
    assert!(response
        .messages
        .iter()
        .any(|m| m.contains("no markets to analyze")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_model_output_still_terminates() {
    let pipeline = pipeline_with(
        Arc::new(seeded_persistence()),
        Arc::new(seeded_market_data()),
        Arc::new(seeded_news()),
        Arc::new(FakeCompletion::returning("Sorry, I can't produce JSON today.")),
    )
    .unwrap();

    let state = pipeline
        .run(PipelineState::proactive_scan("user-1"))
        .await
        .unwrap();

    assert_eq!(state.next_node, Some(Node::End));
    assert_eq!(state.decisions, Some(vec![]));
    assert!(state.messages.iter().any(|m| m.contains("failed to parse")));
}

#[tokio::test]
async fn every_stage_output_is_present_after_a_run() {
    let pipeline = pipeline_with(
        Arc::new(FakePersistence::failing()),
        Arc::new(FakeMarketData::default().failing_prices()),
        Arc::new(FakeNews::default().failing_search().failing_general()),
        Arc::new(FakeCompletion::failing("boom")),
    )
    .unwrap();

    let state = pipeline
        .run(PipelineState::proactive_scan("user-1"))
        .await
        .unwrap();

    assert!(state.watchlist_markets.is_some());
    assert!(state.tracked_wallets.is_some());
    assert!(state.market_snapshots.is_some());
    assert!(state.smart_money_trades.is_some());
    assert!(state.news_items.is_some());
    assert!(state.decisions.is_some());
}

#[tokio::test]
async fn runs_at_most_four_workers() {
    let pipeline = pipeline_with(
        Arc::new(seeded_persistence()),
        Arc::new(seeded_market_data()),
        Arc::new(seeded_news()),
        Arc::new(FakeCompletion::returning(ADVISOR_REPLY)),
    )
    .unwrap();

    let state = pipeline
        .run(PipelineState::proactive_scan("user-1"))
        .await
        .unwrap();

    let routes: Vec<&String> = state
        .messages
        .iter()
        .filter(|m| m.starts_with("Supervisor: routing to"))
        .collect();
    assert_eq!(routes.len(), 5);
    assert_eq!(routes[4], "Supervisor: routing to END");
}

#[tokio::test]
async fn pipeline_is_reusable_across_concurrent_runs() {
    let pipeline = Arc::new(
        pipeline_with(
            Arc::new(seeded_persistence()),
            Arc::new(seeded_market_data()),
            Arc::new(seeded_news()),
            Arc::new(FakeCompletion::returning(ADVISOR_REPLY)),
        )
        .unwrap(),
    );

    let (a, b) = tokio::join!(
        pipeline.analyze("user-1", "proactive_scan"),
        pipeline.analyze("user-2", "proactive_scan"),
    );

    // user-2 has no watchlist, so runs must not leak state into each other.
    assert_eq!(a.unwrap().decisions.len(), 2);
    assert!(b.unwrap().decisions.is_empty());
}

#[tokio::test]
async fn sqlite_store_drives_context() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.upsert_agent_config("user-1", &user_config()).unwrap();
    store
        .add_watchlist("user-1", "Macro", &["fed-cut-march"])
        .unwrap();
    store
        .add_squad(
            "user-1",
            "Whales",
            true,
            &["0x1234567890abcdef1234567890abcdef12345678"],
        )
        .unwrap();
    let store = Arc::new(store);

    let pipeline = pipeline_with(
        store.clone(),
        Arc::new(seeded_market_data()),
        Arc::new(seeded_news()),
        Arc::new(FakeCompletion::returning(ADVISOR_REPLY)),
    )
    .unwrap();

    let state = pipeline
        .run(PipelineState::proactive_scan("user-1"))
        .await
        .unwrap();
    assert_eq!(state.watchlist_markets().len(), 1);
    assert_eq!(state.tracked_wallets().len(), 1);
    assert_eq!(state.user_config.risk_profile, RiskProfile::Conservative);

    let inserted = Persistence::insert_decision(store.as_ref(), "user-1", &state.decisions()[0])
        .await
        .unwrap();
    assert!(inserted);
}
