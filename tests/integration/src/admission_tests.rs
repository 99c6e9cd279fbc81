//! Admission control across the full dispatch path

use crate::{governor_over, seed_credential, MockAnthropic, MockOpenAi};
use lectern_core::{ChatMessage, LecternError, ProviderId};
use lectern_governor::RequestGovernor;
use lectern_limits::Admission;
use lectern_store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

/// Fill most of the small OpenAI test window with one confirmed call.
async fn fill_openai_window(governor: &RequestGovernor, openai: &MockOpenAi) {
    openai.mock_reply("filler", 3_200, 300).await;
    governor
        .dispatch(
            &ProviderId::new("openai-gpt4o"),
            &[ChatMessage::user("warm up")],
            "",
            None,
        )
        .await
        .expect("filling dispatch");
}

#[tokio::test]
async fn local_denial_short_circuits_before_the_network() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");
    seed_credential(&governor, "openai-gpt4o", "sk-test").await;
    fill_openai_window(&governor, &openai).await;
    assert_eq!(openai.calls().await, 1);

    // A big context cannot fit in the ~500 tokens left of the 4000 window.
    let big_context = "x".repeat(8_000);
    let err = governor
        .dispatch(
            &ProviderId::new("openai-gpt4o"),
            &[ChatMessage::user("summarize so far")],
            &big_context,
            None,
        )
        .await
        .expect_err("denied locally");

    let LecternError::RateLimited {
        confirmed,
        retry_after,
        ..
    } = err
    else {
        panic!("expected RateLimited, got {err:?}");
    };
    assert!(!confirmed, "denial came from the simulation, not the provider");
    assert!(retry_after.expect("wait hint") > Duration::ZERO);

    // The transport was never consulted for the denied attempt.
    assert_eq!(openai.calls().await, 1);
}

#[tokio::test]
async fn denied_preflight_becomes_allowed_after_the_computed_wait() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");
    seed_credential(&governor, "openai-gpt4o", "sk-test").await;
    fill_openai_window(&governor, &openai).await;

    let provider = ProviderId::new("openai-gpt4o");
    let denied = governor
        .can_admit_estimate(&provider, "")
        .expect("preflight");
    assert!(matches!(
        denied.admission,
        Admission::Denied { confirmed: false, .. }
    ));
    let wait = denied.admission.wait().expect("denied with a wait hint");
    assert!(wait >= Duration::from_secs(1));
    assert!(wait <= Duration::from_secs(3), "window drains at 500 tok/s");

    tokio::time::sleep(wait + Duration::from_millis(200)).await;

    let allowed = governor
        .can_admit_estimate(&provider, "")
        .expect("preflight");
    assert!(allowed.admission.is_allowed());
}

#[tokio::test]
async fn provider_confirmed_throttle_denies_the_next_attempt_locally() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;
    anthropic.mock_rate_limit(80_000, 0, 30).await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");
    seed_credential(&governor, "anthropic-sonnet", "sk-ant-test").await;

    let provider = ProviderId::new("anthropic-sonnet");
    let first = governor
        .dispatch(&provider, &[ChatMessage::user("hi")], "", None)
        .await
        .expect_err("provider rejects");
    assert!(matches!(
        first,
        LecternError::RateLimited { confirmed: true, .. }
    ));
    assert_eq!(anthropic.calls().await, 1);

    // The reconciled bucket (full window, 30s cooldown) denies the retry
    // before it leaves the process.
    let second = governor
        .dispatch(&provider, &[ChatMessage::user("hi again")], "", None)
        .await
        .expect_err("denied locally");
    assert!(matches!(
        second,
        LecternError::RateLimited { confirmed: true, .. }
    ));
    assert_eq!(anthropic.calls().await, 1);
}

#[tokio::test]
async fn free_provider_without_a_window_always_admits() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");

    let preflight = governor
        .can_admit_estimate(&ProviderId::new("ollama-local"), &"y".repeat(400_000))
        .expect("preflight");
    assert!(preflight.admission.is_allowed());
    assert!(preflight.approx_cost.is_none());
}
