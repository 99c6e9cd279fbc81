//! Dispatch round-trips against mock provider servers

use crate::{governor_over, seed_credential, MockAnthropic, MockOpenAi};
use lectern_core::{ChatMessage, LecternError, ProviderId};
use lectern_store::MemoryStore;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn openai_success_records_usage_and_stamps_credential() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;
    openai.mock_reply("She is the narrator's sister.", 900, 100).await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");
    seed_credential(&governor, "openai-gpt4o", "sk-test").await;

    let provider = ProviderId::new("openai-gpt4o");
    let reply = governor
        .dispatch(
            &provider,
            &[ChatMessage::user("Who is Margaret?")],
            "Margaret waved from the pier.",
            None,
        )
        .await
        .expect("dispatch");

    assert_eq!(reply.text, "She is the narrator's sister.");
    assert_eq!(reply.usage.expect("usage").total(), 1_000);
    assert_eq!(openai.calls().await, 1);

    let status = governor.provider_status(&provider).await.expect("status");
    let bucket = status.bucket.expect("bucket");
    assert!(bucket.used > 900.0);
    assert!(bucket.is_simulated);

    let credential = governor
        .credentials()
        .operational_credential(&provider)
        .await
        .expect("credential");
    assert!(credential.last_used_at.is_some());
}

#[tokio::test]
async fn anthropic_success_flows_through_its_transport() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;
    anthropic.mock_reply("The letter was never sent.", 310, 42).await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");
    seed_credential(&governor, "anthropic-sonnet", "sk-ant-test").await;

    let reply = governor
        .dispatch(
            &ProviderId::new("anthropic-sonnet"),
            &[ChatMessage::user("What happened to the letter?")],
            "He sealed the letter and hid it.",
            None,
        )
        .await
        .expect("dispatch");

    assert_eq!(reply.text, "The letter was never sent.");
    assert_eq!(anthropic.calls().await, 1);
    assert_eq!(openai.calls().await, 0);
}

#[tokio::test]
async fn default_system_prompt_reaches_the_wire() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;
    anthropic.mock_reply("ok", 10, 5).await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");
    seed_credential(&governor, "anthropic-sonnet", "sk-ant-test").await;

    governor
        .dispatch(
            &ProviderId::new("anthropic-sonnet"),
            &[ChatMessage::user("hi")],
            "The captain lowered the flag.",
            None,
        )
        .await
        .expect("dispatch");

    let requests = anthropic.server.received_requests().await.expect("requests");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let system = body["system"].as_str().expect("system field");
    assert!(system.contains("The captain lowered the flag."));
    assert!(system.contains("Never reveal"));
}

#[tokio::test]
async fn provider_rate_limit_reconciles_the_bucket() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;
    openai.mock_rate_limit(30_000, 29_500, 1_500, 4.0).await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");
    seed_credential(&governor, "openai-gpt4o", "sk-test").await;

    let provider = ProviderId::new("openai-gpt4o");
    let err = governor
        .dispatch(&provider, &[ChatMessage::user("hi")], "", None)
        .await
        .expect_err("rate limited");

    let LecternError::RateLimited {
        confirmed,
        retry_after,
        ..
    } = err
    else {
        panic!("expected RateLimited, got {err:?}");
    };
    assert!(confirmed);
    assert_eq!(retry_after, Some(Duration::from_secs_f64(4.0)));

    // The bucket now carries the provider's own figures, not the seed.
    let status = governor.provider_status(&provider).await.expect("status");
    let bucket = status.bucket.expect("bucket");
    assert!(!bucket.is_simulated);
    assert_eq!(bucket.limit, 30_000);
    assert!(bucket.used <= 29_500.0);
}

#[tokio::test]
async fn server_error_surfaces_raw_detail_and_skips_bookkeeping() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;
    openai.mock_server_error().await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");
    seed_credential(&governor, "openai-gpt4o", "sk-test").await;

    let provider = ProviderId::new("openai-gpt4o");
    let err = governor
        .dispatch(&provider, &[ChatMessage::user("hi")], "", None)
        .await
        .expect_err("server error");

    let LecternError::Provider { status, body, .. } = err else {
        panic!("expected Provider error, got {err:?}");
    };
    assert_eq!(status, Some(500));
    assert!(body.contains("server had an error"));

    // No confirmed success and no confirmed rejection: the bucket stays a
    // pristine simulated seed.
    let bucket = governor
        .provider_status(&provider)
        .await
        .expect("status")
        .bucket
        .expect("seeded bucket");
    assert!(bucket.is_simulated);
    assert!(bucket.used < 1.0);

    // And the credential was never stamped.
    let credential = governor
        .credentials()
        .operational_credential(&provider)
        .await
        .expect("credential");
    assert!(credential.last_used_at.is_none());
}

#[tokio::test]
async fn unknown_provider_fails_before_everything() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;

    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");

    let err = governor
        .dispatch(
            &ProviderId::new("no-such-provider"),
            &[ChatMessage::user("hi")],
            "",
            None,
        )
        .await
        .expect_err("unknown provider");
    assert!(matches!(err, LecternError::UnknownProvider { .. }));
    assert_eq!(anthropic.calls().await, 0);
    assert_eq!(openai.calls().await, 0);
}
