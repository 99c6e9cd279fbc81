//! The chunking consumer surface exposed by the governor

use crate::{governor_over, MockAnthropic, MockOpenAi};
use lectern_context::{ContextWindow, PAGE_SEPARATOR};
use lectern_store::MemoryStore;
use std::sync::Arc;

#[tokio::test]
async fn governor_chunk_matches_the_window_pipeline() {
    let anthropic = MockAnthropic::start().await;
    let openai = MockOpenAi::start().await;
    let governor = governor_over(Arc::new(MemoryStore::new()), &anthropic.uri(), &openai.uri())
        .await
        .expect("open governor");

    let pages: Vec<String> = (1..=6)
        .map(|n| format!("Page {n}: the tide kept rising through the night."))
        .collect();

    let via_governor = governor.chunk(pages.clone(), 30);
    let via_window = ContextWindow::new(pages.clone()).chunks(30);
    assert_eq!(via_governor, via_window);

    // Budget respected, order preserved, nothing lost.
    for chunk in &via_governor {
        assert!(chunk.estimated_tokens <= 30);
        assert!(!chunk.truncated);
    }
    let reconstructed: Vec<String> = via_governor
        .iter()
        .flat_map(|c| c.text.split(PAGE_SEPARATOR))
        .map(str::to_string)
        .collect();
    assert_eq!(reconstructed, pages);
}

#[tokio::test]
async fn generation_features_take_only_the_first_chunk() {
    let pages = vec![
        "The detective arrives and meets the household.".to_string(),
        "A quiet week passes at the manor.".to_string(),
        "The will is read aloud at last.".to_string(),
    ];
    let window = ContextWindow::new(pages.clone());

    let first = window.first_chunk(15).expect("first chunk");
    let all = window.chunks(15);
    assert_eq!(first, all[0]);
    // The later pages exist in later chunks but the default policy never
    // selects them.
    assert!(all.len() > 1);
    assert!(first.text.starts_with("The detective"));
}
