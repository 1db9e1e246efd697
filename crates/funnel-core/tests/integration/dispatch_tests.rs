use std::collections::HashSet;
use std::time::Duration;

use funnel_core::{
    AppError, DelayAlgorithm, DelayConfig, DelayedFetcher, DispatchConfig, Dispatcher,
    calculate_delays,
};

use crate::integration::common::{FakeSite, Posting, PostingParser};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn schedule_then_dispatch_completes_every_posting() {
    let ids = ["p1", "p2", "p3", "p4", "p5"];
    let postings: Vec<Posting> = ids.iter().map(|id| Posting::new(id)).collect();

    let config = DelayConfig::new(DelayAlgorithm::Linear, 0.02);
    let delays = calculate_delays(postings.len(), &config).unwrap();

    let dispatcher = Dispatcher::new(DispatchConfig::new(3));
    let pool = dispatcher.pool();
    let fetcher = DelayedFetcher::new(FakeSite::with_postings(&ids));
    let mut parser = PostingParser::default();

    let summary = dispatcher
        .dispatch(postings, &fetcher, &mut parser, &pool, &delays)
        .await
        .unwrap();

    let completed: HashSet<String> = parser.completed.lock().unwrap().iter().cloned().collect();
    let expected: HashSet<String> = ids.iter().map(|s| s.to_string()).collect();
    assert_eq!(completed, expected);
    assert_eq!(summary.items.len(), 5);
    for posting in &summary.items {
        let description = posting.description.as_deref().unwrap();
        assert!(description.contains(&posting.id));
    }
    assert!(pool.is_shut_down());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn explicit_schedule_is_respected() {
    let ids = ["a", "b", "c", "d", "e"];
    let postings: Vec<Posting> = ids.iter().map(|id| Posting::new(id)).collect();
    let dispatcher = Dispatcher::new(DispatchConfig::default());
    let pool = dispatcher.pool();
    let fetcher = DelayedFetcher::new(FakeSite::with_postings(&ids));
    let mut parser = PostingParser::default();

    let summary = dispatcher
        .dispatch(
            postings,
            &fetcher,
            &mut parser,
            &pool,
            &[0.0, 0.01, 0.01, 0.02, 0.02],
        )
        .await
        .unwrap();

    assert!(summary.elapsed >= Duration::from_millis(20));
    assert_eq!(parser.completed.lock().unwrap().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn missing_page_fails_the_dispatch() {
    // "c" is not served by the site
    let postings: Vec<Posting> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|id| Posting::new(id))
        .collect();
    let dispatcher = Dispatcher::new(DispatchConfig::default());
    let pool = dispatcher.pool();
    let fetcher = DelayedFetcher::new(FakeSite::with_postings(&["a", "b", "d", "e"]));
    let mut parser = PostingParser::default();

    let err = dispatcher
        .dispatch(
            postings,
            &fetcher,
            &mut parser,
            &pool,
            &[0.0, 0.01, 0.05, 0.5, 0.5],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::HttpError(msg) if msg.contains("404")));
    let completed = parser.completed.lock().unwrap().clone();
    assert!(!completed.contains(&"c".to_string()));
    assert!(!completed.contains(&"d".to_string()));
    assert!(!completed.contains(&"e".to_string()));
}
