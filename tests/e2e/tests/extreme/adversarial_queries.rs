//! Hostile and unusual queries against a stored index

use std::sync::Arc;
use std::thread;

use dialogic_core::{MatchRoute, QueryError, TopicLabel};
use dialogic_e2e_tests::harness::TestArtifactManager;
use dialogic_e2e_tests::mocks::TestDataFactory;

#[test]
fn test_empty_and_blank_queries_rejected() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    for query in ["", " ", "\n\t  \r\n"] {
        assert_eq!(classifier.classify(query), Err(QueryError::EmptyQuery));
    }
}

#[test]
fn test_punctuation_and_emoji_only() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    for query in ["?!?!", "🔥🔥🔥", "¯\\_(ツ)_/¯ ...", "#@%"] {
        let result = classifier.classify_detailed(query).unwrap();
        // no word of any of these is in the vocabulary
        assert_eq!(result.label, TopicLabel::sentinel(), "query {query:?}");
        assert_eq!(result.route, MatchRoute::Unlabeled);
    }
}

#[test]
fn test_very_long_query() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let query = "password ".repeat(10_000);

    // one known word: cosine 1/sqrt(6) with the password anchor, just above 0.4
    let result = classifier.classify_detailed(&query).unwrap();
    assert_eq!(result.label, TopicLabel::new("Account", "Password"));
    assert_eq!(result.route, MatchRoute::CosineFallback);
}

#[test]
fn test_case_and_punctuation_do_not_matter() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let plain = classifier.classify_detailed("where is my package").unwrap();
    let shouted = classifier.classify_detailed("WHERE. IS. MY. PACKAGE!!!").unwrap();
    assert_eq!(plain, shouted);
    assert_eq!(plain.label, TopicLabel::new("Shipping", "Tracking"));
}

#[test]
fn test_non_finite_query_vector() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let width = classifier.anchors().dimensions();

    let result = classifier.classify_vector(&vec![f32::NAN; width]).unwrap();
    assert_eq!(result.route, MatchRoute::Unlabeled);
    assert_eq!(result.label, TopicLabel::sentinel());

    assert!(matches!(
        classifier.classify_vector(&vec![0.0; width + 1]),
        Err(QueryError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_concurrent_queries_match_sequential() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let queries: Vec<String> = TestDataFactory::held_out()
        .into_iter()
        .map(|r| r.text)
        .collect();
    let expected: Vec<_> = queries
        .iter()
        .map(|q| classifier.classify_detailed(q).unwrap())
        .collect();

    let queries = Arc::new(queries);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let classifier = classifier.clone();
            let queries = Arc::clone(&queries);
            thread::spawn(move || {
                queries
                    .iter()
                    .map(|q| classifier.classify_detailed(q).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
