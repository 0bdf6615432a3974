//! Build-then-classify journeys
//!
//! A dataset goes through the builder onto disk, a fresh classifier loads it,
//! and queries come back with the labels of the anchors they match.

use std::sync::Arc;

use dialogic_core::{
    ArtifactStore, Classifier, ClassifierConfig, MatchRoute, TopicLabel, SENTINEL_TOPIC,
};
use dialogic_e2e_tests::harness::TestArtifactManager;
use dialogic_e2e_tests::mocks::TestDataFactory;

#[test]
fn test_password_example_end_to_end() {
    let (_env, classifier) = TestArtifactManager::support_classifier();

    let label = classifier.classify(TestDataFactory::PASSWORD_QUERY).unwrap();
    assert_eq!(label, TopicLabel::new("Account", "Password"));

    let detailed = classifier
        .classify_detailed(TestDataFactory::PASSWORD_QUERY)
        .unwrap();
    assert_eq!(detailed.route, MatchRoute::Nearest);
    assert!(detailed.distance <= 1.0);
    assert_eq!(
        classifier.anchors().text(detailed.anchor.unwrap()),
        Some("How do I reset my password?")
    );
}

#[test]
fn test_round_trip_every_anchor_classifies_to_itself() {
    let (_env, classifier) = TestArtifactManager::support_classifier();

    for record in TestDataFactory::support_anchors() {
        let result = classifier.classify_detailed(&record.text).unwrap();
        assert_eq!(result.label, record.label(), "anchor {:?}", record.text);
        assert_eq!(result.route, MatchRoute::Nearest);
        assert!(result.distance.abs() < 1e-6);
    }
}

#[test]
fn test_cosine_fallback_end_to_end() {
    let (_env, classifier) = TestArtifactManager::support_classifier();

    let result = classifier
        .classify_detailed(TestDataFactory::FALLBACK_QUERY)
        .unwrap();
    assert!(result.distance > 1.0);
    assert_eq!(result.route, MatchRoute::CosineFallback);
    assert_eq!(result.label, TopicLabel::new("Account", "Password"));
    assert!(result.similarity.unwrap() >= 0.4);
}

#[test]
fn test_off_topic_query_gets_sentinel() {
    let (_env, classifier) = TestArtifactManager::support_classifier();

    let label = classifier.classify(TestDataFactory::OFF_TOPIC_QUERY).unwrap();
    assert_eq!(label.topic, SENTINEL_TOPIC);
    assert_eq!(label.subtopic, None);

    let json = serde_json::to_value(&label).unwrap();
    assert_eq!(json, serde_json::json!({"topic": "General", "subtopic": null}));
}

#[test]
fn test_labels_keep_dataset_order_after_reload() {
    let env = TestArtifactManager::new_temp();
    let embedder = TestDataFactory::support_embedder();
    let records = TestDataFactory::support_anchors();
    env.build(&embedder, &records).unwrap();

    let loaded = ArtifactStore::new(env.store.dir()).load().unwrap();
    assert_eq!(loaded.len(), records.len());
    for (position, record) in records.iter().enumerate() {
        assert_eq!(loaded.text(position), Some(record.text.as_str()));
        assert_eq!(loaded.label(position), Some(&record.label()));
    }
    assert_eq!(loaded.manifest().model_name, "bag-of-words");
    assert_eq!(loaded.manifest().anchor_count, records.len());
}

#[test]
fn test_deterministic_across_classifier_instances() {
    let env = TestArtifactManager::new_temp();
    let embedder = Arc::new(TestDataFactory::support_embedder());
    env.build(embedder.as_ref(), &TestDataFactory::support_anchors())
        .unwrap();

    let first = env
        .classifier(embedder.clone(), ClassifierConfig::default())
        .unwrap();
    let second = env.classifier(embedder, ClassifierConfig::default()).unwrap();

    for record in TestDataFactory::held_out() {
        assert_eq!(
            first.classify_detailed(&record.text).unwrap(),
            second.classify_detailed(&record.text).unwrap()
        );
    }
}

#[test]
fn test_rebuild_replaces_previous_index() {
    let env = TestArtifactManager::new_temp();
    let embedder = TestDataFactory::support_embedder();
    env.build(&embedder, &TestDataFactory::support_anchors())
        .unwrap();

    let fewer: Vec<_> = TestDataFactory::support_anchors().into_iter().take(2).collect();
    env.build(&embedder, &fewer).unwrap();

    let loaded = env.store.load().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.labels()[1], TopicLabel::new("Account", "Login"));
}

#[test]
fn test_larger_synthetic_index() {
    let env = TestArtifactManager::new_temp();
    let records = TestDataFactory::synthetic_anchors(12, 25);
    let embedder = Arc::new(dialogic_e2e_tests::mocks::BagOfWordsEmbedder::from_corpus(
        records.iter().map(|r| r.text.as_str()),
    ));
    env.build(embedder.as_ref(), &records).unwrap();

    let classifier = Classifier::open(embedder, &env.store, ClassifierConfig::default()).unwrap();
    assert_eq!(classifier.anchors().len(), 300);
    assert_eq!(classifier.anchors().topic_distribution().len(), 12);

    let sample = &records[7 * 25 + 3];
    assert_eq!(classifier.classify(&sample.text).unwrap(), sample.label());
}
