//! Evaluate a stored index against a held-out dataset file

use dialogic_core::{evaluate, load_dataset, ClassifierConfig, RouteCounts};
use dialogic_e2e_tests::harness::TestArtifactManager;
use dialogic_e2e_tests::mocks::TestDataFactory;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_held_out_evaluation() {
    let (env, classifier) = TestArtifactManager::support_classifier();
    let path = env.write_dataset("test.jsonl", &TestDataFactory::held_out());
    let records = load_dataset(&path).unwrap();

    let report = evaluate(&classifier, &records);

    assert_eq!(report.total, 6);
    assert_eq!(report.failed, 0);
    assert_eq!(
        report.routes,
        RouteCounts {
            nearest: 4,
            cosine_fallback: 1,
            unlabeled: 1
        }
    );
    // only the fallback query is wrong
    assert!(close(report.topic_accuracy, 5.0 / 6.0));
    assert!(close(report.subtopic_accuracy, 5.0 / 6.0));
    // weighted recall equals accuracy
    assert!(close(report.topic_recall, report.topic_accuracy));
    // Account is over-predicted: precision 1/2 on support 1
    assert!(close(report.topic_precision, 5.5 / 6.0));
}

#[test]
fn test_strict_thresholds_push_queries_to_sentinel() {
    let (env, _) = TestArtifactManager::support_classifier();
    let embedder = std::sync::Arc::new(TestDataFactory::support_embedder());
    let mut config = ClassifierConfig::default();
    config.primary_threshold = 0.0;
    config.secondary_threshold = 1.0;
    let classifier = env.classifier(embedder, config).unwrap();

    let report = evaluate(&classifier, &TestDataFactory::held_out());
    // "where is my package now" embeds exactly onto its anchor, distance 0
    assert_eq!(report.routes.nearest, 1);
    assert_eq!(report.routes.cosine_fallback, 0);
    assert_eq!(report.routes.unlabeled, 5);
    assert!(report.topic_accuracy < 5.0 / 6.0);
}

#[test]
fn test_report_serializes() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let report = evaluate(&classifier, &TestDataFactory::held_out());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total"], 6);
    assert_eq!(json["routes"]["nearest"], 4);
    assert!(json["perTopic"].as_array().unwrap().len() >= 5);
}
