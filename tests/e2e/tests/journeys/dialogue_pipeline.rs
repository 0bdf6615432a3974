//! Expand-then-classify journeys over a stored index

use std::sync::Arc;

use dialogic_core::{
    DialoguePipeline, ExpansionError, MatchRoute, PipelineError, QueryExpander, TopicLabel, Turn,
};
use dialogic_e2e_tests::harness::TestArtifactManager;
use dialogic_e2e_tests::mocks::ScriptedGenerator;

fn conversation() -> Vec<Turn> {
    vec![
        Turn::user("I ordered a jacket last week"),
        Turn::bot("Thanks! How can I help with that order?"),
        Turn::user("It arrived torn"),
    ]
}

#[test]
fn test_follow_up_is_expanded_then_classified() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let generator = Arc::new(
        ScriptedGenerator::new().with("can I get my money back", "I want a refund for my order"),
    );
    let pipeline = DialoguePipeline::new(QueryExpander::new(generator.clone()), classifier);

    let outcome = pipeline
        .run_turns(&conversation(), "can I get my money back")
        .unwrap();

    assert_eq!(outcome.expanded, "I want a refund for my order");
    assert_eq!(
        outcome.classification.label,
        TopicLabel::new("Billing", "Refund")
    );
    assert_eq!(outcome.classification.route, MatchRoute::Nearest);
    assert_eq!(generator.calls(), 1);
}

#[test]
fn test_expansion_that_matches_nothing_gets_sentinel() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let pipeline = DialoguePipeline::new(
        QueryExpander::new(
            ScriptedGenerator::new().with("and then?", "Sing something cheerful"),
        ),
        classifier,
    );

    let outcome = pipeline.run("User: hi\nBot: hello", "and then?").unwrap();
    assert_eq!(outcome.classification.label, TopicLabel::sentinel());
    assert_eq!(outcome.classification.route, MatchRoute::Unlabeled);
}

#[test]
fn test_missing_context_never_reaches_generator() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let generator = Arc::new(ScriptedGenerator::new());
    let pipeline = DialoguePipeline::new(QueryExpander::new(generator.clone()), classifier);

    let err = pipeline.run_turns(&[], "what about it").unwrap_err();
    assert_eq!(
        err,
        PipelineError::Expansion(ExpansionError::MissingInput("context"))
    );
    assert_eq!(generator.calls(), 0);
}

#[test]
fn test_generator_failure_surfaces() {
    let (_env, classifier) = TestArtifactManager::support_classifier();
    let pipeline = DialoguePipeline::new(QueryExpander::new(ScriptedGenerator::new()), classifier);

    assert!(matches!(
        pipeline.run_turns(&conversation(), "unscripted question"),
        Err(PipelineError::Expansion(ExpansionError::Generation(_)))
    ));
}
