//! Classification evaluation
//!
//! Runs the classifier over a held-out labeled set and reports accuracy plus
//! support-weighted precision, recall and F1 over topics. A label that is
//! never predicted (or never true) scores 0 instead of dividing by zero.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::anchors::{AnchorRecord, TopicLabel};
use crate::classifier::{Classifier, MatchRoute};

/// Per-topic scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicScore {
    pub topic: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of records whose true topic is this one
    pub support: usize,
}

/// How many predictions each tier produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCounts {
    pub nearest: usize,
    pub cosine_fallback: usize,
    pub unlabeled: usize,
}

impl RouteCounts {
    fn record(&mut self, route: MatchRoute) {
        match route {
            MatchRoute::Nearest => self.nearest += 1,
            MatchRoute::CosineFallback => self.cosine_fallback += 1,
            MatchRoute::Unlabeled => self.unlabeled += 1,
        }
    }
}

/// Aggregated evaluation results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub total: usize,
    /// Queries the classifier returned an error for
    pub failed: usize,
    pub topic_accuracy: f64,
    pub topic_precision: f64,
    pub topic_recall: f64,
    pub topic_f1: f64,
    pub subtopic_accuracy: f64,
    pub routes: RouteCounts,
    /// Sorted by topic name
    pub per_topic: Vec<TopicScore>,
}

/// Classify every record's text and score the predictions
///
/// A per-query error counts under `failed` and is scored as the fallback
/// topic, so one bad record never aborts the run.
pub fn evaluate(classifier: &Classifier, records: &[AnchorRecord]) -> EvaluationReport {
    let mut predictions = Vec::with_capacity(records.len());
    let mut routes = RouteCounts::default();
    let mut failed = 0;

    for record in records {
        match classifier.classify_detailed(&record.text) {
            Ok(classification) => {
                routes.record(classification.route);
                predictions.push(classification.label);
            }
            Err(e) => {
                tracing::warn!(text = %record.text, error = %e, "Evaluation query failed");
                failed += 1;
                predictions.push(TopicLabel::topic_only(
                    classifier.config().fallback_topic.clone(),
                ));
            }
        }
    }

    let truth: Vec<TopicLabel> = records.iter().map(AnchorRecord::label).collect();
    let mut report = score(&truth, &predictions);
    report.failed = failed;
    report.routes = routes;

    tracing::info!(
        total = report.total,
        failed,
        accuracy = report.topic_accuracy,
        f1 = report.topic_f1,
        "Evaluation complete"
    );
    report
}

/// Score aligned true and predicted labels
///
/// `failed` and `routes` are left zeroed.
pub fn score(truth: &[TopicLabel], predicted: &[TopicLabel]) -> EvaluationReport {
    let total = truth.len().min(predicted.len());
    let pairs = || truth.iter().zip(predicted.iter());

    let topic_hits = pairs().filter(|(t, p)| t.topic == p.topic).count();
    let subtopic_hits = pairs().filter(|(t, p)| t == p).count();

    let topics: BTreeSet<&str> = pairs()
        .flat_map(|(t, p)| [t.topic.as_str(), p.topic.as_str()])
        .collect();

    #[derive(Default)]
    struct Tally {
        true_positive: usize,
        predicted: usize,
        support: usize,
    }

    let mut tallies: BTreeMap<&str, Tally> = topics.iter().map(|t| (*t, Tally::default())).collect();
    for (t, p) in pairs() {
        if let Some(tally) = tallies.get_mut(t.topic.as_str()) {
            tally.support += 1;
            if t.topic == p.topic {
                tally.true_positive += 1;
            }
        }
        if let Some(tally) = tallies.get_mut(p.topic.as_str()) {
            tally.predicted += 1;
        }
    }

    let per_topic: Vec<TopicScore> = tallies
        .into_iter()
        .map(|(topic, tally)| {
            let precision = ratio(tally.true_positive, tally.predicted);
            let recall = ratio(tally.true_positive, tally.support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            TopicScore {
                topic: topic.to_string(),
                precision,
                recall,
                f1,
                support: tally.support,
            }
        })
        .collect();

    EvaluationReport {
        total,
        failed: 0,
        topic_accuracy: ratio(topic_hits, total),
        topic_precision: weighted(&per_topic, total, |s| s.precision),
        topic_recall: weighted(&per_topic, total, |s| s.recall),
        topic_f1: weighted(&per_topic, total, |s| s.f1),
        subtopic_accuracy: ratio(subtopic_hits, total),
        routes: RouteCounts::default(),
        per_topic,
    }
}

/// Support-weighted mean of a per-topic metric
fn weighted(scores: &[TopicScore], total: usize, metric: impl Fn(&TopicScore) -> f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    scores
        .iter()
        .map(|s| metric(s) * s.support as f64)
        .sum::<f64>()
        / total as f64
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
