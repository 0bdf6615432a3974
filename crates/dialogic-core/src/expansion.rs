//! Query Expansion
//!
//! Rewrites an ambiguous follow-up ("what about the second one?") into a
//! self-contained question using the dialogue so far, then hands it to the
//! classifier. Text generation itself is a black box behind [`TextGenerator`];
//! this module owns the prompt and the input/output checks around it.

use crate::classifier::{Classification, Classifier, QueryError};

/// Instruction prefix given to the sequence-to-sequence model
pub const EXPANSION_INSTRUCTION: &str = "Instruction: ONLY expand the ambiguous query below into a full, self-contained question based on the dialogue context below. DO NOT answer it:";

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Text generator failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Text generation failed: {0}")]
pub struct GenerationError(pub String);

/// Query expansion errors
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpansionError {
    /// Context or query was empty
    #[error("Both the conversation context and the ambiguous query are required (missing {0})")]
    MissingInput(&'static str),
    /// The generator failed
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The generator produced only whitespace
    #[error("Generator returned an empty expansion")]
    EmptyExpansion,
}

/// Expand-then-classify errors
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

// ============================================================================
// DIALOGUE
// ============================================================================

/// Who said a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "User"),
            Speaker::Bot => write!(f, "Bot"),
        }
    }
}

/// One utterance of the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.into(),
        }
    }
}

/// Render turns as `Speaker: text` lines
pub fn format_dialogue(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.speaker, t.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Separator between the prompt sections: a backslash followed by `n`, not a
/// line break. The expansion model was tuned on prompts in this form.
pub const PROMPT_SEPARATOR: &str = "\\n";

/// Build the expansion prompt for a context and an ambiguous query
///
/// The dialogue keeps its own line breaks; only the sections are joined
/// with [`PROMPT_SEPARATOR`].
pub fn build_expansion_prompt(context: &str, ambiguous_query: &str) -> String {
    format!(
        "{}\\n{}\\nUser: {}",
        EXPANSION_INSTRUCTION,
        context.trim(),
        ambiguous_query.trim()
    )
}

// ============================================================================
// EXPANDER
// ============================================================================

/// A prompt-in, text-out generation model
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for std::sync::Arc<T> {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt)
    }
}

/// Wraps a generator with the expansion prompt and input checks
pub struct QueryExpander<G> {
    generator: G,
}

impl<G: TextGenerator> QueryExpander<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Rewrite `ambiguous_query` into a self-contained question
    pub fn expand(&self, context: &str, ambiguous_query: &str) -> Result<String, ExpansionError> {
        if context.trim().is_empty() {
            return Err(ExpansionError::MissingInput("context"));
        }
        if ambiguous_query.trim().is_empty() {
            return Err(ExpansionError::MissingInput("query"));
        }

        let prompt = build_expansion_prompt(context, ambiguous_query);
        let generated = self.generator.generate(&prompt)?;
        let expanded = generated.trim();

        if expanded.is_empty() {
            return Err(ExpansionError::EmptyExpansion);
        }

        tracing::debug!(query = ambiguous_query, expanded, "Expanded query");
        Ok(expanded.to_string())
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Result of expanding and classifying one follow-up
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub expanded: String,
    pub classification: Classification,
}

/// Expand-then-classify
pub struct DialoguePipeline<G> {
    expander: QueryExpander<G>,
    classifier: Classifier,
}

impl<G: TextGenerator> DialoguePipeline<G> {
    pub fn new(expander: QueryExpander<G>, classifier: Classifier) -> Self {
        Self {
            expander,
            classifier,
        }
    }

    pub fn run(&self, context: &str, ambiguous_query: &str) -> Result<PipelineOutcome, PipelineError> {
        let expanded = self.expander.expand(context, ambiguous_query)?;
        let classification = self.classifier.classify_detailed(&expanded)?;
        Ok(PipelineOutcome {
            expanded,
            classification,
        })
    }

    /// Same as [`run`](Self::run) with structured turns
    pub fn run_turns(
        &self,
        turns: &[Turn],
        ambiguous_query: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.run(&format_dialogue(turns), ambiguous_query)
    }
}

// ============================================================================
// TESTS
// ============================================================================
