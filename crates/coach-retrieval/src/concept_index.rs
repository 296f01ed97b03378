//! Keyword-to-concept lookup over the built-in knowledge base.
//!
//! Resolution is case-insensitive substring matching against an ordered
//! keyword table; the first keyword found in the question wins. Overlapping
//! keywords therefore resolve by declaration order, not specificity
//! ("missing" is last so more specific keywords get a chance first).

use std::collections::HashMap;

use tracing::debug;

use coach_types::{ConceptRecord, GENERAL_CONCEPT};

/// Rendered when the question matches no concept.
pub const NO_CONCEPT_CONTEXT: &str = "No specific concept knowledge found.";

/// Read-only keyword -> concept table.
#[derive(Debug, Clone, Default)]
pub struct ConceptIndex {
    /// (lowercased keyword, concept id) in priority order
    keywords: Vec<(String, String)>,
    concepts: HashMap<String, ConceptRecord>,
}

impl ConceptIndex {
    /// Build an index from an ordered keyword table and concept records.
    ///
    /// Keywords pointing at ids with no record are kept; they resolve to a
    /// concept id but to no record.
    pub fn new<K, S>(keywords: K, concepts: Vec<ConceptRecord>) -> Self
    where
        K: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|(k, id)| (k.into().to_lowercase(), id.into()))
                .collect(),
            concepts: concepts.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    /// Index with no keywords; every question resolves to "general".
    pub fn empty() -> Self {
        Self::default()
    }

    /// The data-science interview knowledge base.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_KEYWORDS.iter().copied(), builtin_concepts())
    }

    /// Concept id of the first keyword contained in the question.
    fn match_id(&self, question_text: &str) -> Option<&str> {
        let lowered = question_text.to_lowercase();
        self.keywords
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, id)| id.as_str())
    }

    /// Resolve a question to its concept record, if any.
    pub fn resolve(&self, question_text: &str) -> Option<&ConceptRecord> {
        let record = self.match_id(question_text).and_then(|id| self.concepts.get(id));
        debug!(
            concept = record.map(|c| c.id.as_str()).unwrap_or(GENERAL_CONCEPT),
            "Resolved concept"
        );
        record
    }

    /// Resolved concept id, or "general" when no keyword matches.
    pub fn concept_id_for(&self, question_text: &str) -> &str {
        self.match_id(question_text).unwrap_or(GENERAL_CONCEPT)
    }

    pub fn get(&self, concept_id: &str) -> Option<&ConceptRecord> {
        self.concepts.get(concept_id)
    }

    /// All records, sorted by id.
    pub fn concepts(&self) -> Vec<&ConceptRecord> {
        let mut all: Vec<_> = self.concepts.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Keyword table in priority order.
    pub fn keywords(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keywords.iter().map(|(k, id)| (k.as_str(), id.as_str()))
    }

    /// Knowledge-base context for grounding feedback and clarification prompts.
    pub fn feedback_context(&self, question_text: &str) -> String {
        let Some(concept) = self.resolve(question_text) else {
            return NO_CONCEPT_CONTEXT.to_string();
        };

        format!(
            "RELEVANT CONCEPT KNOWLEDGE:\nDefinition: {}\n\nKey Points: {}\n\nCommon Interview Red Flags: {}\n\nPractical Application: {}\n",
            concept.definition,
            concept.key_points.join(", "),
            concept.red_flags.join(", "),
            concept.practical_application.as_deref().unwrap_or("N/A"),
        )
    }
}

const BUILTIN_KEYWORDS: &[(&str, &str)] = &[
    ("type i and type ii errors", "type_i_ii_errors"),
    ("p-value", "p_value"),
    ("central limit theorem", "central_limit_theorem"),
    ("correlation and causation", "correlation_vs_causation"),
    ("bias-variance tradeoff", "bias_variance_tradeoff"),
    ("class imbalance", "class_imbalance"),
    ("bagging and boosting", "bagging_vs_boosting"),
    ("linear regression", "linear_regression_assumptions"),
    ("a/b test", "ab_test_design"),
    ("missing", "missing_data_handling"),
];

fn builtin_concepts() -> Vec<ConceptRecord> {
    vec![
        ConceptRecord::new(
            "type_i_ii_errors",
            "Type I: False positive (rejecting true null hypothesis). Type II: False negative (failing to reject false null hypothesis)",
        )
        .with_key_points([
            "Type I (α): Saying there's an effect when there isn't",
            "Type II (β): Missing an effect that exists",
            "Power = 1 - β (ability to detect true effects)",
            "Setting α affects β inversely",
        ])
        .with_red_flags([
            "Confusing which is which",
            "No real-world examples",
            "Not discussing business trade-offs",
        ])
        .with_practical_application(
            "Choose α based on cost of false positives vs false negatives in business context",
        ),
        ConceptRecord::new(
            "p_value",
            "Probability of observing test results at least as extreme as observed, assuming null hypothesis is true",
        )
        .with_key_points([
            "NOT the probability that null hypothesis is true",
            "Lower p-value = stronger evidence against null hypothesis",
            "Threshold (usually 0.05) is arbitrary",
            "Affected by sample size",
        ])
        .with_red_flags([
            "Defining as probability null is true",
            "Not mentioning p-hacking risks",
            "Ignoring practical significance",
        ])
        .with_practical_application(
            "Use alongside effect size and confidence intervals for complete picture",
        ),
        ConceptRecord::new(
            "central_limit_theorem",
            "Sample means approach normal distribution as sample size increases, regardless of population distribution",
        )
        .with_key_points([
            "Works for any population distribution shape",
            "Sample size ~30 often sufficient",
            "Standard error = σ/√n",
            "Foundation for confidence intervals and hypothesis testing",
        ])
        .with_red_flags([
            "Saying original data becomes normal",
            "Not explaining why it matters for data science",
            "Missing the sampling distribution concept",
        ])
        .with_practical_application(
            "Allows us to make probabilistic statements about sample statistics",
        ),
        ConceptRecord::new(
            "correlation_vs_causation",
            "Correlation measures linear relationship strength; causation implies one variable directly influences another",
        )
        .with_key_points([
            "Correlation ≠ causation",
            "Confounding variables can create spurious correlations",
            "Temporal order matters for causation",
            "Randomized experiments can establish causation",
        ])
        .with_red_flags([
            "Using correlation to imply causation",
            "No mention of confounding variables",
            "Not discussing experimental design",
        ]),
        ConceptRecord::new(
            "bias_variance_tradeoff",
            "The fundamental tradeoff between a model's bias (underfitting) and variance (overfitting)",
        )
        .with_key_points([
            "Bias: error from overly simplistic assumptions",
            "Variance: error from sensitivity to training data changes",
            "Total error = bias² + variance + irreducible error",
            "Cannot minimize both simultaneously",
        ])
        .with_red_flags([
            "Confusing with statistical bias",
            "No practical examples or diagnostics",
            "Missing the fundamental tradeoff",
        ])
        .with_practical_application(
            "Use learning curves to diagnose, cross-validation to evaluate, regularization to reduce variance, feature engineering to reduce bias",
        ),
        ConceptRecord::new(
            "class_imbalance",
            "When target classes are not represented equally in the dataset",
        )
        .with_key_points([
            "Accuracy becomes misleading metric",
            "Model may just predict majority class",
            "Need different evaluation metrics",
            "Multiple handling techniques available",
        ])
        .with_red_flags([
            "Only mentioning accuracy",
            "Not discussing business implications",
            "Ignoring evaluation metric changes",
        ])
        .with_practical_application(
            "Choose technique based on dataset size, domain constraints, and business costs",
        ),
        ConceptRecord::new(
            "bagging_vs_boosting",
            "Bagging: parallel weak learners on bootstrap samples. Boosting: sequential weak learners focusing on mistakes",
        )
        .with_key_points([
            "Bagging trains models on bootstrap samples and averages predictions",
            "Boosting trains sequentially, each model correcting previous errors",
            "Bagging mainly reduces variance; boosting reduces bias and variance",
            "Boosting is more sensitive to noise and overfitting",
        ])
        .with_red_flags([
            "Confusing the sequential vs parallel nature",
            "Not mentioning specific algorithms",
            "Missing bias/variance implications",
        ]),
        ConceptRecord::new(
            "linear_regression_assumptions",
            "Key assumptions that must hold for linear regression to provide reliable results",
        )
        .with_key_points([
            "Linearity between features and target",
            "Independent observations",
            "Homoscedasticity (constant residual variance)",
            "Normally distributed residuals",
            "No multicollinearity among features",
        ])
        .with_red_flags([
            "Forgetting key assumptions",
            "Not knowing how to test assumptions",
            "No solutions for violations",
        ]),
        ConceptRecord::new(
            "ab_test_design",
            "Controlled experiment to compare two or more variants to determine which performs better",
        )
        .with_key_points([
            "Clear hypothesis and success metrics",
            "Random assignment to treatment/control",
            "Sufficient sample size (power analysis)",
            "Statistical significance testing",
        ])
        .with_red_flags([
            "No mention of randomization",
            "Ignoring statistical power",
            "Not discussing potential biases",
        ]),
        ConceptRecord::new(
            "missing_data_handling",
            "Systematic approach to deal with incomplete data in datasets",
        )
        .with_key_points([
            "Preserve relationships between variables",
            "Don't introduce bias",
            "Consider uncertainty from imputation",
            "Business domain knowledge crucial",
        ])
        .with_red_flags([
            "Just deleting rows without analysis",
            "Not understanding missingness types",
            "No justification for chosen method",
        ]),
    ]
}
