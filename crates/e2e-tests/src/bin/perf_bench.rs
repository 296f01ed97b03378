use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use coach_embeddings::{CandleEmbedder, EmbeddingModel, HashEmbedder};
use coach_retrieval::{ConceptIndex, FollowupRetriever, PatternCorpus};
use coach_session::{Collaborators, InterviewSession, SessionConfig};
use coach_types::{FollowupCategory, Question};
use e2e_tests::{SHIPPED_PATTERNS, SHIPPED_QUESTIONS};

const DEFAULT_ITERATIONS: usize = 3;
const DEFAULT_QUERIES: usize = 200;
const DEFAULT_SESSIONS: usize = 8;

const ANSWERS: [&str; 5] = [
    "I am not sure.",
    "It is about comparing a sample to what we would expect by chance.",
    "You would look at the trade-off between the two errors and pick a threshold that fits the business cost.",
    "The key idea is that with more data the estimate becomes more stable, but bias can still remain if the model is too simple or the sample is skewed.",
    "First I would define the metric, then estimate the sample size from the minimum detectable effect, randomize users, run the test for full weeks, and check guardrails before deciding.",
];

#[derive(Parser, Debug)]
#[command(
    name = "perf_bench",
    about = "Interview coach retrieval benchmark harness"
)]
struct Args {
    #[arg(long, value_enum, default_value = "hash")]
    embedder: BenchEmbedder,
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    #[arg(long, default_value_t = DEFAULT_QUERIES)]
    queries: usize,
    #[arg(long, default_value_t = DEFAULT_SESSIONS)]
    sessions: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value = SHIPPED_PATTERNS)]
    patterns: PathBuf,
    #[arg(long, default_value = SHIPPED_QUESTIONS)]
    questions: PathBuf,
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum BenchEmbedder {
    Hash,
    Candle,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StepMetrics {
    p50_ms: f64,
    p90_ms: f64,
    p99_ms: f64,
    samples: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct BenchmarkOutput {
    embedder: BenchEmbedder,
    iterations: usize,
    corpus_size: usize,
    generated_at: String,
    steps: BTreeMap<String, StepMetrics>,
}

#[derive(Default)]
struct SampleCollector {
    durations: BTreeMap<String, Vec<f64>>,
}

impl SampleCollector {
    fn record(&mut self, step: &str, duration_ms: f64) {
        self.durations
            .entry(step.to_string())
            .or_default()
            .push(duration_ms);
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    let questions_json = fs::read_to_string(&args.questions)
        .map_err(|e| format!("Failed to read {}: {e}", args.questions.display()))?;
    let questions: Vec<Question> =
        serde_json::from_str(&questions_json).map_err(|e| e.to_string())?;
    if questions.is_empty() {
        return Err("Question bank is empty".to_string());
    }

    let model = build_model(args.embedder)?;
    let mut collector = SampleCollector::default();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut corpus_size = 0;

    for _ in 0..args.iterations {
        let start = Instant::now();
        let corpus = PatternCorpus::from_path(&args.patterns, model.as_ref())
            .map_err(|e| format!("Failed to load corpus: {e}"))?;
        collector.record("corpus_load", elapsed_ms(start));
        corpus_size = corpus.len();

        let retriever = FollowupRetriever::new(
            Arc::new(corpus),
            Arc::new(ConceptIndex::builtin()),
            model.clone(),
        );

        for _ in 0..args.queries {
            let question = questions
                .choose(&mut rng)
                .ok_or("Question bank is empty")?;
            let answer = ANSWERS.choose(&mut rng).ok_or("No answers")?;
            let category = FollowupCategory::ALL
                .choose(&mut rng)
                .copied()
                .unwrap_or(FollowupCategory::GapFilling);

            let start = Instant::now();
            let results = retriever.retrieve(&question.question, answer, category, 3);
            collector.record("retrieve", elapsed_ms(start));
            if results.len() > 3 {
                return Err(format!("retrieve returned {} results", results.len()));
            }
        }

        let start = Instant::now();
        run_concurrent_sessions(&retriever, &questions, args.sessions).await?;
        collector.record("concurrent_sessions", elapsed_ms(start));
    }

    let output = BenchmarkOutput {
        embedder: args.embedder,
        iterations: args.iterations,
        corpus_size,
        generated_at: Utc::now().to_rfc3339(),
        steps: build_metrics(&collector),
    };

    let json = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    let table = render_table(&output);
    if let Some(out_dir) = &args.out_dir {
        fs::create_dir_all(out_dir).map_err(|e| format!("Failed to create out dir: {e}"))?;
        write_outputs(out_dir, &json, &table)?;
    }

    println!("{}", table);
    println!("\n{}", json);
    Ok(())
}

fn build_model(kind: BenchEmbedder) -> Result<Arc<dyn EmbeddingModel>, String> {
    match kind {
        BenchEmbedder::Hash => Ok(Arc::new(HashEmbedder::default())),
        BenchEmbedder::Candle => {
            let embedder = CandleEmbedder::load_default()
                .map_err(|e| format!("Failed to load candle model: {e}"))?;
            Ok(Arc::new(embedder))
        }
    }
}

/// One full turn per session, all sessions sharing one retriever.
async fn run_concurrent_sessions(
    retriever: &FollowupRetriever,
    questions: &[Question],
    sessions: usize,
) -> Result<(), String> {
    let mut handles = Vec::with_capacity(sessions);
    for i in 0..sessions {
        let retriever = retriever.clone();
        let question = questions[i % questions.len()].clone();
        let answer = ANSWERS[i % ANSWERS.len()];

        handles.push(tokio::spawn(async move {
            let mut session = InterviewSession::new(
                retriever,
                Collaborators::offline(),
                SessionConfig::default(),
            );
            session.select_question(question);
            session.submit_answer(answer).await.map(|_| ())
        }));
    }

    for handle in handles {
        handle
            .await
            .map_err(|e| format!("Session task panicked: {e}"))?
            .map_err(|e| format!("Session turn failed: {e}"))?;
    }
    Ok(())
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn build_metrics(collector: &SampleCollector) -> BTreeMap<String, StepMetrics> {
    let mut steps = BTreeMap::new();
    for (step, durations) in &collector.durations {
        let mut sorted = durations.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        steps.insert(
            step.clone(),
            StepMetrics {
                p50_ms: percentile(&sorted, 50.0),
                p90_ms: percentile(&sorted, 90.0),
                p99_ms: percentile(&sorted, 99.0),
                samples: durations.len(),
            },
        );
    }
    steps
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = (percentile / 100.0) * (values.len() as f64 - 1.0);
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        values[low]
    } else {
        let weight = rank - low as f64;
        values[low] + (values[high] - values[low]) * weight
    }
}

fn render_table(output: &BenchmarkOutput) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Benchmark Results (embedder={:?}, iterations={}, corpus={} patterns)",
        output.embedder, output.iterations, output.corpus_size
    ));
    lines.push("step\tp50_ms\tp90_ms\tp99_ms\tsamples".to_string());

    for (step, metrics) in &output.steps {
        lines.push(format!(
            "{}\t{:.3}\t{:.3}\t{:.3}\t{}",
            step, metrics.p50_ms, metrics.p90_ms, metrics.p99_ms, metrics.samples
        ));
    }
    lines.join("\n")
}

fn write_outputs(out_dir: &Path, json: &str, table: &str) -> Result<(), String> {
    fs::write(out_dir.join("latest.json"), json).map_err(|e| e.to_string())?;
    fs::write(out_dir.join("latest.txt"), table).map_err(|e| e.to_string())?;
    Ok(())
}
