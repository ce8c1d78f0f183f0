mod scenario;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use engine::{safe_prefix_len, Engine, FailurePolicy, FanOut};
use pipeline::ScoreBounds;
use reco_core::{Recommendation, StatisticsSnapshot};
use scenario::{Item, Scenario};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// reco - delegating recommendation engine
#[derive(Parser)]
#[command(name = "reco")]
#[command(about = "Merge sub-engine recommendations and post-process a safe prefix", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenario once and print the recommendations
    Recommend {
        /// Scenario file (JSON)
        #[arg(long)]
        scenario: PathBuf,

        /// Override the scenario's result limit
        #[arg(long)]
        limit: Option<usize>,

        /// Override the scenario's time budget, in milliseconds
        #[arg(long)]
        max_time_ms: Option<u64>,

        /// Run sub-engines on the rayon thread pool
        #[arg(long)]
        parallel: bool,

        /// Fail the request when any sub-engine fails
        #[arg(long)]
        propagate_failures: bool,

        /// Print recommendations and statistics as JSON
        #[arg(long)]
        json: bool,

        /// Show the score components of each recommendation
        #[arg(long)]
        explain: bool,
    },

    /// Compute the safe prefix for a list of scores
    Prune {
        /// Candidate scores, in any order
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        scores: Vec<f32>,

        /// Number of results requested
        #[arg(long)]
        limit: usize,

        /// Post-processor bounds as POS:NEG (e.g. 5:-5, inf:-inf); repeatable
        #[arg(long = "bound", value_parser = parse_bound)]
        bounds: Vec<ScoreBounds>,
    },

    /// Run the scenario repeatedly and report latencies
    Benchmark {
        /// Scenario file (JSON)
        #[arg(long)]
        scenario: PathBuf,

        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,

        /// Run sub-engines on the rayon thread pool
        #[arg(long)]
        parallel: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Recommend {
            scenario,
            limit,
            max_time_ms,
            parallel,
            propagate_failures,
            json,
            explain,
        } => {
            let options = RunOptions {
                limit,
                max_time_ms,
                failure_policy: if propagate_failures {
                    FailurePolicy::Propagate
                } else {
                    FailurePolicy::Isolate
                },
                fan_out: fan_out(parallel),
            };
            handle_recommend(&scenario, options, json, explain)?
        }
        Commands::Prune {
            scores,
            limit,
            bounds,
        } => handle_prune(scores, limit, &bounds),
        Commands::Benchmark {
            scenario,
            requests,
            concurrent,
            parallel,
        } => handle_benchmark(&scenario, requests, concurrent, fan_out(parallel)).await?,
    }

    Ok(())
}

struct RunOptions {
    limit: Option<usize>,
    max_time_ms: Option<u64>,
    failure_policy: FailurePolicy,
    fan_out: FanOut,
}

fn fan_out(parallel: bool) -> FanOut {
    if parallel {
        FanOut::Parallel
    } else {
        FanOut::Sequential
    }
}

/// Parse a `POS:NEG` pair; `inf` and `-inf` are accepted.
fn parse_bound(value: &str) -> std::result::Result<ScoreBounds, String> {
    let (positive, negative) = value
        .split_once(':')
        .ok_or_else(|| format!("expected POS:NEG, got '{}'", value))?;
    let positive: f32 = positive
        .trim()
        .parse()
        .map_err(|_| format!("invalid positive bound '{}'", positive))?;
    let negative: f32 = negative
        .trim()
        .parse()
        .map_err(|_| format!("invalid negative bound '{}'", negative))?;

    if positive.is_nan() || positive < 0.0 {
        return Err(format!("positive bound must be >= 0, got {}", positive));
    }
    if negative.is_nan() || negative > 0.0 {
        return Err(format!("negative bound must be <= 0, got {}", negative));
    }
    Ok(ScoreBounds::new(positive, negative))
}

/// Handle the 'recommend' command
fn handle_recommend(path: &Path, options: RunOptions, json: bool, explain: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let engine = scenario.build_engine(options.failure_policy, options.fan_out);
    let config = scenario.config(options.limit, options.max_time_ms);
    let context = scenario.context(config);

    info!(
        "Running {} engines and {} post-processors for {}",
        engine.engine_count(),
        engine.post_processor_count(),
        scenario.input
    );
    let recommendations = engine.recommend(&scenario.input, &context)?;
    let ranked = recommendations.into_sorted_vec();
    let statistics = context.statistics().snapshot();

    if json {
        let output = serde_json::json!({
            "input": scenario.input,
            "limit": config.limit(),
            "recommendations": ranked,
            "statistics": statistics,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_recommendations(&ranked, config.limit(), explain);
        print_statistics(&statistics);
    }
    Ok(())
}

/// Handle the 'prune' command
fn handle_prune(mut scores: Vec<f32>, limit: usize, bounds: &[ScoreBounds]) {
    scores.sort_unstable_by(|a, b| b.total_cmp(a));
    let combined = bounds
        .iter()
        .fold(ScoreBounds::ZERO, |acc, bounds| acc.combine(*bounds));
    let safe = safe_prefix_len(&scores, limit, combined);

    println!(
        "{} {} of {} candidates must be post-processed (limit {}, bounds [{}, {}])",
        "✓".green(),
        safe.to_string().bold(),
        scores.len(),
        limit,
        combined.max_positive,
        combined.max_negative
    );
    for (rank, score) in scores.iter().enumerate() {
        let line = format!("{:>3}. {:.2}", rank + 1, score);
        if rank < safe {
            println!("{}", line);
        } else {
            println!("{}", line.dimmed());
        }
    }
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    path: &Path,
    requests: usize,
    concurrent: usize,
    fan_out: FanOut,
) -> Result<()> {
    if requests == 0 || concurrent == 0 {
        bail!("requests and concurrent must both be at least 1");
    }

    let scenario = Arc::new(Scenario::load(path)?);
    let engine = Arc::new(scenario.build_engine(FailurePolicy::Isolate, fan_out));

    let started = Instant::now();
    let mut timings: Vec<Duration> = Vec::with_capacity(requests);
    let mut remaining = requests;

    // Requests go out in waves of `concurrent`
    while remaining > 0 {
        let wave = remaining.min(concurrent);
        let mut handles = Vec::with_capacity(wave);
        for _ in 0..wave {
            let scenario = Arc::clone(&scenario);
            let engine = Arc::clone(&engine);
            handles.push(tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                let context = scenario.context(scenario.config(None, None));
                engine.recommend(&scenario.input, &context)?;
                Ok::<_, anyhow::Error>(start.elapsed())
            }));
        }
        for handle in handles {
            timings.push(handle.await??);
        }
        remaining -= wave;
    }
    let wall_time = started.elapsed();

    let total: Duration = timings.iter().sum();
    let avg_latency = total / timings.len() as u32;
    timings.sort();
    let percentile = |p: f32| timings[((timings.len() as f32 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f64 / wall_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Helper function to format and print recommendations
fn print_recommendations(ranked: &[Recommendation<Item>], limit: usize, explain: bool) {
    println!("{}", "Recommendations:".bold().blue());
    for (rank, recommendation) in ranked.iter().enumerate() {
        let line = format!(
            "{}. {} - Score: {:.2}",
            rank + 1,
            recommendation.item(),
            recommendation.total()
        );
        // Entries past the limit were post-processed but not requested
        if rank < limit {
            println!("{}", line.green());
        } else {
            println!("{}", line.dimmed());
        }
        if explain {
            println!("   {}", recommendation.score());
        }
    }
}

fn print_statistics(statistics: &StatisticsSnapshot) {
    println!("{}", "Statistics:".bold().blue());
    println!("{}total: {:.2}ms", "• ".cyan(), statistics.total_time_ms);
    for (task, elapsed) in &statistics.timers_ms {
        println!("{}{}: {:.2}ms", "• ".cyan(), task, elapsed);
    }
    for (task, values) in &statistics.values {
        let values = values
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{}{}: {}", "• ".cyan(), task, values);
    }
}
