use anyhow::{Context, Result};
use clap::Parser;
use escoffier_eval::cli::{self, Args, Command, PlaygroundConfig};
use escoffier_eval::eval::{
    self, EvaluationMode, EvaluationResult, EvaluationStrategy, Evaluator, ModelCatalog,
    ScenarioCatalog, SyntheticEvaluation, TraceEvaluation,
};
use escoffier_eval::monitoring::{MetricsCollector, Monitor};
use escoffier_eval::web::{self, AppState};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = PlaygroundConfig::load_or_default(args.config.as_deref())?;

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        config
            .log_level
            .parse::<Level>()
            .with_context(|| format!("Invalid log_level: {}", config.log_level))?
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match args.command {
        Command::Serve(serve_args) => {
            serve(config, serve_args).await?;
        }
        Command::Evaluate(evaluate_args) => {
            evaluate_once(config, evaluate_args).await?;
        }
        Command::Models => {
            list_models();
        }
        Command::Scenarios => {
            list_scenarios();
        }
        Command::Init(init_args) => {
            generate_sample_config(init_args)?;
        }
    }

    Ok(())
}

fn build_evaluator(
    config: &PlaygroundConfig,
    mode: EvaluationMode,
    collector: Arc<MetricsCollector>,
) -> Evaluator {
    let settings = &config.evaluation;
    let strategy: Arc<dyn EvaluationStrategy> = match mode {
        EvaluationMode::Synthetic => Arc::new(SyntheticEvaluation::new(
            settings.simulated_delay(),
            settings.event_count,
            settings.seed,
        )),
        EvaluationMode::Trace => Arc::new(TraceEvaluation::new(
            settings.traces_dir.clone(),
            collector,
        )),
    };

    Evaluator::new(Arc::new(ScenarioCatalog::builtin()), strategy)
}

async fn serve(mut config: PlaygroundConfig, args: cli::ServeArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    let collector =
        Arc::new(MetricsCollector::new().context("Failed to register kitchen metrics")?);
    let evaluator = build_evaluator(&config, config.evaluation.mode, collector.clone());
    info!("Evaluations run in {} mode", evaluator.mode());

    let state = Arc::new(AppState::new(
        Arc::new(ModelCatalog::builtin()),
        Arc::new(evaluator),
        Arc::new(Monitor::new()),
        collector,
        config.transport.clone(),
    ));

    println!("\nESCOFFIER-EVAL playground");
    println!("  API:       http://{}:{}/api", config.server.host, config.server.port);
    println!("  WebSocket: ws://{}:{}/ws", config.server.host, config.server.port);
    if config.metrics.enabled {
        println!(
            "  Metrics:   http://{}:{}{}",
            config.server.host, config.server.port, config.metrics.path
        );
    }
    println!("  Press Ctrl+C to stop the server\n");

    web::start_server(state, &config.server, &config.metrics).await
}

async fn evaluate_once(mut config: PlaygroundConfig, args: cli::EvaluateArgs) -> Result<()> {
    let models = ModelCatalog::builtin();
    if !models.contains(&args.model) {
        anyhow::bail!(eval::EvalError::UnknownModel(args.model));
    }

    let mode = if args.trace {
        EvaluationMode::Trace
    } else {
        config.evaluation.mode
    };
    // No one is waiting on a UI from the command line
    config.evaluation.simulated_delay_ms = 0;

    let collector = Arc::new(MetricsCollector::new()?);
    let evaluator = build_evaluator(&config, mode, collector.clone());
    let result = evaluator.evaluate_model(&args.model, &args.scenario).await?;

    print_result(&result);

    if let Some(output_dir) = args.output {
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {:?}", output_dir))?;

        let json_path = output_dir.join(format!("{}.json", result.run_id));
        result.save_json(&json_path)?;
        let report_path = output_dir.join(format!("{}_report.md", result.run_id));
        std::fs::write(&report_path, result.generate_report())?;
        if mode == EvaluationMode::Trace {
            let metrics_path = output_dir.join(format!("{}_metrics.prom", result.run_id));
            std::fs::write(&metrics_path, collector.render()?)?;
        }

        println!("\nResults saved to: {:?}", output_dir);
    }

    Ok(())
}

fn print_result(result: &EvaluationResult) {
    println!("\n{}", "=".repeat(60));
    println!("EVALUATION COMPLETE: {} on {}", result.model, result.scenario);
    println!("{}", "=".repeat(60));
    println!("  Mode: {}", result.mode);
    println!("  Events: {}", result.events.len());
    println!("\nMetrics:");
    for (name, value) in &result.metrics {
        println!("  {:<28} {:.3}", name, value);
    }
}

fn list_models() {
    println!("Available models:");
    for model in ModelCatalog::builtin().list() {
        println!(
            "  - {:<8} {} ({}, {} tokens)",
            model.id, model.name, model.provider, model.max_tokens
        );
    }
}

fn list_scenarios() {
    println!("Available scenarios:");
    for scenario in ScenarioCatalog::builtin().iter() {
        println!(
            "  - {:<16} [{}] difficulty {}/5, {} min",
            scenario.id,
            scenario.kind,
            scenario.difficulty,
            scenario.duration.as_secs() / 60
        );
        println!("      {}", scenario.description);
        for task in &scenario.tasks {
            println!("      task: {}", task.description);
        }
        for (target, value) in &scenario.metrics {
            println!("      target {}: {}", target, value);
        }
    }
}

fn generate_sample_config(args: cli::InitArgs) -> Result<()> {
    let config = PlaygroundConfig::sample();

    config.save(&args.output)?;
    println!("Generated sample config at: {:?}", args.output);

    Ok(())
}
