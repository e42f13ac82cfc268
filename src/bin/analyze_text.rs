use fallacy_guard_lib::models::DetectionEvent;
use fallacy_guard_lib::services::config_store::{AppConfig, Dialect};
use fallacy_guard_lib::services::detection::FallacyDetector;
use fallacy_guard_lib::services::text_processor::log_excerpt;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let _ = dotenvy::dotenv();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  cargo run --bin analyze_text -- <text | @path.txt> [--base <url>] [--model <name>] [--openai] [--out <json_path>]\n\nNotes:\n  - Defaults come from LOCAL_API_BASE / LOCAL_MODEL_NAME / USE_OLLAMA and config.json.\n  - `--openai` switches to the /v1/chat/completions dialect."
        );
        return Ok(());
    }

    let input = args[1].clone();
    let text = match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|e| format!("read file failed: {}", e))?,
        None => input,
    };

    let mut config = AppConfig::load();
    if let Some(base) = parse_arg_value(&args, "--base") {
        config.api_base = base;
    }
    if let Some(model) = parse_arg_value(&args, "--model") {
        config.model_name = model;
    }
    if has_flag(&args, "--openai") {
        config.dialect = Dialect::OpenAiCompatible;
    }
    let out_path = parse_arg_value(&args, "--out");

    let detector = FallacyDetector::new(&config).map_err(|e| e.to_string())?;

    println!("Endpoint: {}", detector.endpoint());
    println!("Model: {} ({})", config.model_name, detector.dialect().as_str());
    println!("Input: {} chars  {}", text.chars().count(), log_excerpt(&text, 120));
    println!();

    if !detector.is_analyzable(&text) {
        println!(
            "Skipped: input shorter than {} characters",
            detector.min_text_chars()
        );
        return Ok(());
    }

    let outcome = detector.detect_or_degrade(&text).await;
    let degraded = outcome.is_degraded();
    if let Some(ref failure) = outcome.failure {
        println!("Detection failed: {}", failure);
    } else {
        println!(
            "has_fallacies={} confidence={} records={}",
            outcome.has_issues,
            outcome.overall_confidence,
            outcome.records.len()
        );
        for (i, r) in outcome.records.iter().enumerate() {
            println!(
                "[F{:02}] {} ({}) severity={} confidence={} span={:?}..{:?}  {}",
                i,
                r.kind,
                r.label,
                r.severity.as_str(),
                r.confidence,
                r.start_offset,
                r.end_offset,
                log_excerpt(&r.span_text, 80)
            );
        }
        if let Some(ref summary) = outcome.summary {
            println!();
            println!("Analysis: {}", summary);
        }
    }

    if let Some(out_path) = out_path {
        let event = DetectionEvent::from_outcome(&text, None, outcome);
        let json = serde_json::to_string_pretty(&event).map_err(|e| e.to_string())?;
        std::fs::write(&out_path, json).map_err(|e| format!("write out failed: {}", e))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    if degraded {
        return Err("detection failed".to_string());
    }
    Ok(())
}
