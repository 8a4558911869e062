//! `triagent run` — Run one triage task from the terminal.

use triagent_config::AppConfig;
use triagent_core::{OutputKind, TaskId, TaskInput};
use triagent_governor::CancelHandle;

use crate::wiring::Pipeline;

pub async fn run(
    query: String,
    budget: Option<u32>,
    task_id: Option<String>,
    allowed: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    TRIAGENT_API_KEY      (generic)");
        eprintln!("    OPENROUTER_API_KEY");
        eprintln!("    OPENAI_API_KEY");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!(
            "    {}",
            AppConfig::config_dir().join("config.toml").display()
        );
        eprintln!();
        anyhow::bail!("no API key found");
    }

    let pipeline = Pipeline::from_config(&config).await?;
    let runner = pipeline.runner(&config);

    let input = TaskInput {
        query,
        step_budget: budget.unwrap_or(config.governor.step_budget),
        allowed_actions: if allowed.is_empty() {
            None
        } else {
            Some(allowed)
        },
        task_id: task_id.map(|id| TaskId::from(&id)),
    };

    let output = runner.run(input, &CancelHandle::new()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let kind = match output.kind {
        OutputKind::Answer => "answer",
        OutputKind::Clarification => "clarification",
        OutputKind::Escalation => "escalation",
    };

    println!();
    println!("{}", output.text);
    println!();
    println!("   Kind:        {kind}");
    if let Some(confidence) = output.confidence {
        println!("   Confidence:  {confidence:.2}");
    }
    println!("   Steps:       {}", output.diagnostics.iterations);
    if output.diagnostics.duplicate_calls > 0 {
        println!("   Duplicates:  {}", output.diagnostics.duplicate_calls);
    }
    if output.diagnostics.exhausted_budget {
        println!("   ⚠️  Step budget exhausted before convergence");
    }
    if let Some(e) = &output.diagnostics.last_error {
        println!("   Last error:  {e}");
    }
    println!();

    Ok(())
}
