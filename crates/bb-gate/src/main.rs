use anyhow::Result;
use clap::Parser;

mod cli;
mod pipeline;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let project_root = std::env::current_dir()?;

    match cli.command {
        Commands::Gate { command } => {
            let outcome = pipeline::run_gate(&project_root, &command);
            print_decision(&outcome);
            std::process::exit(if outcome.decision.is_allowed() { 0 } else { 1 });
        }
        Commands::Record { command, output } => {
            // `record` is a post-execution side-effect: no policy decision,
            // just a scored insert into the store against the current
            // session.
            let outcome = pipeline::record_executed(&project_root, &command, &output);
            tracing::info!(risk_score = outcome.risk_score, "recorded");
        }
        Commands::SessionStart => {
            session_start(&project_root)?;
        }
        Commands::SessionEnd => {
            session_end(&project_root)?;
        }
        Commands::RecordPrompt { prompt } => {
            record_prompt(&project_root, &prompt)?;
        }
        Commands::RecordTool { name, input, output } => {
            record_tool(&project_root, &name, &input, &output)?;
        }
    }

    Ok(())
}

fn print_decision(outcome: &pipeline::GateOutcome) {
    match &outcome.decision {
        bb_core::Decision::Allow { risk_score } => {
            tracing::info!(risk_score = *risk_score, "allowed");
        }
        bb_core::Decision::Deny { violation, risk_score } => {
            let err = bb_core::BbError::Policy(format!("{} ({}; risk {risk_score}/10)", violation.message, violation.rule));
            eprintln!("blocked: {err}");
        }
    }
}

fn open_store() -> Result<bb_store::Store> {
    let path = bb_config::paths::store_path()
        .ok_or_else(|| bb_core::BbError::Misconfiguration("could not resolve the home directory for the store path".to_string()))?;
    bb_store::Store::open(&path).map_err(|err| bb_core::BbError::StoreUnavailable(err.to_string()).into())
}

fn current_agent(project_root: &std::path::Path) -> Option<String> {
    bb_config::config::load(project_root).agent
}

fn session_start(project_root: &std::path::Path) -> Result<()> {
    let store = open_store()?;
    let manager = bb_session::SessionManager::new(&store);
    let agent = current_agent(project_root).unwrap_or_else(|| "unknown".to_string());
    let pid = std::process::id();
    let cwd = project_root.display().to_string();
    let repo_name = project_root.file_name().and_then(|n| n.to_str());
    let id = manager.start(&agent, pid, &cwd, repo_name)?;
    println!("{id}");
    Ok(())
}

fn session_end(project_root: &std::path::Path) -> Result<()> {
    let store = open_store()?;
    let agent = current_agent(project_root);
    if let Some(session) = bb_session::find_running_session(&store, agent.as_deref())? {
        bb_session::SessionManager::attach(&store, &session.id)?.end()?;
    }
    Ok(())
}

fn record_prompt(project_root: &std::path::Path, prompt: &str) -> Result<()> {
    let store = open_store()?;
    let agent = current_agent(project_root);
    let session_id = bb_session::find_running_session(&store, agent.as_deref())?.map(|s| s.id);
    store.insert_user_prompt(&bb_store::NewUserPrompt {
        session_id,
        prompt: prompt.to_string(),
        original_length: prompt.chars().count() as i64,
        working_dir: project_root.display().to_string(),
    })?;
    Ok(())
}

fn record_tool(project_root: &std::path::Path, name: &str, input: &str, output: &str) -> Result<()> {
    let store = open_store()?;
    let agent = current_agent(project_root);
    let session_id = bb_session::find_running_session(&store, agent.as_deref())?.map(|s| s.id);
    store.insert_tool_use(&bb_store::NewToolUse {
        session_id,
        tool_name: name.to_string(),
        input: input.to_string(),
        output: output.to_string(),
        exit_code: None,
        success: None,
        working_dir: project_root.display().to_string(),
        repo_info: None,
    })?;
    Ok(())
}
