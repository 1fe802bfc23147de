//! muddle: multi-repository build orchestrator
//!
//! Loads a build description, then plans, queries or runs builds of labels
//! against its rules.

use anyhow::Result;
use clap::Parser;
use muddle::cli::{Cli, Commands};
use muddle::commands::CommandExecutor;
use muddle::config::load_ruleset;
use muddle::labels::label_list_to_string;
use muddle::output::{ExitCode, JsonDocument, JsonError, JsonOutput, OutputContext};
use muddle::storage::InMemoryTagStore;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MUDDLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Plan { .. } => "plan",
        Commands::RequiredBy { .. } => "required-by",
        Commands::Rules { .. } => "rules",
        Commands::Build { .. } => "build",
    }
}

fn print_json<T: Serialize>(output: &OutputContext, data: T, command: &str) -> Result<()> {
    output.print_json(&JsonOutput::success(data, command).to_json_string()?)?;
    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let output = OutputContext::new(cli.quiet, cli.json);
    let command = command_name(&cli.command);

    let exit_code = match run(cli, &output) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            let code = ExitCode::for_error(&e);
            if output.is_json() {
                match JsonError::from_error(&e, command).to_json_string() {
                    Ok(json) => {
                        let _ = output.print_json(&json);
                    }
                    Err(_) => {
                        let _ = output.print_error(format!("{:#}", e));
                    }
                }
            } else {
                let _ = output.print_error(format!("{:#}", e));
            }
            code
        }
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }
}

fn run(cli: Cli, output: &OutputContext) -> Result<()> {
    let ruleset = load_ruleset(&cli.description)?;
    let executor = CommandExecutor::new(ruleset, InMemoryTagStore::new());

    match cli.command {
        Commands::Plan { label, match_mode } => {
            let plan = executor.plan(&label, match_mode.into())?;
            if output.is_json() {
                return print_json(output, plan, "plan");
            }
            for step in &plan {
                output.print_data(&step.target)?;
            }
            output.print_info(format!("{} step(s)", plan.len()))?;
        }

        Commands::RequiredBy { label, match_mode } => {
            let labels = executor.required_by(&label, match_mode.into())?;
            if output.is_json() {
                return print_json(output, labels, "required-by");
            }
            if labels.is_empty() {
                output.print_info(format!("Nothing depends on {}", label))?;
            } else {
                output.print_data(label_list_to_string(&labels))?;
            }
        }

        Commands::Rules {
            label,
            show_system,
            ignore_empty,
        } => {
            if output.is_json() {
                let rules = executor.rules(label.as_deref(), show_system, ignore_empty)?;
                return print_json(output, rules, "rules");
            }
            let text = executor.rules_text(label.as_deref(), show_system, ignore_empty)?;
            output.print_data(text.trim_end())?;
        }

        Commands::Build {
            label,
            match_mode,
            just_print,
        } => {
            let report = executor.build(&label, match_mode.into(), just_print)?;
            if output.is_json() {
                return print_json(output, report, "build");
            }
            let verb = if just_print { "Would build" } else { "Built" };
            for built in &report.built {
                output.print_data(format!("{} {}", verb, built))?;
            }
            for skipped in &report.skipped {
                output.print_info(format!("Skipped {} (already built)", skipped))?;
            }
        }
    }

    Ok(())
}
