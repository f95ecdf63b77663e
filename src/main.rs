use anyhow::{Context, Result};
use clap::Parser;
use leakcheck::cli::{Cli, Command, OutputFormat};
use leakcheck::{classify_dump, IgnoreRule, IgnoreRules, ProcThreads, TaskSource};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run_dump(pid: Option<u32>, proc_root: PathBuf) -> Result<()> {
    let source = match pid {
        Some(pid) => ProcThreads::for_pid(pid),
        None => ProcThreads::current(),
    }
    .with_root(proc_root);

    let dump = source
        .dump()
        .with_context(|| format!("Failed to dump threads of PID {}", source.pid()))?;
    println!("{}", dump);
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dump from {}", path.display())),
        _ => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read dump from stdin")?;
            Ok(input)
        }
    }
}

fn run_classify(
    file: Option<PathBuf>,
    ignore: &[String],
    no_default_ignores: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut rules = if no_default_ignores {
        IgnoreRules::empty()
    } else {
        IgnoreRules::default()
    };
    for pattern in ignore {
        let rule = IgnoreRule::pattern(pattern)
            .with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
        rules.push(rule);
    }

    let dump = read_input(file.as_deref())?;
    let (tasks, errors) = classify_dump(&dump, &rules);
    tracing::debug!(tasks = tasks.len(), errors = errors.len(), "classified dump");

    match format {
        OutputFormat::Text => {
            for err in &errors {
                eprintln!("[leakcheck: {}]", err);
            }
            let records: Vec<&str> = tasks.iter().map(|t| t.stack.as_str()).collect();
            if !records.is_empty() {
                println!("{}", records.join("\n\n"));
            }
        }
        OutputFormat::Json => {
            let errors: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            let output = serde_json::json!({ "tasks": tasks, "errors": errors });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize JSON")?
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    match args.command {
        Command::Dump { pid, proc_root } => run_dump(pid, proc_root),
        Command::Classify {
            file,
            ignore,
            no_default_ignores,
            format,
        } => run_classify(file, &ignore, no_default_ignores, format),
    }
}
