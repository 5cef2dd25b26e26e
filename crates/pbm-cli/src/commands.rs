use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use pbm_binsec::BinarySection;
use pbm_import::ImportPlan;
use pbm_order::{plan_sources, LibraryOrder, PlannedSource, Target};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Binsec(args) => cmd_binsec(args, format),
        Command::Order(args) => cmd_order(args, format),
        Command::SortLibs(args) => cmd_sort_libs(args, format),
        Command::Target(args) => cmd_target(args, format),
        Command::Plan(args) => cmd_plan(args, format),
    }
}

#[derive(Serialize)]
struct SourceEntry {
    path: PathBuf,
    sidecar: Option<PathBuf>,
}

impl From<PlannedSource> for SourceEntry {
    fn from(s: PlannedSource) -> Self {
        Self { path: s.path, sidecar: s.sidecar }
    }
}

#[derive(Serialize)]
struct JobEntry {
    container: PathBuf,
    source_dir: PathBuf,
    reserved: bool,
    sources: Vec<SourceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct PlanSummary {
    target: PathBuf,
    workers: usize,
    min_iterations: usize,
    jobs: Vec<JobEntry>,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_binsec(args: BinsecArgs, format: OutputFormat) -> anyhow::Result<()> {
    let section = BinarySection::from_file(&args.sidecar)
        .with_context(|| format!("encoding {}", args.sidecar.display()))?;
    let text = section.render();

    match &args.output {
        Some(out) => {
            std::fs::write(out, &text).with_context(|| format!("writing {}", out.display()))?;
            if format == OutputFormat::Json {
                return print_json(&serde_json::json!({
                    "sidecar": section.sidecar_name,
                    "chunks": section.chunk_count(),
                    "output": out,
                }));
            }
            println!(
                "{} {} -> {} ({} chunks)",
                "✓".green().bold(),
                section.sidecar_name,
                out.display(),
                section.chunk_count()
            );
        }
        None if format == OutputFormat::Json => {
            print_json(&serde_json::json!({
                "sidecar": section.sidecar_name,
                "chunks": section.chunk_count(),
                "section": text,
            }))?;
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_order(args: OrderArgs, format: OutputFormat) -> anyhow::Result<()> {
    let plan = plan_sources(&args.dir, &args.sidecar_ext)
        .with_context(|| format!("reading {}", args.dir.display()))?;
    debug!(dir = %args.dir.display(), sources = plan.len(), "planned import order");

    if format == OutputFormat::Json {
        let entries: Vec<SourceEntry> = plan.into_iter().map(SourceEntry::from).collect();
        return print_json(&entries);
    }

    println!("{} {}", "Import order:".bold(), args.dir.display());
    print_sources(&plan);
    Ok(())
}

fn print_sources(plan: &[PlannedSource]) {
    if plan.is_empty() {
        println!("  {}", "(no sources)".dimmed());
    }
    for (i, source) in plan.iter().enumerate() {
        let marker = match &source.sidecar {
            Some(sidecar) => format!(" + {}", file_name(sidecar)).cyan().to_string(),
            None => String::new(),
        };
        println!("  {:>3}. {}{}", i + 1, source.file_name(), marker);
    }
}

fn cmd_sort_libs(args: SortLibsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let order = LibraryOrder::default();
    let sorted = order.sorted(args.names);
    debug!(libraries = sorted.len(), "sorted libraries");

    if format == OutputFormat::Json {
        return print_json(&sorted);
    }
    for name in &sorted {
        let (base, _) = pbm_order::parse_name(name);
        println!("{:>3}  {}", order.priority(base).to_string().dimmed(), name);
    }
    Ok(())
}

fn cmd_target(args: TargetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let target = Target::new(args.app, args.app_lib, args.libs);
    debug!(app = %target.app_name, libraries = target.libs.len(), "rendering target");

    match &args.output {
        Some(out) => {
            target
                .write(out)
                .with_context(|| format!("writing {}", out.display()))?;
            if format == OutputFormat::Json {
                return print_json(&serde_json::json!({ "output": out, "app": target.app_name }));
            }
            println!("{} Target written to {}", "✓".green().bold(), out.display());
        }
        None if format == OutputFormat::Json => {
            print_json(&serde_json::json!({ "app": target.app_name, "target": target.render() }))?;
        }
        None => println!("{}", target.render()),
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs, format: OutputFormat) -> anyhow::Result<()> {
    let plan = ImportPlan::load(&args.plan)
        .with_context(|| format!("loading {}", args.plan.display()))?;
    plan.config.validate()?;
    debug!(plan = %args.plan.display(), jobs = plan.jobs.len(), "plan loaded");

    let jobs: Vec<JobEntry> = plan
        .jobs
        .iter()
        .map(|job| {
            let reserved = plan.config.is_reserved(&job.container);
            let (sources, error) = if reserved {
                (Vec::new(), None)
            } else {
                match plan_sources(&job.source_dir, &plan.config.sidecar_extension) {
                    Ok(sources) => (sources.into_iter().map(SourceEntry::from).collect(), None),
                    Err(e) => (Vec::new(), Some(e.to_string())),
                }
            };
            JobEntry {
                container: job.container.as_path().to_path_buf(),
                source_dir: job.source_dir.clone(),
                reserved,
                sources,
                error,
            }
        })
        .collect();

    let summary = PlanSummary {
        target: plan.target.clone(),
        workers: plan.config.workers,
        min_iterations: plan.config.min_iterations,
        jobs,
    };
    if format == OutputFormat::Json {
        return print_json(&summary);
    }

    println!("{} {}", "Target:".bold(), summary.target.display());
    println!(
        "  {} workers, at least {} iterations, {} containers",
        summary.workers,
        summary.min_iterations,
        summary.jobs.len()
    );
    for job in &summary.jobs {
        println!();
        println!("{} {}", "Container:".bold(), job.container.display());
        if job.reserved {
            println!("  {}", "substituted from bundled resource".yellow());
            continue;
        }
        if let Some(error) = &job.error {
            println!("  {} {}", "✗".red().bold(), error);
            continue;
        }
        if job.sources.is_empty() {
            println!("  {}", "(no sources)".dimmed());
        }
        for (i, source) in job.sources.iter().enumerate() {
            let marker = match &source.sidecar {
                Some(sidecar) => format!(" + {}", file_name(sidecar)).cyan().to_string(),
                None => String::new(),
            };
            println!("  {:>3}. {}{}", i + 1, file_name(&source.path), marker);
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
