use clap::Parser;
use colored::Colorize;
use databinding_step::{
    ExecutionContext, ProcessDataBindingStep, SourcePath, Step, StepCache, StepFingerprint, StepSettings,
};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// process-databinding - Strip Android data binding markup from layout resources
#[derive(Parser, Debug)]
#[command(name = "process-databinding")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Resource input: a directory or a build target output (//base/path:name)
    #[arg(long, value_name = "SOURCE")]
    res_in: Option<SourcePath>,

    /// Output directory for the rewritten resources
    #[arg(long, value_name = "DIR")]
    res_out: Option<PathBuf>,

    /// Output directory for layout info files and the class descriptor
    #[arg(long, value_name = "DIR")]
    info_out: Option<PathBuf>,

    /// Package of the generated binding classes (e.g., "com.example.app")
    #[arg(short, long)]
    package: Option<String>,

    /// Android SDK directory
    #[arg(long, value_name = "DIR")]
    sdk_dir: Option<PathBuf>,

    /// Project root that relative paths are resolved against
    #[arg(long, value_name = "DIR")]
    project_root: Option<PathBuf>,

    /// Build output directory for //target inputs, relative to the project root
    #[arg(long, value_name = "DIR")]
    gen_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip processing when configuration and inputs are unchanged since the last success
    #[arg(long)]
    incremental: bool,

    /// Custom fingerprint cache path (default: next to the info output dir)
    #[arg(long, value_name = "FILE")]
    cache_path: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("process-databinding v{}", env!("CARGO_PKG_VERSION"));

    let cwd = std::env::current_dir().into_diagnostic()?;
    let settings = load_settings(&cli, &cwd)?;
    let step = settings.build_step(&cwd)?;

    let code = run_step(&step, &settings, &cli)?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli, cwd: &Path) -> Result<StepSettings> {
    let root = cli
        .project_root
        .as_ref()
        .map(|root| cwd.join(root))
        .unwrap_or_else(|| cwd.to_path_buf());

    let mut settings = if let Some(config_path) = &cli.config {
        StepSettings::from_file(config_path)?
    } else {
        // Try to load from default locations
        StepSettings::from_default_locations(&root)?
    };

    // Override with CLI arguments
    settings.merge(StepSettings {
        project_root: cli.project_root.clone(),
        gen_dir: cli.gen_dir.clone(),
        resource_input: cli.res_in.clone(),
        resource_output_dir: cli.res_out.clone(),
        metadata_output_dir: cli.info_out.clone(),
        sdk_dir: cli.sdk_dir.clone(),
        package_name: cli.package.clone(),
        cache_path: cli.cache_path.clone(),
    });

    Ok(settings)
}

/// Run the step once, returning the process exit code
fn run_step(step: &ProcessDataBindingStep, settings: &StepSettings, cli: &Cli) -> Result<i32> {
    let context = ExecutionContext::new();
    info!("{}", step.description(&context));

    let cache_path = settings
        .cache_path
        .clone()
        .unwrap_or_else(|| StepCache::default_cache_path(step.metadata_output_dir()));

    let fingerprint = if cli.incremental {
        let input_dir = step.resolve_input_dir().into_diagnostic()?;
        let fingerprint = StepFingerprint::compute(step, &input_dir)
            .into_diagnostic()
            .wrap_err("Failed to fingerprint resource inputs")?;

        if let Ok(cache) = StepCache::load(&cache_path) {
            if cache.is_fresh(&fingerprint, step) {
                info!("Inputs unchanged ({} files), skipping", fingerprint.file_count);
                if !cli.quiet {
                    println!("{}", "✓ Data binding outputs are up to date".green());
                }
                return Ok(0);
            }
        }
        Some(fingerprint)
    } else {
        None
    };

    let result = step
        .execute(&context)
        .into_diagnostic()
        .wrap_err_with(|| format!("{} failed", step.short_name()))?;

    if !result.is_success() {
        eprintln!(
            "{}: {}",
            "Data binding processing failed".red(),
            result.message().unwrap_or("unknown error")
        );
        return Ok(result.exit_code());
    }

    if let Some(fingerprint) = fingerprint {
        if let Err(e) = StepCache::new(fingerprint).save(&cache_path) {
            warn!("Failed to save cache {}: {}", cache_path.display(), e);
        }
    }

    if !cli.quiet {
        println!(
            "{}",
            format!(
                "✓ Processed {} into {} and {}",
                step.resource_input(),
                step.resource_output_dir().display(),
                step.metadata_output_dir().display()
            )
            .green()
        );
    }

    Ok(result.exit_code())
}
