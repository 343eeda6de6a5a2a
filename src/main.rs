use std::path::PathBuf;
use std::thread;
use anyhow::Context;
use clap::Parser;
use log::{error, info};

use stain_quant_lib::{
    export, write_results_csv, BatchOutcome, BatchRunner, ChannelProgress, Config,
    FailurePolicy, ProgressEvent, RenderMode, ScratchArea,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "StainQuant - stained area quantification for microscopy images")]
struct Args {
    /// Folder containing .jpg, .png or .tif images
    #[clap(short, long)]
    input: Option<String>,

    /// Folder to export percentages.txt and result images to
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Scratch folder for result images (cleared on every run)
    #[clap(long)]
    scratch: Option<String>,

    /// Stop at the first image that cannot be quantified
    #[clap(long)]
    fail_fast: bool,

    /// Render only the stained pixels instead of the composite
    #[clap(long)]
    foreground_only: bool,

    /// Write the effective configuration to the config path and exit
    #[clap(long)]
    write_config: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = Config::load_or_default(&args.config)?;

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }
    if let Some(output) = args.output.clone() {
        config.output_dir = Some(output);
    }
    if let Some(scratch) = args.scratch.clone() {
        config.scratch_dir = Some(scratch);
    }
    if args.fail_fast {
        config.failure_policy = FailurePolicy::FailFast;
    }
    if args.foreground_only {
        config.render_mode = RenderMode::Foreground;
    }

    config.validate()?;

    if args.write_config {
        config.save_to_file(&args.config)?;
        info!("Configuration written to {}", args.config);
        return Ok(());
    }

    let scratch_path = config.scratch_path();
    let scratch = ScratchArea::open(&scratch_path)
        .with_context(|| format!("failed to prepare scratch folder {}", scratch_path.display()))?;

    let mut runner = BatchRunner::new(scratch)
        .with_policy(config.failure_policy)
        .with_render_mode(config.render_mode);

    let (sink, events) = ChannelProgress::bounded(config.progress_channel_capacity);
    let printer = thread::spawn(move || {
        let mut maximum = 0;
        for event in events {
            match event {
                ProgressEvent::Reset => maximum = 0,
                ProgressEvent::Maximum(m) => maximum = m,
                ProgressEvent::Value(v) => println!("[{}/{}]", v, maximum),
                ProgressEvent::Status(message) => eprintln!("{}", message),
            }
        }
    });

    let outcome = runner.run_batch(&config.input_path, &sink);
    drop(sink);
    if printer.join().is_err() {
        error!("Progress printer thread panicked");
    }

    let report = match outcome? {
        BatchOutcome::Rejected(_) => return Ok(()),
        BatchOutcome::Completed(report) => report,
    };

    for (name, percentage) in runner.results().table_rows() {
        println!("{}\t{}", name, percentage);
    }
    for failure in &report.failures {
        error!("{}: {}", failure.path.display(), failure.message);
    }

    if let Some(output) = &config.output_dir {
        let destination = PathBuf::from(output);
        let results = runner.results().as_slice();
        if results.is_empty() {
            error!("No results to export!");
            return Ok(());
        }

        export(results, &destination)
            .with_context(|| format!("failed to export results to {}", destination.display()))?;
        if config.write_csv_summary {
            write_results_csv(results, &destination)?;
        }
        info!("Results exported to {}", destination.display());
    }

    Ok(())
}
