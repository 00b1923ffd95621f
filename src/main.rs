use clap::{Parser, Subcommand};
use lk_align::config::{load_config_or_default, Config};
use lk_align::logging::{init_logging, new_correlation_id, set_correlation_id};
use lk_align::utils::array_to_grayimage;
use lk_align::visualization::{print_comparison_table, print_results};
use lk_align::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "align")]
#[command(about = "Lucas-Kanade template alignment on image pyramids")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Align a template image to a target image
    Align {
        /// Path to the template image
        #[arg(short, long, required_unless_present = "crop")]
        template: Option<PathBuf>,

        /// Cut the template out of the target instead: x,y,width,height
        #[arg(long, value_delimiter = ',', num_args = 4, conflicts_with = "template")]
        crop: Option<Vec<usize>>,

        /// Path to the target image
        #[arg(short = 'T', long)]
        target: PathBuf,

        /// fa, fc or ic; defaults to the configured algorithm
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Motion model; defaults to the configured mode
        #[arg(short, long)]
        mode: Option<String>,

        /// Initial warp parameters, comma-separated
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
        initial: Option<Vec<f64>>,

        /// Output file for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Align a generated scene with a known ground truth
    Synthetic {
        /// Motion model; defaults to the configured scene
        #[arg(short, long)]
        mode: Option<String>,

        /// Random texture seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// fa, fc or ic; defaults to the configured algorithm
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Also write template.png and target.png here
        #[arg(long)]
        save_images: Option<PathBuf>,

        /// Output file for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare all algorithms on the same problem
    Compare {
        /// Path to the template image; a synthetic scene is used when omitted
        #[arg(short, long, requires = "target")]
        template: Option<PathBuf>,

        /// Path to the target image
        #[arg(short = 'T', long)]
        target: Option<PathBuf>,

        /// Initial warp parameters, comma-separated
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
        initial: Option<Vec<f64>>,

        /// Output file for comparison results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every algorithm on synthetic scenes of every motion model
    Benchmark {
        /// Number of seeds per motion model
        #[arg(short = 'n', long, default_value = "3")]
        count: u64,

        /// Output file for benchmark results
        #[arg(short, long, default_value = "results/benchmark.json")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config_or_default(cli.config.as_deref());

    let logging = config.logging.clone().with_verbosity(cli.verbose);
    let _guard = init_logging(&logging)?;
    set_correlation_id(new_correlation_id());
    let span = lk_align::correlation_span!(tracing::Level::INFO, "cli");
    let _enter = span.enter();

    match cli.command {
        Commands::Align { template, crop, target, algorithm, mode, initial, output } => {
            handle_align(&config, template, crop, target, algorithm, mode, initial, output)?;
        }
        Commands::Synthetic { mode, seed, algorithm, save_images, output } => {
            handle_synthetic(&config, mode, seed, algorithm, save_images, output)?;
        }
        Commands::Compare { template, target, initial, output } => {
            handle_compare(&config, template, target, initial, output)?;
        }
        Commands::Benchmark { count, output } => {
            handle_benchmark(&config, count, output)?;
        }
    }

    Ok(())
}

fn resolve_algorithm(config: &Config, algorithm: Option<String>) -> anyhow::Result<AlgorithmKind> {
    algorithm.map_or(Ok(config.alignment.algorithm), |a| a.parse())
}

fn resolve_initial(mode: WarpMode, initial: Option<Vec<f64>>) -> anyhow::Result<DynWarp> {
    match initial {
        Some(p) => DynWarp::from_parameters(mode, &p),
        None => Ok(DynWarp::identity(mode)),
    }
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    info!(path = %path.display(), "Results saved");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_align(
    config: &Config,
    template_path: Option<PathBuf>,
    crop: Option<Vec<usize>>,
    target_path: PathBuf,
    algorithm: Option<String>,
    mode: Option<String>,
    initial: Option<Vec<f64>>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let target = load_float_image(&target_path)?;
    let template = match (template_path, crop.as_deref()) {
        (Some(path), _) => load_float_image(&path)?,
        (None, Some(&[x, y, w, h])) => {
            info!(x, y, width = w, height = h, "Template cropped from target");
            PatchExtractor::extract_patch(&target, x, y, w, h)?
        }
        _ => return Err(anyhow::anyhow!("Either --template or --crop x,y,width,height is required")),
    };
    println!(
        "Template: {}x{}, Target: {}x{}",
        template.ncols(),
        template.nrows(),
        target.ncols(),
        target.nrows()
    );

    let kind = resolve_algorithm(config, algorithm)?;
    let mode = mode.map_or(Ok(config.alignment.mode), |m| m.parse())?;
    let initial = resolve_initial(mode, initial)?;

    let pipeline = AlignmentPipeline::from_config(config);
    let report = pipeline.run_with(kind, &template, &target, &initial)?;
    print_results(std::slice::from_ref(&report));

    if let Some(output_path) = output {
        write_json(&report, &output_path)?;
    }
    Ok(())
}

fn handle_synthetic(
    config: &Config,
    mode: Option<String>,
    seed: Option<u64>,
    algorithm: Option<String>,
    save_images: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut params = config.synthetic.clone();
    if let Some(m) = mode {
        params.mode = m.parse()?;
        params.ground_truth = None;
        params.perturbation = None;
    }
    if let Some(s) = seed {
        params.seed = s;
    }
    let scene = SyntheticScene::generate(&params)?;
    println!("Ground truth: {}", scene.ground_truth);

    if let Some(dir) = save_images {
        std::fs::create_dir_all(&dir)?;
        array_to_grayimage(&scene.template)?.save(dir.join("template.png"))?;
        array_to_grayimage(&scene.target)?.save(dir.join("target.png"))?;
        info!(dir = %dir.display(), "Scene images saved");
    }

    let kind = resolve_algorithm(config, algorithm)?;
    let mut pipeline_config = config.alignment.clone();
    pipeline_config.algorithm = kind;
    let pipeline = AlignmentPipeline::new(pipeline_config, config.pyramid.clone());
    let report = pipeline.run_against_ground_truth(
        &scene.template,
        &scene.target,
        &scene.initial,
        &scene.ground_truth,
    )?;
    print_results(std::slice::from_ref(&report));

    if let Some(output_path) = output {
        write_json(&report, &output_path)?;
    }
    Ok(())
}

fn handle_compare(
    config: &Config,
    template_path: Option<PathBuf>,
    target_path: Option<PathBuf>,
    initial: Option<Vec<f64>>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let pipeline = AlignmentPipeline::from_config(config);
    let reports = match (template_path, target_path) {
        (Some(t), Some(i)) => {
            let template = load_float_image(&t)?;
            let target = load_float_image(&i)?;
            let initial = resolve_initial(config.alignment.mode, initial)?;
            pipeline.compare(&template, &target, &initial, None)?
        }
        _ => {
            if initial.is_some() {
                warn!("Initial parameters are ignored for synthetic scenes");
            }
            let scene = SyntheticScene::generate(&config.synthetic)?;
            println!("Ground truth: {}", scene.ground_truth);
            pipeline.compare(
                &scene.template,
                &scene.target,
                &scene.initial,
                Some(&scene.ground_truth),
            )?
        }
    };

    print_comparison_table(&reports);

    if let Some(output_path) = output {
        write_json(&reports, &output_path)?;
    }
    Ok(())
}

fn handle_benchmark(config: &Config, count: u64, output: PathBuf) -> anyhow::Result<()> {
    let mut runner = BenchmarkRunner::new(AlignmentPipeline::from_config(config));
    for mode in WarpMode::ALL {
        for seed in 0..count {
            runner.add_scene(SyntheticParams {
                mode,
                seed: config.synthetic.seed.wrapping_add(seed),
                ground_truth: None,
                perturbation: None,
                ..config.synthetic.clone()
            });
        }
    }

    let reports = runner.run_benchmark()?;
    print_comparison_table(&reports);
    write_json(&reports, &output)
}
