//! DeepLeaf CLI
//!
//! Diagnoses leaf photographs from the command line: single files or whole
//! directories, the crop health assessment, and the crop-specificity check.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;
use walkdir::WalkDir;

use deepleaf::backend::backend_name;
use deepleaf::diagnosis::parse_label;
use deepleaf::utils::logging::{init_logging, LogConfig};
use deepleaf::{
    ClassMap, CropContext, DeepLeafConfig, DiagnosisEngine, DiagnosisRequest, DiagnosisResult,
    Soil, Weather,
};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "webp", "tiff"];

/// DeepLeaf crop-leaf health diagnosis
///
/// Runs the two-stage health gate around a trained classifier and falls back
/// to color heuristics when the model is missing or unsure.
#[derive(Parser, Debug)]
#[command(name = "deepleaf")]
#[command(version)]
#[command(about = "Crop-leaf health diagnosis with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging (gate scores, fallback reasons)
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, default_value = "false", conflicts_with = "verbose")]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DEEPLEAF_LOG")]
    log_level: Option<String>,

    /// Plain log output without ANSI colors
    #[arg(long, default_value = "false")]
    no_color: bool,

    #[command(flatten)]
    models: ModelArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Directory holding the model artifacts
    #[arg(long, global = true, env = "DEEPLEAF_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Disease classifier weights
    #[arg(long, global = true, env = "DEEPLEAF_MODEL_PATH")]
    model_path: Option<PathBuf>,

    /// Class index to label JSON map
    #[arg(long, global = true, env = "DEEPLEAF_CLASSES_PATH")]
    classes_path: Option<PathBuf>,

    /// Crop health model weights
    #[arg(long, global = true, env = "DEEPLEAF_HEALTH_MODEL_PATH")]
    health_model_path: Option<PathBuf>,

    /// Version string reported on model-backed results
    #[arg(long, global = true, env = "DEEPLEAF_MODEL_VERSION")]
    model_version: Option<String>,
}

impl ModelArgs {
    fn to_config(&self) -> Result<DeepLeafConfig> {
        let mut config = match &self.models_dir {
            Some(dir) => DeepLeafConfig::with_models_dir(dir),
            None => DeepLeafConfig::default(),
        };
        if let Some(path) = &self.model_path {
            config.model_path = path.clone();
        }
        if let Some(path) = &self.classes_path {
            config.classes_path = path.clone();
        }
        if let Some(path) = &self.health_model_path {
            config.health_model_path = path.clone();
        }
        if let Some(version) = &self.model_version {
            config.model_version = version.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct ContextArgs {
    /// Declared crop type (e.g. Tomato, Maize, Paddy)
    #[arg(long)]
    crop_type: Option<String>,

    /// Growth stage (Seedling, Vegetative, Flowering, Fruiting / Grain Filling)
    #[arg(long)]
    crop_stage: Option<String>,

    /// Air temperature in °C
    #[arg(long)]
    temp: Option<f64>,

    /// Relative humidity in %
    #[arg(long)]
    humidity: Option<f64>,

    /// Rainfall in mm
    #[arg(long)]
    rain: Option<f64>,

    /// Soil pH
    #[arg(long)]
    ph: Option<f64>,

    /// Soil moisture in %
    #[arg(long)]
    moisture: Option<f64>,
}

impl ContextArgs {
    fn to_context(&self) -> CropContext {
        let weather = (self.temp.is_some() || self.humidity.is_some() || self.rain.is_some()).then(|| {
            let defaults = Weather::default();
            Weather {
                temp: self.temp.unwrap_or(defaults.temp),
                humidity: self.humidity.unwrap_or(defaults.humidity),
                rain: self.rain.unwrap_or(defaults.rain),
            }
        });
        let soil = (self.ph.is_some() || self.moisture.is_some()).then(|| {
            let defaults = Soil::default();
            Soil {
                ph: self.ph.unwrap_or(defaults.ph),
                moisture: self.moisture.unwrap_or(defaults.moisture),
            }
        });

        CropContext {
            crop_type: self.crop_type.clone(),
            crop_stage: self.crop_stage.clone(),
            weather,
            soil,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diagnose a leaf image or every image under a directory
    Diagnose {
        /// Path to input image or directory
        input: PathBuf,

        #[command(flatten)]
        context: ContextArgs,

        /// Print results as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Assess crop health with the multi-head health model
    Assess {
        /// Path to input image
        input: PathBuf,

        #[command(flatten)]
        context: ContextArgs,

        /// Print the assessment as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Check that different crops yield different health outcomes
    Specificity {
        /// Image to assess (a synthetic green leaf when omitted)
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Comma-separated crops to compare
        #[arg(long, value_delimiter = ',')]
        crops: Vec<String>,

        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the classifier's classes with their parsed labels
    Classes {
        /// Show the built-in PlantVillage labels instead of the configured map
        #[arg(long, default_value = "false")]
        builtin: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_flags(cli.verbose, cli.quiet, cli.log_level.as_deref());
    if cli.no_color {
        log_config = log_config.without_ansi();
    }

    let _ = init_logging(&log_config);

    let config = cli.models.to_config()?;

    match cli.command {
        Commands::Diagnose {
            input,
            context,
            json,
        } => {
            if !json {
                print_banner();
            }
            cmd_diagnose(config, &input, &context, json)?;
        }

        Commands::Assess {
            input,
            context,
            json,
        } => {
            if !json {
                print_banner();
            }
            cmd_assess(config, &input, &context, json)?;
        }

        Commands::Specificity { image, crops, json } => {
            if !json {
                print_banner();
            }
            cmd_specificity(config, image.as_deref(), &crops, json)?;
        }

        Commands::Classes { builtin } => {
            cmd_classes(&config, builtin)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════════╗
 ║   🌱 DeepLeaf                                                ║
 ║   Crop-Leaf Health Diagnosis with Burn + Rust                ║
 ╚══════════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn collect_images(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }

    let mut images: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| is_image(path))
        .collect();
    images.sort();
    images
}

fn read_image(path: &Path) -> Result<image::RgbImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(deepleaf::decode_image(&bytes)?)
}

fn cmd_diagnose(config: DeepLeafConfig, input: &Path, context: &ContextArgs, json: bool) -> Result<()> {
    if !input.exists() {
        bail!("Input path not found: {}", input.display());
    }

    let images = collect_images(input);
    if images.is_empty() {
        bail!("No images found under {}", input.display());
    }

    info!(images = images.len(), input = %input.display(), "Diagnosing");
    if !json {
        println!("{}", "Diagnosis Configuration:".cyan().bold());
        println!("  📷 Input:   {} ({} image(s))", input.display(), images.len());
        println!("  🧠 Model:   {}", config.model_path.display());
        println!("  🏷️  Classes: {}", config.classes_path.display());
        println!("  🖥️  Backend: {}", backend_name());
        println!();
    }

    let engine = DiagnosisEngine::from_config(config);
    let base_context = context.to_context();

    let pb = ProgressBar::new(images.len() as u64);
    if json || images.len() == 1 {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let failures = AtomicUsize::new(0);
    let results: Vec<(PathBuf, DiagnosisResult)> = images
        .par_iter()
        .filter_map(|path| {
            let request = DiagnosisRequest {
                context: base_context.clone(),
                file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            };
            let outcome = std::fs::read(path)
                .map_err(deepleaf::DeepLeafError::from)
                .and_then(|bytes| engine.diagnose_bytes(&bytes, &request));
            pb.inc(1);
            match outcome {
                Ok(result) => Some((path.clone(), result)),
                Err(e) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(path = %path.display(), error = %e, "Skipping image");
                    None
                }
            }
        })
        .collect();
    pb.finish_and_clear();

    if json {
        let entries: Vec<serde_json::Value> = results
            .iter()
            .map(|(path, result)| {
                serde_json::json!({
                    "file": path.display().to_string(),
                    "result": result,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (path, result) in &results {
        print_result(path, result);
    }

    let healthy = results.iter().filter(|(_, r)| r.is_healthy()).count();
    let fallback = results.iter().filter(|(_, r)| r.is_fallback()).count();
    let alerts = results.iter().filter(|(_, r)| r.alert).count();
    println!("{}", "Summary:".cyan().bold());
    println!("  ✅ Healthy:    {}", healthy);
    println!("  ⚠️  Unhealthy:  {}", results.len() - healthy);
    println!("  🚨 Alerts:     {}", alerts);
    println!("  🔁 Heuristic:  {}", fallback);
    let failed = failures.load(Ordering::Relaxed);
    if failed > 0 {
        println!("  {} Unreadable: {}", "❌".red(), failed);
    }

    Ok(())
}

fn print_result(path: &Path, result: &DiagnosisResult) {
    let status = if result.is_healthy() {
        result.health_status.to_string().green().bold()
    } else {
        result.health_status.to_string().red().bold()
    };
    println!("{} {}", "📄".dimmed(), path.display().to_string().bold());
    println!("  Status:     {}", status);
    println!("  Prediction: {}", result.prediction);
    println!("  Confidence: {:.2}%{}", result.confidence, if result.alert { " 🚨" } else { "" });
    println!("  Crop:       {}", result.crop_type.as_deref().unwrap_or("unknown"));
    println!("  Source:     {}", result.model_version.dimmed());
    println!("  Cause:      {}", result.cause);
    println!("  Treatment:  {}", result.suggestions);
    println!("  Prevention: {}", result.prevention);
    if !result.note.is_empty() {
        println!("  Note:       {}", result.note.yellow());
    }
    println!();
}

fn cmd_assess(config: DeepLeafConfig, input: &Path, context: &ContextArgs, json: bool) -> Result<()> {
    let image = read_image(input)?;
    let engine = DiagnosisEngine::from_config(config);
    let context = context.to_context();

    let assessment = engine
        .assess(&image, &context)
        .context("Crop health assessment needs the health model")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    println!("{}", "Crop Health Assessment:".cyan().bold());
    println!("  🌾 Crop:       {}", context.crop_label());
    println!("  🩺 Status:     {}", assessment.health_status.as_str().bold());
    println!("  📊 Confidence: {:.1}%", assessment.confidence);
    let [healthy, moderate, critical] = assessment.probabilities;
    println!(
        "  Probabilities: healthy {:.3} | moderate {:.3} | critical {:.3}",
        healthy, moderate, critical
    );
    println!();

    if !assessment.issues.is_empty() {
        println!("{}", "Issues:".yellow().bold());
        for issue in &assessment.issues {
            println!("  - [{:?}] {}", issue.severity, issue.description);
        }
        println!();
    }

    println!("{}", "Recommendations:".green().bold());
    for recommendation in &assessment.recommendations {
        println!("  - {}", recommendation);
    }

    Ok(())
}

fn cmd_specificity(config: DeepLeafConfig, image: Option<&Path>, crops: &[String], json: bool) -> Result<()> {
    let engine = DiagnosisEngine::from_config(config);
    let image = image.map(read_image).transpose()?;
    let crops: Vec<&str> = crops.iter().map(String::as_str).collect();

    let report = engine
        .validate_specificity(image.as_ref(), &crops)
        .context("Crop-specificity validation needs the health model")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Crop Predictions:".cyan().bold());
    println!("  {:12} {:>8} {:>9} {:>9} {:>6}", "crop", "healthy", "moderate", "critical", "class");
    for p in &report.crop_predictions {
        println!(
            "  {:12} {:>8.3} {:>9.3} {:>9.3} {:>6}",
            p.crop, p.healthy, p.moderate, p.critical, p.predicted_class
        );
    }
    println!();
    println!(
        "  Variance: healthy {:.4} | moderate {:.4} | critical {:.4}",
        report.variance.healthy, report.variance.moderate, report.variance.critical
    );
    println!("  Unique classes: {}", report.unique_classes);

    if report.is_crop_specific {
        println!("  {} Predictions differ across crops", "✅".green());
    } else {
        println!("  {} Predictions are identical across crops", "❌".red());
    }

    Ok(())
}

fn cmd_classes(config: &DeepLeafConfig, builtin: bool) -> Result<()> {
    let class_map = if builtin {
        ClassMap::plantvillage()
    } else {
        ClassMap::load(&config.classes_path)
            .with_context(|| format!("Failed to load class map {}", config.classes_path.display()))?
    };

    println!("{} ({} classes)", "Class Map:".cyan().bold(), class_map.len());
    for (index, label) in class_map.iter() {
        let parsed = parse_label(label);
        let crop = parsed.crop_type.as_deref().unwrap_or("-");
        let marker = if parsed.is_healthy { "✅" } else { "🦠" };
        println!(
            "  {:>3} {} {:45} {:10} {}",
            index, marker, label, crop, parsed.display_name
        );
    }

    Ok(())
}
