use anyhow::Context;
use clap::{Parser, Subcommand};
use log::warn;
use mdshot::{BatchItem, Converter, ConverterConfig, ImageFormat, RenderOptions};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "mdshot",
    version,
    about = "Convert markdown files to high-quality images"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a markdown file to an image
    Convert {
        /// Markdown input file
        input: PathBuf,
        /// Output image path (defaults to the input name with the format extension)
        output: Option<PathBuf>,
        /// Image width in pixels (200-3000)
        #[arg(short, long)]
        width: Option<u32>,
        /// Image format (png|jpeg|webp)
        #[arg(short, long)]
        format: Option<String>,
        /// Image quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,
        /// Theme (default|dark|minimal|local)
        #[arg(short, long)]
        theme: Option<String>,
        /// Custom CSS file appended after the theme stylesheet
        #[arg(long)]
        css: Option<PathBuf>,
        /// Pixel density (1.0-3.0)
        #[arg(long)]
        scale: Option<f64>,
        /// Pick settings from the document's content complexity
        #[arg(long)]
        smart: bool,
        /// Preset bundle (web|mobile|print|archive)
        #[arg(long)]
        preset: Option<String>,
    },
    /// Convert many markdown files into an output directory
    Batch {
        /// Markdown input files
        inputs: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
        #[arg(short, long)]
        width: Option<u32>,
        #[arg(short, long)]
        format: Option<String>,
        #[arg(short, long)]
        quality: Option<u8>,
        #[arg(short, long)]
        theme: Option<String>,
        #[arg(long)]
        css: Option<PathBuf>,
    },
    /// Show supported formats, themes, and presets
    Info,
}

fn load_custom_css(path: Option<&PathBuf>) -> Option<String> {
    let path = path?;
    match std::fs::read_to_string(path) {
        Ok(css) => Some(css),
        Err(e) => {
            warn!("failed to read CSS file {}: {e}", path.display());
            None
        }
    }
}

fn output_extension(format: Option<&str>) -> &'static str {
    format
        .and_then(ImageFormat::parse)
        .unwrap_or(ImageFormat::Webp)
        .extension()
}

fn run(converter: &Converter, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Convert {
            input,
            output,
            width,
            format,
            quality,
            theme,
            css,
            scale,
            smart,
            preset,
        } => {
            let output = output.unwrap_or_else(|| {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "output".to_string());
                PathBuf::from(format!("{stem}.{}", output_extension(format.as_deref())))
            });

            let options = RenderOptions {
                width,
                quality,
                theme,
                scale_factor: scale,
                custom_style: load_custom_css(css.as_ref()),
                preset,
                adaptive: smart,
                format,
            };

            let start = Instant::now();
            let result = converter
                .convert_file(&input, &output, &options)
                .with_context(|| format!("converting {}", input.display()))?;

            println!("wrote {}", result.output_path.display());
            println!(
                "{:.2} KB, {} @ {}px, {}ms",
                result.size as f64 / 1024.0,
                result.format,
                result.width,
                start.elapsed().as_millis()
            );
            Ok(())
        }
        Commands::Batch {
            inputs,
            output,
            width,
            format,
            quality,
            theme,
            css,
        } => {
            if inputs.is_empty() {
                println!("no input files given");
                return Ok(());
            }
            let custom_style = load_custom_css(css.as_ref());
            let extension = output_extension(format.as_deref());

            let items: Vec<BatchItem> = inputs
                .iter()
                .map(|input| {
                    let stem = input
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "output".to_string());
                    BatchItem {
                        input: input.clone(),
                        output: output.join(format!("{stem}.{extension}")),
                        options: RenderOptions {
                            width,
                            format: format.clone(),
                            quality,
                            theme: theme.clone(),
                            custom_style: custom_style.clone(),
                            ..Default::default()
                        },
                    }
                })
                .collect();

            let start = Instant::now();
            let records = converter.convert_all(&items);
            let succeeded = records.iter().filter(|r| r.success).count();
            let failed = records.len() - succeeded;

            println!(
                "batch finished: {succeeded} succeeded, {failed} failed, {}ms",
                start.elapsed().as_millis()
            );
            for record in records.iter().filter(|r| !r.success) {
                println!(
                    "  {}: {}",
                    record.input_path.display(),
                    record.error.as_deref().unwrap_or("unknown error")
                );
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} conversions failed", records.len());
            }
            Ok(())
        }
        Commands::Info => {
            println!("formats: png, jpeg, webp (default)");
            println!("themes:  default, dark, minimal, local");
            println!("presets:");
            for preset in [
                mdshot::Preset::Web,
                mdshot::Preset::Mobile,
                mdshot::Preset::Print,
                mdshot::Preset::Archive,
            ] {
                let b = preset.bundle();
                println!(
                    "  {:?}: quality {}, {} @ {}px x{} - {}",
                    preset, b.quality, b.format, b.width, b.scale_factor, b.rationale
                );
            }
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let converter = Converter::new(ConverterConfig::default());
    let result = run(&converter, cli.command);
    // Engine teardown runs on success and failure paths alike.
    converter.shutdown();
    result
}
