use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use env_logger::{Env, TimestampPrecision};
use geo::{
    ArrayNum, RasterReader, RasterSize, dispatch_data_type,
    raster::{GdalRasterReader, GdalRasterWriter, GdalWriteOptions},
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use inf::progressinfo::{CallbackProgress, ComputationStatus, ProgressNotification};
use tiler::{EngineOptions, FocalOptions, MaskTransform, OccurrenceAccumulator, PassSummary, Reducer, RescaleTransform, TileEngine};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser, Debug)]
#[clap(name = "focalstat", about = "Tiled raster processing: focal statistics, masks, value substitution and probabilities")]
struct Opt {
    #[command(subcommand)]
    command: Commands,

    #[arg(long = "tile-size", global = true, default_value = "256", help = "Width and height of the processing tiles")]
    tile_size: usize,

    #[arg(long = "threads", global = true, help = "Number of worker threads (default: available cores)")]
    threads: Option<usize>,

    #[arg(long = "noprogress", global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Moving window statistic, nodata cells are ignored")]
    Focal {
        input: PathBuf,
        output: PathBuf,
        #[arg(help = "Odd window size")]
        kernel_size: usize,
        #[arg(value_name = "mean|median|min|max|sum|range|variance|std|majority|minority|unique_count")]
        stat: Reducer,
        #[arg(long = "nodata", default_value = "-9999", allow_negative_numbers = true, help = "Output nodata value")]
        nodata: f64,
    },
    #[command(about = "Byte mask with 1 for valid cells and 0 for nodata (the type limits when the input has no nodata)")]
    Mask {
        input: PathBuf,
        #[arg(long = "mask", help = "Output path (default: <input>_mask.tif)")]
        output: Option<PathBuf>,
    },
    #[command(name = "to8bit", about = "Stretch the value range of the input linearly onto an 8 bit raster")]
    To8bit { input: PathBuf, output: PathBuf },
    #[command(about = "Replace a value in the source raster with the cells of a reference raster")]
    Replace {
        source: PathBuf,
        reference: PathBuf,
        output: PathBuf,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    #[command(about = "Fraction of the input rasters in which a cell holds the phenomenon value")]
    Probability {
        output: PathBuf,
        #[arg(allow_negative_numbers = true)]
        value: f64,
        #[arg(required = true, help = "Input rasters or directories containing .tif files")]
        inputs: Vec<PathBuf>,
    },
}

/// Shared state of a single command invocation
struct Runner {
    engine: TileEngine,
    write_options: GdalWriteOptions,
}

fn focal<T: ArrayNum>(
    runner: &Runner,
    input: &GdalRasterReader,
    output: &Path,
    options: &FocalOptions,
    progress: &impl ProgressNotification,
) -> Result<PassSummary> {
    let mut writer = GdalRasterWriter::create(output, options.output_descriptor(input.descriptor()), &runner.write_options)?;
    Ok(tiler::focal_statistics::<T>(&runner.engine, input, &mut writer, options, progress)?)
}

fn mask<T: ArrayNum>(runner: &Runner, input: &GdalRasterReader, output: &Path, progress: &impl ProgressNotification) -> Result<PassSummary> {
    let mut writer = GdalRasterWriter::create(output, MaskTransform::output_descriptor(input.descriptor()), &runner.write_options)?;
    Ok(tiler::create_mask::<T>(&runner.engine, input, &mut writer, progress)?)
}

fn to_8bit<T: ArrayNum>(runner: &Runner, input: &GdalRasterReader, output: &Path, progress: &impl ProgressNotification) -> Result<PassSummary> {
    let mut writer = GdalRasterWriter::create(output, RescaleTransform::output_descriptor(input.descriptor()), &runner.write_options)?;
    Ok(tiler::convert_to_8bit::<T>(&runner.engine, input, &mut writer, progress)?)
}

fn replace<T: ArrayNum>(
    runner: &Runner,
    source: &GdalRasterReader,
    reference: &GdalRasterReader,
    value: f64,
    output: &Path,
    progress: &impl ProgressNotification,
) -> Result<PassSummary> {
    let mut writer = GdalRasterWriter::create(output, source.descriptor().clone(), &runner.write_options)?;
    Ok(tiler::substitute_values::<T>(&runner.engine, source, reference, value, &mut writer, progress)?)
}

fn probability<T: ArrayNum>(
    runner: &Runner,
    inputs: &[GdalRasterReader],
    value: f64,
    output: &Path,
    progress: &impl ProgressNotification,
) -> Result<usize> {
    let Some(first) = inputs.first() else {
        bail!("No input rasters found");
    };

    let mut writer = GdalRasterWriter::create(output, OccurrenceAccumulator::output_descriptor(first.descriptor()), &runner.write_options)?;
    Ok(tiler::probability_of_phenomenon::<T, _>(&runner.engine, inputs, value, &mut writer, progress)?)
}

fn default_mask_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    input.with_file_name(format!("{stem}_mask.tif"))
}

/// Directories expand to the `.tif` files they contain, in name order
fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut tifs = std::fs::read_dir(input)
                .with_context(|| format!("Failed to list directory {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("tif")))
                .collect::<Vec<_>>();
            tifs.sort();
            paths.extend(tifs);
        } else {
            paths.push(input.clone());
        }
    }

    Ok(paths)
}

fn open(path: &Path) -> Result<GdalRasterReader> {
    GdalRasterReader::open(path).with_context(|| format!("Failed to open raster {}", path.display()))
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    let logger = env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .build();

    let multi = MultiProgress::new();
    let level = logger.filter();
    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(level);

    let progress_bar = if opt.no_progress {
        ProgressBar::hidden()
    } else {
        multi.add(ProgressBar::new(0))
    };
    progress_bar.set_style(ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} tiles ({eta})")?);

    let pb = progress_bar.clone();
    let progress = CallbackProgress::with_cb(move |done, total| {
        pb.set_length(total);
        pb.set_position(done);
        ComputationStatus::Continue
    });

    let mut engine_options = EngineOptions::default().with_tile_size(RasterSize::square(opt.tile_size));
    if let Some(threads) = opt.threads {
        engine_options = engine_options.with_worker_count(threads);
    }

    let runner = Runner {
        engine: TileEngine::new(engine_options)?,
        write_options: GdalWriteOptions {
            // GeoTIFF blocks must be a multiple of 16
            tiled: opt.tile_size % 16 == 0,
            block_size: engine_options.tile_size,
            ..Default::default()
        },
    };

    match opt.command {
        Commands::Focal {
            input,
            output,
            kernel_size,
            stat,
            nodata,
        } => {
            let input = open(&input)?;
            let options = FocalOptions {
                kernel_size,
                reducer: stat,
                output_nodata: nodata,
                ..Default::default()
            };

            let data_type = input.descriptor().data_type;
            let summary = dispatch_data_type!(data_type, focal, &runner, &input, &output, &options, &progress)?;
            log::info!("Focal {stat} written to {} in {:.2?}", output.display(), summary.elapsed);
        }
        Commands::Mask { input, output } => {
            let output = output.unwrap_or_else(|| default_mask_path(&input));
            let input = open(&input)?;

            let data_type = input.descriptor().data_type;
            dispatch_data_type!(data_type, mask, &runner, &input, &output, &progress)?;
            log::info!("Mask written to {}", output.display());
        }
        Commands::To8bit { input, output } => {
            let input = open(&input)?;

            let data_type = input.descriptor().data_type;
            let summary = dispatch_data_type!(data_type, to_8bit, &runner, &input, &output, &progress)?;
            log::info!("8 bit raster written to {} in {:.2?}", output.display(), summary.elapsed);
        }
        Commands::Replace {
            source,
            reference,
            output,
            value,
        } => {
            let source = open(&source)?;
            let reference = open(&reference)?;

            let data_type = source.descriptor().data_type;
            dispatch_data_type!(data_type, replace, &runner, &source, &reference, value, &output, &progress)?;
            log::info!("Replaced {value} in {}", output.display());
        }
        Commands::Probability { output, value, inputs } => {
            let inputs = expand_inputs(&inputs)?
                .iter()
                .map(|path| open(path))
                .collect::<Result<Vec<_>>>()?;

            let Some(data_type) = inputs.first().map(|input| input.descriptor().data_type) else {
                bail!("No input rasters found");
            };

            let count = dispatch_data_type!(data_type, probability, &runner, &inputs, value, &output, &progress)?;
            log::info!("Probability of {value} over {count} rasters written to {}", output.display());
        }
    }

    progress_bar.finish_and_clear();
    Ok(())
}
