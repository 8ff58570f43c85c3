/// regionmark command line entry point for native builds
#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    match cli::run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

// WASM builds only use the library
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use clap::{Parser, Subcommand, ValueEnum};
    use regionmark::config::{AppConfig, SettingsError};
    use regionmark::error::ValidationError;
    use regionmark::format::{
        ConfigError, CropMode, ExportError, ExportFormat, PolygonPolicy, WarningSeverity,
    };
    use regionmark::session::Session;
    use regionmark::task::{ExportOutcome, ExportTask};
    use regionmark::tiles::TileGrid;

    /// Annotation geometry, augmentation and dataset export.
    #[derive(Parser)]
    #[command(name = "regionmark")]
    #[command(version, about)]
    #[command(propagate_version = true)]
    struct Cli {
        /// Configuration file (defaults to the user config directory).
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        /// Log level (error, warn, info, debug, trace). Overrides the config file.
        #[arg(long, global = true)]
        log_level: Option<log::LevelFilter>,

        #[command(subcommand)]
        command: Commands,
    }

    /// Available subcommands.
    #[derive(Subcommand)]
    enum Commands {
        /// Export JSON annotation files to a dataset format.
        Export(ExportArgs),
        /// Cut images into fixed-size tiles.
        Tiles(TilesArgs),
        /// Manage the configuration file.
        Config(ConfigArgs),
    }

    /// Arguments for the export subcommand.
    #[derive(clap::Args)]
    struct ExportArgs {
        /// Annotation files written by the JSON exporter.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output format ('json', 'coco', 'voc' or 'yolo'). Defaults to the config.
        #[arg(long)]
        format: Option<String>,

        /// Output directory. Defaults to the config's export folder.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Generate the augmentation variants configured in the config file.
        #[arg(long)]
        augment: bool,

        /// Copy images into the export.
        #[arg(long)]
        write_images: bool,

        /// Write cropped PNGs.
        #[arg(long, value_enum)]
        crops: Option<CropArg>,

        /// Tile size for '--crops tiles'. Defaults to the config.
        #[arg(long)]
        tile_size: Option<u32>,

        /// Leave polygons out of VOC and YOLO instead of using their bounding rectangle.
        #[arg(long)]
        skip_polygons: bool,
    }

    #[derive(Clone, Copy, ValueEnum)]
    enum CropArg {
        Shapes,
        Tiles,
    }

    /// Arguments for the tiles subcommand.
    #[derive(clap::Args)]
    struct TilesArgs {
        /// Images to cut.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Tile edge length in pixels.
        #[arg(long)]
        size: u32,

        /// Output directory.
        #[arg(long)]
        out: PathBuf,
    }

    /// Arguments for the config subcommand.
    #[derive(clap::Args)]
    struct ConfigArgs {
        /// Write a default configuration file to this path.
        #[arg(long)]
        init: PathBuf,
    }

    #[derive(Debug, thiserror::Error)]
    pub enum CliError {
        #[error(transparent)]
        Settings(#[from] SettingsError),

        #[error(transparent)]
        Export(#[from] ExportError),

        #[error(transparent)]
        Config(#[from] ConfigError),

        #[error(transparent)]
        Validation(#[from] ValidationError),

        #[error("Failed to read {path:?}: {source}")]
        Io {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },

        #[error("Failed to load image {path:?}: {source}")]
        Image {
            path: PathBuf,
            #[source]
            source: image::ImageError,
        },

        #[error("Export finished with {0} failed item(s)")]
        PartialFailure(usize),

        #[error("Export cancelled")]
        Cancelled,

        #[error("No output directory: pass --out or set preferences.export_folder")]
        MissingOutput,
    }

    /// Run the CLI.
    pub fn run() -> Result<(), CliError> {
        let cli = Cli::parse();
        let config = match &cli.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::load_from_default_path().unwrap_or_default(),
        };

        let level = cli
            .log_level
            .unwrap_or_else(|| config.preferences.log_level.to_level_filter());
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
            .init();

        match cli.command {
            Commands::Export(args) => run_export(args, &config),
            Commands::Tiles(args) => run_tiles(args),
            Commands::Config(args) => {
                AppConfig::new().save(&args.init)?;
                println!("Wrote default configuration to {}", args.init.display());
                Ok(())
            }
        }
    }

    fn run_export(args: ExportArgs, config: &AppConfig) -> Result<(), CliError> {
        let format = match &args.format {
            Some(name) => name.parse::<ExportFormat>()?,
            None => config.preferences.export_format,
        };
        let out = match args.out {
            Some(out) => out,
            None if !config.preferences.export_folder.is_empty() => {
                PathBuf::from(&config.preferences.export_folder)
            }
            None => return Err(CliError::MissingOutput),
        };

        let mut options = config.export_options();
        options.write_images |= args.write_images;
        if !args.augment {
            options.augmentation = Default::default();
        }
        if args.skip_polygons {
            options.polygon_policy = PolygonPolicy::Skip;
        }
        options.crops = match args.crops {
            None => CropMode::None,
            Some(CropArg::Shapes) => CropMode::Shapes,
            Some(CropArg::Tiles) => {
                CropMode::Tiles(args.tile_size.unwrap_or(config.preferences.tile_size))
            }
        };

        let mut session = Session::new(config.to_registry()?);
        for input in &args.inputs {
            let bytes = std::fs::read(input).map_err(|e| CliError::Io {
                path: input.clone(),
                source: e,
            })?;
            let index = session.import_json(&bytes, Some(input.as_path()), None)?;

            if options.needs_pixels() {
                let file_name = session
                    .image(index)
                    .map(|item| item.meta.file_name.clone())
                    .unwrap_or_default();
                let path = input
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(file_name);
                let pixels = image::open(&path).map_err(|e| CliError::Image {
                    path: path.clone(),
                    source: e,
                })?;
                session.set_pixels(index, Arc::new(pixels));
            }
        }

        let task = ExportTask::spawn(session.snapshot(), format, out.clone(), options)?;
        while !task.is_finished() {
            report_progress(&task);
            std::thread::sleep(Duration::from_millis(50));
        }
        report_progress(&task);

        match task.join() {
            ExportOutcome::Completed(result) => {
                println!(
                    "Exported {} images with {} annotations to {}",
                    result.images_exported,
                    result.annotations_exported,
                    out.display()
                );
                println!(
                    "{} files written, {} warnings, {} failures",
                    result.written.len(),
                    result.warnings.len(),
                    result.failures.len()
                );
                for warning in &result.warnings {
                    let level = match warning.severity {
                        WarningSeverity::Info => "info",
                        WarningSeverity::Warning => "warning",
                    };
                    println!(
                        "  {} [{}]: {}",
                        level,
                        warning.image.as_deref().unwrap_or("-"),
                        warning.message
                    );
                }
                for failure in &result.failures {
                    println!(
                        "  failed [{}]: {}",
                        failure.image.as_deref().unwrap_or("dataset"),
                        failure.error
                    );
                }
                if result.has_failures() {
                    Err(CliError::PartialFailure(result.failures.len()))
                } else {
                    Ok(())
                }
            }
            ExportOutcome::Cancelled(_) => Err(CliError::Cancelled),
            ExportOutcome::Failed(e) => Err(e.into()),
        }
    }

    fn report_progress(task: &ExportTask) {
        while let Some(progress) = task.try_progress() {
            println!(
                "[{}/{}] {}",
                progress.completed, progress.total, progress.image
            );
        }
    }

    fn run_tiles(args: TilesArgs) -> Result<(), CliError> {
        for path in &args.images {
            let image = image::open(path).map_err(|e| CliError::Image {
                path: path.clone(),
                source: e,
            })?;
            let grid = TileGrid::new(image.width(), image.height(), args.size)
                .ok_or(ConfigError::InvalidTileSize)?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());

            std::fs::create_dir_all(&args.out).map_err(|e| CliError::Io {
                path: args.out.clone(),
                source: e,
            })?;
            for (row, col) in grid.cells() {
                let out = args.out.join(TileGrid::tile_name(&stem, row, col));
                grid.crop(&image, row, col)
                    .save(&out)
                    .map_err(|e| CliError::Image {
                        path: out.clone(),
                        source: e,
                    })?;
            }
            println!(
                "{}: {} tiles ({} x {})",
                path.display(),
                grid.rows() * grid.cols(),
                grid.rows(),
                grid.cols()
            );
        }
        Ok(())
    }
}
