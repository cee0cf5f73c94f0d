use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kurbo::{Affine, Size};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use svga_player::svga_core::{AudioEntity, LineCap, LineJoin, ShapeStyle};
use svga_player::{
    fit_transform, ArchiveReader, ContentMode, DrawDescriptor, DynamicOverrides, FileFetcher,
    FillMode, MovieEntity, PlaybackConfig, PlaybackEngine, Player, PlayerEvent, SpriteKind,
};
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory for extracted 1.x archives
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of an archive as JSON
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the resolved draw descriptors of one frame as JSON
    Scene {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, default_value_t = 0)]
        frame: usize,

        /// Hide every sprite using this image key (repeatable)
        #[arg(long)]
        hide: Vec<String>,

        /// Surface size as WIDTHxHEIGHT, adds the canvas-to-surface transform
        #[arg(long, value_parser = parse_size)]
        surface: Option<Size>,

        #[arg(long, value_enum, default_value_t = ContentModeArg::AspectFit)]
        content_mode: ContentModeArg,
    },
    /// Play an archive and log every playback event
    Play {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON playback config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Loops before finishing, 0 loops forever
        #[arg(long)]
        loops: Option<usize>,

        #[arg(long, value_enum)]
        fill_mode: Option<FillModeArg>,

        /// Stop after this many ticks. Defaults to one tick per frame per loop.
        #[arg(long)]
        ticks: Option<usize>,

        /// Load on a worker thread and tick in real time at the movie's frame rate
        #[arg(long)]
        realtime: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum FillModeArg {
    Forward,
    Backward,
    Clear,
}

impl From<FillModeArg> for FillMode {
    fn from(mode: FillModeArg) -> Self {
        match mode {
            FillModeArg::Forward => FillMode::Forward,
            FillModeArg::Backward => FillMode::Backward,
            FillModeArg::Clear => FillMode::Clear,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ContentModeArg {
    ScaleToFill,
    AspectFit,
    AspectFill,
    Top,
    Bottom,
    Left,
    Right,
}

impl From<ContentModeArg> for ContentMode {
    fn from(mode: ContentModeArg) -> Self {
        match mode {
            ContentModeArg::ScaleToFill => ContentMode::ScaleToFill,
            ContentModeArg::AspectFit => ContentMode::AspectFit,
            ContentModeArg::AspectFill => ContentMode::AspectFill,
            ContentModeArg::Top => ContentMode::Top,
            ContentModeArg::Bottom => ContentMode::Bottom,
            ContentModeArg::Left => ContentMode::Left,
            ContentModeArg::Right => ContentMode::Right,
        }
    }
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{s}`"))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("`{v}`: {e}"));
    Ok(Size::new(parse(w)?, parse(h)?))
}

fn main() {
    let cli = Cli::parse();

    // Initialize Logging
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(cli.log_level).into())
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match cli.log_format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }

    let reader = cli
        .cache_dir
        .map(ArchiveReader::with_cache_dir)
        .unwrap_or_default();

    let result = match cli.command {
        Command::Inspect { file } => inspect(&reader, &file),
        Command::Scene {
            file,
            frame,
            hide,
            surface,
            content_mode,
        } => scene(&reader, &file, frame, &hide, surface, content_mode.into()),
        Command::Play {
            file,
            config,
            loops,
            fill_mode,
            ticks,
            realtime,
        } => load_config(config.as_deref()).and_then(|mut config| {
            if let Some(loops) = loops {
                config.total_loop = loops;
            }
            if let Some(fill_mode) = fill_mode {
                config.fill_mode = fill_mode.into();
            }
            if realtime {
                play_realtime(reader, &file, config, ticks)
            } else {
                play(&reader, &file, config, ticks)
            }
        }),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn open(reader: &ArchiveReader, file: &Path) -> Result<Arc<MovieEntity>> {
    info!("Opening {:?}", file);
    let movie = reader
        .open(file)
        .with_context(|| format!("cannot decode {}", file.display()))?;
    Ok(Arc::new(movie))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct MovieSummary<'a> {
    version: &'a str,
    width: f64,
    height: f64,
    fps: u32,
    frames: usize,
    duration_secs: f64,
    images_total_size: usize,
    images: Vec<ImageSummary<'a>>,
    sprites: Vec<SpriteSummary<'a>>,
    audios: &'a [AudioEntity],
}

#[derive(Serialize)]
struct ImageSummary<'a> {
    key: &'a str,
    width: u32,
    height: u32,
    bytes: usize,
}

#[derive(Serialize)]
struct SpriteSummary<'a> {
    index: usize,
    image_key: &'a str,
    kind: SpriteKind,
    matte_key: Option<&'a str>,
    frames: usize,
    keep_shape_frames: usize,
}

fn inspect(reader: &ArchiveReader, file: &Path) -> Result<()> {
    let movie = open(reader, file)?;

    let mut images: Vec<ImageSummary> = movie
        .images
        .iter()
        .map(|(key, bitmap)| ImageSummary {
            key,
            width: bitmap.width,
            height: bitmap.height,
            bytes: bitmap.data.len(),
        })
        .collect();
    images.sort_by_key(|image| image.key);

    let sprites = movie
        .sprites
        .iter()
        .enumerate()
        .map(|(index, sprite)| SpriteSummary {
            index,
            image_key: &sprite.image_key,
            kind: sprite.kind(),
            matte_key: sprite.matte_key(),
            frames: sprite.frames.len(),
            keep_shape_frames: sprite.frames.iter().filter(|f| f.keep_shapes).count(),
        })
        .collect();

    print_json(&MovieSummary {
        version: &movie.version,
        width: movie.size.width,
        height: movie.size.height,
        fps: movie.fps,
        frames: movie.frames,
        duration_secs: movie.duration().as_secs_f64(),
        images_total_size: movie.images_total_size,
        images,
        sprites,
        audios: &movie.audios,
    })
}

#[derive(Serialize)]
struct SceneJson {
    index: usize,
    /// Canvas to surface, present when a surface size was given.
    view_transform: Option<[f64; 6]>,
    descriptors: Vec<DescriptorJson>,
}

#[derive(Serialize)]
struct DescriptorJson {
    sprite_index: usize,
    image_key: String,
    kind: SpriteKind,
    visible: bool,
    bitmap: Option<(u32, u32)>,
    alpha: f64,
    layout: [f64; 4],
    transform: [f64; 6],
    nx: f64,
    ny: f64,
    clip: Option<String>,
    mask: Option<usize>,
    shapes: Vec<ShapeJson>,
}

#[derive(Serialize)]
struct ShapeJson {
    path: String,
    transform: [f64; 6],
    style: Option<StyleJson>,
}

#[derive(Serialize)]
struct StyleJson {
    fill: Option<[f32; 4]>,
    stroke: Option<[f32; 4]>,
    stroke_width: f64,
    miter_limit: f64,
    line_cap: LineCap,
    line_join: LineJoin,
    dash: Option<(Vec<f64>, f64)>,
}

impl From<&ShapeStyle> for StyleJson {
    fn from(style: &ShapeStyle) -> Self {
        Self {
            fill: style.fill.map(|c| c.to_array()),
            stroke: style.stroke.map(|c| c.to_array()),
            stroke_width: style.stroke_width,
            miter_limit: style.miter_limit,
            line_cap: style.line_cap,
            line_join: style.line_join,
            dash: style.dash.as_ref().map(|d| (d.array.clone(), d.phase)),
        }
    }
}

impl From<&DrawDescriptor> for DescriptorJson {
    fn from(d: &DrawDescriptor) -> Self {
        Self {
            sprite_index: d.sprite_index,
            image_key: d.image_key.clone(),
            kind: d.kind,
            visible: d.visible,
            bitmap: d.bitmap.as_ref().map(|b| (b.width, b.height)),
            alpha: d.alpha,
            layout: [d.layout.x0, d.layout.y0, d.layout.width(), d.layout.height()],
            transform: d.transform.as_coeffs(),
            nx: d.nx,
            ny: d.ny,
            clip: d.clip.as_ref().map(|c| c.to_svg()),
            mask: d.mask,
            shapes: d
                .shapes
                .iter()
                .map(|s| ShapeJson {
                    path: s.path.to_svg(),
                    transform: s.transform.as_coeffs(),
                    style: s.style.as_ref().map(StyleJson::from),
                })
                .collect(),
        }
    }
}

fn scene(
    reader: &ArchiveReader,
    file: &Path,
    frame: usize,
    hide: &[String],
    surface: Option<Size>,
    content_mode: ContentMode,
) -> Result<()> {
    let movie = open(reader, file)?;
    if frame >= movie.frames {
        bail!("frame {} out of range, movie has {} frames", frame, movie.frames);
    }

    let mut overrides = DynamicOverrides::default();
    for key in hide {
        overrides.set_hidden(key.as_str(), true);
    }
    let scene = svga_player::resolve_scene(&movie, frame, &overrides)?;

    print_json(&SceneJson {
        index: scene.index,
        view_transform: surface
            .map(|surface| fit_transform(movie.size, surface, content_mode))
            .map(Affine::as_coeffs),
        descriptors: scene.descriptors.iter().map(DescriptorJson::from).collect(),
    })
}

fn load_config(path: Option<&Path>) -> Result<PlaybackConfig> {
    let Some(path) = path else {
        return Ok(PlaybackConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn tick_budget(movie: &MovieEntity, config: &PlaybackConfig, ticks: Option<usize>) -> usize {
    ticks.unwrap_or(movie.frames * config.total_loop.max(1))
}

fn log_events(events: &[PlayerEvent]) -> bool {
    let mut finished = false;
    for event in events {
        info!("{:?}", event);
        finished |= matches!(event, PlayerEvent::Finished { .. });
    }
    finished
}

fn play(reader: &ArchiveReader, file: &Path, config: PlaybackConfig, ticks: Option<usize>) -> Result<()> {
    let movie = open(reader, file)?;
    let budget = tick_budget(&movie, &config, ticks);

    let mut engine = PlaybackEngine::headless(config);
    log_events(&engine.set_movie(Some(movie))?.events);

    for _ in 0..budget {
        if log_events(&engine.tick().events) || !engine.is_playing() {
            break;
        }
    }
    info!(
        "Stopped at frame {} after {} loops",
        engine.current_index(),
        engine.loop_count()
    );
    Ok(())
}

fn play_realtime(
    reader: ArchiveReader,
    file: &Path,
    config: PlaybackConfig,
    ticks: Option<usize>,
) -> Result<()> {
    let mut player = Player::new(config.clone(), Arc::new(FileFetcher), reader);
    player.load(file.to_string_lossy());

    let loaded = player.wait_for_load(Duration::from_secs(30));
    if let Some(e) = player.last_error() {
        bail!("cannot load {}: {:#}", file.display(), e);
    }
    let Some(movie) = player.engine().movie().cloned() else {
        bail!("timed out loading {}", file.display());
    };
    log_events(&loaded);

    let budget = tick_budget(&movie, &config, ticks);
    let mut ticked = 0;
    while ticked < budget && player.engine().is_playing() {
        let events = player.pump();
        ticked += events
            .iter()
            .filter(|e| matches!(e, PlayerEvent::Updated { .. }))
            .count();
        if log_events(&events) {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    player.stop();
    info!(
        "Stopped at frame {} after {} loops",
        player.engine().current_index(),
        player.engine().loop_count()
    );
    Ok(())
}
