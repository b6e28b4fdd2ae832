//! Chart rendering command line.
//!
//! Renders tiles and maps from the configured chart layers into image files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chart_common::{CrsCode, GeoBox, TileCoord};
use chart_render::{ChartService, RenderRequest, ServiceConfig};
use clap::{Parser, Subcommand};
use projection::Position;
use renderer::OutputFormat;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "chart-render")]
#[command(about = "Render nautical chart tiles and maps")]
struct Args {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Layer configuration (overrides CHART_LAYERS_FILE)
    #[arg(long)]
    layers_file: Option<PathBuf>,

    /// Dalle store root (overrides CHART_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Font for labels and error tiles (overrides CHART_FONT_PATH)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Render timeout in milliseconds (overrides RENDER_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render pyramid tiles, one by coordinates or all covering a box
    Tile {
        layer: String,
        /// Tile coordinates `z x y`
        #[arg(num_args = 3, conflicts_with = "bbox")]
        zxy: Vec<u32>,
        /// Geographic box `west,south,east,north`
        #[arg(long, allow_hyphen_values = true)]
        bbox: Option<String>,
        #[arg(long, default_value_t = 1024)]
        width: u32,
        #[arg(long, default_value_t = 768)]
        height: u32,
        #[arg(long, default_value = "png")]
        format: String,
        /// Output file for one tile, directory for a box
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Render a map of one or more layers
    Map {
        /// Comma separated layer names, drawn in order
        #[arg(long, value_delimiter = ',', required = true)]
        layers: Vec<String>,
        #[arg(long, default_value = "EPSG:3395")]
        crs: String,
        /// `minx,miny,maxx,maxy` in the CRS's axis order
        #[arg(long, allow_hyphen_values = true)]
        bbox: String,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value = "png")]
        format: String,
        /// Outline clip boxes and dalles
        #[arg(long)]
        debug: bool,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List registered layers as JSON
    Layers,
    /// Find the charts of a layer around a location
    Locate {
        layer: String,
        /// Geographic box `west,south,east,north`, or a point `lon,lat`
        #[arg(allow_hyphen_values = true)]
        location: String,
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

fn service_config(args: &Args) -> ServiceConfig {
    let mut config = ServiceConfig::from_env();
    if let Some(path) = &args.layers_file {
        config.layers_file = path.clone();
    }
    if let Some(path) = &args.data_dir {
        config.data_dir = path.clone();
    }
    if let Some(path) = &args.font {
        config.font_path = Some(path.clone());
    }
    if let Some(ms) = args.timeout_ms {
        config.render_timeout_ms = ms;
    }
    config
}

fn parse_location(s: &str) -> Result<GeoBox> {
    let coords = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .with_context(|| format!("invalid location '{}'", s))?;
    match coords.as_slice() {
        [lon, lat] => Ok(GeoBox::from_position(Position::new(*lon, *lat))),
        _ => Ok(GeoBox::from_coords(&coords)?),
    }
}

fn write_image(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

async fn run(args: Args) -> Result<()> {
    let config = service_config(&args);
    config.validate()?;
    let service = ChartService::from_config(config)?;
    info!(layers = service.registry().len(), "Chart service ready");

    match args.command {
        Command::Tile {
            layer,
            zxy,
            bbox,
            width,
            height,
            format,
            output,
        } => {
            let format: OutputFormat = format.parse()?;
            if let Some(bbox) = bbox {
                let geo = GeoBox::from_wms_string(&bbox)?;
                let tiles = service
                    .render_tiles_for_box(&layer, &geo, width, height, format)
                    .await?;
                for (coord, tile) in &tiles {
                    let path = output.join(format!(
                        "{}/{}/{}/{}.{}",
                        layer,
                        coord.z,
                        coord.x,
                        coord.y,
                        tile.format.extension()
                    ));
                    write_image(&path, &tile.data)?;
                }
                let failed = tiles.iter().filter(|(_, t)| t.error.is_some()).count();
                info!(tiles = tiles.len(), failed, dir = %output.display(), "Wrote tiles");
            } else {
                let &[z, x, y] = zxy.as_slice() else {
                    bail!("tile needs either `z x y` or --bbox");
                };
                let coord = TileCoord::new(z, x, y)?;
                let tile = service.render_tile(&layer, coord, format).await?;
                let path = if output.is_dir() {
                    output.join(format!("{}-{}-{}-{}.{}", layer, z, x, y, tile.format.extension()))
                } else {
                    output
                };
                write_image(&path, &tile.data)?;
                if let Some(error) = &tile.error {
                    bail!("tile {} failed: {}", coord, error);
                }
                info!(tile = %coord, path = %path.display(), "Wrote tile");
            }
        }
        Command::Map {
            layers,
            crs,
            bbox,
            width,
            height,
            format,
            debug,
            output,
        } => {
            let coords = bbox
                .split(',')
                .map(|part| part.trim().parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .with_context(|| format!("invalid bbox '{}'", bbox))?;
            let bbox: [f64; 4] = match *coords.as_slice() {
                [a, b, c, d] | [a, b, _, c, d, _] => [a, b, c, d],
                _ => bail!("bbox needs 4 or 6 numbers"),
            };
            let request = RenderRequest {
                layers,
                crs: CrsCode::from_wms_string(&crs)?,
                bbox,
                width,
                height,
                format: format.parse()?,
                debug,
            };
            let image = service.render_map(&request).await?;
            write_image(&output, &image.data)?;
            info!(
                path = %output.display(),
                entries = image.report.entries_drawn,
                dalles = image.report.dalles_drawn,
                "Wrote map"
            );
        }
        Command::Layers => {
            println!("{}", serde_json::to_string_pretty(&service.layers())?);
        }
        Command::Locate {
            layer,
            location,
            count,
        } => {
            let geo = parse_location(&location)?;
            let result = service.locate(&layer, &geo, count)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}
