use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use prism_tiles::{
    Bivariate, ElasticBackend, GeoTiles, JsonQuery, QueryBuilder, SpatialBinner, TileCoord,
    TileParams, TileSpec, TilesConfig, TopTermCountTile,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "prism-tiles")]
#[command(about = "Generate top-term count tiles from an Elasticsearch-compatible index")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, env = "PRISM_TILES_CONFIG", default_value = "prism-tiles.toml")]
    config: PathBuf,

    /// Backend URL, overrides the config file
    #[arg(long, env = "PRISM_TILES_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one tile and write its payload
    Tile {
        #[command(flatten)]
        tile: TileArgs,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the search request for a tile without sending it
    Query {
        #[command(flatten)]
        tile: TileArgs,
    },
}

#[derive(Args, Debug)]
struct TileArgs {
    /// Index to search
    #[arg(short, long)]
    index: String,

    /// Tile coordinate as z/x/y
    #[arg(value_parser = parse_coord)]
    coord: TileCoord,

    /// Tile parameters as a JSON object
    #[arg(short, long, conflicts_with = "params_file")]
    params: Option<String>,

    /// Read tile parameters from a JSON file
    #[arg(long)]
    params_file: Option<PathBuf>,

    /// Bin over a geo_point field (`geoField`) instead of two numeric fields
    #[arg(long)]
    geo: bool,
}

impl TileArgs {
    fn tile_params(&self) -> Result<TileParams> {
        let raw = match (&self.params, &self.params_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("reading params {}", path.display()))?,
            (None, None) => anyhow::bail!("one of --params or --params-file is required"),
        };
        let value: serde_json::Value =
            serde_json::from_str(&raw).context("parsing tile params")?;
        Ok(TileParams::from_value(value)?)
    }
}

fn parse_coord(s: &str) -> std::result::Result<TileCoord, String> {
    let parts: Vec<&str> = s.split('/').collect();
    let [z, x, y] = parts.as_slice() else {
        return Err(format!("expected z/x/y, got `{}`", s));
    };
    let z = z.parse::<u8>().map_err(|e| format!("zoom: {}", e))?;
    let x = x.parse::<u32>().map_err(|e| format!("x: {}", e))?;
    let y = y.parse::<u32>().map_err(|e| format!("y: {}", e))?;
    TileCoord::new(z, x, y).map_err(|e| e.to_string())
}

fn init_logging(config: &TilesConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
    );
    let json = config.logging.format == "json";

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TilesConfig::load_or_default(&cli.config)?;
    if let Some(url) = cli.url {
        config.backend.url = url;
    }
    init_logging(&config);

    match cli.command {
        Commands::Tile { tile, output } => {
            let bytes = if tile.geo {
                create::<GeoTiles>(&config, &tile).await?
            } else {
                create::<Bivariate>(&config, &tile).await?
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!("Wrote tile {} ({} bytes) to {}", tile.coord, bytes.len(), path.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.write_all(b"\n")?;
                }
            }
        }
        Commands::Query { tile } => {
            let request = if tile.geo {
                describe::<GeoTiles>(&tile)?
            } else {
                describe::<Bivariate>(&tile)?
            };
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
    }

    Ok(())
}

async fn create<B: SpatialBinner>(config: &TilesConfig, args: &TileArgs) -> Result<Vec<u8>> {
    let backend = Arc::new(ElasticBackend::new(&config.backend)?);
    tracing::info!("Generating tile {} from {} ({})", args.coord, args.index, backend.url());

    let tiles: TopTermCountTile<B> = TopTermCountTile::new(backend);
    let params = args.tile_params()?;
    let base = JsonQuery::from_params(&params, "query");

    let bytes = tiles
        .create(
            &args.index,
            &args.coord,
            &params,
            base.as_ref().map(|q| q as &dyn QueryBuilder),
        )
        .await?;
    Ok(bytes)
}

/// Build the search request offline; no backend is contacted or configured
fn describe<B: SpatialBinner>(args: &TileArgs) -> Result<prism_tiles::SearchRequest> {
    let params = args.tile_params()?;
    let base = JsonQuery::from_params(&params, "query");

    let request = TileSpec::<B>::parse(&params)?
        .search_request(&args.coord, base.as_ref().map(|q| q as &dyn QueryBuilder))?;
    Ok(request)
}
