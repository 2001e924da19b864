use anyhow::{Context, Result};
use clap::Parser;
use llm_json_extract::json_utils::candidate;
use llm_json_extract::{extract, extract_from_reader, ExtractConfig, JsonMap};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Extract the first JSON object from LLM output",
    long_about = None
)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    JSON_EXTRACT_PRETTY    Pretty-print output (true|false)
    JSON_EXTRACT_READ_BUF  Read chunk size in bytes for --stream (min 1024)
    RUST_LOG               Log filter, e.g. llm_json_extract=debug

EXAMPLES:
    json_extract response.txt             # Extract from a file
    cat response.txt | json_extract       # Extract from stdin
    json_extract --span response.txt      # Print the raw matched text
    json_extract --stream < live.txt      # Stop reading once the object closes")]
struct Args {
    /// Input file [default: stdin]
    input: Option<PathBuf>,

    /// Pretty-print the extracted object
    #[arg(short, long)]
    pretty: bool,

    /// Print the matched substring verbatim instead of re-serialized JSON
    #[arg(long, conflicts_with = "stream")]
    span: bool,

    /// Read incrementally and stop at the first closed object
    #[arg(long)]
    stream: bool,
}

async fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    Ok(match path {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    })
}

fn render(map: JsonMap, pretty: bool) -> Result<String> {
    let value = serde_json::Value::Object(map);
    Ok(if pretty { serde_json::to_string_pretty(&value)? } else { serde_json::to_string(&value)? })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let args = Args::parse();
    let config = ExtractConfig::from_env();
    let config = if args.pretty { config.with_pretty(true) } else { config };
    tracing::debug!(?config, stream = args.stream, span = args.span, "starting extraction");

    let mut reader = open_input(args.input.as_ref()).await?;

    if args.stream {
        let map = extract_from_reader(reader, config.read_buf).await?;
        println!("{}", render(map, config.pretty)?);
        return Ok(());
    }

    let mut text = String::new();
    reader.read_to_string(&mut text).await.context("reading input")?;

    if args.span {
        let slice = candidate(&text).context("no balanced JSON object found")?;
        println!("{}", slice);
        return Ok(());
    }

    let map = extract(&text)?;
    println!("{}", render(map, config.pretty)?);
    Ok(())
}
