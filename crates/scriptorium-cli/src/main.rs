//! Scriptorium CLI

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use scriptorium::hocr;
use scriptorium::ingest::{DerivativeIngestor, IngestRequest};
use scriptorium::model::ModelParameters;
use scriptorium::queue::JsonLinesQueue;
use scriptorium::store::require_item;
use scriptorium::{
    Artifact, ContentItem, EntityRecord, FsContentStore, GenerationPipeline, HocrConversion, Materializer,
    PathTemplate, ScriptoriumConfig, TemplateContext, Term,
};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Conversion preset
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConversionKind {
    /// hOCR to plain text transcript
    Plaintext,
    /// hOCR to OCR derivative
    Ocr,
}

#[derive(Parser)]
#[command(name = "scriptorium")]
#[command(version, about = "hOCR text extraction and derivative dispatch", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract plain text from an hOCR file
    Extract {
        /// hOCR file to read
        input: PathBuf,

        /// Write the text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stream lines to the sink instead of buffering the whole text
        #[arg(long)]
        stream: bool,
    },

    /// Render a destination path template to a locator
    RenderPath {
        /// Template, e.g. "[date:custom:Y]-[date:custom:m]/[node:nid].txt"
        template: String,

        #[arg(long, default_value = "public")]
        scheme: String,

        /// Parent item id
        #[arg(long)]
        nid: u64,

        /// Parent item title
        #[arg(long, default_value = "")]
        title: String,

        /// Media id
        #[arg(long)]
        mid: Option<u64>,

        /// Media name
        #[arg(long, default_value = "")]
        media_name: String,

        /// Term id
        #[arg(long)]
        tid: Option<u64>,

        /// Term name
        #[arg(long, default_value = "")]
        term_name: String,

        /// Term URI
        #[arg(long, default_value = "")]
        term_uri: String,
    },

    /// Print the recognition engine arguments for a model record (JSON or TOML field map)
    ModelArgs {
        model_file: PathBuf,

        /// Emit only the model id
        #[arg(long)]
        minimal: bool,

        /// Extra arguments appended after the model parameters
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        args: String,
    },

    /// Convert a stored item's hOCR media into a text derivative
    Convert {
        /// Content store directory
        #[arg(long)]
        store: PathBuf,

        /// Parent item id
        #[arg(long)]
        parent: u64,

        #[arg(short, long, value_enum, default_value = "plaintext")]
        kind: ConversionKind,

        /// Config file (default: discover scriptorium.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Build a generation request and print it as a JSON line
    Dispatch {
        /// Content store directory
        #[arg(long)]
        store: PathBuf,

        /// Parent item id
        #[arg(long)]
        parent: u64,

        /// Config file (default: discover scriptorium.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Materialize an engine result from an ingest request JSON file
    Ingest {
        /// Content store directory
        #[arg(long)]
        store: PathBuf,

        /// Ingest request JSON ("-" for stdin)
        request: PathBuf,

        /// Config file (default: discover scriptorium.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract { input, output, stream } => {
            let bytes = std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
            let document = hocr::parse_hocr_bytes(&bytes)?;

            match (output, stream) {
                (Some(path), true) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    hocr::write_linearized(&document, std::io::BufWriter::new(file))
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
                (None, true) => hocr::write_linearized(&document, std::io::stdout().lock())?,
                (Some(path), false) => std::fs::write(&path, hocr::linearize(&document))
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                (None, false) => std::io::stdout().write_all(hocr::linearize(&document).as_bytes())?,
            }
            Ok(())
        }

        Commands::RenderPath {
            template,
            scheme,
            nid,
            title,
            mid,
            media_name,
            tid,
            term_name,
            term_uri,
        } => {
            let node = ContentItem::new(nid, title);
            let media = mid.map(|id| Artifact {
                id,
                parent_id: nid,
                name: media_name,
                artifact_type: String::new(),
                term_id: tid.unwrap_or_default(),
                mime_type: None,
                locator: None,
            });
            let term = tid.map(|id| Term {
                id,
                name: term_name,
                uri: term_uri,
            });

            let mut context = TemplateContext::new(chrono::Utc::now()).with_node(&node);
            if let Some(media) = &media {
                context = context.with_media(media);
            }
            if let Some(term) = &term {
                context = context.with_term(term);
            }

            println!("{}", PathTemplate::new(template).locator(&scheme, &context)?);
            Ok(())
        }

        Commands::ModelArgs {
            model_file,
            minimal,
            args,
        } => {
            let record = read_model_record(&model_file)?;
            let parameters = ModelParameters::from_record(&record)?;
            let mut line = if minimal {
                parameters.model_id_args()
            } else {
                parameters.full_args()
            };
            if !args.trim().is_empty() {
                line.push(' ');
                line.push_str(args.trim());
            }
            println!("{}", line);
            Ok(())
        }

        Commands::Convert {
            store,
            parent,
            kind,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let store = Arc::new(FsContentStore::open(&store)?);
            let vocabulary = Arc::new(config.vocabulary());
            let materializer = Arc::new(Materializer::new(store.clone()));
            let conversion = match kind {
                ConversionKind::Plaintext => HocrConversion::plaintext(&config, store.clone(), vocabulary, materializer),
                ConversionKind::Ocr => HocrConversion::ocr(&config, store.clone(), vocabulary, materializer),
            };

            let item = require_item(&*store, parent)?;
            let artifact = conversion.execute(&item)?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
            Ok(())
        }

        Commands::Dispatch { store, parent, config } => {
            let config = load_config(config.as_deref())?;
            let store = Arc::new(FsContentStore::open(&store)?);
            let queue = Arc::new(JsonLinesQueue::new(std::io::stdout()));
            let pipeline = GenerationPipeline::new(
                config.generate.clone(),
                store.clone(),
                store.clone(),
                Arc::new(config.vocabulary()),
                queue,
            );

            let item = require_item(&*store, parent)?;
            pipeline.execute(&item)?;
            Ok(())
        }

        Commands::Ingest {
            store,
            request,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let json = if request.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&request).with_context(|| format!("Failed to read {}", request.display()))?
            };
            let request = IngestRequest::from_json(&json)?;

            let store = Arc::new(FsContentStore::open(&store)?);
            let materializer = Arc::new(Materializer::new(store.clone()));
            let ingestor = DerivativeIngestor::new(store, Arc::new(config.vocabulary()), materializer);
            let artifact = ingestor.ingest(&request)?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ScriptoriumConfig> {
    let config = match path {
        Some(path) => ScriptoriumConfig::from_file(path)?,
        None => ScriptoriumConfig::discover()?.unwrap_or_default(),
    };
    Ok(config)
}

/// Read a model record given as a flat JSON or TOML field map.
fn read_model_record(path: &Path) -> Result<EntityRecord> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => serde_json::to_value(toml::from_str::<toml::Table>(&content)?)?,
        Some("json") => serde_json::from_str(&content)?,
        _ => bail!("Unsupported model file format: {}. Supported formats: .json, .toml", path.display()),
    };
    let Some(object) = value.as_object() else {
        bail!("Model file {} must contain a table of fields", path.display());
    };

    let fields: BTreeMap<String, String> = object
        .iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(text) => Some((key.clone(), text.clone())),
            serde_json::Value::Number(number) => Some((key.clone(), number.to_string())),
            _ => None,
        })
        .collect();

    Ok(EntityRecord {
        id: 0,
        label: path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        fields,
    })
}
