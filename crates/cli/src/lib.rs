use annotator_core::{annotation, upload, viewport, AnnotatorConfig, AnnotatorSession, FixedSurface, Rect, SessionEvent};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_engine::LopdfWriter;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use storage::Storage;

/// Overrides the settings directory, mainly for tests.
const DATA_DIR_ENV: &str = "PDF_ANNOTATOR_DATA_DIR";

const DEFAULT_PDF_OUTPUT: &str = "annotated-pdf.pdf";
const DEFAULT_JSON_OUTPUT: &str = "pdf-annotations.json";

#[derive(Debug, Parser)]
#[command(name = "pdf-annotator")]
#[command(about = "Draw described regions on PDF pages and export them")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Stamp exported annotations onto a PDF and write the JSON sidecar.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Annotation JSON as written by a previous export.
        #[arg(long, value_name = "JSON")]
        annotations: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json_output: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Replay recorded viewer events and print the resulting annotations.
    Replay {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "JSON")]
        events: PathBuf,
        /// Also export the annotated PDF here.
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json_output: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    first_page_size: Option<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f64,
    height: f64,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Export { file, annotations, output, json_output, config } => {
            run_export(&file, &annotations, output.as_deref(), json_output.as_deref(), config.as_deref())
        }
        Commands::Replay { file, events, output, json_output, config } => {
            run_replay(&file, &events, output.as_deref(), json_output.as_deref(), config.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let info = pdf_engine::inspect_path(file).context("failed to open PDF")?;
    let first_page_size =
        info.page_sizes.first().map(|size| PageSizeOutput { width: size.width, height: size.height });

    let payload = InfoOutput { path: file.display().to_string(), page_count: info.page_count(), first_page_size };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_export(
    file: &Path,
    annotations: &Path,
    output: Option<&Path>,
    json_output: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let mut session = open_session(file, config)?;

    let json = fs::read_to_string(annotations)
        .with_context(|| format!("failed to read annotations from {}", annotations.display()))?;
    let loaded = annotation::from_json(&json).context("annotations file is not valid annotation JSON")?;
    log::info!("loaded {} annotations from {}", loaded.len(), annotations.display());
    session.store_mut().load(loaded);

    let (pdf_path, json_path) = write_artifacts(&session, file, output, json_output)?;
    println!("{}", pdf_path.display());
    println!("{}", json_path.display());

    Ok(())
}

fn run_replay(
    file: &Path,
    events: &Path,
    output: Option<&Path>,
    json_output: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let mut session = open_session(file, config)?;

    let json = fs::read_to_string(events)
        .with_context(|| format!("failed to read events from {}", events.display()))?;
    let events: Vec<SessionEvent> = serde_json::from_str(&json).context("events file is not a list of session events")?;

    let info = pdf_engine::inspect_path(file).context("failed to open PDF")?;
    let page = info.page_size(1)?;
    let surface = FixedSurface::new(Rect::new(
        0.0,
        0.0,
        viewport::container_width(page.width, session.config()),
        page.height + session.config().anchor.y,
    ));

    for event in events {
        let outcome = session.apply(event, &surface);
        log::debug!("replayed event: {outcome:?}");
    }

    println!("{}", annotation::to_json(session.annotations())?);

    if output.is_some() || json_output.is_some() {
        let (pdf_path, json_path) = write_artifacts(&session, file, output, json_output)?;
        log::info!("wrote {} and {}", pdf_path.display(), json_path.display());
    }

    Ok(())
}

fn open_session(file: &Path, config: Option<&Path>) -> Result<AnnotatorSession> {
    ensure_pdf_exists(file)?;

    let mut session = AnnotatorSession::new(load_config(config)?);

    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let mime = upload::infer_mime(file, &bytes);
    let name = file.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    session.open(&name, mime, bytes)?;

    Ok(session)
}

fn write_artifacts(
    session: &AnnotatorSession,
    file: &Path,
    output: Option<&Path>,
    json_output: Option<&Path>,
) -> Result<(PathBuf, PathBuf)> {
    let mut writer = LopdfWriter::new();
    let artifacts = session.export(&mut writer)?;

    let pdf_path = output.map(ToOwned::to_owned).unwrap_or_else(|| sibling(file, DEFAULT_PDF_OUTPUT));
    let json_path = json_output.map(ToOwned::to_owned).unwrap_or_else(|| sibling(file, DEFAULT_JSON_OUTPUT));

    for path in [&pdf_path, &json_path] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&pdf_path, &artifacts.pdf)
        .with_context(|| format!("failed to write PDF to {}", pdf_path.display()))?;
    if let Err(err) = fs::write(&json_path, &artifacts.json) {
        // Both files or neither.
        if let Err(remove_err) = fs::remove_file(&pdf_path) {
            log::warn!("could not remove {}: {remove_err}", pdf_path.display());
        }
        return Err(err).with_context(|| format!("failed to write annotations to {}", json_path.display()));
    }

    Ok((pdf_path, json_path))
}

fn load_config(explicit: Option<&Path>) -> Result<AnnotatorConfig> {
    if let Some(path) = explicit {
        return storage::load_settings_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()));
    }

    let storage = match std::env::var_os(DATA_DIR_ENV) {
        Some(root) => Storage::with_root(root),
        None => match Storage::from_default_project() {
            Ok(storage) => storage,
            Err(err) => {
                log::warn!("using default settings: {err}");
                return Ok(AnnotatorConfig::default());
            }
        },
    };

    storage
        .load_settings()
        .with_context(|| format!("failed to load settings from {}", storage.settings_path().display()))
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn sibling(file: &Path, name: &str) -> PathBuf {
    file.with_file_name(name)
}
