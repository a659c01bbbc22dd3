//! Offline PDF Translator CLI - translate PDF documents with locally
//! installed language packages.

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use offline_translator_core::pdf::{encode_png, encode_webp};
use offline_translator_core::translator::ArgosEngine;
use offline_translator_core::{
    AppConfig, JobEvent, JobState, Lang, LanguagePair, PagedPreviewCache, TranslationPipeline,
    Translator, TranslatorSession, create_translator, language_label, supported_languages,
};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "offline-translate")]
#[command(author, version, about = "Translate PDF documents offline", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Argos translate command
    #[arg(long, global = true, env = "ARGOS_TRANSLATE")]
    argos_translate: Option<String>,

    /// Argos package manager command
    #[arg(long, global = true, env = "ARGOSPM")]
    argospm: Option<String>,

    /// Tesseract command used for OCR
    #[arg(long, global = true, env = "TESSERACT")]
    tesseract: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a PDF into a new, reflowed PDF
    Translate {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file (default from config: translated.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language code
        #[arg(short = 's', long)]
        source: Option<String>,

        /// Target language code
        #[arg(short = 't', long)]
        target: Option<String>,

        /// Also copy the translated PDF here
        #[arg(long)]
        save_as: Option<PathBuf>,
    },

    /// Export one rendered page of a PDF as an image
    Preview {
        /// Input PDF file
        input: PathBuf,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Render resolution (default from config)
        #[arg(long)]
        dpi: Option<u32>,

        /// Image format
        #[arg(long, value_enum, default_value = "png")]
        format: ImageFormat,

        /// Output image (default: <input>-page<N>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List installed translation routes
    Routes {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install language packages (default: the required pairs from config)
    Install {
        /// Pairs to install, written as `from:to`
        #[arg(value_parser = parse_pair)]
        pairs: Vec<LanguagePair>,
    },

    /// Translate plain text (argument or stdin)
    Text {
        /// Source language code
        #[arg(short = 's', long)]
        source: Option<String>,

        /// Target language code
        #[arg(short = 't', long)]
        target: Option<String>,

        /// Text to translate; read from stdin when omitted
        text: Option<String>,
    },

    /// List the language codes the tools know about
    Languages,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImageFormat {
    Png,
    Webp,
}

impl ImageFormat {
    const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

fn parse_pair(value: &str) -> std::result::Result<LanguagePair, String> {
    let (source, target) = value
        .split_once(':')
        .ok_or_else(|| format!("expected `from:to`, got `{value}`"))?;
    if source.is_empty() || target.is_empty() {
        return Err(format!("expected `from:to`, got `{value}`"));
    }
    Ok(LanguagePair::new(source, target))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    if let Some(command) = args.argos_translate {
        config.translator.translate_command = command;
    }
    if let Some(command) = args.argospm {
        config.translator.package_command = command;
    }
    if let Some(command) = args.tesseract {
        config.ocr.command = command;
    }

    match args.command {
        Command::Translate {
            input,
            output,
            source,
            target,
            save_as,
        } => {
            if let Some(source) = source {
                config.source_lang = Lang::new(source);
            }
            if let Some(target) = target {
                config.target_lang = Lang::new(target);
            }
            translate(&config, &input, output, save_as.as_deref()).await
        }
        Command::Preview {
            input,
            page,
            dpi,
            format,
            output,
        } => preview(&config, &input, page, dpi, format, output),
        Command::Routes { json } => routes(&config, json).await,
        Command::Install { pairs } => install(&config, pairs).await,
        Command::Text {
            source,
            target,
            text,
        } => {
            let source = source.map_or_else(|| config.source_lang.clone(), Lang::new);
            let target = target.map_or_else(|| config.target_lang.clone(), Lang::new);
            translate_text(&config, &source, &target, text).await
        }
        Command::Languages => {
            #[allow(clippy::print_stdout)]
            for lang in supported_languages() {
                println!("{}", lang.label());
            }
            Ok(())
        }
    }
}

async fn translate(
    config: &AppConfig,
    input: &Path,
    output: Option<PathBuf>,
    save_as: Option<&Path>,
) -> Result<()> {
    let translator = create_translator(&config.translator)
        .await
        .context("Failed to discover installed translation routes")?;
    let pipeline = TranslationPipeline::from_config(config, translator)
        .context("Failed to set up the PDF writer")?;
    let mut session = TranslatorSession::from_config(config, Arc::new(pipeline));
    if let Some(output) = output {
        session.set_output_path(output);
    }

    let pages = session
        .select_input(input)
        .with_context(|| format!("Failed to load PDF: {}", input.display()))?;
    info!("Document has {} pages", pages);

    session.start_translation().context("Failed to start translation")?;

    let pb = ProgressBar::new(100);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    while let Some(message) = session.next_message().await {
        if let JobEvent::Stage(stage) = &message.event {
            pb.set_message(stage.to_string());
        }
        session.apply(message);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        pb.set_position(session.progress().round() as u64);
    }

    let notice = session.take_notice();
    match session.state() {
        JobState::Succeeded(path) => {
            pb.finish_with_message("Translation complete");
            if let Some(notice) = notice {
                pb.println(notice.text());
            }
            info!(
                "Translated PDF has {} pages",
                session.translated().total_pages()
            );
            let path = path.clone();

            if let Some(destination) = save_as {
                session
                    .save_translated(destination)
                    .with_context(|| format!("Failed to save copy to {}", destination.display()))?;
            }

            // CLI output is intentional
            #[allow(clippy::print_stdout)]
            {
                println!("Translated PDF saved to: {}", path.display());
                if let Some(destination) = save_as {
                    println!("Copy saved to: {}", destination.display());
                }
            }
            Ok(())
        }
        JobState::Failed(failure) => {
            pb.abandon_with_message("Translation failed");
            if failure.error.is_missing_route() {
                warn!("Run `offline-translate install` to add the missing language package");
            }
            bail!("{failure}")
        }
        other => bail!("Translation ended in unexpected state {other:?}"),
    }
}

fn preview(
    config: &AppConfig,
    input: &Path,
    page: usize,
    dpi: Option<u32>,
    format: ImageFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let dpi = dpi.unwrap_or(config.preview_dpi);
    let mut cache = PagedPreviewCache::with_mupdf(dpi, 1);

    let total = cache
        .open(input)
        .with_context(|| format!("Failed to load PDF: {}", input.display()))?;
    let image = cache
        .show(page)
        .with_context(|| format!("Failed to render page {page} of {total}"))?;

    let bytes = match format {
        ImageFormat::Png => encode_png(image)?,
        ImageFormat::Webp => encode_webp(image),
    };

    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("preview");
        input.with_file_name(format!("{stem}-page{page}.{}", format.extension()))
    });

    std::fs::write(&output, bytes)
        .with_context(|| format!("Failed to write image: {}", output.display()))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{} ({}) -> {}", cache.cursor(), input.display(), output.display());
    }
    Ok(())
}

async fn routes(config: &AppConfig, json: bool) -> Result<()> {
    let translator = create_translator(&config.translator)
        .await
        .context("Failed to discover installed translation routes")?;
    let installed: Vec<&LanguagePair> = translator.installed().pairs().collect();

    #[allow(clippy::print_stdout)]
    {
        if json {
            println!("{}", serde_json::to_string_pretty(&installed)?);
            return Ok(());
        }

        let engine = translator.engine_info();
        println!(
            "Engine: {} ({})",
            engine.name,
            if engine.offline { "offline" } else { "online" }
        );
        if installed.is_empty() {
            println!("No translation routes installed");
        }
        for pair in &installed {
            println!(
                "{} -> {}",
                language_label(pair.source.as_str()),
                language_label(pair.target.as_str())
            );
        }

        let missing = missing_pairs(&translator, &config.translator.required_pairs);
        if !missing.is_empty() {
            println!();
            println!("Missing required routes:");
            for pair in missing {
                println!("  {pair}");
            }
        }
    }
    Ok(())
}

fn missing_pairs(translator: &Translator, required: &[LanguagePair]) -> Vec<LanguagePair> {
    required
        .iter()
        .filter(|pair| !translator.installed().contains(&pair.source, &pair.target))
        .cloned()
        .collect()
}

async fn install(config: &AppConfig, pairs: Vec<LanguagePair>) -> Result<()> {
    let engine = Arc::new(ArgosEngine::from_config(&config.translator));
    let mut translator = Translator::discover(engine.clone())
        .await
        .context("Failed to discover installed translation routes")?;

    let wanted = if pairs.is_empty() {
        config.translator.required_pairs.clone()
    } else {
        pairs
    };
    let missing = missing_pairs(&translator, &wanted);

    if missing.is_empty() {
        #[allow(clippy::print_stdout)]
        {
            println!("All requested routes are already installed");
        }
        return Ok(());
    }

    engine
        .update_index()
        .await
        .context("Failed to update the package index")?;

    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(missing.len() as u64);
    for pair in &missing {
        pb.set_message(pair.to_string());
        engine
            .install(pair)
            .await
            .with_context(|| format!("Failed to install {pair}"))?;
        pb.inc(1);
    }
    pb.finish_with_message("Packages installed");

    translator
        .refresh_routes()
        .await
        .context("Failed to refresh installed routes")?;

    let still_missing = missing_pairs(&translator, &missing);
    if !still_missing.is_empty() {
        bail!(
            "Routes still unavailable after install: {}",
            still_missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    #[allow(clippy::print_stdout)]
    {
        println!("{} routes installed", translator.installed().len());
    }
    Ok(())
}

async fn translate_text(
    config: &AppConfig,
    source: &Lang,
    target: &Lang,
    text: Option<String>,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read text from stdin")?;
            buffer
        }
    };

    if text.trim().is_empty() {
        bail!("No text found to translate");
    }

    let translator = create_translator(&config.translator)
        .await
        .context("Failed to discover installed translation routes")?;

    let translated = translator
        .translate_text(source, target, &text)
        .await
        .with_context(|| format!("Failed to translate {source} -> {target}"))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{translated}");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("ko:en"), Ok(LanguagePair::new("ko", "en")));
        assert!(parse_pair("ko").is_err());
        assert!(parse_pair(":en").is_err());
    }

    #[test]
    fn test_args_parse_translate() {
        let args = Args::try_parse_from([
            "offline-translate",
            "-vv",
            "translate",
            "in.pdf",
            "-s",
            "de",
            "--save-as",
            "copy.pdf",
        ])
        .unwrap();

        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Translate {
                input,
                source,
                save_as,
                ..
            } => {
                assert_eq!(input, PathBuf::from("in.pdf"));
                assert_eq!(source.as_deref(), Some("de"));
                assert_eq!(save_as, Some(PathBuf::from("copy.pdf")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_args_parse_install_pairs() {
        let args =
            Args::try_parse_from(["offline-translate", "install", "ko:en", "en:ko"]).unwrap();
        match args.command {
            Command::Install { pairs } => assert_eq!(pairs.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
