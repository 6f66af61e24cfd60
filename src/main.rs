use sss_tutor::cli::{Cli, Commands, ConfigAction};
use sss_tutor::config::{Config, ConfigValidator};
use sss_tutor::curriculum::{capitalize, Subject, SubjectCatalog};
use sss_tutor::error::{Result, TutorError};
use sss_tutor::index::{IndexCacheManager, IndexOrigin};
use sss_tutor::lesson::{OpenAiCompatibleGenerator, Pace, SssLevel};
use sss_tutor::server::{self, AppState, SourceDocument};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Serve { host, port } => {
            cmd_serve(cli.config, host, port).await?;
        }
        Commands::Rebuild { subject } => {
            cmd_rebuild(cli.config, subject).await?;
        }
        Commands::Status { subject, json } => {
            cmd_status(cli.config, subject, json)?;
        }
        Commands::Lesson {
            topic,
            level,
            pace,
            subject,
        } => {
            cmd_lesson(cli.config, &topic, level, pace, subject).await?;
        }
        Commands::Subjects => {
            cmd_subjects(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "sss_tutor=debug"
    } else {
        "sss_tutor=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn cmd_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let api_key = config.llm_api_key()?;
    let generator = Arc::new(OpenAiCompatibleGenerator::from_config(&config.llm, &api_key));

    tracing::info!(
        "Generation model: {} via {}",
        config.llm.model,
        config.llm.api_base()
    );

    let state = AppState::from_config(&config, generator)?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    server::serve(state, &host, port).await
}

async fn cmd_rebuild(config_path: Option<PathBuf>, subject: Option<String>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let catalog = SubjectCatalog::from_config(&config)?;
    let subject = resolve(&catalog, subject)?;
    let cache = Arc::new(IndexCacheManager::from_config(&config)?);

    println!("Rebuilding {} index from {}...", subject.name, subject.source.display());

    let task_cache = cache.clone();
    let task_subject = subject.clone();
    let ready = tokio::task::spawn_blocking(move || task_cache.ensure_ready(&task_subject, true))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    println!("✓ Index rebuilt: {} chunks", ready.index.chunk_count());
    if let IndexOrigin::Built {
        persisted: false, ..
    } = ready.origin
    {
        println!("⚠ Index could not be saved to disk; it will be rebuilt on next start");
    }
    print_metadata(&cache, &subject)
}

fn cmd_status(config_path: Option<PathBuf>, subject: Option<String>, json: bool) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let catalog = SubjectCatalog::from_config(&config)?;
    let subject = resolve(&catalog, subject)?;
    let cache = IndexCacheManager::from_config(&config)?;
    let status = cache.status(&subject).map_err(anyhow::Error::from)?;

    if json {
        let body = serde_json::json!({
            "subject": status.subject,
            "source_file": status.source,
            "index_on_disk": status.index_on_disk,
            "metadata": status.metadata,
        });
        let rendered = serde_json::to_string_pretty(&body)
            .map_err(|e| TutorError::json(e, "Failed to render status"))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("Subject: {}", status.subject);
    println!("  Source: {}", subject.source.display());
    println!(
        "  Index on disk: {}",
        if status.index_on_disk { "yes" } else { "no" }
    );
    match status.metadata {
        Some(metadata) => {
            println!(
                "  Last build: {}",
                metadata.last_build.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("  Pages: {}", metadata.num_documents);
            println!("  Chunks: {}", metadata.num_chunks);
            println!("  Fingerprint: {}", metadata.file_hash);
        }
        None => println!("  Not built yet. Run 'sss-tutor rebuild' to build it."),
    }

    Ok(())
}

async fn cmd_lesson(
    config_path: Option<PathBuf>,
    topic: &str,
    level: SssLevel,
    pace: Pace,
    subject: Option<String>,
) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(TutorError::Config("Topic must not be empty".to_string()));
    }

    let config = Config::load_or_default(config_path)?;
    let api_key = config.llm_api_key()?;
    let generator = Arc::new(OpenAiCompatibleGenerator::from_config(&config.llm, &api_key));
    let state = AppState::from_config(&config, generator)?;

    let subject = subject.as_deref().map(capitalize);
    let lesson = state
        .orchestrator
        .generate(subject.as_deref(), topic, level, pace)
        .await
        .map_err(anyhow::Error::from)?;

    println!("{}", "=".repeat(80));
    println!(
        "LESSON: {} - {} ({}, {} pace)",
        lesson.subject,
        lesson.topic,
        lesson.level,
        lesson.pace.as_str().to_uppercase()
    );
    println!("{}", "=".repeat(80));
    println!("{}", lesson.lesson_notes);
    println!("{}", "-".repeat(80));
    println!("Sources:");
    for result in &lesson.sources {
        let doc = SourceDocument::from(result);
        match doc.page {
            Some(page) => println!("  - {} (page {})", doc.source, page),
            None => println!("  - {}", doc.source),
        }
    }

    Ok(())
}

fn cmd_subjects(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let catalog = SubjectCatalog::from_config(&config)?;

    if catalog.is_empty() {
        println!(
            "No subjects configured or found under {}",
            config.storage.curriculum_root.display()
        );
        return Ok(());
    }

    println!("Subjects ({}):", catalog.len());
    for subject in catalog.iter() {
        let marker = if subject.name.eq_ignore_ascii_case(catalog.default_subject_name()) {
            " (default)"
        } else {
            ""
        };
        let present = if subject.source.is_file() { "" } else { " [missing]" };
        println!(
            "  {}{}: {}{}",
            subject.name,
            marker,
            subject.source.display(),
            present
        );
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = Config::load_or_default(config_path)?;
            let value = toml::Value::try_from(&config)
                .map_err(|e| TutorError::Config(format!("Failed to render config: {}", e)))?;

            let rendered = match section {
                Some(section) => {
                    let table = value.get(&section).ok_or_else(|| {
                        TutorError::Config(format!("Unknown config section: {}", section))
                    })?;
                    toml::to_string_pretty(table)?
                }
                None => toml::to_string_pretty(&value)?,
            };
            println!("{}", rendered);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            ConfigValidator::validate(&config)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Subjects: {}", config.subjects.len());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| TutorError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn resolve(catalog: &SubjectCatalog, subject: Option<String>) -> Result<Subject> {
    let requested = subject.as_deref().map(capitalize);
    catalog.resolve(requested.as_deref()).cloned()
}

fn print_metadata(cache: &IndexCacheManager, subject: &Subject) -> Result<()> {
    match cache.metadata(subject).map_err(anyhow::Error::from)? {
        Some(metadata) => {
            println!("  Last build: {}", metadata.last_build.to_rfc3339());
            println!("  Pages: {}", metadata.num_documents);
            println!("  Chunks: {}", metadata.num_chunks);
        }
        None => println!("  No metadata recorded"),
    }
    Ok(())
}
