use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use ap_core::{ContentType, HistoryRecord, HistoryStorage};
use ap_inference::prelude::*;
use ap_scrapers::{init_logging, HttpFetcher};
use ap_web::prelude::*;
use base64::Engine;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Analyze conversations, images, documents and web pages with Gemini", long_about = None)]
pub struct Cli {
    /// History backend: memory or sqlite
    #[arg(long, env = "AP_STORAGE", default_value = "sqlite", global = true)]
    storage: String,
    #[arg(long, env = "AP_DB_PATH", default_value = ap_storage::DEFAULT_DB_PATH, global = true)]
    db_path: PathBuf,
    #[arg(long, env = "AP_PROVIDER", default_value = "gemini", global = true, help = "Model provider. Available providers: gemini (default), canned")]
    provider: String,
    /// Gemini model name
    #[arg(long, env = "AP_MODEL", global = true)]
    model: Option<String>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    /// Override the Gemini REST endpoint
    #[arg(long, env = "AP_GEMINI_BASE_URL", global = true)]
    gemini_base_url: Option<String>,
    /// Answer returned by every call of the canned provider
    #[arg(long, env = "AP_CANNED_RESPONSE", global = true)]
    canned_response: Option<String>,
    #[arg(long, env = "AP_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "AP_BIND", default_value = "127.0.0.1:3000")]
        bind: String,
        /// Comma separated token=user pairs
        #[arg(long, env = "AP_AUTH_TOKENS", default_value = "", hide_env_values = true)]
        auth_tokens: String,
    },
    /// Run a single analysis and print the JSON result
    Analyze {
        /// Record the result in this user's history
        #[arg(long, global = true)]
        user: Option<String>,
        #[command(subcommand)]
        target: AnalyzeTarget,
    },
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
enum AnalyzeTarget {
    Url {
        url: String,
    },
    Image {
        path: PathBuf,
        #[arg(long)]
        mime_type: Option<String>,
    },
    Document {
        path: PathBuf,
        #[arg(long)]
        mime_type: Option<String>,
    },
    Conversation {
        path: PathBuf,
        #[arg(long)]
        mime_type: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum HistoryCommands {
    List {
        #[arg(long)]
        user: String,
        #[arg(long = "type")]
        content_type: Option<ContentType>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    Delete {
        #[arg(long)]
        user: String,
        id: String,
    },
    Clear {
        #[arg(long)]
        user: String,
    },
}

impl Cli {
    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            provider: Some(self.provider.clone()),
            api_key: self.api_key.clone(),
            model_name: self.model.clone(),
            base_url: self.gemini_base_url.clone(),
            canned_response: self.canned_response.clone(),
        }
    }
}

/// Base64 payload and mime type of a local file
fn read_media(path: &Path, mime_type: Option<String>) -> anyhow::Result<(String, Option<String>)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mime_type = mime_type.or_else(|| mime_guess::from_path(path).first_raw().map(str::to_string));
    Ok((base64::engine::general_purpose::STANDARD.encode(bytes), mime_type))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn describe(record: &HistoryRecord) -> String {
    let input = record
        .input_data
        .url
        .as_deref()
        .or(record.input_data.prompt.as_deref())
        .unwrap_or("-");
    match &record.file_info {
        Some(info) => format!("{} [{}]", input, info.describe()),
        None => input.to_string(),
    }
}

async fn serve(
    service: AnalysisService,
    bind: &str,
    auth_tokens: &str,
) -> anyhow::Result<()> {
    let auth = AuthState::parse(auth_tokens)?;
    if auth.is_empty() {
        warn!("No auth tokens configured; history routes will reject every request");
    }

    let app = create_app(AppState::new(service, auth));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("🚀 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn analyze(
    service: &AnalysisService,
    user: Option<&str>,
    target: AnalyzeTarget,
) -> anyhow::Result<()> {
    match target {
        AnalyzeTarget::Url { url } => {
            let request = UrlRequest { url: Some(url) };
            print_json(&service.analyze_url(user, &request).await?)
        }
        AnalyzeTarget::Image { path, mime_type } => {
            let (data, mime_type) = read_media(&path, mime_type)?;
            let request = ImageRequest {
                image_data: Some(data),
                mime_type,
            };
            print_json(&service.analyze_image(user, &request).await?)
        }
        AnalyzeTarget::Document { path, mime_type } => {
            let (data, mime_type) = read_media(&path, mime_type)?;
            let request = DocumentRequest {
                document_data: Some(data),
                mime_type,
                file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            };
            print_json(&service.analyze_document(user, &request).await?)
        }
        AnalyzeTarget::Conversation { path, mime_type } => {
            let (data, mime_type) = read_media(&path, mime_type)?;
            let request = ConversationRequest {
                audio_data: Some(data),
                mime_type,
            };
            print_json(&service.analyze_conversation(user, &request).await?)
        }
    }
}

async fn history(storage: &dyn HistoryStorage, command: HistoryCommands) -> anyhow::Result<()> {
    match command {
        HistoryCommands::List {
            user,
            content_type,
            limit,
        } => {
            let page = storage.list(&user, limit, content_type).await?;
            for record in &page.data {
                println!(
                    "{}  {}  {:<12}  {}",
                    record.id,
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.content_type.as_str(),
                    describe(record)
                );
            }
            println!(
                "{} of {} item(s){}",
                page.data.len(),
                page.count,
                if page.has_more { ", more available" } else { "" }
            );
        }
        HistoryCommands::Delete { user, id } => {
            if !storage.delete(&user, &id).await? {
                bail!("Failed to delete history item {}", id);
            }
            println!("Deleted {}", id);
        }
        HistoryCommands::Clear { user } => {
            let deleted = storage.clear(&user).await?;
            println!("Deleted {} item(s)", deleted);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let storage = ap_storage::create_storage(&cli.storage, Some(cli.db_path.as_path())).await?;
    info!("✨ Storage initialized successfully (using {})", cli.storage);

    let model_config = cli.model_config();
    let command = match cli.command {
        Commands::History { command } => return history(storage.as_ref(), command).await,
        command => command,
    };

    let model: Option<Arc<dyn GenerativeModel>> = match create_model(&model_config) {
        Ok(model) => {
            info!("🧠 Inference model initialized successfully (using {})", model.name());
            Some(model)
        }
        Err(e) if matches!(command, Commands::Serve { .. }) => {
            warn!("Starting without a model, analysis routes will fail: {}", e);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let service = AnalysisService::new(model, Arc::new(HttpFetcher::new()?), storage);

    match command {
        Commands::Serve { bind, auth_tokens } => serve(service, &bind, &auth_tokens).await,
        Commands::Analyze { user, target } => analyze(&service, user.as_deref(), target).await,
        Commands::History { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "ap",
            "--storage",
            "memory",
            "analyze",
            "--user",
            "alice",
            "image",
            "cat.png",
        ])
        .unwrap();
        assert_eq!(cli.storage, "memory");
        match cli.command {
            Commands::Analyze {
                user,
                target: AnalyzeTarget::Image { path, mime_type },
            } => {
                assert_eq!(user.as_deref(), Some("alice"));
                assert_eq!(path, PathBuf::from("cat.png"));
                assert_eq!(mime_type, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_model_config_from_flags() {
        let cli = Cli::try_parse_from([
            "ap",
            "--provider",
            "canned",
            "--canned-response",
            r#"{"title": "Fixed"}"#,
            "--gemini-base-url",
            "http://localhost:8080/v1beta",
            "history",
            "clear",
            "--user",
            "alice",
        ])
        .unwrap();
        let config = cli.model_config();
        assert_eq!(config.canned_response.as_deref(), Some(r#"{"title": "Fixed"}"#));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1beta"));

        let model = create_model(&config).unwrap();
        assert_eq!(model.name(), "Canned");
    }

    #[tokio::test]
    async fn test_canned_provider_answers_with_flag_text() {
        let cli = Cli::try_parse_from([
            "ap",
            "--provider",
            "canned",
            "--canned-response",
            r#"{"description": "Fixed answer"}"#,
            "analyze",
            "url",
            "https://example.com",
        ])
        .unwrap();
        let model = create_model(&cli.model_config()).unwrap();
        let text = model.generate(&[Part::text("hi")]).await.unwrap();
        assert_eq!(text, r#"{"description": "Fixed answer"}"#);
    }

    #[test]
    fn test_parse_history_type() {
        let cli = Cli::try_parse_from(["ap", "history", "list", "--user", "bob", "--type", "url"]).unwrap();
        match cli.command {
            Commands::History {
                command: HistoryCommands::List { content_type, limit, .. },
            } => {
                assert_eq!(content_type, Some(ContentType::Url));
                assert_eq!(limit, 10);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["ap", "history", "list", "--user", "bob", "--type", "video"]).is_err());
    }

    #[test]
    fn test_describe_record() {
        let record = HistoryRecord::new(
            "alice",
            ap_core::NewHistoryRecord {
                content_type: ContentType::Document,
                input_data: ap_core::InputData::prompt("Document analysis"),
                output_data: "{}".to_string(),
                file_info: Some(ap_core::FileInfo {
                    name: "a.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    size: Some(1024 * 1024),
                }),
            },
        );
        assert_eq!(describe(&record), "Document analysis [a.pdf (application/pdf) - 1.00MB]");
    }

    #[test]
    fn test_read_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"hello").unwrap();

        let (data, mime_type) = read_media(&path, None).unwrap();
        assert_eq!(data, "aGVsbG8=");
        assert_eq!(mime_type.as_deref(), Some("text/plain"));

        let (_, mime_type) = read_media(&path, Some("application/pdf".to_string())).unwrap();
        assert_eq!(mime_type.as_deref(), Some("application/pdf"));

        let slides = dir.path().join("deck.PPTX");
        std::fs::write(&slides, b"pk").unwrap();
        let (_, mime_type) = read_media(&slides, None).unwrap();
        assert_eq!(
            mime_type.as_deref(),
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        );

        let unknown = dir.path().join("blob.zzz");
        std::fs::write(&unknown, b"?").unwrap();
        assert_eq!(read_media(&unknown, None).unwrap().1, None);
    }
}
