use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use studydesk_core::{ContentSource, Outcome, PlaybackEvent, Settled, StudyDesk};
use studydesk_service::config::Config;
use studydesk_service::console;
use studydesk_service::process_player::ProcessPlayer;
use studydesk_service::types::{ChatMode, SourceType, UploadFile, VideoKind};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(name = "studydesk", about = "Terminal client for the course tutoring backend")]
struct Cli {
    /// Backend base URL; overrides STUDYDESK_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the tutor questions about the course material
    Chat {
        /// normal, exam or simple
        #[arg(long, default_value = "normal")]
        mode: ChatMode,
        /// Continue a stored session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },
    /// Listen to a teacher/student dialogue on a topic
    Dialogue {
        topic: String,
        /// Ground the dialogue in a chat session
        #[arg(long)]
        session: Option<String>,
    },
    /// Manage course material
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },
    /// Explainer videos
    Videos {
        #[command(subcommand)]
        action: VideosAction,
    },
    /// List stored chat sessions, or print one
    Sessions { id: Option<String> },
    /// Check that the backend is up
    Health,
}

#[derive(Subcommand)]
enum SourcesAction {
    List,
    /// Add a YouTube video or a PDF link
    AddUrl {
        url: String,
        /// youtube or pdf_url
        #[arg(long, default_value = "youtube")]
        kind: SourceType,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Poll until the backend has processed the source
        #[arg(long)]
        wait: bool,
    },
    /// Upload a PDF (50 MiB at most)
    Upload {
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        wait: bool,
    },
    Delete {
        id: String,
    },
    /// Rebuild the backend's index from the current material
    Reingest,
}

#[derive(Subcommand)]
enum VideosAction {
    List,
    Generate {
        topic: String,
        /// concept, exam_tips or definition
        #[arg(long, default_value = "concept")]
        kind: VideoKind,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Parse Command-Line Arguments ---
    let cli = Cli::parse();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    // --- 3. Initialize Logging ---
    // Logs go to stderr so they do not interleave with the conversation on stdout.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("Using backend at {}", config.api_url);

    // --- 4. Build the desk ---
    let client = studydesk_gateway::connect_with_config(config.gateway_config())
        .context("Failed to create backend client")?;
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let player = Arc::new(ProcessPlayer::new(&config.audio_player, event_tx));
    let desk = Arc::new(StudyDesk::new(
        Arc::new(client),
        player,
        config.settle_policy(),
    ));

    let result = tokio::select! {
        result = run(cli.command, desk.clone(), event_rx) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
            Ok(())
        }
    };
    desk.dialogue.stop().await;
    result
}

async fn run(
    command: Command,
    desk: Arc<StudyDesk>,
    events: mpsc::UnboundedReceiver<PlaybackEvent>,
) -> Result<()> {
    match command {
        Command::Chat { mode, session } => chat(&desk, mode, session).await,
        Command::Dialogue { topic, session } => dialogue(desk, &topic, session, events).await,
        Command::Sources { action } => sources(&desk, action).await,
        Command::Videos { action } => videos(&desk, action).await,
        Command::Sessions { id } => sessions(&desk, id).await,
        Command::Health => health(&desk).await,
    }
}

// Splits "/cmd arg" into ("/cmd", "arg").
fn split_command(line: &str) -> (&str, &str) {
    line.split_once(' ')
        .map(|(cmd, arg)| (cmd, arg.trim()))
        .unwrap_or((line, ""))
}

async fn chat(desk: &StudyDesk, mode: ChatMode, session: Option<String>) -> Result<()> {
    desk.chat.set_mode(mode).await;
    if let Some(id) = session {
        let loaded = desk
            .chat
            .resume(&id)
            .await
            .with_context(|| format!("Failed to load session {id}"))?;
        for message in desk.chat.snapshot().await.transcript {
            println!("{}", console::message(&message));
        }
        println!("-- resumed {id} ({loaded} messages)");
    }
    println!("Ask a question. Commands: /mode <normal|exam|simple>, /reset, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match split_command(line) {
            ("", _) => {}
            ("/quit", _) => break,
            ("/reset", _) => {
                desk.chat.reset().await;
                println!("-- new conversation");
            }
            ("/mode", arg) => match arg.parse::<ChatMode>() {
                Ok(mode) => {
                    desk.chat.set_mode(mode).await;
                    println!("-- mode: {mode}");
                }
                Err(e) => println!("{e}"),
            },
            _ => match desk.chat.send(line).await {
                Ok(_) => {
                    if let Some(reply) = desk.chat.snapshot().await.transcript.last() {
                        println!("{}", console::message(reply));
                    }
                }
                Err(e) => println!("{e}"),
            },
        }
    }

    if let Some(id) = desk.chat.snapshot().await.session_id {
        println!("-- session {id}");
    }
    Ok(())
}

async fn dialogue(
    desk: Arc<StudyDesk>,
    topic: &str,
    session: Option<String>,
    mut events: mpsc::UnboundedReceiver<PlaybackEvent>,
) -> Result<()> {
    // Feed player notifications back into the engine while the dialogue runs.
    let forward = {
        let desk = desk.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                desk.dialogue.handle_playback_event(event).await;
            }
        })
    };
    let result = run_dialogue(&desk, topic, session).await;
    desk.dialogue.stop().await;
    forward.abort();
    result
}

async fn run_dialogue(desk: &StudyDesk, topic: &str, session: Option<String>) -> Result<()> {
    let engine = &desk.dialogue;
    let Outcome::Applied(opened) = engine
        .start(topic, session)
        .await
        .context("Failed to start dialogue")?
    else {
        return Ok(());
    };
    for (index, turn) in opened.turns.iter().enumerate() {
        println!("{}", console::turn(index, turn));
    }
    println!("Enter: next turn. Type a question to steer it. /play <n>, /pause, /stop");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match split_command(line) {
            ("/stop", _) | ("/quit", _) => break,
            ("/pause", _) => {
                engine.pause().await;
            }
            ("/play", arg) => match arg.parse::<usize>() {
                Ok(index) => {
                    if let Err(e) = engine.toggle(index).await {
                        println!("{e}");
                    }
                }
                Err(_) => println!("usage: /play <turn number>"),
            },
            _ => {
                let question = (!line.is_empty()).then_some(line);
                match engine.continue_dialogue(question).await {
                    Ok(Outcome::Applied(turn)) => {
                        let index = engine
                            .snapshot()
                            .await
                            .session
                            .map(|s| s.turns.len().saturating_sub(1))
                            .unwrap_or_default();
                        println!("{}", console::turn(index, &turn));
                        if turn.audio_url.is_some() {
                            if let Err(e) = engine.play_turn(index).await {
                                println!("{e}");
                            }
                        }
                    }
                    Ok(Outcome::Stale) => break,
                    Err(e) => println!("{e}"),
                }
            }
        }
    }
    Ok(())
}

async fn sources(desk: &StudyDesk, action: SourcesAction) -> Result<()> {
    let content = &desk.content;
    match action {
        SourcesAction::List => {
            let sources = content
                .refresh()
                .await
                .context("Failed to load content sources")?;
            if sources.is_empty() {
                println!("No content sources yet.");
            }
            for source in &sources {
                println!("{}", console::source(source));
            }
        }
        SourcesAction::AddUrl {
            url,
            kind,
            title,
            description,
            wait,
        } => {
            let source = content
                .add_url(kind, &url, title.as_deref(), description.as_deref())
                .await?;
            report_added(desk, &source, wait).await?;
        }
        SourcesAction::Upload {
            path,
            title,
            description,
            wait,
        } => {
            let file = UploadFile::from_path(&path).await?;
            let source = content
                .add_file(file, title.as_deref(), description.as_deref())
                .await?;
            report_added(desk, &source, wait).await?;
        }
        SourcesAction::Delete { id } => {
            content
                .delete(&id)
                .await
                .with_context(|| format!("Failed to remove {id}"))?;
            if let Some(notice) = content.snapshot().await.notice {
                println!("{notice}");
            }
        }
        SourcesAction::Reingest => {
            println!("{}", content.reingest().await?);
        }
    }
    Ok(())
}

async fn report_added(desk: &StudyDesk, source: &ContentSource, wait: bool) -> Result<()> {
    println!("{}", console::source(source));
    if let Some(notice) = desk.content.snapshot().await.notice {
        println!("{notice}");
    }
    if !wait {
        return Ok(());
    }
    match desk.content.await_settled(&source.id).await? {
        Settled::Status(status) => println!("{}: {status}", source.id),
        Settled::Removed => println!("{} was removed by the backend", source.id),
        Settled::TimedOut => println!("{} is still processing; check again with `sources list`", source.id),
    }
    Ok(())
}

async fn videos(desk: &StudyDesk, action: VideosAction) -> Result<()> {
    match action {
        VideosAction::List => {
            let summaries = desk
                .videos
                .refresh()
                .await
                .context("Failed to load video summaries")?;
            if summaries.is_empty() {
                println!("No videos yet.");
            }
            for summary in &summaries {
                let url = summary
                    .video_url
                    .as_deref()
                    .and_then(|asset| desk.asset_url(asset).ok());
                println!("{}", console::video(summary, url.as_deref()));
            }
        }
        VideosAction::Generate { topic, kind } => {
            let job = desk.videos.submit(&topic, kind).await?;
            if desk.videos.awaiting().await.contains(&job) {
                println!("{}", console::awaiting(&job));
            } else {
                println!("Video {} is ready.", job.video_id);
            }
        }
    }
    Ok(())
}

async fn sessions(desk: &StudyDesk, id: Option<String>) -> Result<()> {
    match id {
        None => {
            for summary in desk.sessions().await.context("Failed to list sessions")? {
                println!("{}", console::session(&summary));
            }
        }
        Some(id) => {
            desk.chat
                .resume(&id)
                .await
                .with_context(|| format!("Failed to load session {id}"))?;
            for message in desk.chat.snapshot().await.transcript {
                println!("{}", console::message(&message));
            }
        }
    }
    Ok(())
}

async fn health(desk: &StudyDesk) -> Result<()> {
    let status = desk.health().await.context("Backend is unreachable")?;
    let index = if status.rag_initialized {
        "index ready"
    } else {
        "index not built"
    };
    println!("{} ({index})", status.status);
    if !status.is_healthy() {
        bail!("backend reports '{}'", status.status);
    }
    Ok(())
}
