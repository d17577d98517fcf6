use botchat::audio::{extension_for, FileRecorder};
use botchat::bots::BotType;
use botchat::conversation::WidgetEvent;
use botchat::gateway::{BotBackend, BotClient};
use botchat::widget::{ChatWidget, WidgetCommand};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, oneshot};

#[derive(Parser)]
#[command(name = "botchat")]
#[command(about = "Botchat CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: BOTCHAT_CONFIG_PATH or ~/.botchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Query the bot backend's health endpoint.
    Health {
        /// Config file path (default: BOTCHAT_CONFIG_PATH or ~/.botchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Chat with a bot in the terminal. Type /help for commands.
    Chat {
        /// Config file path (default: BOTCHAT_CONFIG_PATH or ~/.botchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Bot to open with: quote-auto or faq-bot (default from config)
        #[arg(long, short)]
        bot: Option<BotType>,

        /// Audio clip used as the microphone input for /mic
        #[arg(long, value_name = "FILE")]
        audio: Option<PathBuf>,

        /// Directory to save spoken replies to (when speech.speakResponses is set)
        #[arg(long, value_name = "DIR")]
        audio_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("botchat {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Health { config }) => {
            if let Err(e) = run_health(config).await {
                log::error!("health check failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            bot,
            audio,
            audio_out,
        }) => {
            if let Err(e) = run_chat(config, bot, audio, audio_out).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(botchat::config::default_config_path);
    let dir = botchat::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_health(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = botchat::config::load_config(config_path)?;
    botchat::init::require_initialized(&path)?;
    let client = BotClient::from_config(&config)?;
    let status = client.health_check().await?;
    println!("{}", status);
    Ok(())
}

const HELP: &str = "\
commands:
  /quote       switch to the auto quote bot
  /faq         switch to the FAQ bot
  /open        show or hide the chat window
  /min         minimize (keeps the conversation)
  /close       close (clears the conversation)
  /continue    dismiss the inactivity warning
  /mic         start recording, or stop and send
  /transcript  print the conversation so far
  /quit        exit";

async fn run_chat(
    config_path: Option<PathBuf>,
    bot: Option<BotType>,
    audio: Option<PathBuf>,
    audio_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (config, path) = botchat::config::load_config(config_path)?;
    botchat::init::require_initialized(&path)?;
    let backend: Arc<dyn BotBackend> = Arc::new(BotClient::from_config(&config)?);
    let mut widget = ChatWidget::from_config(&config, backend);
    if let Some(path) = audio {
        widget = widget.with_recorder(Box::new(FileRecorder::new(path)));
    }
    if let Some(dir) = &audio_out {
        std::fs::create_dir_all(dir)?;
    }

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(widget.run(cmd_rx, event_tx));

    let first = match bot {
        Some(bot) => WidgetCommand::SwitchBot(bot),
        None => WidgetCommand::ToggleChat,
    };
    cmd_tx
        .send(first)
        .await
        .map_err(|_| anyhow::anyhow!("chat widget stopped before start"))?;
    println!("{}", HELP);
    tokio::spawn(read_commands(cmd_tx));

    let mut spoken = 0usize;
    while let Some(event) = event_rx.recv().await {
        match event {
            WidgetEvent::ChatOpened { bot } => println!("-- {} --", bot.config().title),
            WidgetEvent::ChatHidden => println!("-- chat hidden (/open to show) --"),
            WidgetEvent::ChatClosed => println!("-- chat closed (/open to start over) --"),
            WidgetEvent::MessagesReset(messages) => {
                for m in messages.iter().filter(|m| !m.from_user) {
                    println!("< {}", m.message);
                }
            }
            WidgetEvent::MessageAppended(m) if m.from_user => {
                log::debug!("sent: {}", m.message);
            }
            WidgetEvent::MessageAppended(m) => println!("< {}", m.message),
            WidgetEvent::TypingChanged(true) => println!("..."),
            WidgetEvent::InactivityWarning { seconds_left } => println!(
                "!! are you still there? the chat closes in {}s (/continue to keep it open)",
                seconds_left
            ),
            WidgetEvent::Countdown { seconds_left } if seconds_left % 10 == 0 => {
                println!("!! closing in {}s", seconds_left)
            }
            WidgetEvent::Notice(text) => eprintln!("!! {}", text),
            WidgetEvent::RecordingChanged(on) => {
                println!("{}", if on { "[recording]" } else { "[stopped]" })
            }
            WidgetEvent::Speech(audio) => {
                if let Some(dir) = &audio_out {
                    spoken += 1;
                    let path = dir.join(format!("reply-{}.{}", spoken, extension_for(&audio.format)));
                    match std::fs::write(&path, &audio.bytes) {
                        Ok(()) => println!("[audio saved to {}]", path.display()),
                        Err(e) => log::warn!("saving {}: {}", path.display(), e),
                    }
                }
            }
            other => log::debug!("event: {:?}", other),
        }
    }

    handle.await?;
    Ok(())
}

/// Read stdin lines and forward them to the widget until /quit or EOF.
async fn read_commands(commands: mpsc::Sender<WidgetCommand>) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("reading stdin: {}", e);
                break;
            }
        };
        let input = line.trim();
        let cmd = match input.to_lowercase().as_str() {
            "" => continue,
            "/help" => {
                println!("{}", HELP);
                continue;
            }
            "/quit" | "/exit" => break,
            "/quote" => WidgetCommand::SwitchBot(BotType::QuoteAuto),
            "/faq" => WidgetCommand::SwitchBot(BotType::Faq),
            "/open" => WidgetCommand::ToggleChat,
            "/min" => WidgetCommand::Minimize,
            "/close" => WidgetCommand::Close,
            "/continue" => WidgetCommand::KeepActive,
            "/mic" => WidgetCommand::Microphone,
            "/transcript" => {
                let (tx, rx) = oneshot::channel();
                if commands.send(WidgetCommand::Transcript(tx)).await.is_err() {
                    break;
                }
                if let Ok(text) = rx.await {
                    print!("{}", text);
                }
                continue;
            }
            _ => WidgetCommand::Send(input.to_string()),
        };
        if commands.send(cmd).await.is_err() {
            break;
        }
    }
    let _ = commands.send(WidgetCommand::Shutdown).await;
}
