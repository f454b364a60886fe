use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bacheca_client::{
    Board, BoardConfig, Command, ConfigError, HtmlFileView, LocalStorage, MemoryStore, MessageStore,
    RestStore, TelegramNotifier,
};
use bacheca_core::RenderOptions;
use clap::Parser;
use time::UtcOffset;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "bacheca")]
#[command(about = "Message board with Telegram notifications and live updates")]
#[command(version)]
struct Cli {
    /// File di configurazione TOML (default: <config dir>/bacheca/config.toml se esiste)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pagina HTML riscritta ad ogni cambio di stato
    #[arg(long, default_value = "bacheca.html")]
    output: PathBuf,

    /// Usa uno store in memoria invece di quello configurato
    #[arg(long)]
    memory: bool,

    /// Aggiunge alla pagina un meta refresh ogni N secondi
    #[arg(long)]
    refresh: Option<u32>,
}

fn init_tracing(config: &BoardConfig) {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match config.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: BACHECA_LOG='{}' is not a valid tracing filter ({}); falling back to 'info'",
                    config.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    // stdout è dell'utente: i log vanno su stderr
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // l'offset locale va letto prima di avviare altri thread
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let config = BoardConfig::load(cli.config.as_deref()).context("load configuration")?;
    init_tracing(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bacheca starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    let result = runtime.block_on(async move {
        let config = Arc::new(config);
        let notifier = Arc::new(TelegramNotifier::from_config(&config).context("build telegram client")?);
        let view = HtmlFileView::new(&cli.output, RenderOptions { offset, refresh_secs: cli.refresh });
        tracing::info!(output = %cli.output.display(), "rendering page");

        if cli.memory {
            tracing::warn!("using in-memory store: messages are lost on exit");
            let store = Ok(Arc::new(MemoryStore::new()));
            run(config, store, notifier, view).await;
        } else {
            let store = RestStore::initialize(&config).map(Arc::new);
            run(config, store, notifier, view).await;
        }
        Ok::<(), anyhow::Error>(())
    });
    // una lettura di stdin ancora pendente non deve bloccare l'uscita
    runtime.shutdown_background();
    result
}

async fn run<S: MessageStore>(
    config: Arc<BoardConfig>,
    store: Result<Arc<S>, ConfigError>,
    notifier: Arc<TelegramNotifier>,
    view: HtmlFileView,
) {
    let mut board = Board::new(config, store, notifier, view);
    match LocalStorage::open_default() {
        Ok(storage) => board = board.with_storage(storage),
        Err(e) => tracing::warn!("name will not be remembered: {}", e),
    }

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(read_commands(board.saved_name().unwrap_or_default(), tx));

    board.start().await;
    board.run(rx).await;
    tracing::info!("bye");
}

/// Righe da stdin: testo semplice = messaggio; `/name`, `/reload`, `/clear`, `/quit`.
async fn read_commands(mut name: String, tx: mpsc::UnboundedSender<Command>) {
    if name.is_empty() {
        eprintln!("Set your name with /name <your name>, then type a message and press enter.");
    } else {
        eprintln!("Posting as {}. Type a message and press enter (/quit to exit).", name);
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("cannot read stdin: {}", e);
                break;
            }
        };
        let command = match line.trim() {
            "" => continue,
            "/quit" => Command::Quit,
            "/reload" => Command::Reload,
            "/clear" => Command::ClearLog,
            cmd if cmd.starts_with("/name") => {
                name = cmd.trim_start_matches("/name").trim().to_string();
                eprintln!("Posting as {}.", name);
                continue;
            }
            text => Command::Submit { name: name.clone(), message: text.to_string() },
        };
        let quit = command == Command::Quit;
        if tx.send(command).is_err() || quit {
            return;
        }
    }
    let _ = tx.send(Command::Quit);
}
