use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_assistant_gateway::{ApiServerBuilder, AudioInput, Config, RequestPipeline, lookup};

/// Voice assistant - spoken questions in, spoken answers out
#[derive(Parser)]
#[command(name = "voice-assistant", version, about)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(long, env = "VOICE_ASSISTANT_PORT")]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long, env = "VOICE_ASSISTANT_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Run one audio file through the pipeline and print the reply
    Ask {
        /// Audio file (wav, mp3, webm, ...)
        file: PathBuf,
        /// Write the spoken reply to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Probe the lookup store with a query
    Lookup {
        /// Text to match, as if it were a transcript
        query: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_assistant_gateway=info",
        1 => "info,voice_assistant_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let mut config = Config::load(config_path)?;
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            serve(&config).await
        }
        Command::Ask { file, output } => {
            ask(&Config::load(config_path)?, &file, output.as_deref()).await
        }
        Command::Lookup { query } => {
            // Probing the lookup store needs no provider credentials
            probe_lookup(&Config::load_unvalidated(config_path)?, &query).await
        }
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        port = config.server.port,
        stt = ?config.stt.provider,
        tts = ?config.tts.provider,
        language_source = ?config.pipeline.language_source,
        "starting voice assistant"
    );

    let pipeline = RequestPipeline::from_config(config)?;
    ApiServerBuilder::new(pipeline)
        .server_config(config)
        .build()
        .run()
        .await?;
    Ok(())
}

async fn ask(config: &Config, file: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let data = tokio::fs::read(file).await?;
    let content_type = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!("audio/{}", e.to_ascii_lowercase()));

    let pipeline = RequestPipeline::from_config(config)?;
    let reply = pipeline
        .handle(AudioInput::Upload { data, content_type })
        .await?;

    println!("You said: {}", reply.transcript);
    println!("Reply ({:?}, {}): {}", reply.source, reply.language, reply.text);

    match (reply.audio, output) {
        (Some(audio), Some(path)) => {
            tokio::fs::write(path, &audio.data).await?;
            println!(
                "Audio: {} ({} bytes, voice {})",
                path.display(),
                audio.data.len(),
                audio.voice
            );
        }
        (Some(audio), None) => {
            println!("Audio: {} bytes, voice {}", audio.data.len(), audio.voice);
        }
        (None, _) => println!(
            "Audio unavailable: {}",
            reply.audio_error.as_deref().unwrap_or("unknown error")
        ),
    }
    Ok(())
}

async fn probe_lookup(config: &Config, query: &str) -> anyhow::Result<()> {
    let Some(path) = &config.lookup.path else {
        anyhow::bail!("no lookup store configured (set VOICE_ASSISTANT_LOOKUP_PATH)");
    };

    let store = lookup::open(path)?;
    match store.find(query).await? {
        Some(response) => println!("{response}"),
        None => println!("No match for {query:?} in {}", path.display()),
    }
    Ok(())
}
