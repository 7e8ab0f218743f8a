use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use conversation::Conversation;
use cowrite::{logging, provider_from_config, AppConfig, Repl};
use session_store::FileSessionStore;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("cowrite: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> io::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = AppConfig::from_env(&cwd).map_err(io::Error::other)?;
    tracing::debug!(?config, "loaded configuration");

    let provider = provider_from_config(&config).map_err(io::Error::other)?;
    let store = Arc::new(FileSessionStore::new(config.session_dir.clone()));
    let conversation = Conversation::new(provider, store, config.conversation_settings());

    let stdout = io::stdout();
    let mut repl = Repl::new(conversation, stdout.lock());
    repl.run(BufReader::new(tokio::io::stdin())).await
}
