use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use talkback::audio::capture::MicCapture;
use talkback::audio::output::CpalOutput;
use talkback::engine::session::Session;
use talkback::transport::mock::MockService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("talkback starting");

    // 2. Engine channel: capture completions, transport events, controls
    let (tx, rx) = mpsc::channel(256);

    // 3. Devices + service seam. The mock service stands in for the real
    // endpoint; swap the connector to talk to a live one.
    let output = CpalOutput::new(tx.clone())?;
    let capture = MicCapture::spawn();
    let connector = Box::new(MockService::new());

    let (session, handle) = Session::new(rx, tx.clone(), connector, capture, output);

    tokio::spawn(session.run());

    // 4. Report the speaking flag as it flips
    let mut speaking = handle.speaking.clone();
    tokio::spawn(async move {
        while speaking.changed().await.is_ok() {
            let flag = *speaking.borrow();
            tracing::info!(speaking = flag, "agent speaking");
        }
    });

    // 5. Console control loop
    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    println!("Commands: start | stop | status | dismiss | quit");

    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "" => continue,
            "start" => handle.start().await,
            "stop" => handle.stop().await,
            "dismiss" => handle.dismiss_error().await,
            "status" => {
                let status = handle.status.borrow().clone();
                match &status.last_error {
                    Some(cause) => println!("state: {} (error: {})", status.state, cause),
                    None => println!("state: {}", status.state),
                }
            }
            "quit" => break,
            other => println!("unknown command: {}", other),
        }
    }

    handle.stop().await;
    tracing::info!("talkback exiting");
    Ok(())
}
