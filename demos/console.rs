//! Console driver for a VR Sync server
//!
//! Usage: `cargo run --example console -- <host> <port> <license> [media-id] [type-index]`
//!
//! Connects, prints every event, and once connected plays the given media
//! (defaults: id `0`, type `2`/CloudVideo) followed by a text message.

use std::env;
use vrsync_companion::{Action, Config, Event, PlayOptions, VariableUpdate, VrSyncClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut config = Config::default();
    if let Some(host) = args.first() {
        config.host = host.clone();
    }
    if let Some(port) = args.get(1) {
        config.port = port.parse()?;
    }
    if let Some(license) = args.get(2) {
        config.license_key = license.clone();
    }
    config.log_incoming_messages = true;

    let play = Action::Play(PlayOptions {
        id: args.get(3).cloned().unwrap_or_else(|| "0".to_string()),
        media_type: args.get(4).map(|s| s.parse()).transpose()?.unwrap_or(2),
        ..PlayOptions::default()
    });

    let client = VrSyncClient::connect(config)?;
    let mut events = client.subscribe();
    let mut played = false;

    while let Ok(event) = events.recv().await {
        match &event {
            Event::StatusChanged(status) => println!("status: {:?}", status),
            Event::CheckFeedbacks => {
                println!("connected: {}", client.is_connected());
                if client.is_connected() && !played {
                    played = true;
                    play.execute(&client)?;
                    client.send_text("Playback starting")?;
                }
            }
            Event::Variable(VariableUpdate::Media(media)) => {
                println!("media:");
                for label in media {
                    println!("  {}", label);
                }
            }
            Event::Variable(VariableUpdate::PlayStartedTrigger(token)) => {
                println!("play started ({})", token);
            }
            Event::ProtocolError(error) => println!("server error: {:?}", error),
        }
    }

    Ok(())
}
