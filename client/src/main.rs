use clap::Parser;
use client::input::{Direction, LocalPlayer};
use client::network::RelayClient;
use env_logger::Env;
use log::{error, info};
use shared::LOCAL_PLAYER_ID;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay address to connect to
    #[arg(short = 's', long, default_value_t = format!("{}:{}", shared::DEFAULT_HOST, shared::DEFAULT_PORT))]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let client = RelayClient::connect(&args.server).await?;

    let mut player = LocalPlayer::new();
    let start = player.position();
    client.update_local_position(LOCAL_PLAYER_ID, start.x, start.y);

    info!("Controls: W/A/S/D + Enter to move, P to list participants, Q to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    'input: while let Some(line) = lines.next_line().await? {
        for key in line.chars() {
            if let Some(direction) = Direction::from_key(key) {
                let position = player.step(direction);
                client.update_local_position(LOCAL_PLAYER_ID, position.x, position.y);
                if let Err(e) = client.send_update(position.x, position.y).await {
                    error!("Failed to send position to relay: {}", e);
                }
            } else {
                match key.to_ascii_lowercase() {
                    'p' => print_participants(&client),
                    'q' => break 'input,
                    _ => {}
                }
            }
        }

        if !client.is_connected() {
            info!("Relay connection lost, exiting");
            break;
        }
    }

    client.disconnect().await;

    Ok(())
}

fn print_participants(client: &RelayClient) {
    client.with_participants(|map| {
        for participant in map.snapshot() {
            let [r, g, b] = participant.color;
            let marker = if participant.player_id == LOCAL_PLAYER_ID {
                " (you)"
            } else {
                ""
            };
            println!(
                "{:>4}{} at ({:>2}, {:>2}) color ({:.2}, {:.2}, {:.2})",
                participant.player_id,
                marker,
                participant.position.x,
                participant.position.y,
                r,
                g,
                b
            );
        }
    });
}
