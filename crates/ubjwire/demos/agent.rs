//! Minimal agent: connects to a controller, says hello, and answers commands
//! from an in-memory playlist until the controller goes away.
//!
//! Run with:
//!   cargo run -p ubjwire --example agent
//!
//! Start the controller example first, or in any order: the agent retries
//! until the controller is listening.

use ubjwire::peer::{connect_agent, ConnectConfig, MemoryPlayer, Player};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_path = "/tmp/ubjwire-demo/controller.sock";
    let config = ConnectConfig {
        max_attempts: Some(30),
        ..ConnectConfig::default()
    };

    let mut agent = connect_agent(sock_path, &config, MemoryPlayer::demo())?;
    eprintln!("Connected to {sock_path}");

    loop {
        match agent.run_once() {
            Ok(_) => {}
            Err(e) => {
                eprintln!("Controller disconnected: {e}");
                break;
            }
        }
    }

    let player = agent.into_player();
    eprintln!(
        "Final state: {} at {}us",
        player.playback_status(),
        player.position()
    );
    Ok(())
}
