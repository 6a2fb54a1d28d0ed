//! Minimal controller: accepts one agent, drives it through a few commands,
//! and prints the replies.
//!
//! Run with:
//!   cargo run -p ubjwire --example controller
//!
//! In another terminal:
//!   cargo run -p ubjwire --example agent
//! or:
//!   cargo run -p ubjwire --features cli -- agent /tmp/ubjwire-demo/controller.sock

use std::fs;
use std::path::PathBuf;

use ubjwire::peer::ControllerListener;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = PathBuf::from("/tmp/ubjwire-demo");
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("controller.sock");

    let listener = ControllerListener::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    let mut controller = listener.accept()?;
    eprintln!("Agent connected");

    controller.keepalive()?;
    controller.play()?;
    controller.seek(30_000_000)?;
    eprintln!("status:   {}", controller.playback_status()?);
    eprintln!("position: {}us", controller.position()?);
    match controller.metadata()? {
        Some(meta) => eprintln!("playing:  {} by {}", meta.title, meta.artist.join(", ")),
        None => eprintln!("nothing playing"),
    }

    controller.next()?;
    if let Some(meta) = controller.metadata()? {
        eprintln!("next:     {}", meta.title);
    }
    controller.stop()?;

    controller.shutdown()?;
    Ok(())
}
