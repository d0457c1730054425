//! # Play
//!
//! Play WAV files on the default output device with live speed and EQ control.
//!
//! **Concepts:** Playlist, device sink, controller, keyboard commands
//!
//! ```bash
//! cargo run --example play --features device -- track1.wav track2.wav
//! cargo run --example play --features device -- -d 1 track1.wav
//! cargo run --example play --features device -- -l
//! ```
//!
//! `-d <index>` picks an output device by its position in the `-l` listing.
//!
//! Type a key and press enter:
//! `p` pause/resume, `[`/`]` slower/faster, `e` next EQ preset,
//! `,`/`.` previous/next track, `b`/`f` seek 10 s, `q` quit.

use adagio::prelude::*;
use std::io::BufRead;

fn main() -> adagio::Result<()> {
    let mut files = Vec::new();
    let mut device_index = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-l" => {
                for device in DeviceSink::list_output_devices()? {
                    println!("{device}");
                }
                return Ok(());
            }
            "-d" => match args.next().and_then(|v| v.parse::<usize>().ok()) {
                Some(index) => device_index = Some(index),
                None => usage(),
            },
            _ => files.push(arg),
        }
    }
    if files.is_empty() {
        usage();
    }

    let config = AdagioConfig::default().with_log_level(LogLevel::Info);
    adagio::logging::init(config.log_level);

    let playlist = Playlist::from_paths(&files)?;
    let sink = DeviceSink::open(device_index)?;
    println!("Output: {}", sink.name());
    let mut player = Player::new(config.player, playlist, WavLoader, sink)?;

    let controller = player.controller();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            for key in line.chars() {
                if let Some(event) = ControlEvent::from_key(key) {
                    if !controller.send(event) {
                        return;
                    }
                }
            }
        }
    });

    println!("p pause | [ ] speed | e eq | , . track | b f seek | q quit");
    player.run()?;

    let metrics = player.metrics();
    println!(
        "Played {} tracks, {} frames, {} underruns recovered",
        metrics.tracks_finished, metrics.frames_written, metrics.underruns
    );
    Ok(())
}

fn usage() -> ! {
    eprintln!("usage: play [-l] [-d <device index>] <file1.wav> [file2.wav ...]");
    std::process::exit(1);
}
