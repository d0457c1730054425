//! # Generate Tone
//!
//! Write a 5 second 1 kHz test tone as 16-bit WAV, for trying out the player.
//!
//! ```bash
//! cargo run --example generate_tone -- 1khz_tone.wav mono
//! ```

use adagio::dsp::signal::sine_tone;

fn main() -> adagio::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "1khz_tone.wav".to_string());
    let channels: u16 = match args.next().as_deref() {
        Some("mono") => 1,
        _ => 2,
    };

    let spec = hound::WavSpec {
        channels,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let samples = sine_tone(1000.0, spec.sample_rate, 5.0, 0.5, channels);

    let mut writer =
        hound::WavWriter::create(&path, spec).map_err(adagio::player::Error::from)?;
    for sample in samples {
        writer
            .write_sample(sample)
            .map_err(adagio::player::Error::from)?;
    }
    writer.finalize().map_err(adagio::player::Error::from)?;

    println!("Generated {path} - 5 seconds, 44.1kHz, {channels} channel(s), 1kHz sine");
    Ok(())
}
