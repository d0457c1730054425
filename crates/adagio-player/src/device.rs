//! Hardware output through CPAL.
//!
//! [`DeviceSink::write`] blocks until the lock-free ring has room; the CPAL
//! callback drains the ring and plays silence when it runs dry. A dry ring
//! after the first write is reported as an underrun on the next write.

use crate::sink::{AudioSink, SinkError};
use crate::{Error, Result};
use adagio_dsp::TrackFormat;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Ring length in seconds of audio.
const RING_SECONDS: f64 = 0.25;
/// Longest a write waits for ring space before reporting would-block.
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct SharedState {
    underrun: AtomicBool,
    primed: AtomicBool,
    paused: AtomicBool,
}

pub struct DeviceSink {
    device: cpal::Device,
    name: String,
    stream: Option<cpal::Stream>,
    producer: Option<HeapProd<i16>>,
    format: Option<TrackFormat>,
    shared: Arc<SharedState>,
}

impl DeviceSink {
    /// Open an output device by index, or the default device.
    pub fn open(device_index: Option<usize>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device_index {
            Some(idx) => {
                let devices: Vec<_> = host.output_devices()?.collect();
                let count = devices.len();
                devices.into_iter().nth(idx).ok_or_else(|| {
                    Error::DeviceNotFound(format!(
                        "output device index {idx} out of range (available: {count})"
                    ))
                })?
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::DeviceNotFound("no output device available".into()))?,
        };

        let name = device.name()?;
        let preferred = device.default_output_config()?;
        info!(
            device = %name,
            sample_rate = preferred.sample_rate().0,
            channels = preferred.channels(),
            "output device opened"
        );

        Ok(Self {
            device,
            name,
            stream: None,
            producer: None,
            format: None,
            shared: Arc::new(SharedState::default()),
        })
    }

    /// Names of available output devices, prefixed with their index.
    pub fn list_output_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        host.output_devices()?
            .enumerate()
            .map(|(idx, device)| Ok(format!("{}: {}", idx, device.name()?)))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn build_stream<T>(
        &self,
        config: &cpal::StreamConfig,
        mut consumer: HeapCons<i16>,
    ) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: cpal::SizedSample + cpal::FromSample<i16>,
    {
        let shared = Arc::clone(&self.shared);
        let mut scratch: Vec<i16> = Vec::new();

        self.device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() < data.len() {
                    scratch.resize(data.len(), 0);
                }
                let read = consumer.pop_slice(&mut scratch[..data.len()]);

                for (out, &sample) in data.iter_mut().zip(&scratch[..read]) {
                    *out = T::from_sample(sample);
                }
                for out in &mut data[read..] {
                    *out = T::EQUILIBRIUM;
                }

                if read < data.len()
                    && shared.primed.load(Ordering::Acquire)
                    && !shared.paused.load(Ordering::Acquire)
                {
                    shared.underrun.store(true, Ordering::Release);
                }
            },
            |err| warn!(error = %err, "output stream error"),
            None,
        )
    }

    fn stream_error(e: impl std::fmt::Display) -> SinkError {
        SinkError::Device(e.to_string())
    }
}

impl AudioSink for DeviceSink {
    fn configure(&mut self, format: TrackFormat) -> std::result::Result<(), SinkError> {
        if self.format == Some(format) && self.stream.is_some() {
            return Ok(());
        }

        // Old stream first, so the device is free
        self.stream = None;
        self.producer = None;

        let channels = format.channels.max(1) as usize;
        let capacity = ((format.sample_rate as f64 * RING_SECONDS) as usize).max(1024) * channels;
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let sample_format = self
            .device
            .default_output_config()
            .map_err(Self::stream_error)?
            .sample_format();

        let stream = match sample_format {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&config, consumer),
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&config, consumer),
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&config, consumer),
            other => {
                return Err(SinkError::Device(format!(
                    "unsupported device sample format {other:?}"
                )))
            }
        }
        .map_err(Self::stream_error)?;
        stream.play().map_err(Self::stream_error)?;

        self.shared.primed.store(false, Ordering::Release);
        self.shared.underrun.store(false, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        self.stream = Some(stream);
        self.producer = Some(producer);
        self.format = Some(format);
        debug!(device = %self.name, %format, capacity, "output stream configured");
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> std::result::Result<usize, SinkError> {
        if self.shared.underrun.swap(false, Ordering::AcqRel) {
            return Err(SinkError::Underrun);
        }
        let channels = self.format.map_or(1, |f| f.channels.max(1) as usize);
        let producer = self.producer.as_mut().ok_or(SinkError::Closed)?;

        let offered = samples.len() / channels;
        if offered == 0 {
            return Ok(0);
        }

        let started = Instant::now();
        loop {
            let vacant = producer.vacant_len() / channels;
            if vacant > 0 {
                let frames = vacant.min(offered);
                producer.push_slice(&samples[..frames * channels]);
                self.shared.primed.store(true, Ordering::Release);
                return Ok(frames);
            }
            if started.elapsed() > WRITE_TIMEOUT {
                return Err(SinkError::WouldBlock);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn recover(&mut self) -> std::result::Result<(), SinkError> {
        self.shared.underrun.store(false, Ordering::Release);
        if let Some(stream) = self.stream.as_ref() {
            stream.play().map_err(Self::stream_error)?;
        }
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) -> std::result::Result<(), SinkError> {
        self.shared.paused.store(paused, Ordering::Release);
        if let Some(stream) = self.stream.as_ref() {
            if paused {
                stream.pause().map_err(Self::stream_error)?;
            } else {
                stream.play().map_err(Self::stream_error)?;
            }
        }
        Ok(())
    }

    fn drain(&mut self) -> std::result::Result<(), SinkError> {
        let Some(producer) = self.producer.as_ref() else {
            return Ok(());
        };
        let started = Instant::now();
        while producer.occupied_len() > 0 {
            if started.elapsed() > WRITE_TIMEOUT {
                warn!(pending = producer.occupied_len(), "output did not drain");
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        // Quiet so the tail is not reported as an underrun
        self.shared.primed.store(false, Ordering::Release);
        Ok(())
    }
}
