//! Live microphone capture using CPAL (Cross-Platform Audio Library).
//!
//! Captures raw amplitude faithfully: no echo cancellation, noise
//! suppression, or automatic gain is requested from the backend, since the
//! detector thresholds are tuned against unprocessed levels.

use crate::audio::source::AudioSource;
use crate::audio::wav::resample;
use crate::defaults;
use crate::error::{AurisError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers when
/// probing audio backends.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Preferred device names for desktop PipeWire/PulseAudio environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List all available audio input device names.
///
/// # Errors
/// Returns `AurisError::AudioCapture` if device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| AurisError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            names.push(name);
        }
    }
    Ok(names)
}

/// Get the best default input device, preferring PipeWire/PulseAudio so the
/// desktop's device selection is respected.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| AurisError::PermissionDenied {
                message: "no input device available (access denied or none present)".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only accessed through the Mutex in
/// CpalAudioSource, so it never crosses thread boundaries unsynchronized.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone source capturing 16-bit PCM mono at the configured rate.
///
/// Tries the preferred format first (i16/mono at the target rate), then
/// f32/mono, then falls back to the device's native config with software
/// channel mixing and resampling.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Create a new CPAL audio source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best default.
    ///
    /// # Errors
    /// `AudioDeviceNotFound` when a named device is missing,
    /// `PermissionDenied` when no input device is accessible.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host.input_devices().map_err(|e| AurisError::AudioCapture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;

                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        return Ok(dev);
                    }
                }

                Err(AurisError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                get_best_default_device()
            }
        })?;

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    /// Build the input stream, preferring i16/mono at the target rate.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("auris: audio stream error: {}", err);
        };

        // i16/mono — PipeWire/PulseAudio convert transparently
        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // f32/mono — for devices that only expose float formats
        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend(
                        data.iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                    );
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Native config with software conversion
        self.build_stream_native()
    }

    /// Build a stream at the device's native config, mixing to mono and
    /// resampling to the target rate in software.
    fn build_stream_native(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| AurisError::AudioCapture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let err_callback = |err| {
            eprintln!("auris: audio stream error: {}", err);
        };

        let buffer = Arc::clone(&self.buffer);

        match default_config.sample_format() {
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let converted =
                            convert_to_mono(data, native_channels, native_rate, target_rate);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| AurisError::AudioCapture {
                    message: format!("Failed to build native i16 stream: {}", e),
                }),
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let i16_data: Vec<i16> = data
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect();
                        let converted =
                            convert_to_mono(&i16_data, native_channels, native_rate, target_rate);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| AurisError::AudioCapture {
                    message: format!("Failed to build native f32 stream: {}", e),
                }),
            fmt => Err(AurisError::AudioCapture {
                message: format!(
                    "Unsupported native sample format: {:?}. Try --device with another input.",
                    fmt
                ),
            }),
        }
    }
}

/// Mix multi-channel audio to mono and resample to the target rate.
fn convert_to_mono(
    samples: &[i16],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<i16> {
    let mono: Vec<i16> = if channels == 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    if source_rate == target_rate {
        mono
    } else {
        resample(&mono, source_rate, target_rate)
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        {
            let stream_guard = self.stream.lock().map_err(|e| AurisError::AudioCapture {
                message: format!("Failed to lock stream: {}", e),
            })?;
            if stream_guard.is_some() {
                return Ok(()); // Already started
            }
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| AurisError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        let mut stream_guard = self.stream.lock().map_err(|e| AurisError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut stream_guard = self.stream.lock().map_err(|e| AurisError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;

        if let Some(sendable_stream) = stream_guard.take() {
            sendable_stream
                .0
                .pause()
                .map_err(|e| AurisError::AudioCapture {
                    message: format!("Failed to stop audio stream: {}", e),
                })?;
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buffer = self.buffer.lock().map_err(|e| AurisError::AudioCapture {
            message: format!("Failed to lock audio buffer: {}", e),
        })?;

        let samples = buffer.clone();
        buffer.clear();
        Ok(samples)
    }
}
