use anyhow::{anyhow, Result};
use log::error;
use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Mutex,
};
use std::thread;

use super::noise::BrownNoise;
use super::AmbientOutput;

enum AudioCommand {
    Start,
    Stop,
    SetVolume(f32),
}

/// Owns the rodio output on a dedicated thread; the stream is not `Send`.
pub struct AudioEngineHandle {
    tx: Mutex<Option<Sender<AudioCommand>>>,
}

impl AudioEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Mutex::new(None),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("audio engine lock poisoned"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("ambient-audio".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Start => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            match open_sink() {
                                Ok((stream, new_sink)) => {
                                    new_sink.set_volume(0.0);
                                    new_sink.append(BrownNoise::new());
                                    _stream = Some(stream);
                                    sink = Some(new_sink);
                                }
                                Err(err) => error!("ambient audio unavailable: {err}"),
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            _stream = None;
                        }
                        AudioCommand::SetVolume(v) => {
                            if let Some(ref s) = sink {
                                s.set_volume(v.clamp(0.0, 1.0));
                            }
                        }
                    }
                }
            })?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    fn send(&self, command: AudioCommand) -> Result<()> {
        self.ensure_thread()?
            .send(command)
            .map_err(|_| anyhow!("audio thread has exited"))
    }
}

impl Default for AudioEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AmbientOutput for AudioEngineHandle {
    fn start(&self) -> Result<()> {
        self.send(AudioCommand::Start)
    }

    fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(AudioCommand::SetVolume(volume))
    }

    fn stop(&self) -> Result<()> {
        // never spin up a thread just to stop it
        if let Ok(guard) = self.tx.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(AudioCommand::Stop);
            }
        }
        Ok(())
    }
}

fn open_sink() -> Result<(OutputStream, Sink)> {
    let (stream, handle) = OutputStream::try_default()
        .map_err(|e| anyhow!("failed to create audio output stream: {e}"))?;
    let sink = Sink::try_new(&handle).map_err(|e| anyhow!("failed to create audio sink: {e}"))?;
    Ok((stream, sink))
}
