//! Optional ambient sound behind the reader, faded in on play and out on
//! every exit path.

#[cfg(feature = "ambient-audio")]
mod engine;
pub mod noise;

#[cfg(feature = "ambient-audio")]
pub use engine::AudioEngineHandle;
pub use noise::BrownNoise;

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmbientAudioConfig {
    pub enabled: bool,
    /// Target volume in `[0, 1]`
    pub volume: f32,
    pub fade_ms: u64,
    pub fade_steps: u32,
}

impl Default for AmbientAudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: 0.3,
            fade_ms: 1_200,
            fade_steps: 24,
        }
    }
}

/// Where ambient samples end up.
pub trait AmbientOutput: Send + Sync {
    fn start(&self) -> Result<()>;
    fn set_volume(&self, volume: f32) -> Result<()>;
    fn stop(&self) -> Result<()>;
}

/// Output that plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl AmbientOutput for NullOutput {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn set_volume(&self, _volume: f32) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Ramps an [`AmbientOutput`] between silence and the configured volume in a
/// fixed number of steps. At most one ramp runs at a time; dropping the fader
/// aborts it and stops the output.
pub struct AmbientFader {
    output: Arc<dyn AmbientOutput>,
    config: AmbientAudioConfig,
    level: Arc<AtomicU32>,
    active: AtomicBool,
    ramp: Mutex<Option<JoinHandle<()>>>,
}

impl AmbientFader {
    pub fn new(output: Arc<dyn AmbientOutput>, config: AmbientAudioConfig) -> Self {
        Self {
            output,
            config,
            level: Arc::new(AtomicU32::new(0f32.to_bits())),
            active: AtomicBool::new(false),
            ramp: Mutex::new(None),
        }
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::SeqCst))
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn fade_in(&self) {
        if !self.config.enabled || self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.output.start() {
            log_warn!("ambient audio failed to start: {err}");
            self.active.store(false, Ordering::SeqCst);
            return;
        }
        self.ramp_to(self.config.volume, false);
    }

    pub fn fade_out(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.ramp_to(0.0, true);
    }

    /// Waits for the running ramp, if any.
    pub async fn settle(&self) {
        let handle = lock(&self.ramp).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Aborts any ramp and silences the output immediately.
    pub fn stop_now(&self) {
        if let Some(handle) = lock(&self.ramp).take() {
            handle.abort();
        }
        self.active.store(false, Ordering::SeqCst);
        self.level.store(0f32.to_bits(), Ordering::SeqCst);
        if let Err(err) = self.output.stop() {
            log_warn!("ambient audio failed to stop: {err}");
        }
    }

    fn ramp_to(&self, target: f32, stop_after: bool) {
        let mut slot = lock(&self.ramp);
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let output = self.output.clone();
        let level = self.level.clone();
        let steps = self.config.fade_steps.max(1);
        let step_delay = Duration::from_millis(self.config.fade_ms) / steps;
        let target = target.clamp(0.0, 1.0);

        let ramp = async move {
            let start = f32::from_bits(level.load(Ordering::SeqCst));
            for step in 1..=steps {
                tokio::time::sleep(step_delay).await;
                let value = start + (target - start) * step as f32 / steps as f32;
                if let Err(err) = output.set_volume(value) {
                    log_warn!("ambient volume update failed: {err}");
                }
                level.store(value.to_bits(), Ordering::SeqCst);
            }
            if stop_after {
                if let Err(err) = output.stop() {
                    log_warn!("ambient audio failed to stop: {err}");
                }
            }
            log_debug!("ambient ramp finished at {target}");
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => *slot = Some(runtime.spawn(ramp)),
            Err(_) => {
                // no runtime to ramp on: jump straight to the target
                let _ = self.output.set_volume(target);
                self.level.store(target.to_bits(), Ordering::SeqCst);
                if stop_after {
                    let _ = self.output.stop();
                }
            }
        }
    }
}

impl Drop for AmbientFader {
    fn drop(&mut self) {
        self.stop_now();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
