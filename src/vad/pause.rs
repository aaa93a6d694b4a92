//! Pause tracking over successive VAD decisions.
//!
//! Two states, speaking and silent. A speaking -> silent edge opens a
//! pause; the next silent -> speaking edge closes it and reports its length
//! if it reaches the debounce threshold. Stream time is an integer sample
//! offset, so a pause's length does not depend on where it falls.

#[derive(Debug, Clone)]
pub struct PauseTracker {
    debounce_secs: f64,
    sample_rate: u32,
    speaking: bool,
    pause_start: Option<u64>,
}

impl PauseTracker {
    pub fn new(debounce_secs: f64, sample_rate: u32) -> Self {
        Self {
            debounce_secs,
            sample_rate: sample_rate.max(1),
            speaking: false,
            pause_start: None,
        }
    }

    /// Feed one VAD decision taken at stream offset `now_sample`.
    ///
    /// Returns the completed pause duration in seconds when this decision
    /// closes a pause of at least the debounce threshold.
    pub fn update(&mut self, speaking: bool, now_sample: u64) -> Option<f64> {
        let mut completed = None;
        match (self.speaking, speaking) {
            (true, false) => {
                self.pause_start = Some(now_sample);
            }
            (false, true) => {
                if let Some(start) = self.pause_start.take() {
                    let duration =
                        now_sample.saturating_sub(start) as f64 / self.sample_rate as f64;
                    if duration >= self.debounce_secs {
                        completed = Some(duration);
                    }
                }
            }
            _ => {}
        }
        self.speaking = speaking;
        completed
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Sample offset where the currently open pause began.
    pub fn pending_pause(&self) -> Option<u64> {
        self.pause_start
    }
}
