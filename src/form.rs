// Instrument / tuning / tempo form state
use crate::models::{FormOptions, Instrument, Tuning, DEFAULT_TEMPO, MAX_TEMPO, MIN_TEMPO};
use log::{debug, warn};

/// Raw control values as entered by the user. Any control may be absent,
/// in which case `get_options` falls back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct OptionsForm {
    instrument: Option<Instrument>,
    tuning: Option<String>,
    tempo: Option<String>,
}

impl OptionsForm {
    pub fn new() -> Self {
        let mut form = Self::default();
        form.set_instrument(Instrument::default());
        form.set_tempo(DEFAULT_TEMPO.to_string());
        form
    }

    /// Switch instrument. The tuning set is replaced and its first entry selected.
    pub fn set_instrument(&mut self, instrument: Instrument) {
        self.instrument = Some(instrument);
        self.tuning = Some(instrument.default_tuning().id.to_string());
        debug!("Instrument set to {}, tuning reset to {}", instrument, instrument.default_tuning().id);
    }

    /// Select a tuning from the current instrument's set
    pub fn set_tuning(&mut self, tuning: &str) -> Result<(), String> {
        let instrument = self.instrument();
        match instrument.tuning(tuning) {
            Some(found) => {
                self.tuning = Some(found.id.to_string());
                Ok(())
            }
            None => {
                warn!("Tuning {} is not available for {}", tuning, instrument);
                Err(format!("Tuning {} is not available for {}", tuning, instrument))
            }
        }
    }

    pub fn set_tempo(&mut self, tempo: impl Into<String>) {
        self.tempo = Some(tempo.into());
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument.unwrap_or_default()
    }

    /// Tunings selectable under the current instrument
    pub fn tunings(&self) -> &'static [Tuning] {
        self.instrument().tunings()
    }

    pub fn get_options(&self) -> FormOptions {
        let defaults = FormOptions::default();
        FormOptions {
            instrument: self.instrument.unwrap_or(defaults.instrument),
            tuning: self.tuning.clone().unwrap_or(defaults.tuning),
            tempo: self
                .tempo
                .as_deref()
                .and_then(parse_tempo)
                .unwrap_or(defaults.tempo),
        }
    }

    /// Tempo must be an integer in [1, 300]; a missing tempo control uses the default
    pub fn is_valid(&self) -> bool {
        match self.tempo.as_deref() {
            None => true,
            Some(raw) => parse_tempo(raw).is_some(),
        }
    }
}

fn parse_tempo(raw: &str) -> Option<u16> {
    let value: i64 = raw.trim().parse().ok()?;
    if (MIN_TEMPO..=MAX_TEMPO).contains(&value) {
        u16::try_from(value).ok()
    } else {
        None
    }
}
