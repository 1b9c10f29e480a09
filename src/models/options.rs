// Instrument, tuning and transcription option models
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TEMPO: u16 = 120;
pub const MIN_TEMPO: i64 = 1;
pub const MAX_TEMPO: i64 = 300;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    #[default]
    Bass,
    Guitar,
    Ukulele,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Tuning {
    pub id: &'static str,
    pub label: &'static str,
    /// Open string names, lowest string first
    pub strings: &'static [&'static str],
}

const BASS_TUNINGS: &[Tuning] = &[
    Tuning { id: "standard", label: "Standard (E A D G)", strings: &["E", "A", "D", "G"] },
    Tuning { id: "5-string", label: "5-string (B E A D G)", strings: &["B", "E", "A", "D", "G"] },
    Tuning { id: "drop-d", label: "Drop D (D A D G)", strings: &["D", "A", "D", "G"] },
];

const GUITAR_TUNINGS: &[Tuning] = &[
    Tuning { id: "standard", label: "Standard (E A D G B E)", strings: &["E", "A", "D", "G", "B", "e"] },
    Tuning { id: "drop-d", label: "Drop D (D A D G B E)", strings: &["D", "A", "D", "G", "B", "e"] },
    Tuning {
        id: "half-step-down",
        label: "Half-step down (Eb Ab Db Gb Bb Eb)",
        strings: &["Eb", "Ab", "Db", "Gb", "Bb", "eb"],
    },
];

const UKULELE_TUNINGS: &[Tuning] = &[
    Tuning { id: "standard", label: "Standard (G C E A)", strings: &["G", "C", "E", "A"] },
    Tuning { id: "baritone", label: "Baritone (D G B E)", strings: &["D", "G", "B", "E"] },
];

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Bass, Instrument::Guitar, Instrument::Ukulele];

    pub fn as_str(self) -> &'static str {
        match self {
            Instrument::Bass => "bass",
            Instrument::Guitar => "guitar",
            Instrument::Ukulele => "ukulele",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Instrument::Bass => "Bass",
            Instrument::Guitar => "Guitar",
            Instrument::Ukulele => "Ukulele",
        }
    }

    /// Tuning set for this instrument. The first entry is the default.
    pub fn tunings(self) -> &'static [Tuning] {
        match self {
            Instrument::Bass => BASS_TUNINGS,
            Instrument::Guitar => GUITAR_TUNINGS,
            Instrument::Ukulele => UKULELE_TUNINGS,
        }
    }

    pub fn default_tuning(self) -> &'static Tuning {
        &self.tunings()[0]
    }

    pub fn tuning(self, id: &str) -> Option<&'static Tuning> {
        self.tunings().iter().find(|t| t.id == id)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bass" => Ok(Instrument::Bass),
            "guitar" => Ok(Instrument::Guitar),
            "ukulele" => Ok(Instrument::Ukulele),
            other => Err(format!("Unknown instrument: {}", other)),
        }
    }
}

/// Instrument catalog entry as exposed to the front end
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentInfo {
    pub id: Instrument,
    pub name: &'static str,
    pub string_count: usize,
    pub tunings: Vec<Tuning>,
}

impl From<Instrument> for InstrumentInfo {
    fn from(instrument: Instrument) -> Self {
        Self {
            id: instrument,
            name: instrument.display_name(),
            string_count: instrument.default_tuning().strings.len(),
            tunings: instrument.tunings().to_vec(),
        }
    }
}

/// Options sent along with an upload and stored as history metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormOptions {
    pub instrument: Instrument,
    pub tuning: String,
    pub tempo: u16,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            instrument: Instrument::Bass,
            tuning: String::from("standard"),
            tempo: DEFAULT_TEMPO,
        }
    }
}

impl FormOptions {
    /// String names for the selected tuning, if the tuning is known
    pub fn string_names(&self) -> Option<&'static [&'static str]> {
        self.instrument.tuning(&self.tuning).map(|t| t.strings)
    }
}
