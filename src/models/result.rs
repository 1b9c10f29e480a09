// Transcription result payload models
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body of `GET /result/{job_id}?format=json`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ResultPayload {
    pub tablature: Option<Tablature>,
    pub notes: Option<Vec<NoteEvent>>,
    pub standard_notation: Option<String>,
    pub chord_chart: Option<Vec<ChordShape>>,
    pub audio_url: Option<String>,
    #[serde(alias = "bpm")]
    pub tempo: Option<f64>,
    pub instrument: Option<String>,
    pub tuning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Tablature {
    Preformatted(String),
    Structured { strings: Vec<TabString> },
    List(Vec<TabString>),
}

impl Tablature {
    pub fn strings(&self) -> &[TabString] {
        match self {
            Tablature::Preformatted(_) => &[],
            Tablature::Structured { strings } | Tablature::List(strings) => strings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabString {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Vec<TabNote>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabNote {
    pub time: f64,
    pub fret: u32,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteEvent {
    /// String index, 0 is the highest-pitched string as reported by the service
    pub string: usize,
    pub fret: u32,
    #[serde(alias = "start_time")]
    pub time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub pitch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChordShape {
    pub name: String,
    #[serde(default)]
    pub position: Option<ChordPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChordPosition {
    Fret(i64),
    Shape(String),
}

impl fmt::Display for ChordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordPosition::Fret(0) => f.write_str("open"),
            ChordPosition::Fret(fret) => write!(f, "fret {}", fret),
            ChordPosition::Shape(shape) => f.write_str(shape),
        }
    }
}

/// Output formats offered by the result endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Json,
    Pdf,
    Musicxml,
}

impl ResultFormat {
    pub fn as_query(self) -> &'static str {
        match self {
            ResultFormat::Json => "json",
            ResultFormat::Pdf => "pdf",
            ResultFormat::Musicxml => "musicxml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ResultFormat::Json => "json",
            ResultFormat::Pdf => "pdf",
            ResultFormat::Musicxml => "musicxml",
        }
    }
}

impl FromStr for ResultFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ResultFormat::Json),
            "pdf" => Ok(ResultFormat::Pdf),
            "musicxml" | "xml" => Ok(ResultFormat::Musicxml),
            other => Err(format!("Unknown result format: {}", other)),
        }
    }
}
