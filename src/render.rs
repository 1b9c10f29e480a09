// Result payload -> display structures
use crate::models::{FormOptions, NoteEvent, ResultPayload, Tablature};
use log::warn;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;

pub const COLUMNS_PER_ROW: usize = 16;
pub const NOT_AVAILABLE: &str = "not available";
/// Upper bound on grid rows when the payload has no tuning to go by
pub const MAX_STRINGS: usize = 12;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChordCell {
    pub name: String,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedResults {
    pub job_id: String,
    /// Plain-text tab grid (or the service's own preformatted tab)
    pub tablature: Option<String>,
    pub notation_url: Option<String>,
    pub chord_chart: Vec<ChordCell>,
    pub audio_url: Option<String>,
    pub note_count: usize,
    pub tempo: Option<f64>,
    pub instrument: Option<String>,
    pub tuning: Option<String>,
}

impl RenderedResults {
    pub fn has_tablature(&self) -> bool {
        self.tablature.is_some()
    }

    /// Console rendering used by the headless front end
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Job {}", self.job_id);
        if let Some(instrument) = &self.instrument {
            let _ = writeln!(out, "Instrument: {}", instrument);
        }
        if let Some(tuning) = &self.tuning {
            let _ = writeln!(out, "Tuning: {}", tuning);
        }
        if let Some(tempo) = self.tempo {
            let _ = writeln!(out, "Tempo: {:.0} BPM", tempo);
        }

        let _ = writeln!(out, "\nTablature ({} notes):", self.note_count);
        let _ = writeln!(out, "{}", self.tablature.as_deref().unwrap_or(NOT_AVAILABLE));

        let _ = writeln!(out, "\nNotation: {}", self.notation_url.as_deref().unwrap_or(NOT_AVAILABLE));

        if self.chord_chart.is_empty() {
            let _ = writeln!(out, "Chords: {}", NOT_AVAILABLE);
        } else {
            let chords: Vec<String> = self
                .chord_chart
                .iter()
                .map(|c| match &c.position {
                    Some(position) => format!("{} ({})", c.name, position),
                    None => c.name.clone(),
                })
                .collect();
            let _ = writeln!(out, "Chords: {}", chords.join(", "));
        }

        let _ = write!(out, "Audio: {}", self.audio_url.as_deref().unwrap_or(NOT_AVAILABLE));
        out
    }
}

pub fn render(job_id: &str, payload: &ResultPayload, metadata: Option<&FormOptions>) -> RenderedResults {
    let open_strings = metadata.and_then(FormOptions::string_names);

    let tablature = match &payload.tablature {
        Some(Tablature::Preformatted(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(tab) if tab.strings().iter().any(|s| !s.notes.is_empty()) => {
            Some(grid_from_strings(tab, open_strings))
        }
        _ => payload
            .notes
            .as_deref()
            .filter(|notes| !notes.is_empty())
            .map(|notes| grid_from_notes(notes, open_strings)),
    };

    let note_count = match (&payload.notes, &payload.tablature) {
        (Some(notes), _) if !notes.is_empty() => notes.len(),
        (_, Some(tab)) => tab.strings().iter().map(|s| s.notes.len()).sum(),
        _ => 0,
    };

    let chord_chart = payload
        .chord_chart
        .iter()
        .flatten()
        .map(|chord| ChordCell {
            name: chord.name.clone(),
            position: chord.position.as_ref().map(ToString::to_string),
        })
        .collect();

    RenderedResults {
        job_id: job_id.to_string(),
        tablature,
        notation_url: non_empty(&payload.standard_notation),
        chord_chart,
        audio_url: non_empty(&payload.audio_url),
        note_count,
        tempo: payload.tempo,
        instrument: payload
            .instrument
            .clone()
            .or_else(|| metadata.map(|m| m.instrument.display_name().to_string())),
        tuning: payload.tuning.clone().or_else(|| {
            metadata.and_then(|m| m.instrument.tuning(&m.tuning)).map(|t| t.label.to_string())
        }),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// Label for string `index`, where index 0 is the highest string.
/// `open_strings` lists the tuning lowest string first.
fn string_label(index: usize, count: usize, open_strings: Option<&[&str]>) -> String {
    match open_strings {
        Some(names) if names.len() == count => names[count - 1 - index].to_string(),
        _ => (index + 1).to_string(),
    }
}

fn grid_from_strings(tab: &Tablature, open_strings: Option<&[&str]>) -> String {
    let strings = tab.strings();
    let rows: Vec<(String, Vec<(f64, u32)>)> = strings
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let label = s
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| string_label(i, strings.len(), open_strings));
            (label, s.notes.iter().map(|n| (n.time, n.fret)).collect())
        })
        .collect();
    draw_grid(&rows)
}

fn grid_from_notes(notes: &[NoteEvent], open_strings: Option<&[&str]>) -> String {
    let limit = open_strings.map_or(MAX_STRINGS, |names| names.len().clamp(1, MAX_STRINGS));
    let count = notes
        .iter()
        .filter(|n| n.string < limit)
        .map(|n| n.string.saturating_add(1))
        .max()
        .unwrap_or(0)
        .max(open_strings.map_or(0, |_| limit));

    let skipped = notes.iter().filter(|n| n.string >= limit).count();
    if skipped > 0 {
        warn!("Dropped {} note(s) on strings beyond {}", skipped, limit);
    }

    let rows: Vec<(String, Vec<(f64, u32)>)> = (0..count)
        .map(|i| {
            let cells = notes
                .iter()
                .filter(|n| n.string == i)
                .map(|n| (n.time, n.fret))
                .collect();
            (string_label(i, count, open_strings), cells)
        })
        .collect();
    draw_grid(&rows)
}

fn time_key(time: f64) -> i64 {
    (time * 1000.0).round() as i64
}

fn draw_grid(rows: &[(String, Vec<(f64, u32)>)]) -> String {
    let columns: Vec<i64> = rows
        .iter()
        .flat_map(|(_, notes)| notes.iter().map(|(time, _)| time_key(*time)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(1);

    // One fret per string per column; a later note at the same onset wins
    let cells: Vec<Vec<Option<String>>> = rows
        .iter()
        .map(|(_, notes)| {
            let mut row = vec![None; columns.len()];
            for (time, fret) in notes {
                if let Ok(col) = columns.binary_search(&time_key(*time)) {
                    row[col] = Some(fret.to_string());
                }
            }
            row
        })
        .collect();

    let widths: Vec<usize> = (0..columns.len())
        .map(|col| {
            cells
                .iter()
                .filter_map(|row| row[col].as_ref().map(String::len))
                .max()
                .unwrap_or(1)
        })
        .collect();

    let mut blocks = Vec::new();
    let chunk_starts: Vec<usize> = if columns.is_empty() {
        vec![0]
    } else {
        (0..columns.len()).step_by(COLUMNS_PER_ROW).collect()
    };

    for start in chunk_starts {
        let end = (start + COLUMNS_PER_ROW).min(columns.len());
        let lines: Vec<String> = rows
            .iter()
            .zip(&cells)
            .map(|((label, _), row)| {
                let body: Vec<String> = (start..end)
                    .map(|col| match &row[col] {
                        Some(fret) => format!("{:-<width$}", fret, width = widths[col]),
                        None => "-".repeat(widths[col]),
                    })
                    .collect();
                format!("{:<label_width$}|-{}-|", label, body.join("-"), label_width = label_width)
            })
            .collect();
        blocks.push(lines.join("\n"));
    }

    blocks.join("\n\n")
}
