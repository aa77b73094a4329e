//! The 32 precomputed modulator curve tables (§4.3).
//!
//! Each table maps a raw controller sample (0..127, or 0..8191 for the
//! pitch-wheel range) to a `[0, 1]` or `[-1, 1]` transform value. Building
//! all 32 once at startup, the way `dsp`'s lookup tables are built, keeps
//! the render path free of `log10`/branching per sample.

use crate::modulator::{Continuity, Direction, Polarity, Source};
use once_cell::sync::Lazy;

const NORMAL_TABLE_SIZE: usize = 128;
const PITCH_WHEEL_TABLE_SIZE: usize = 8192;
const TABLE_COUNT: usize = 32;

fn positive_linear(i: f32, m: f32) -> f32 {
    i / (m + 1.0)
}

fn positive_concave(i: f32, m: f32) -> f32 {
    if i >= m {
        1.0
    } else {
        -40.0 / 96.0 * ((m - i) / m).log10()
    }
}

fn positive_convex(i: f32, m: f32) -> f32 {
    if i <= 0.0 {
        0.0
    } else {
        1.0 + 40.0 / 96.0 * (i / m).log10()
    }
}

fn positive_switched(i: f32, m: f32) -> f32 {
    if i <= m / 2.0 {
        0.0
    } else {
        1.0
    }
}

fn positive(continuity: Continuity, i: f32, m: f32) -> f32 {
    match continuity {
        Continuity::Linear => positive_linear(i, m),
        Continuity::Concave => positive_concave(i, m),
        Continuity::Convex => positive_convex(i, m),
        Continuity::Switched => positive_switched(i, m),
    }
}

/// Packs a source's four flags plus its controller range into the 0..31
/// table index (§4.3: `16·isPitchWheelRange + 8·isBipolar + 4·isDescending + continuityKind`).
pub fn table_index(is_pitch_wheel_range: bool, is_bipolar: bool, is_descending: bool, continuity: Continuity) -> usize {
    16 * is_pitch_wheel_range as usize + 8 * is_bipolar as usize + 4 * is_descending as usize + continuity as usize
}

fn build_table(is_pitch_wheel_range: bool, is_bipolar: bool, is_descending: bool, continuity: Continuity) -> Vec<f32> {
    let size = if is_pitch_wheel_range { PITCH_WHEEL_TABLE_SIZE } else { NORMAL_TABLE_SIZE };
    let m = (size - 1) as f32;
    (0..size)
        .map(|raw| {
            let i = raw as f32;
            let positive_value = positive(continuity, i, m);
            let value = if is_descending { 1.0 - positive_value } else { positive_value };
            if is_bipolar {
                2.0 * value - 1.0
            } else {
                value
            }
        })
        .collect()
}

fn build_all_tables() -> Vec<Vec<f32>> {
    let mut tables = vec![Vec::new(); TABLE_COUNT];
    for is_pitch_wheel_range in [false, true] {
        for is_bipolar in [false, true] {
            for is_descending in [false, true] {
                for continuity in [Continuity::Linear, Continuity::Concave, Continuity::Convex, Continuity::Switched] {
                    let index = table_index(is_pitch_wheel_range, is_bipolar, is_descending, continuity);
                    tables[index] = build_table(is_pitch_wheel_range, is_bipolar, is_descending, continuity);
                }
            }
        }
    }
    tables
}

static TABLES: Lazy<Vec<Vec<f32>>> = Lazy::new(build_all_tables);

/// Forces the 32 curve tables to build. Call once, off the render thread.
pub fn warm_value_transformer_tables() {
    Lazy::force(&TABLES);
}

/// Transforms a raw controller reading (already range-clamped by the
/// caller) through the table selected by `source`'s four flags.
pub fn transform(source: Source, raw_value: u32) -> f32 {
    let is_pitch_wheel_range = source.uses_pitch_wheel_range();
    let is_bipolar = source.polarity == Polarity::Bipolar;
    let is_descending = source.direction == Direction::Decreasing;
    let index = table_index(is_pitch_wheel_range, is_bipolar, is_descending, source.continuity);
    let table = &TABLES[index];
    let clamped = (raw_value as usize).min(table.len() - 1);
    table[clamped]
}
