use serde_json::{Map, Value};

use crate::constants::TOP_TIER_RANK;
use crate::models::{RankedEntry, ScoreRecord};

/// Converts a raw name→record mapping into validated score records.
///
/// An entry is kept only if its value is an object carrying a `score` member.
/// An unparsable score degrades to 0 rather than dropping the record. The
/// optional `time` member is kept only when it parses to a finite float, so a
/// record never shows a stale or fallback time; `time: 0` parses to a real
/// `Some(0.0)`.
pub(crate) fn normalize(raw: &Map<String, Value>) -> Vec<ScoreRecord> {
    raw.iter()
        .filter_map(|(name, value)| {
            let fields = value.as_object()?;
            let score = fields.get("score")?;
            Some(ScoreRecord {
                name: name.clone(),
                score: parse_score(score),
                time: fields.get("time").and_then(parse_time),
            })
        })
        .collect()
}

fn parse_score(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64))
            .unwrap_or(0),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|float| float as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn parse_time(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|time| time.is_finite())
}

/// Orders records by score descending and assigns 1-based ranks. Ties keep
/// input order; no secondary key is defined. Per-entry times are rendered to
/// two decimals, or omitted entirely when the source hides them.
pub(crate) fn rank(records: &[ScoreRecord], show_times: bool) -> Vec<RankedEntry> {
    let mut ordered: Vec<&ScoreRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.score.cmp(&a.score));

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let rank = index + 1;
            RankedEntry {
                rank,
                rank_display: rank_display(rank),
                name: record.name.clone(),
                score: record.score,
                time: record
                    .time
                    .filter(|_| show_times)
                    .map(|time| format!("{:.2}", time)),
                top_tier: rank <= TOP_TIER_RANK,
            }
        })
        .collect()
}

fn rank_display(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        _ => format!("#{}", rank),
    }
}
