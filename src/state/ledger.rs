use std::time::{Duration, SystemTime};

use uuid::Uuid;

/// One reported chip-stack observation. Immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipStackUpdate {
    /// Stable identifier for the observation.
    pub id: Uuid,
    /// Absolute chip count at `timestamp`, not a delta.
    pub amount: f64,
    /// Optional free-text note attached by the player or a lifecycle op.
    pub note: Option<String>,
    /// Wall-clock time of the observation.
    pub timestamp: SystemTime,
}

/// A ledger entry group collapsed for display.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedUpdate {
    /// Last amount reported within the group.
    pub amount: f64,
    /// Timestamp of the last entry within the group.
    pub timestamp: SystemTime,
    /// Synthesized note, see [`ChipLedger::merged_for_display`].
    pub note: Option<String>,
    /// Number of raw entries collapsed into this one.
    pub merged_count: usize,
}

/// Append-only sequence of chip-stack observations.
///
/// The ledger never removes or reorders entries; every derived view (current
/// stack, profit, merged display items) is computed on read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChipLedger {
    entries: Vec<ChipStackUpdate>,
}

impl ChipLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted entries.
    pub fn from_entries(entries: Vec<ChipStackUpdate>) -> Self {
        Self { entries }
    }

    /// Append an observation. Always permitted while a session exists; the
    /// amount carries no sign validation beyond what the caller enforces.
    pub fn append(&mut self, amount: f64, note: Option<String>, timestamp: SystemTime) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(ChipStackUpdate {
            id,
            amount,
            note,
            timestamp,
        });
        id
    }

    /// All raw entries in append order.
    pub fn entries(&self) -> &[ChipStackUpdate] {
        &self.entries
    }

    /// Whether no observation has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last recorded observation, if any.
    pub fn last(&self) -> Option<&ChipStackUpdate> {
        self.entries.last()
    }

    /// The stack as last reported, falling back to `buy_in` for an empty ledger.
    pub fn current_amount(&self, buy_in: f64) -> f64 {
        self.entries.last().map(|e| e.amount).unwrap_or(buy_in)
    }

    /// Net result so far: current stack minus total buy-in.
    pub fn profit(&self, buy_in: f64) -> f64 {
        self.current_amount(buy_in) - buy_in
    }

    /// Collapse bursts of updates into display entries. Read-only; the ledger
    /// itself is never mutated by this view.
    ///
    /// Entries are sorted by timestamp and grouped greedily: an entry joins
    /// the current group when it lands within `window` of the previous entry
    /// *in that group*. Each group renders as its last amount/timestamp, with
    /// the note synthesized as follows:
    /// 1. every entry carries a quick add/subtract note: the signed deltas are
    ///    summed into one `Quick add:` note;
    /// 2. no entry carries a note: `Combined N updates (<net>)`;
    /// 3. all present notes are identical: that note is kept;
    /// 4. otherwise the net change plus the distinct notes, semicolon-joined.
    ///
    /// A group of one passes through unchanged.
    pub fn merged_for_display(&self, window: Duration) -> Vec<MergedUpdate> {
        let mut sorted: Vec<&ChipStackUpdate> = self.entries.iter().collect();
        sorted.sort_by_key(|e| e.timestamp);

        let mut groups: Vec<Vec<&ChipStackUpdate>> = Vec::new();
        for entry in sorted {
            let joins_group = groups.last().is_some_and(|group| {
                entry
                    .timestamp
                    .duration_since(group.last().expect("groups are never empty").timestamp)
                    .unwrap_or_default()
                    <= window
            });
            if joins_group {
                groups
                    .last_mut()
                    .expect("groups are never empty")
                    .push(entry);
            } else {
                groups.push(vec![entry]);
            }
        }

        groups.into_iter().map(collapse_group).collect()
    }
}

fn collapse_group(group: Vec<&ChipStackUpdate>) -> MergedUpdate {
    let last = group.last().expect("groups are never empty");
    if group.len() == 1 {
        return MergedUpdate {
            amount: last.amount,
            timestamp: last.timestamp,
            note: last.note.clone(),
            merged_count: 1,
        };
    }

    MergedUpdate {
        amount: last.amount,
        timestamp: last.timestamp,
        note: synthesize_note(&group),
        merged_count: group.len(),
    }
}

fn synthesize_note(group: &[&ChipStackUpdate]) -> Option<String> {
    let quick_deltas = group
        .iter()
        .map(|e| e.note.as_deref().and_then(parse_quick_note))
        .collect::<Option<Vec<f64>>>();
    if let Some(deltas) = quick_deltas {
        let sum: f64 = deltas.iter().sum();
        return Some(format!("Quick add: {}", format_signed_dollars(sum)));
    }

    let net = group.last().expect("groups are never empty").amount
        - group.first().expect("groups are never empty").amount;

    let notes: Vec<&str> = group.iter().filter_map(|e| e.note.as_deref()).collect();
    if notes.is_empty() {
        return Some(format!(
            "Combined {} updates ({})",
            group.len(),
            format_signed_dollars(net)
        ));
    }

    let mut distinct: Vec<&str> = Vec::new();
    for note in &notes {
        if !distinct.contains(note) {
            distinct.push(note);
        }
    }
    if distinct.len() == 1 {
        return Some(distinct[0].to_owned());
    }

    Some(format!(
        "Combined {} updates ({}): {}",
        group.len(),
        format_signed_dollars(net),
        distinct.join("; ")
    ))
}

/// Parse the signed dollar delta out of a quick-update note such as
/// `"Quick add: +$5"` or `"Quick subtract: -$25"`.
pub fn parse_quick_note(note: &str) -> Option<f64> {
    let rest = note
        .strip_prefix("Quick add: ")
        .or_else(|| note.strip_prefix("Quick subtract: "))?;
    parse_signed_dollars(rest)
}

fn parse_signed_dollars(value: &str) -> Option<f64> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1.0, &value[1..]),
        b'-' => (-1.0, &value[1..]),
        _ => (1.0, value),
    };
    let digits = rest.strip_prefix('$')?;
    digits.parse::<f64>().ok().map(|v| sign * v)
}

/// Render a signed dollar amount the way ledger notes spell it: `+$200`,
/// `-$20`, `+$12.50`. Whole amounts drop the cents.
pub fn format_signed_dollars(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "+" };
    let abs = value.abs();
    if abs.fract() == 0.0 {
        format!("{sign}${abs:.0}")
    } else {
        format!("{sign}${abs:.2}")
    }
}
