//! Pattern Detector (spec §4.C6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Stable,
    Declining,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Rising => "Rising",
            Trend::Stable => "Stable",
            Trend::Declining => "Declining",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalExample {
    pub file: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Default)]
struct NameState {
    count: u64,
    example: Option<CanonicalExample>,
    example_priority: u8, // 0 = none, 1 = non-core, 2 = core/shared
    dates: Vec<DateTime<Utc>>,
}

/// Per-category state: `name -> count`, canonical example, and date history
/// (spec §3 PatternCategoryState).
#[derive(Debug, Clone, Default)]
pub struct PatternCategoryState {
    names: HashMap<String, NameState>,
}

fn is_core_path(file: &str) -> bool {
    file.contains("/core/") || file.starts_with("core/") || file.contains("/shared/") || file.starts_with("shared/")
}

impl PatternCategoryState {
    pub fn track(&mut self, name: &str, example: Option<(&str, &str)>, file_date: Option<DateTime<Utc>>) {
        let state = self.names.entry(name.to_string()).or_default();
        state.count += 1;
        if let Some(date) = file_date {
            state.dates.push(date);
        }

        if let Some((file, snippet)) = example {
            let priority = if is_core_path(file) { 2 } else { 1 };
            let replace = match &state.example {
                None => true,
                Some(existing) => {
                    if priority > state.example_priority {
                        true
                    } else if priority == state.example_priority {
                        existing.snippet.len() > 200 && snippet.len() < existing.snippet.len() && snippet.len() > 50
                    } else {
                        false
                    }
                }
            };
            if replace {
                state.example = Some(CanonicalExample {
                    file: file.to_string(),
                    snippet: snippet.to_string(),
                });
                state.example_priority = priority;
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.names.values().map(|s| s.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// `calculateTrend` (spec §4.C6).
pub fn calculate_trend(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Trend> {
    let date = date?;
    let days = (now - date).num_days();
    Some(if days <= 90 {
        Trend::Rising
    } else if days <= 365 {
        Trend::Stable
    } else {
        Trend::Declining
    })
}

/// P90-newest file date: sort descending, take index `floor(n * 0.1)`, or
/// index 0 when `n < 5` (spec §4.C6 "Trend robustness").
fn p90_newest(dates: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    if dates.is_empty() {
        return None;
    }
    let mut sorted = dates.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));
    let idx = if sorted.len() < 5 { 0 } else { (sorted.len() as f64 * 0.1).floor() as usize };
    sorted.get(idx.min(sorted.len() - 1)).copied()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    pub name: String,
    pub count: u64,
    pub frequency_pct: u32,
    pub trend: Option<String>,
    pub guidance: String,
    pub canonical_example: Option<CanonicalExample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consensus {
    pub primary: PatternEntry,
    pub also_detected: Vec<PatternEntry>,
}

impl Consensus {
    /// Alternates close enough to the primary's adoption share that there is
    /// no clear team consensus yet (within 15 points), surfaced to
    /// `get_team_patterns` as detected conflicts.
    pub fn conflicts(&self) -> Vec<&PatternEntry> {
        self.also_detected
            .iter()
            .filter(|alt| self.primary.frequency_pct.abs_diff(alt.frequency_pct) < 15)
            .collect()
    }
}

fn guidance_for(name: &str, pct: u32, trend: Option<&Trend>, is_alternative: bool, has_rising_alternative: bool) -> String {
    let trend_suffix = |t: &Trend| format!(", {}", t.as_str().to_lowercase());
    match (is_alternative, trend) {
        (true, Some(Trend::Rising)) => format!("USE: {name} – {pct}%, rising (migration target)"),
        (false, Some(Trend::Declining)) if has_rising_alternative => format!("CAUTION: {name} – {pct}%, declining (legacy)"),
        (false, t) if pct >= 80 && !matches!(t, Some(Trend::Declining)) => {
            format!("USE: {name} – {pct}% adoption{}", t.map(trend_suffix).unwrap_or_default())
        }
        (false, Some(Trend::Declining)) if pct >= 80 => format!("PREFER: {name} – {pct}% adoption, declining"),
        (false, t) if (50..80).contains(&pct) => {
            format!("PREFER: {name} – {pct}% adoption{}", t.map(trend_suffix).unwrap_or_default())
        }
        (true, Some(Trend::Declining)) => format!("AVOID: {name} – {pct}%, declining (legacy)"),
        (true, t) if pct < 20 => format!("CAUTION: {name} – {pct}% minority pattern{}", t.map(trend_suffix).unwrap_or_default()),
        (_, t) => format!("{name} – {pct}%{}", t.map(trend_suffix).unwrap_or_default()),
    }
}

/// Category -> set of pattern names that complement rather than compete
/// (spec §4.C6, §9). Declared as explicit configuration, not inferred.
pub fn complementary_names(category: &str) -> &'static [&'static str] {
    match category {
        "reactivity" => &["Computed", "Effect"],
        _ => &[],
    }
}

/// Testing-framework category superset (spec §4.C6): separate unit/e2e/mock
/// buckets, plus a legacy bucket kept only for display when no unit
/// framework was detected.
pub const TESTING_CATEGORIES: &[&str] = &["unitTestFramework", "e2eFramework", "testMocking", "testUtility", "testingFramework"];

pub fn get_consensus(state: &PatternCategoryState, now: DateTime<Utc>) -> Option<Consensus> {
    if state.is_empty() {
        return None;
    }
    let total = state.total().max(1);
    let mut ranked: Vec<(&String, &NameState)> = state.names.iter().collect();
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(b.0)));

    let rising_exists = ranked.iter().skip(1).any(|(_, s)| {
        matches!(calculate_trend(p90_newest(&s.dates), now), Some(Trend::Rising))
    });

    let build_entry = |name: &str, s: &NameState, is_alt: bool| -> PatternEntry {
        let pct = ((s.count as f64 / total as f64) * 100.0).round() as u32;
        let trend = calculate_trend(p90_newest(&s.dates), now);
        let guidance = guidance_for(name, pct, trend.as_ref(), is_alt, rising_exists);
        PatternEntry {
            name: name.to_string(),
            count: s.count,
            frequency_pct: pct,
            trend: trend.map(|t| t.as_str().to_string()),
            guidance,
            canonical_example: s.example.clone(),
        }
    };

    let (primary_name, primary_state) = ranked[0];
    let primary = build_entry(primary_name, primary_state, false);
    let also_detected = ranked
        .iter()
        .skip(1)
        .take(3)
        .map(|(n, s)| build_entry(n, s, true))
        .collect();

    Some(Consensus { primary, also_detected })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenFileEntry {
    pub file: String,
    pub score: f64,
    pub flags: HashMap<String, bool>,
}

/// Pattern detector: per-category state plus golden-file tracking (spec
/// §4.C6).
#[derive(Debug, Default)]
pub struct PatternDetector {
    categories: HashMap<String, PatternCategoryState>,
    golden_files: HashMap<String, GoldenFileEntry>,
}

impl PatternDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, category: &str, name: &str, example: Option<(&str, &str)>, file_date: Option<DateTime<Utc>>) {
        self.categories.entry(category.to_string()).or_default().track(name, example, file_date);
    }

    pub fn get_consensus(&self, category: &str, now: DateTime<Utc>) -> Option<Consensus> {
        self.categories.get(category).and_then(|s| get_consensus(s, now))
    }

    pub fn categories(&self) -> impl Iterator<Item = &String> {
        self.categories.keys()
    }

    pub fn track_golden_file(&mut self, file: &str, score: f64, flags: HashMap<String, bool>) {
        let replace = match self.golden_files.get(file) {
            Some(existing) => score > existing.score,
            None => true,
        };
        if replace {
            self.golden_files.insert(
                file.to_string(),
                GoldenFileEntry {
                    file: file.to_string(),
                    score,
                    flags,
                },
            );
        }
    }

    pub fn golden_files(&self, n: usize) -> Vec<GoldenFileEntry> {
        let mut all: Vec<_> = self.golden_files.values().cloned().collect();
        all.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        all.truncate(n);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn consensus_matches_spec_scenario_4() {
        let now = Utc::now();
        let mut state = PatternCategoryState::default();
        for _ in 0..97 {
            state.track("inject() function", None, Some(now - Duration::days(10)));
        }
        for _ in 0..3 {
            state.track("Constructor injection", None, Some(now - Duration::days(800)));
        }

        let consensus = get_consensus(&state, now).unwrap();
        assert_eq!(consensus.primary.name, "inject() function");
        assert_eq!(consensus.primary.frequency_pct, 97);
        assert_eq!(consensus.primary.trend.as_deref(), Some("Rising"));
        assert!(consensus.primary.guidance.starts_with("USE:"));

        let alt = &consensus.also_detected[0];
        assert_eq!(alt.name, "Constructor injection");
        assert_eq!(alt.trend.as_deref(), Some("Declining"));
        assert!(alt.guidance.starts_with("AVOID:"));
    }

    #[test]
    fn trend_is_robust_to_a_minority_of_recent_edits() {
        let now = Utc::now();
        let mut dates: Vec<DateTime<Utc>> = (0..100).map(|_| now - Duration::days(800)).collect();
        // Mutate 10% to "today" - P90 newest should still land on an old date.
        for d in dates.iter_mut().take(10) {
            *d = now;
        }
        let trend = calculate_trend(p90_newest(&dates), now);
        assert_eq!(trend, Some(Trend::Declining));
    }

    #[test]
    fn canonical_example_prefers_core_path_then_shorter() {
        let mut state = PatternCategoryState::default();
        state.track("X", Some(("src/feature/a.ts", &"a".repeat(250))), None);
        state.track("X", Some(("src/core/b.ts", "short")), None);
        let example = state.names.get("X").unwrap().example.clone().unwrap();
        assert_eq!(example.file, "src/core/b.ts");
    }
}
