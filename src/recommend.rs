use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::play::{PlayRecord, Situation};
use crate::rationale::{self, RationaleRule};
use crate::strategy::{PlayCodeTable, strategy_label};

/// Half-widths of the approximate-match windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchWindow {
    pub distance_yards: u32,
    pub field_yards: u32,
}

impl Default for MatchWindow {
    fn default() -> Self {
        Self {
            distance_yards: 2,
            field_yards: 10,
        }
    }
}

/// One ranked strategy, ready for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub label: String,
    pub avg_gain: f64,
    pub success_rate: String,
    pub sample_size: usize,
    pub rationale: String,
}

/// Per-strategy statistics over the matched plays.
#[derive(Debug, Clone)]
pub struct StrategyGroup<'a> {
    pub label: String,
    pub avg_gain: f64,
    pub success_rate: f64,
    pub sample_size: usize,
    pub plays: Vec<&'a PlayRecord>,
}

/// Plays similar to `situation`. Each specified dimension narrows the match;
/// unspecified ones are ignored.
pub fn filter_plays<'a>(
    plays: &'a [PlayRecord],
    situation: &Situation,
    window: MatchWindow,
) -> Vec<&'a PlayRecord> {
    let distance_range = situation.distance.map(|d| {
        (
            d.saturating_sub(window.distance_yards),
            d.saturating_add(window.distance_yards),
        )
    });
    let field_range = situation.field_position.map(|pos| {
        (
            f64::from(pos.saturating_sub(window.field_yards)),
            f64::from(pos.saturating_add(window.field_yards).min(100)),
        )
    });

    plays
        .iter()
        .filter(|p| situation.down.is_none_or(|d| p.down == d))
        .filter(|p| distance_range.is_none_or(|(lo, hi)| (lo..=hi).contains(&p.distance)))
        .filter(|p| {
            field_range.is_none_or(|(lo, hi)| {
                p.field_position_num()
                    .is_some_and(|pos| pos >= lo && pos <= hi)
            })
        })
        .filter(|p| {
            situation
                .quarter
                .as_deref()
                .is_none_or(|q| p.quarter == q)
        })
        .collect()
}

/// Group plays by strategy label. Groups come back in label order.
pub fn aggregate<'a>(plays: &[&'a PlayRecord], codes: &PlayCodeTable) -> Vec<StrategyGroup<'a>> {
    let mut by_label: BTreeMap<String, Vec<&'a PlayRecord>> = BTreeMap::new();
    for play in plays {
        by_label
            .entry(strategy_label(play, codes))
            .or_default()
            .push(*play);
    }

    by_label
        .into_iter()
        .filter(|(_, members)| !members.is_empty())
        .map(|(label, members)| {
            let n = members.len() as f64;
            let avg_gain = members.iter().map(|p| p.yards_gained).sum::<f64>() / n;
            let success_rate = members.iter().map(|p| f64::from(p.success)).sum::<f64>() / n;
            StrategyGroup {
                label,
                avg_gain,
                success_rate,
                sample_size: members.len(),
                plays: members,
            }
        })
        .collect()
}

/// Best average gain first; equal averages favor the larger sample.
pub fn rank(groups: &mut [StrategyGroup<'_>]) {
    groups.sort_by(|a, b| {
        b.avg_gain
            .total_cmp(&a.avg_gain)
            .then(b.sample_size.cmp(&a.sample_size))
    });
}

/// Stateless situational recommender. Holds only configuration.
pub struct Recommender {
    codes: PlayCodeTable,
    rules: Vec<Box<dyn RationaleRule>>,
    window: MatchWindow,
}

impl Default for Recommender {
    fn default() -> Self {
        Self {
            codes: PlayCodeTable::legacy(),
            rules: rationale::default_rules(),
            window: MatchWindow::default(),
        }
    }
}

impl Recommender {
    pub fn new(codes: PlayCodeTable, rules: Vec<Box<dyn RationaleRule>>, window: MatchWindow) -> Self {
        Self {
            codes,
            rules,
            window,
        }
    }

    pub fn with_window(mut self, window: MatchWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_codes(mut self, codes: PlayCodeTable) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_rule(mut self, rule: impl RationaleRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn window(&self) -> MatchWindow {
        self.window
    }

    /// Ranked suggestions for `situation`. Empty when nothing in `dataset` matches.
    pub fn recommend(&self, dataset: &[PlayRecord], situation: &Situation) -> Vec<Suggestion> {
        let matched = filter_plays(dataset, situation, self.window);
        if matched.is_empty() {
            return Vec::new();
        }

        let mut groups = aggregate(&matched, &self.codes);
        rank(&mut groups);

        groups
            .iter()
            .filter(|g| g.sample_size > 0)
            .map(|g| self.suggestion(g))
            .collect()
    }

    fn suggestion(&self, group: &StrategyGroup<'_>) -> Suggestion {
        let notes = self
            .rules
            .iter()
            .filter_map(|rule| rule.note(&group.plays))
            .collect::<Vec<_>>();
        let avg_gain = round1(group.avg_gain);
        Suggestion {
            label: group.label.clone(),
            avg_gain,
            success_rate: format!("{:.0}%", group.success_rate * 100.0),
            sample_size: group.sample_size,
            rationale: rationale::compose(group.sample_size, avg_gain, &notes),
        }
    }
}

/// Recommend with the default code table, rules and windows.
pub fn recommend(dataset: &[PlayRecord], situation: &Situation) -> Vec<Suggestion> {
    Recommender::default().recommend(dataset, situation)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
