use crate::play::PlayRecord;

/// A contextual note mined from the plays of one strategy group.
///
/// Implementations look at the member rows and return a short note, or `None`
/// when the signal is absent. Notes are appended to the rationale in rule order.
pub trait RationaleRule: Send + Sync {
    fn note(&self, plays: &[&PlayRecord]) -> Option<String>;
}

/// Lost-yardage plays. Reported as sacks when the play descriptions say so.
#[derive(Debug, Clone)]
pub struct NegativePlays {
    pub sack_keyword: String,
}

impl Default for NegativePlays {
    fn default() -> Self {
        Self {
            sack_keyword: "sack".to_string(),
        }
    }
}

impl RationaleRule for NegativePlays {
    fn note(&self, plays: &[&PlayRecord]) -> Option<String> {
        let negative = plays
            .iter()
            .filter(|p| p.yards_gained < 0.0)
            .collect::<Vec<_>>();
        if negative.is_empty() {
            return None;
        }
        let keyword = self.sack_keyword.to_lowercase();
        let sacks = negative
            .iter()
            .filter(|p| p.detail.to_lowercase().contains(&keyword))
            .count();
        if sacks > 0 {
            Some(format!("{sacks} {}", plural(sacks, "sack", "sacks")))
        } else {
            Some(format!(
                "{} {}",
                negative.len(),
                plural(negative.len(), "loss", "losses")
            ))
        }
    }
}

/// Explosive plays above a yardage threshold.
#[derive(Debug, Clone)]
pub struct BigGains {
    pub threshold_yards: f64,
}

impl Default for BigGains {
    fn default() -> Self {
        Self {
            threshold_yards: 20.0,
        }
    }
}

impl RationaleRule for BigGains {
    fn note(&self, plays: &[&PlayRecord]) -> Option<String> {
        let big = plays
            .iter()
            .filter(|p| p.yards_gained > self.threshold_yards)
            .count();
        (big > 0).then(|| format!("big gains ({big})"))
    }
}

/// The rules applied when nothing else is configured.
pub fn default_rules() -> Vec<Box<dyn RationaleRule>> {
    vec![Box::new(NegativePlays::default()), Box::new(BigGains::default())]
}

/// "Based on N similar plays (avg X yd). Factors: a, b"
pub fn compose(sample_size: usize, avg_gain: f64, notes: &[String]) -> String {
    let mut out = format!(
        "Based on {sample_size} similar {} (avg {:.1} yd).",
        plural(sample_size, "play", "plays"),
        avg_gain
    );
    if !notes.is_empty() {
        out.push_str(" Factors: ");
        out.push_str(&notes.join(", "));
    }
    out
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(yards: f64, detail: &str) -> PlayRecord {
        let mut p = PlayRecord::new("2025-01-01", "Pass");
        p.yards_gained = yards;
        p.detail = detail.to_string();
        p
    }

    #[test]
    fn sacks_replace_generic_losses() {
        let rows = [play(-7.0, "QB SACKED by #90"), play(-2.0, "bad snap"), play(5.0, "")];
        let refs = rows.iter().collect::<Vec<_>>();
        assert_eq!(NegativePlays::default().note(&refs).as_deref(), Some("1 sack"));

        let rows = [play(-2.0, "stuffed"), play(-1.0, "")];
        let refs = rows.iter().collect::<Vec<_>>();
        assert_eq!(NegativePlays::default().note(&refs).as_deref(), Some("2 losses"));
    }

    #[test]
    fn big_gain_threshold_is_exclusive() {
        let rows = [play(20.0, ""), play(21.0, ""), play(45.0, "")];
        let refs = rows.iter().collect::<Vec<_>>();
        assert_eq!(BigGains::default().note(&refs).as_deref(), Some("big gains (2)"));
    }

    #[test]
    fn compose_lists_notes() {
        assert_eq!(compose(1, 8.0, &[]), "Based on 1 similar play (avg 8.0 yd).");
        let text = compose(3, 4.24, &["1 sack".to_string(), "big gains (1)".to_string()]);
        assert_eq!(text, "Based on 3 similar plays (avg 4.2 yd). Factors: 1 sack, big gains (1)");
    }
}
