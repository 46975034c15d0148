//! Progress extraction from free-form diagnostic text.
//!
//! Recognised signals, in priority order:
//! - a standalone percentage token, `42%` or `37.5%` (tqdm style);
//! - a `done/total` counter pair, `7/20`.
//!
//! Anything else is a plain line and must still reach the log.
use std::sync::OnceLock;

use regex::Regex;

/// A parsed progress signal, before normalisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressSignal {
    Percent(f64),
    Counter { done: u64, total: u64 },
}

impl ProgressSignal {
    /// Normalised percentage, floored and clamped to `0..=100`.
    pub fn percent(self) -> u8 {
        let raw = match self {
            ProgressSignal::Percent(p) => p,
            ProgressSignal::Counter { done, total } => {
                if total == 0 {
                    return 0;
                }
                (done as f64 * 100.0) / total as f64
            }
        };
        if raw.is_nan() {
            return 0;
        }
        raw.floor().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// The line is a progress signal and is consumed as such.
    Progress(u8),
    /// An ordinary diagnostic line; `estimate` carries a heuristic progress
    /// value when the extractor falls back to counting lines.
    Plain { estimate: Option<u8> },
}

pub trait ProgressExtractor: Send {
    fn extract(&mut self, line: &str) -> Extraction;
}

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w.])(\d+(?:\.\d+)?)%(?:$|[^\w])").expect("percent regex is valid")
    })
}

fn counter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w./])(\d+)/(\d+)(?:$|[^\w./])").expect("counter regex is valid")
    })
}

/// Parses the first progress signal in `line`, if any.
pub fn parse_signal(line: &str) -> Option<ProgressSignal> {
    if let Some(p) = percent_re()
        .captures(line)
        .and_then(|c| c.get(1)?.as_str().parse::<f64>().ok())
    {
        return Some(ProgressSignal::Percent(p));
    }
    counter_re().captures_iter(line).find_map(|c| {
        let done = c.get(1)?.as_str().parse::<u64>().ok()?;
        let total = c.get(2)?.as_str().parse::<u64>().ok()?;
        (total > 0).then_some(ProgressSignal::Counter { done, total })
    })
}

/// Percentage-token and counter-pair extractor.
#[derive(Debug, Default)]
pub struct TextProgressExtractor;

impl ProgressExtractor for TextProgressExtractor {
    fn extract(&mut self, line: &str) -> Extraction {
        match parse_signal(line) {
            Some(signal) => Extraction::Progress(signal.percent()),
            None => Extraction::Plain { estimate: None },
        }
    }
}

/// Wraps an extractor for workers that declare an expected item count but
/// may not print structured progress: every non-empty unparsed line advances
/// the estimate by one point, never past `FALLBACK_CEILING`. The stage forces
/// 100 itself once it succeeds.
pub struct LineCountFallback<E> {
    inner: E,
    advanced: u8,
}

pub const FALLBACK_CEILING: u8 = 99;

impl<E: ProgressExtractor> LineCountFallback<E> {
    pub fn new(inner: E) -> Self {
        Self { inner, advanced: 0 }
    }
}

impl<E: ProgressExtractor> ProgressExtractor for LineCountFallback<E> {
    fn extract(&mut self, line: &str) -> Extraction {
        match self.inner.extract(line) {
            Extraction::Plain { estimate: None } if !line.trim().is_empty() => {
                self.advanced = (self.advanced + 1).min(FALLBACK_CEILING);
                Extraction::Plain {
                    estimate: Some(self.advanced),
                }
            }
            other => other,
        }
    }
}

/// Extractor for one stage: counter/percentage parsing, plus the line-count
/// fallback when the stage declared how many items it expects.
pub fn extractor_for(expected_total: Option<u64>) -> Box<dyn ProgressExtractor> {
    match expected_total {
        Some(_) => Box::new(LineCountFallback::new(TextProgressExtractor)),
        None => Box::new(TextProgressExtractor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn percentage_counter_and_plain_lines() {
        let mut ex = TextProgressExtractor;
        let got: Vec<Extraction> = ["42%", "7/20", "not a progress line"]
            .iter()
            .map(|l| ex.extract(l))
            .collect();
        assert_eq!(
            got,
            vec![
                Extraction::Progress(42),
                Extraction::Progress(35),
                Extraction::Plain { estimate: None },
            ]
        );
    }

    #[test]
    fn tqdm_bar_prefers_percentage_over_counter() {
        let line = " 37%|███▋      | 37/100 [00:04<00:07,  8.21it/s]";
        assert_eq!(parse_signal(line), Some(ProgressSignal::Percent(37.0)));
    }

    #[test]
    fn float_percent_is_floored_and_clamped() {
        assert_eq!(ProgressSignal::Percent(99.9).percent(), 99);
        assert_eq!(ProgressSignal::Percent(250.0).percent(), 100);
        assert_eq!(
            ProgressSignal::Counter {
                done: 30,
                total: 20
            }
            .percent(),
            100
        );
        assert_eq!(parse_signal("done: 12.5% of positions"), Some(ProgressSignal::Percent(12.5)));
    }

    #[test]
    fn fen_fragments_and_zero_totals_are_not_progress() {
        assert_eq!(parse_signal("rnbqkbnr/pppppppp/8/8 w KQkq -"), None);
        assert_eq!(parse_signal("0/0 positions"), None);
        assert_eq!(parse_signal("version 1.2%beta"), None);
        assert_eq!(parse_signal("2024/01/05 started"), None);
    }

    #[test]
    fn counter_pair_inside_text() {
        assert_eq!(
            parse_signal("generated 10/100 positions"),
            Some(ProgressSignal::Counter { done: 10, total: 100 })
        );
    }

    #[test]
    fn fallback_advances_one_point_per_line_up_to_ceiling() {
        let mut ex = LineCountFallback::new(TextProgressExtractor);
        assert_eq!(ex.extract("searching"), Extraction::Plain { estimate: Some(1) });
        assert_eq!(ex.extract(""), Extraction::Plain { estimate: None });
        assert_eq!(ex.extract("50%"), Extraction::Progress(50));
        for _ in 0..200 {
            ex.extract("info depth 10");
        }
        assert_eq!(
            ex.extract("info depth 11"),
            Extraction::Plain {
                estimate: Some(FALLBACK_CEILING)
            }
        );
    }
}
