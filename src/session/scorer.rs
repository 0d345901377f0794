//! Result Scorer
//!
//! Turns the volumes recorded during a run into one datapoint per
//! frequency and a single 0-100 score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HearingError, Result};
use crate::session::sequencer::{result_index, Ear};

/// Highest volume a subject can submit
pub const MAX_VOLUME: u8 = 100;

/// One frequency row combining both ears' recorded volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Frequency in Hz. Stored as `name`, the key the chart data has always used.
    #[serde(rename = "name", alias = "frequency")]
    pub frequency: u32,
    /// Volume needed for the right ear, 0-100
    pub right: u8,
    /// Volume needed for the left ear, 0-100
    pub left: u8,
}

impl Datapoint {
    /// Volume recorded for one ear.
    pub fn volume(&self, ear: Ear) -> u8 {
        match ear {
            Ear::Right => self.right,
            Ear::Left => self.left,
        }
    }
}

/// Score bands, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    BelowAverage,
    Poor,
}

impl ScoreBand {
    /// Inclusive lower bound of the band.
    pub fn lower_bound(&self) -> u8 {
        match self {
            ScoreBand::Excellent => 90,
            ScoreBand::Good => 75,
            ScoreBand::Fair => 60,
            ScoreBand::BelowAverage => 40,
            ScoreBand::Poor => 0,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Fair => "Fair",
            ScoreBand::BelowAverage => "Below Average",
            ScoreBand::Poor => "Poor",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label and band for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreInfo {
    pub label: &'static str,
    pub band: ScoreBand,
}

/// Combine a complete run's volumes into one datapoint per frequency.
///
/// The ear at position `e` in `ears` owns results `e*F .. (e+1)*F`, so
/// for the usual `[right, left]` order `right == results[i]` and
/// `left == results[i + F]`.
///
/// # Errors
/// * `IncompleteRun` - `results` does not hold exactly one value per trial
/// * `Config` - `ears` is not one right and one left ear
pub fn assemble(results: &[u8], frequencies: &[u32], ears: &[Ear]) -> Result<Vec<Datapoint>> {
    let expected = frequencies.len() * ears.len();
    if results.len() != expected {
        return Err(HearingError::IncompleteRun {
            expected,
            actual: results.len(),
        });
    }

    let position = |ear: Ear| {
        ears.iter()
            .position(|e| *e == ear)
            .ok_or_else(|| HearingError::Config {
                reason: format!("ear set is missing the {} ear", ear),
            })
    };
    let right_idx = position(Ear::Right)?;
    let left_idx = position(Ear::Left)?;

    let f = frequencies.len();
    Ok(frequencies
        .iter()
        .enumerate()
        .map(|(i, &frequency)| Datapoint {
            frequency,
            right: results[result_index(i, right_idx, f)],
            left: results[result_index(i, left_idx, f)],
        })
        .collect())
}

/// Score a hearing profile: `round(100 - mean volume)` over both ears.
///
/// # Errors
/// * `EmptyInput` - there are no datapoints to average
pub fn score(datapoints: &[Datapoint]) -> Result<u8> {
    if datapoints.is_empty() {
        return Err(HearingError::EmptyInput);
    }

    let total: u32 = datapoints
        .iter()
        .map(|d| u32::from(d.right) + u32::from(d.left))
        .sum();
    let mean = f64::from(total) / (datapoints.len() * 2) as f64;

    Ok((100.0 - mean).round().clamp(0.0, 100.0) as u8)
}

/// Look up the band for a score, clamping it into 0-100 first.
pub fn score_info(score: i32) -> ScoreInfo {
    let clamped = score.clamp(0, 100) as u8;
    let band = [
        ScoreBand::Excellent,
        ScoreBand::Good,
        ScoreBand::Fair,
        ScoreBand::BelowAverage,
    ]
    .into_iter()
    .find(|band| clamped >= band.lower_bound())
    .unwrap_or(ScoreBand::Poor);

    ScoreInfo {
        label: band.label(),
        band,
    }
}

/// Mean volume needed by one ear across all frequencies.
pub fn ear_average(datapoints: &[Datapoint], ear: Ear) -> Option<f64> {
    if datapoints.is_empty() {
        return None;
    }
    let total: u32 = datapoints.iter().map(|d| u32::from(d.volume(ear))).sum();
    Some(f64::from(total) / datapoints.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const RIGHT_LEFT: [Ear; 2] = [Ear::Right, Ear::Left];

    #[test]
    fn test_assemble_offset_rule() {
        let data = assemble(&[10, 20, 30, 40], &[2000, 4000], &RIGHT_LEFT).unwrap();
        assert_eq!(
            data,
            vec![
                Datapoint { frequency: 2000, right: 10, left: 30 },
                Datapoint { frequency: 4000, right: 20, left: 40 },
            ]
        );
    }

    #[test]
    fn test_assemble_left_first_keeps_labels() {
        let data = assemble(&[10, 20, 30, 40], &[2000, 4000], &[Ear::Left, Ear::Right]).unwrap();
        assert_eq!(data[0], Datapoint { frequency: 2000, right: 30, left: 10 });
        assert_eq!(data[1], Datapoint { frequency: 4000, right: 40, left: 20 });
    }

    #[test]
    fn test_assemble_incomplete_run() {
        let err = assemble(&[10, 20, 30], &[2000, 4000], &RIGHT_LEFT).unwrap_err();
        assert!(matches!(
            err,
            HearingError::IncompleteRun { expected: 4, actual: 3 }
        ));
    }

    #[test]
    fn test_score_scenario() {
        let data = assemble(&[10, 20, 30, 40], &[2000, 4000], &RIGHT_LEFT).unwrap();
        let s = score(&data).unwrap();
        assert_eq!(s, 75);
        assert_eq!(score_info(i32::from(s)).label, "Good");
    }

    #[test]
    fn test_score_empty_input() {
        assert!(matches!(score(&[]), Err(HearingError::EmptyInput)));
    }

    #[test]
    fn test_score_monotonic_in_each_volume() {
        let base = vec![
            Datapoint { frequency: 1000, right: 20, left: 35 },
            Datapoint { frequency: 2000, right: 50, left: 5 },
        ];
        for row in 0..base.len() {
            for ear in [Ear::Right, Ear::Left] {
                let mut last = u8::MAX;
                for v in 0..=MAX_VOLUME {
                    let mut data = base.clone();
                    match ear {
                        Ear::Right => data[row].right = v,
                        Ear::Left => data[row].left = v,
                    }
                    let s = score(&data).unwrap();
                    assert!(s <= last, "score rose at {} {} = {}", row, ear, v);
                    last = s;
                }
            }
        }
    }

    #[test]
    fn test_score_extremes() {
        let silent = vec![Datapoint { frequency: 1000, right: 0, left: 0 }];
        let loud = vec![Datapoint { frequency: 1000, right: 100, left: 100 }];
        assert_eq!(score(&silent).unwrap(), 100);
        assert_eq!(score(&loud).unwrap(), 0);
    }

    #[test_case(100, ScoreBand::Excellent; "top")]
    #[test_case(90, ScoreBand::Excellent; "excellent lower bound")]
    #[test_case(89, ScoreBand::Good; "just below excellent")]
    #[test_case(75, ScoreBand::Good; "good lower bound")]
    #[test_case(60, ScoreBand::Fair; "fair lower bound")]
    #[test_case(59, ScoreBand::BelowAverage; "just below fair")]
    #[test_case(40, ScoreBand::BelowAverage; "below average lower bound")]
    #[test_case(39, ScoreBand::Poor; "just below below average")]
    #[test_case(0, ScoreBand::Poor; "bottom")]
    #[test_case(-5, ScoreBand::Poor; "negative clamps")]
    #[test_case(150, ScoreBand::Excellent; "overflow clamps")]
    fn test_score_bands(score: i32, expected: ScoreBand) {
        assert_eq!(score_info(score).band, expected);
    }

    #[test]
    fn test_datapoint_json_layout() {
        let dp = Datapoint { frequency: 2000, right: 10, left: 30 };
        let json = serde_json::to_value(dp).unwrap();
        assert_eq!(json, serde_json::json!({"name": 2000, "right": 10, "left": 30}));

        let parsed: Datapoint =
            serde_json::from_str(r#"{"frequency": 4000, "right": 1, "left": 2}"#).unwrap();
        assert_eq!(parsed.frequency, 4000);
    }

    #[test]
    fn test_ear_average() {
        let data = assemble(&[10, 20, 30, 40], &[2000, 4000], &RIGHT_LEFT).unwrap();
        assert_eq!(ear_average(&data, Ear::Right), Some(15.0));
        assert_eq!(ear_average(&data, Ear::Left), Some(35.0));
        assert_eq!(ear_average(&[], Ear::Left), None);
    }
}
