//! Policies for reducing a `Match` to a single `(target, predicted)` label pair.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::{Error, PredictionItem, Result};

/// Rule for choosing one prediction among the candidates of a ground-truth box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchingPolicy {
    /// Highest confidence score wins; ties go to the first candidate.
    #[default]
    BestScore,
    /// Highest IoU wins. Not implemented.
    BestIou,
}

impl MatchingPolicy {
    /// All policy variants.
    pub const ALL: [MatchingPolicy; 2] = [MatchingPolicy::BestScore, MatchingPolicy::BestIou];

    /// Fail unless the policy has a selection rule.
    pub fn ensure_implemented(&self) -> Result<()> {
        match self {
            MatchingPolicy::BestScore => Ok(()),
            MatchingPolicy::BestIou => Err(Error::NotImplemented(
                "BEST_IOU matching policy".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingPolicy::BestScore => "BEST_SCORE",
            MatchingPolicy::BestIou => "BEST_IOU",
        }
    }
}

impl fmt::Display for MatchingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchingPolicy {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "BEST_SCORE" => Ok(MatchingPolicy::BestScore),
            "BEST_IOU" => Ok(MatchingPolicy::BestIou),
            _ => {
                let valid: Vec<&str> = MatchingPolicy::ALL.iter().map(|p| p.as_str()).collect();
                Err(Error::InvalidConfig(format!(
                    "policy must be one of {:?}, got '{}'",
                    valid, name
                )))
            }
        }
    }
}

/// What to record for a ground-truth box that has no candidate prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedTargetPolicy {
    /// Record nothing; the miss does not show up in the matrix.
    #[default]
    Drop,
    /// Record the box as predicted background (a false negative).
    Background,
}

/// Pick one candidate according to `policy`.
///
/// # Returns
/// `Ok(None)` if there are no candidates.
///
/// # Errors
/// Returns `Error::NotImplemented` for `MatchingPolicy::BestIou`.
pub fn select_prediction(
    policy: MatchingPolicy,
    candidates: &[PredictionItem],
) -> Result<Option<&PredictionItem>> {
    match policy {
        MatchingPolicy::BestScore => Ok(best_score_item(candidates)),
        MatchingPolicy::BestIou => policy.ensure_implemented().map(|_| None),
    }
}

/// Candidate with the strictly highest score, first-seen on ties.
fn best_score_item(candidates: &[PredictionItem]) -> Option<&PredictionItem> {
    candidates.iter().fold(None, |best: Option<&PredictionItem>, item| match best {
        Some(b) if b.score >= item.score => Some(b),
        _ => Some(item),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BBox;

    fn item(index: usize, label_id: usize, score: f64, iou: f64) -> PredictionItem {
        PredictionItem {
            index,
            bbox: BBox::from_xyxy(0.0, 0.0, 1.0, 1.0).unwrap(),
            label_id,
            score,
            iou,
        }
    }

    // ===== Best Score =====

    #[test]
    fn test_best_score_picks_highest() {
        let candidates = vec![item(0, 1, 0.3, 0.9), item(1, 2, 0.8, 0.5), item(2, 3, 0.6, 0.7)];
        let chosen = select_prediction(MatchingPolicy::BestScore, &candidates).unwrap().unwrap();
        assert_eq!(chosen.index, 1);
        assert_eq!(chosen.label_id, 2);
    }

    #[test]
    fn test_best_score_ties_resolve_to_first() {
        let candidates = vec![item(0, 1, 0.5, 0.9), item(1, 2, 0.8, 0.5), item(2, 3, 0.8, 0.99)];
        let chosen = select_prediction(MatchingPolicy::BestScore, &candidates).unwrap().unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn test_best_score_empty() {
        let chosen = select_prediction(MatchingPolicy::BestScore, &[]).unwrap();
        assert!(chosen.is_none());
    }

    // ===== Best IoU =====

    #[test]
    fn test_best_iou_not_implemented() {
        let candidates = vec![item(0, 1, 0.5, 0.9)];
        let result = select_prediction(MatchingPolicy::BestIou, &candidates);
        assert!(matches!(result, Err(Error::NotImplemented(_))));

        // Fails even without candidates
        let result = select_prediction(MatchingPolicy::BestIou, &[]);
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }

    // ===== Parsing =====

    #[test]
    fn test_parse_policy_names() {
        assert_eq!("best_score".parse::<MatchingPolicy>().unwrap(), MatchingPolicy::BestScore);
        assert_eq!("BEST_SCORE".parse::<MatchingPolicy>().unwrap(), MatchingPolicy::BestScore);
        assert_eq!("best_iou".parse::<MatchingPolicy>().unwrap(), MatchingPolicy::BestIou);
    }

    #[test]
    fn test_parse_invalid_policy_names_valid_set() {
        let err = "best_area".parse::<MatchingPolicy>().unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(message.contains("BEST_SCORE"));
        assert!(message.contains("BEST_IOU"));
        assert!(message.contains("best_area"));
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in MatchingPolicy::ALL {
            assert_eq!(policy.to_string().parse::<MatchingPolicy>().unwrap(), policy);
        }
    }
}
