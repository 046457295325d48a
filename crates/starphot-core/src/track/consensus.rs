use crate::consts::{
    CONSENSUS_AGREEMENT_DISTANCE, CONSENSUS_AGREEMENT_WEIGHT, CONSENSUS_CONFIDENCE_WEIGHT,
    CONSENSUS_PROXIMITY_WEIGHT,
};
use crate::frame::Position;
use crate::stats::median;
use crate::track::methods::Candidate;

/// Score of one candidate against the field:
/// `0.5 * confidence + 0.3 * agreement + 0.2 * proximity`, where agreement
/// falls to zero 5 px from the median candidate and proximity falls to zero
/// at `radius` from the search center.
pub fn score(candidate: &Candidate, consensus: &Position, center: &Position, radius: f64) -> f64 {
    let agreement =
        (1.0 - candidate.position.distance(consensus) / CONSENSUS_AGREEMENT_DISTANCE).max(0.0);
    let proximity = if radius > 0.0 {
        (1.0 - candidate.position.distance(center) / radius).max(0.0)
    } else {
        0.0
    };
    CONSENSUS_CONFIDENCE_WEIGHT * candidate.confidence
        + CONSENSUS_AGREEMENT_WEIGHT * agreement
        + CONSENSUS_PROXIMITY_WEIGHT * proximity
}

/// Per-axis median of all candidate positions.
pub fn consensus_position(candidates: &[Candidate]) -> Option<Position> {
    if candidates.is_empty() {
        return None;
    }
    let xs: Vec<f64> = candidates.iter().map(|c| c.position.x).collect();
    let ys: Vec<f64> = candidates.iter().map(|c| c.position.y).collect();
    Some(Position::new(median(&xs), median(&ys)))
}

/// Highest-scoring candidate. On equal scores the earlier candidate wins.
pub fn select_best(candidates: &[Candidate], center: &Position, radius: f64) -> Option<Candidate> {
    let consensus = consensus_position(candidates)?;
    let mut best: Option<(f64, &Candidate)> = None;
    for c in candidates {
        let s = score(c, &consensus, center, radius);
        tracing::debug!(method = %c.method, position = %c.position, score = s, "Consensus candidate");
        if best.map_or(true, |(best_score, _)| s > best_score) {
            best = Some((s, c));
        }
    }
    best.map(|(_, c)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::methods::MethodKind;

    fn cand(x: f64, y: f64, confidence: f64) -> Candidate {
        Candidate {
            position: Position::new(x, y),
            confidence,
            method: MethodKind::CenterOfMass,
        }
    }

    #[test]
    fn test_outlier_loses_despite_confidence() {
        let center = Position::new(50.0, 50.0);
        let candidates = [
            cand(50.2, 50.1, 0.6),
            cand(50.0, 49.9, 0.6),
            cand(70.0, 70.0, 1.0),
        ];
        let best = select_best(&candidates, &center, 25.0).unwrap();
        assert!(best.position.distance(&center) < 1.0);
    }

    #[test]
    fn test_score_terms_clamped() {
        let c = cand(200.0, 200.0, 0.0);
        let s = score(&c, &Position::new(0.0, 0.0), &Position::new(0.0, 0.0), 10.0);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_empty_has_no_best() {
        assert!(select_best(&[], &Position::default(), 10.0).is_none());
    }
}
