//! Per-field similarity averaged into a single `[0,1]` convergence score.

use ainp_core::{constants::CONVERGENCE_EPSILON, Proposal};

fn numeric_similarity(a: f64, b: f64) -> f64 {
    let denom = a.abs().max(b.abs()).max(CONVERGENCE_EPSILON);
    1.0 - (a - b).abs() / denom
}

fn bool_similarity(a: bool, b: bool) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}

/// Similarity between two proposals over their negotiated fields, averaged
/// equally across every field present in at least one of the two. `None`
/// when neither proposal carries any comparable field.
pub fn convergence_delta(previous: &Proposal, current: &Proposal) -> Option<f64> {
    let mut scores = Vec::new();

    if previous.price.is_some() || current.price.is_some() {
        if let (Some(a), Some(b)) = (previous.price, current.price) {
            scores.push(numeric_similarity(a, b));
        } else {
            scores.push(0.0);
        }
    }
    if previous.delivery_time.is_some() || current.delivery_time.is_some() {
        if let (Some(a), Some(b)) = (previous.delivery_time, current.delivery_time) {
            scores.push(numeric_similarity(a, b));
        } else {
            scores.push(0.0);
        }
    }
    if previous.quality_sla.is_some() || current.quality_sla.is_some() {
        if let (Some(a), Some(b)) = (previous.quality_sla, current.quality_sla) {
            scores.push(bool_similarity(a, b));
        } else {
            scores.push(0.0);
        }
    }

    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_proposals_converge_fully() {
        let p = Proposal {
            price: Some(90.0),
            delivery_time: Some(10.0),
            quality_sla: Some(true),
            custom: Default::default(),
        };
        assert_eq!(convergence_delta(&p, &p), Some(1.0));
    }

    #[test]
    fn far_apart_prices_score_near_zero() {
        let a = Proposal {
            price: Some(100.0),
            ..Default::default()
        };
        let b = Proposal {
            price: Some(0.0001),
            ..Default::default()
        };
        let score = convergence_delta(&a, &b).unwrap();
        assert!(score < 0.01);
    }

    #[test]
    fn no_comparable_fields_is_undefined() {
        let a = Proposal::default();
        let b = Proposal::default();
        assert_eq!(convergence_delta(&a, &b), None);
    }

    #[test]
    fn score_is_bounded_to_unit_interval() {
        let a = Proposal {
            price: Some(100.0),
            delivery_time: Some(5.0),
            quality_sla: Some(true),
            custom: Default::default(),
        };
        let b = Proposal {
            price: Some(90.0),
            delivery_time: Some(7.0),
            quality_sla: Some(false),
            custom: Default::default(),
        };
        let score = convergence_delta(&a, &b).unwrap();
        assert!((0.0..=1.0).contains(&score));
    }
}
