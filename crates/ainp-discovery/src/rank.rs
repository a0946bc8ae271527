/// Cosine similarity between two equal-length embeddings, `[-1,1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// `sim = 1 - cos_distance(q, cap) = (1 + cosine_similarity) / 2`, mapped
/// into `[0,1]` since cosine similarity itself ranges `[-1,1]`.
pub fn similarity(query: &[f32], candidate: &[f32]) -> f64 {
    ((1.0 + cosine_similarity(query, candidate)) / 2.0).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct RankWeights {
    pub w_sim: f64,
    pub w_trust: f64,
    pub w_use: f64,
}

/// `rank = w_sim*sim + w_trust*trust + w_use*use`.
pub fn rank(sim: f64, trust: f64, usefulness_0_100: f64, weights: RankWeights) -> f64 {
    let use_norm = usefulness_0_100 / 100.0;
    weights.w_sim * sim + weights.w_trust * trust + weights.w_use * use_norm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_half() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((similarity(&a, &b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn higher_usefulness_never_decreases_rank_when_weight_positive() {
        let weights = RankWeights {
            w_sim: 0.6,
            w_trust: 0.3,
            w_use: 0.1,
        };
        let rank_low = rank(0.8, 0.5, 10.0, weights);
        let rank_high = rank(0.8, 0.5, 90.0, weights);
        assert!(rank_high > rank_low);
    }

    #[test]
    fn usefulness_has_no_effect_when_weight_zero() {
        let weights = RankWeights {
            w_sim: 0.7,
            w_trust: 0.3,
            w_use: 0.0,
        };
        let rank_low = rank(0.8, 0.5, 10.0, weights);
        let rank_high = rank(0.8, 0.5, 90.0, weights);
        assert!((rank_low - rank_high).abs() < 1e-12);
    }
}
