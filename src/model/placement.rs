use rand::Rng;

/// Where one stationary entity sits on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    /// Rotation about the vertical axis in degrees.
    pub seed: f32,
}

/// Samples are drawn from ±RANGE and multiplied by SPREAD.
pub const POSITION_RANGE: f32 = 999.0;
pub const SEED_RANGE: f32 = 360.0;
pub const SPREAD: f32 = 10.0;

pub fn generate_placements<R: Rng>(count: usize, rng: &mut R) -> Vec<Placement> {
    (0..count)
        .map(|_| Placement {
            x: rng.random_range(-POSITION_RANGE..POSITION_RANGE) * SPREAD,
            y: rng.random_range(-POSITION_RANGE..POSITION_RANGE) * SPREAD,
            seed: rng.random_range(-SEED_RANGE..SEED_RANGE) * SPREAD,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generates_requested_count_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let placements = generate_placements(1000, &mut rng);
        assert_eq!(placements.len(), 1000);
        for p in &placements {
            assert!((-9990.0..=9990.0).contains(&p.x));
            assert!((-9990.0..=9990.0).contains(&p.y));
            assert!((-3600.0..=3600.0).contains(&p.seed));
        }
    }

    #[test]
    fn zero_count_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_placements(0, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_same_layout() {
        let a = generate_placements(25, &mut StdRng::seed_from_u64(42));
        let b = generate_placements(25, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
