use ::rand::Rng;
use serde::Serialize;

/// Index into the configured trait alphabet.
pub type TraitId = u8;

/// Ordered list of trait symbols. Only changed at replication time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Genome {
    pub traits: Vec<TraitId>,
}

impl Genome {
    pub fn random(length: usize, alphabet_len: usize, rng: &mut impl Rng) -> Self {
        if alphabet_len == 0 {
            return Self::default();
        }
        let traits = (0..length)
            .map(|_| rng.gen_range(0..alphabet_len) as TraitId)
            .collect();
        Self { traits }
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Copy this genome for an offspring, replacing one slot with probability `rate`.
    ///
    /// Returns the child genome and whether a mutation happened. The mutated
    /// slot always gets a different symbol when the alphabet has more than one.
    pub fn replicate(&self, rate: f32, alphabet_len: usize, rng: &mut impl Rng) -> (Self, bool) {
        let mut child = self.clone();
        if rng.gen::<f32>() >= rate {
            return (child, false);
        }
        if !child.traits.is_empty() && alphabet_len > 1 {
            let slot = rng.gen_range(0..child.traits.len());
            let old = child.traits[slot] as usize;
            // Skip over the current symbol.
            let mut next = rng.gen_range(0..alphabet_len - 1);
            if next >= old {
                next += 1;
            }
            child.traits[slot] = next as TraitId;
        }
        (child, true)
    }

    /// Render using the alphabet's symbols, e.g. `"ACGTA"`.
    pub fn symbols(&self, alphabet: &[String]) -> String {
        self.traits
            .iter()
            .filter_map(|&t| alphabet.get(t as usize))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn random_genome_respects_length_and_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let genome = Genome::random(5, 4, &mut rng);
        assert_eq!(genome.len(), 5);
        assert!(genome.traits.iter().all(|&t| t < 4));
    }

    #[test]
    fn zero_rate_never_mutates() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let parent = Genome::random(5, 4, &mut rng);
        for _ in 0..100 {
            let (child, mutated) = parent.replicate(0.0, 4, &mut rng);
            assert!(!mutated);
            assert_eq!(child, parent);
        }
    }

    #[test]
    fn full_rate_changes_exactly_one_slot() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let parent = Genome::random(5, 4, &mut rng);
        for _ in 0..100 {
            let (child, mutated) = parent.replicate(1.0, 4, &mut rng);
            assert!(mutated);
            assert_eq!(child.len(), parent.len());
            let diffs = child
                .traits
                .iter()
                .zip(&parent.traits)
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(diffs, 1);
        }
    }

    #[test]
    fn single_symbol_alphabet_still_flags_mutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let parent = Genome::random(3, 1, &mut rng);
        let (child, mutated) = parent.replicate(1.0, 1, &mut rng);
        assert!(mutated);
        assert_eq!(child, parent);
    }

    #[test]
    fn full_alphabet_reaches_the_last_trait() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let genome = Genome::random(4096, 256, &mut rng);
        assert!(genome.traits.contains(&255));
    }

    #[test]
    fn symbols_map_through_alphabet() {
        let alphabet: Vec<String> = ["A", "C", "G", "T"].iter().map(|s| s.to_string()).collect();
        let genome = Genome {
            traits: vec![0, 3, 2],
        };
        assert_eq!(genome.symbols(&alphabet), "ATG");
    }
}
