use common::{HarnessError, ModeLabel, QueryItem, DEFAULT_SAMPLE_TARGET, DEFAULT_SEED};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

/// How a training sequence is drawn from the available queries.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Minimum sequence length; the sequence is never shorter than the input.
    pub target: usize,
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_SAMPLE_TARGET,
            seed: DEFAULT_SEED,
        }
    }
}

/// Orders the queries of a run.
///
/// Training runs draw `max(target, items.len())` queries with replacement using
/// a fixed seed, so the same query may appear several times. Other runs keep
/// the input order.
pub fn build_sequence(
    items: &[QueryItem],
    training: bool,
    sampling: &SamplingConfig,
) -> Vec<QueryItem> {
    if !training || items.is_empty() {
        return items.to_vec();
    }
    let count = sampling.target.max(items.len());
    let mut rng = StdRng::seed_from_u64(sampling.seed);
    (0..count)
        .filter_map(|_| items.choose(&mut rng).cloned())
        .collect()
}

/// A slice of the sequence executed under one mode.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub index: usize,
    pub mode: ModeLabel,
    pub items: &'a [QueryItem],
}

/// Splits the sequence into chunks of `chunk_size`; the last may be shorter.
/// Chunk 0 runs on the native planner, every later chunk with the advisor.
pub fn plan_chunks(sequence: &[QueryItem], chunk_size: usize) -> Result<Vec<Chunk<'_>>, HarnessError> {
    if chunk_size == 0 {
        return Err(HarnessError::ConfigError(String::from(
            "chunk size must be at least 1",
        )));
    }
    Ok(sequence
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, items)| Chunk {
            index,
            mode: if index == 0 {
                ModeLabel::Baseline
            } else {
                ModeLabel::Advisor
            },
            items,
        })
        .collect())
}

/// Advisory flags `(select_enabled, reward_enabled)` for one repetition.
///
/// Only the final repetition of a query reports a reward; the earlier ones
/// warm the caches. Baseline chunks report it only in training runs, to seed
/// the advisor with native-planner experience.
pub fn session_flags(
    mode: ModeLabel,
    repetition: usize,
    repeat_count: usize,
    training: bool,
) -> (bool, bool) {
    let last = repetition + 1 == repeat_count;
    match mode {
        ModeLabel::Baseline => (false, training && last),
        ModeLabel::Advisor => (true, last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn items(n: usize) -> Vec<QueryItem> {
        (0..n)
            .map(|i| QueryItem::new(PathBuf::from(format!("q{}/q{}.sql", i, i)), format!("select {}", i)))
            .collect()
    }

    #[test]
    fn test_sequence_keeps_order_outside_training() {
        let input = items(7);
        let seq = build_sequence(&input, false, &SamplingConfig::default());
        assert_eq!(input, seq);
    }

    #[test]
    fn test_training_sequence_is_seeded() {
        let input = items(12);
        let sampling = SamplingConfig::default();
        let a = build_sequence(&input, true, &sampling);
        let b = build_sequence(&input, true, &sampling);
        assert_eq!(DEFAULT_SAMPLE_TARGET, a.len());
        assert_eq!(a, b);
        assert!(a.iter().all(|q| input.contains(q)));

        let other = build_sequence(&input, true, &SamplingConfig { target: 500, seed: 7 });
        assert_ne!(a, other);
    }

    #[test]
    fn test_training_sequence_never_shrinks() {
        let input = items(30);
        let seq = build_sequence(&input, true, &SamplingConfig { target: 10, seed: 42 });
        assert_eq!(30, seq.len());
        assert!(build_sequence(&[], true, &SamplingConfig::default()).is_empty());
    }

    #[test]
    fn test_plan_chunks() {
        let input = items(7);
        let chunks = plan_chunks(&input, 3).unwrap();
        assert_eq!(3, chunks.len());
        assert_eq!(vec![3, 3, 1], chunks.iter().map(|c| c.items.len()).collect::<Vec<_>>());
        assert_eq!(ModeLabel::Baseline, chunks[0].mode);
        assert!(chunks[1..].iter().all(|c| c.mode == ModeLabel::Advisor));
        assert_eq!(input[6], chunks[2].items[0]);
        assert!(plan_chunks(&input, 0).is_err());
        assert!(plan_chunks(&[], 25).unwrap().is_empty());
    }

    #[test]
    fn test_selection_only_after_first_chunk() {
        let input = items(20);
        for size in 1..8 {
            for chunk in plan_chunks(&input, size).unwrap() {
                for rep in 0..3 {
                    let (select, _) = session_flags(chunk.mode, rep, 3, false);
                    assert_eq!(chunk.index != 0, select);
                }
            }
        }
    }

    #[test]
    fn test_reward_only_on_last_repetition() {
        for &repeat_count in &[1usize, 2, 3, 5] {
            for &training in &[false, true] {
                for rep in 0..repeat_count - 1 {
                    assert!(!session_flags(ModeLabel::Advisor, rep, repeat_count, training).1);
                    assert!(!session_flags(ModeLabel::Baseline, rep, repeat_count, training).1);
                }
                let last = repeat_count - 1;
                assert!(session_flags(ModeLabel::Advisor, last, repeat_count, training).1);
                assert_eq!(
                    training,
                    session_flags(ModeLabel::Baseline, last, repeat_count, training).1
                );
            }
        }
    }
}
