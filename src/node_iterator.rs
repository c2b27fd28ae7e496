use std::time::Instant;

use futures::stream::{self, Stream, StreamExt};
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::client::Client;
use crate::network::ConsensusNetworkData;

/// Samples a uniform subset without replacement, sized to one third of the
/// input (rounded up), via in-place swap-with-last -- the same technique
/// `rand::seq::SliceRandom::partial_shuffle` uses, spelled out because the
/// crate's sampling is inlined into this one call site.
pub fn sample_one_third(mut indices: Vec<usize>) -> Vec<usize> {
    let amount = (indices.len() + 2) / 3;
    let (shuffled, _) = indices.partial_shuffle(&mut thread_rng(), amount);
    shuffled.to_vec()
}

/// Computes this attempt round's candidate indices and whether they bypass
/// health pinging (explicit node selection always does).
pub fn candidate_round(
    consensus: &ConsensusNetworkData,
    explicit_indices: Option<&[usize]>,
    now: Instant,
) -> (Vec<usize>, bool) {
    if let Some(explicit) = explicit_indices {
        return (explicit.to_vec(), true);
    }

    let healthy = consensus.healthy_indices(now);
    (sample_one_third(healthy), false)
}

/// Filters a round's candidates down to those confirmed reachable: explicit
/// candidates pass straight through, others must either have been pinged
/// recently or answer a fresh liveness probe now.
pub fn filtered_candidates<'a>(
    client: &'a Client,
    indices: Vec<usize>,
    passthrough: bool,
) -> impl Stream<Item = usize> + 'a {
    let now = Instant::now();
    stream::iter(indices).filter(move |&index| {
        let client = &*client;
        async move {
            if passthrough || client.consensus().load().recently_pinged(index, now) {
                return true;
            }
            let alive = client.ping(index).await;
            if !alive {
                tracing::debug!(index, "liveness probe failed, excluding node from this round");
            }
            alive
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_one_third_rounded_up() {
        let sampled = sample_one_third((0..7).collect());
        assert_eq!(sampled.len(), 3); // ceil(7/3) == 3
    }

    #[test]
    fn samples_all_of_a_small_set() {
        let sampled = sample_one_third(vec![0, 1]);
        assert_eq!(sampled.len(), 1); // ceil(2/3) == 1
    }

    #[test]
    fn empty_input_samples_nothing() {
        assert!(sample_one_third(Vec::new()).is_empty());
    }

    #[test]
    fn explicit_selection_preserves_given_order_and_bypasses_pinging() {
        let consensus = ConsensusNetworkData::default();
        let explicit = [2usize, 0, 1];
        let (indices, passthrough) = candidate_round(&consensus, Some(&explicit), Instant::now());
        assert_eq!(indices, explicit);
        assert!(passthrough);
    }

    proptest::proptest! {
        #[test]
        fn sampled_size_and_membership_hold_for_any_input(n in 0usize..200) {
            let input: Vec<usize> = (0..n).collect();
            let sampled = sample_one_third(input.clone());

            proptest::prop_assert_eq!(sampled.len(), (n + 2) / 3);

            let mut seen = std::collections::HashSet::new();
            for &index in &sampled {
                proptest::prop_assert!(input.contains(&index));
                proptest::prop_assert!(seen.insert(index), "sampled the same index twice");
            }
        }
    }
}
