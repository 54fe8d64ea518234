//! Property-based tests for the turn-taking engine core.
//!
//! Uses `proptest` to verify retrieval, saliency, and selection invariants
//! under random inputs: whatever the contents of a mind, retrieval stays
//! bounded and ordered, recalibration touches exactly the non-stale items,
//! and selection is reproducible from a seed.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use confab_core::config::{ProactivityConfig, SaliencyParams};
use confab_core::conversation::Event;
use confab_core::embedding::{EmbeddingProvider, HashEmbeddingProvider};
use confab_core::error::ConfabError;
use confab_core::mental::{IntrinsicMotivation, MentalObject, Thought};
use confab_core::reservoir::{MemoryStore, ThoughtReservoir};
use confab_core::saliency;
use confab_core::selector::{FloorStatus, ProactivitySelector};
use confab_core::types::{Embedding, MentalObjectId, MentalObjectKind, ParticipantId};

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

fn memory(id: u64, saliency: f32) -> MentalObject {
    let mut m = MentalObject::new(
        MentalObjectId(id),
        ParticipantId(1),
        MentalObjectKind::MemoryLongTerm,
        format!("memory {id}"),
        Embedding(vec![1.0, 0.0]),
        0,
    );
    m.saliency = saliency;
    m
}

fn scored_thought(id: u64, score: f32) -> Thought {
    let object = MentalObject::new(
        MentalObjectId(id),
        ParticipantId(1),
        MentalObjectKind::ThoughtSystem1,
        format!("thought {id}"),
        Embedding(vec![1.0, 0.0]),
        0,
    );
    let mut t = Thought::new(object, vec![]);
    if score >= 0.0 {
        t.set_motivation(IntrinsicMotivation::new("generated", score));
    }
    t
}

// ---------------------------------------------------------------------------
// Property: top-k retrieval is bounded, sorted, and above threshold
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn top_k_is_bounded_sorted_and_above_threshold(
        saliencies in prop::collection::vec(0.0..1.0f32, 0..40),
        k in 0..10usize,
        threshold in 0.0..1.0f32,
    ) {
        let mut store = MemoryStore::new();
        for (i, s) in saliencies.iter().enumerate() {
            store.add(memory(i as u64 + 1, *s)).expect("unique ids");
        }

        let hits = store.retrieve_top_k(k, threshold, None);

        prop_assert!(hits.len() <= k);
        for pair in hits.windows(2) {
            prop_assert!(pair[0].saliency >= pair[1].saliency, "descending order");
        }
        for hit in &hits {
            prop_assert!(hit.saliency >= threshold, "threshold is inclusive");
        }
        // Nothing eligible was left out while there was room under k.
        let eligible = saliencies.iter().filter(|s| **s >= threshold).count();
        prop_assert_eq!(hits.len(), eligible.min(k));
    }
}

// ---------------------------------------------------------------------------
// Property: equal saliencies keep insertion order
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn equal_saliency_ties_keep_insertion_order(count in 1..30usize) {
        let mut store = MemoryStore::new();
        for id in 1..=count as u64 {
            store.add(memory(id, 0.5)).expect("unique ids");
        }

        let ids: Vec<u64> = store
            .retrieve_top_k(count, 0.0, None)
            .iter()
            .map(|m| m.id.0)
            .collect();
        let expected: Vec<u64> = (1..=count as u64).collect();
        prop_assert_eq!(ids, expected);
    }
}

// ---------------------------------------------------------------------------
// Property: retrieval never mutates access bookkeeping
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn retrieval_is_a_pure_read(
        saliencies in prop::collection::vec(0.0..1.0f32, 1..20),
        k in 1..10usize,
    ) {
        let mut store = MemoryStore::new();
        for (i, s) in saliencies.iter().enumerate() {
            store.add(memory(i as u64 + 1, *s)).expect("unique ids");
        }

        let first: Vec<u64> = store.retrieve_top_k(k, 0.0, None).iter().map(|m| m.id.0).collect();
        let second: Vec<u64> = store.retrieve_top_k(k, 0.0, None).iter().map(|m| m.id.0).collect();
        prop_assert_eq!(first, second, "repeated retrieval is identical");

        for m in store.iter() {
            prop_assert_eq!(m.retrieval_count, 0);
            prop_assert_eq!(m.last_accessed_turn, 0);
        }
    }
}

// ---------------------------------------------------------------------------
// Property: recalibration touches exactly the non-stale items
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn recalibration_skips_only_stale_items(
        access_turns in prop::collection::vec(0..20u64, 1..30),
        event_turn in 0..20u64,
    ) {
        let mut store = MemoryStore::new();
        for (i, turn) in access_turns.iter().enumerate() {
            let mut m = memory(i as u64 + 1, 0.42);
            m.record_access(*turn);
            store.add(m).expect("unique ids");
        }

        // Memory and event embeddings are identical, so a recalibrated item
        // lands exactly at similarity 1.0 under default parameters.
        let event = Event::new(
            ParticipantId(9),
            event_turn,
            "the topic of the hour",
            Embedding(vec![1.0, 0.0]),
        );
        saliency::recalibrate_all(store.iter_mut(), &event, &SaliencyParams::default())
            .expect("no degenerate embeddings");

        for (m, accessed) in store.iter().zip(access_turns.iter()) {
            if event_turn < *accessed {
                prop_assert!((m.saliency - 0.42).abs() < f32::EPSILON, "stale item untouched");
            } else {
                prop_assert!((m.saliency - 1.0).abs() < 1e-5, "fresh item recalibrated");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: a decay factor of exactly 1.0 never attenuates
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn unit_decay_factor_is_exact(elapsed in 0..10_000_000u64) {
        let decay = saliency::turn_decay(1.0, elapsed);
        prop_assert_eq!(decay, 1.0, "no drift at any horizon");
    }
}

proptest! {
    #[test]
    fn decay_never_grows_with_elapsed_turns(
        factor in 0.01..0.99f32,
        a in 0..200u64,
        b in 0..200u64,
    ) {
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(saliency::turn_decay(factor, near) >= saliency::turn_decay(factor, far));
    }
}

// ---------------------------------------------------------------------------
// Property: selection is reproducible from a seed
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn selection_is_deterministic_for_a_fixed_seed(
        scores in prop::collection::vec(0.0..1.0f32, 1..10),
        seed in any::<u64>(),
    ) {
        let thoughts: Vec<Thought> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| scored_thought(i as u64 + 1, *s))
            .collect();
        let batch: Vec<&Thought> = thoughts.iter().collect();
        let selector = ProactivitySelector::new(ProactivityConfig::default());

        let first = selector
            .select(&batch, FloorStatus::Open, &mut StdRng::seed_from_u64(seed))
            .map(|t| t.object.id);
        let second = selector
            .select(&batch, FloorStatus::Open, &mut StdRng::seed_from_u64(seed))
            .map(|t| t.object.id);
        prop_assert_eq!(first, second);
    }
}

// ---------------------------------------------------------------------------
// Property: unevaluated thoughts are invisible to selection
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn selection_never_picks_an_unevaluated_thought(
        scores in prop::collection::vec(0.0..1.0f32, 0..6),
        unevaluated in 0..6usize,
        seed in any::<u64>(),
    ) {
        let mut thoughts: Vec<Thought> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| scored_thought(i as u64 + 1, *s))
            .collect();
        for i in 0..unevaluated {
            thoughts.push(scored_thought(100 + i as u64, -1.0));
        }
        let batch: Vec<&Thought> = thoughts.iter().collect();
        let selector = ProactivitySelector::new(ProactivityConfig::default());

        for floor in [FloorStatus::Open, FloorStatus::Granted, FloorStatus::Claimed] {
            let mut rng = StdRng::seed_from_u64(seed);
            if let Some(picked) = selector.select(&batch, floor, &mut rng) {
                prop_assert!(picked.is_evaluated(), "sentinel thoughts never speak");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: a claimed floor only yields interrupts over the bar
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn claimed_floor_only_yields_scores_over_the_interrupt_bar(
        scores in prop::collection::vec(0.0..1.0f32, 1..10),
        seed in any::<u64>(),
    ) {
        let config = ProactivityConfig::default();
        let thoughts: Vec<Thought> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| scored_thought(i as u64 + 1, *s))
            .collect();
        let batch: Vec<&Thought> = thoughts.iter().collect();
        let selector = ProactivitySelector::new(config);

        let mut rng = StdRng::seed_from_u64(seed);
        if let Some(picked) = selector.select(&batch, FloorStatus::Claimed, &mut rng) {
            prop_assert!(picked.score() >= config.interrupt_threshold);
        }
    }
}

// ---------------------------------------------------------------------------
// Property: proactivity thresholds are always clamped
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn proactivity_fields_always_clamped(
        im in -10.0..10.0f32,
        prob in -10.0..10.0f32,
        interrupt in -10.0..10.0f32,
    ) {
        let config = ProactivityConfig::new(im, prob, interrupt);
        prop_assert!((0.0..=1.0).contains(&config.im_threshold));
        prop_assert!((0.0..=1.0).contains(&config.system1_prob));
        prop_assert!((0.0..=1.0).contains(&config.interrupt_threshold));
    }
}

// ---------------------------------------------------------------------------
// Property: cosine similarity is bounded when defined
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn cosine_similarity_is_bounded_when_defined(
        a in prop::collection::vec(-10.0..10.0f32, 4),
        b in prop::collection::vec(-10.0..10.0f32, 4),
    ) {
        let left = Embedding(a);
        let right = Embedding(b);
        match left.cosine_similarity(&right) {
            Ok(sim) => prop_assert!((-1.0 - 1e-3..=1.0 + 1e-3).contains(&sim), "got {}", sim),
            Err(ConfabError::DegenerateEmbedding { .. }) => {} // near-zero norms
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Property: hash embeddings are deterministic and unit-norm
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn hash_embeddings_are_deterministic_and_unit_norm(
        text in ".*",
        dims in 1..64usize,
    ) {
        let provider = HashEmbeddingProvider::new(dims);
        let first = futures::executor::block_on(provider.embed(&text)).expect("embed");
        let second = futures::executor::block_on(provider.embed(&text)).expect("embed");
        prop_assert_eq!(&first.0, &second.0, "same text, same vector");

        let norm: f32 = first.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        prop_assert!((norm - 1.0).abs() < 1e-4, "unit norm, got {}", norm);
    }
}

// ---------------------------------------------------------------------------
// Property: thought reservoirs filter retrieval by kind
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn kind_filtered_retrieval_returns_only_that_kind(
        system1_count in 0..10usize,
        system2_count in 0..10usize,
    ) {
        let mut reservoir = ThoughtReservoir::new();
        let mut next_id = 1u64;
        for _ in 0..system1_count {
            let mut t = scored_thought(next_id, 0.5);
            t.object.saliency = 0.9;
            reservoir.add(t).expect("unique ids");
            next_id += 1;
        }
        for _ in 0..system2_count {
            let object = MentalObject::new(
                MentalObjectId(next_id),
                ParticipantId(1),
                MentalObjectKind::ThoughtSystem2,
                format!("deliberate {next_id}"),
                Embedding(vec![1.0, 0.0]),
                0,
            );
            let mut t = Thought::new(object, vec![]);
            t.object.saliency = 0.9;
            reservoir.add(t).expect("unique ids");
            next_id += 1;
        }

        let hits = reservoir.retrieve_top_k(20, 0.0, Some(MentalObjectKind::ThoughtSystem2));
        prop_assert_eq!(hits.len(), system2_count);
        for hit in hits {
            prop_assert_eq!(hit.object.kind, MentalObjectKind::ThoughtSystem2);
        }
    }
}
