//! Integration tests for complete turn cycles: broadcast → predict → think
//! → arbitrate → articulate → record, with scripted providers standing in
//! for the language model.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use confab_core::config::{ConfabConfig, ProactivityConfig};
use confab_core::conversation::{Conversation, Event};
use confab_core::coordinator::{TurnCoordinator, TurnPhase};
use confab_core::embedding::{EmbeddingProvider, HashEmbeddingProvider};
use confab_core::error::{ConfabError, Result};
use confab_core::mental::{IntrinsicMotivation, MentalObject, StimulusRef, Thought};
use confab_core::participant::{AgentMind, IdAllocator, Participant};
use confab_core::reasoning::{CandidateThought, PredictContext, ReasoningProvider, ThinkContext};
use confab_core::types::{MentalObjectId, MentalObjectKind, ParticipantId, TurnPrediction};

// ---------------------------------------------------------------------------
// Scripted providers
// ---------------------------------------------------------------------------

const EMBED_DIMS: usize = 16;

struct AgentScript {
    /// (kind, content, score); a negative score makes evaluation fail.
    thoughts: Vec<(MentalObjectKind, String, f32)>,
    line: String,
}

/// Deterministic reasoning provider keyed by agent name. Agents without a
/// script fail generation, which exercises the per-agent degrade path.
struct ScriptedReasoning {
    scripts: HashMap<String, AgentScript>,
    prediction: TurnPrediction,
    slow_agents: HashSet<String>,
    failing_articulators: HashSet<String>,
    seen_contexts: Mutex<Vec<ThinkContext>>,
}

impl ScriptedReasoning {
    fn new(prediction: TurnPrediction) -> Self {
        Self {
            scripts: HashMap::new(),
            prediction,
            slow_agents: HashSet::new(),
            failing_articulators: HashSet::new(),
            seen_contexts: Mutex::new(Vec::new()),
        }
    }

    fn script(mut self, agent: &str, line: &str, thoughts: &[(MentalObjectKind, &str, f32)]) -> Self {
        self.scripts.insert(
            agent.to_string(),
            AgentScript {
                thoughts: thoughts
                    .iter()
                    .map(|(kind, content, score)| (*kind, (*content).to_string(), *score))
                    .collect(),
                line: line.to_string(),
            },
        );
        self
    }

    fn slow_generation(mut self, agent: &str) -> Self {
        self.slow_agents.insert(agent.to_string());
        self
    }

    fn failing_articulation(mut self, agent: &str) -> Self {
        self.failing_articulators.insert(agent.to_string());
        self
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedReasoning {
    async fn generate_thoughts(&self, ctx: &ThinkContext) -> Result<Vec<CandidateThought>> {
        self.seen_contexts
            .lock()
            .expect("context log lock")
            .push(ctx.clone());
        if self.slow_agents.contains(&ctx.agent_name) {
            tokio::time::sleep(std::time::Duration::from_secs(600)).await;
        }
        let script = self
            .scripts
            .get(&ctx.agent_name)
            .ok_or_else(|| ConfabError::external("reasoning", "no script for agent"))?;
        Ok(script
            .thoughts
            .iter()
            .map(|(kind, content, _)| CandidateThought {
                kind: *kind,
                content: content.clone(),
                stimuli: vec![StimulusRef::Event(ctx.turn_number)],
            })
            .collect())
    }

    async fn evaluate_motivation(
        &self,
        ctx: &ThinkContext,
        thought: &Thought,
    ) -> Result<IntrinsicMotivation> {
        let script = self
            .scripts
            .get(&ctx.agent_name)
            .ok_or_else(|| ConfabError::external("reasoning", "no script for agent"))?;
        let (_, _, score) = script
            .thoughts
            .iter()
            .find(|(_, content, _)| *content == thought.object.content)
            .ok_or_else(|| ConfabError::external("reasoning", "unscripted thought"))?;
        if *score < 0.0 {
            return Err(ConfabError::external("reasoning", "scripted evaluation failure"));
        }
        Ok(IntrinsicMotivation::new("scripted", *score))
    }

    async fn articulate(&self, ctx: &ThinkContext, _thought: &Thought) -> Result<String> {
        if self.failing_articulators.contains(&ctx.agent_name) {
            return Err(ConfabError::external("reasoning", "scripted articulation failure"));
        }
        let script = self
            .scripts
            .get(&ctx.agent_name)
            .ok_or_else(|| ConfabError::external("reasoning", "no script for agent"))?;
        Ok(script.line.clone())
    }

    async fn predict_next_turn(&self, _ctx: &PredictContext) -> Result<TurnPrediction> {
        Ok(self.prediction.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

fn seeded_config() -> ConfabConfig {
    let mut config = ConfabConfig::default();
    config.turn.rng_seed = Some(11);
    config
}

fn coordinator(reasoning: Arc<ScriptedReasoning>, config: &ConfabConfig) -> TurnCoordinator {
    TurnCoordinator::new(
        reasoning,
        Arc::new(HashEmbeddingProvider::new(EMBED_DIMS)),
        Arc::new(IdAllocator::new()),
        config,
    )
}

/// An agent that never interjects reflexively, so outcomes depend only on
/// scripted scores.
fn steady_agent(id: u64, name: &str) -> Participant {
    Participant::agent(
        ParticipantId(id),
        name,
        AgentMind::new(
            format!("{name}, a member of the gardening collective"),
            ProactivityConfig::new(0.7, 0.0, 0.85),
        ),
    )
}

async fn spoken_event(speaker: u64, turn: u64, content: &str) -> Event {
    let embedding = HashEmbeddingProvider::new(EMBED_DIMS)
        .embed(content)
        .await
        .expect("embed");
    Event::new(ParticipantId(speaker), turn, content, embedding)
}

/// Ann (human, id 1) opens the conversation; Bo (id 2) and Casey (id 3)
/// are agents.
async fn garden_conversation() -> Conversation {
    let mut conv = Conversation::new("Planning the spring planting over tea");
    conv.add_participant(Participant::human(ParticipantId(1), "Ann"))
        .expect("add Ann");
    conv.add_participant(steady_agent(2, "Bo")).expect("add Bo");
    conv.add_participant(steady_agent(3, "Casey")).expect("add Casey");
    conv.record_event(spoken_event(1, 1, "What should we plant this spring?").await)
        .expect("turn 1");
    conv
}

fn mind_of(conv: &Conversation, id: u64) -> &AgentMind {
    conv.participant(ParticipantId(id))
        .expect("registered")
        .mind()
        .expect("agent")
}

// ---------------------------------------------------------------------------
// The floor goes to the highest motivation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn highest_motivation_wins_the_floor() {
    let reasoning = Arc::new(
        ScriptedReasoning::new(TurnPrediction::Anyone)
            .script(
                "Bo",
                "We could try kale again.",
                &[(MentalObjectKind::ThoughtSystem2, "kale survived last frost", 0.9)],
            )
            .script(
                "Casey",
                "Tomatoes, definitely tomatoes.",
                &[(MentalObjectKind::ThoughtSystem2, "tomatoes sold out at market", 0.95)],
            ),
    );
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");

    assert_eq!(outcome.speaker, Some(ParticipantId(3)), "Casey scored higher");
    assert_eq!(outcome.utterance, "Tomatoes, definitely tomatoes.");
    assert_eq!(conv.events().len(), 2, "the utterance was recorded");
    assert_eq!(conv.turn_number(), 2);
    let casey = conv.participant(ParticipantId(3)).expect("registered");
    assert_eq!(casey.last_spoken_turn, Some(2));
    assert_eq!(coord.phase(), TurnPhase::AwaitingEvent);
}

#[tokio::test]
async fn exact_ties_go_to_the_earlier_registered_agent() {
    let reasoning = Arc::new(
        ScriptedReasoning::new(TurnPrediction::Anyone)
            .script(
                "Bo",
                "Beans fix their own nitrogen.",
                &[(MentalObjectKind::ThoughtSystem2, "beans fix nitrogen", 0.9)],
            )
            .script(
                "Casey",
                "Peas are hardy enough.",
                &[(MentalObjectKind::ThoughtSystem2, "peas handle cold", 0.9)],
            ),
    );
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");
    assert_eq!(outcome.speaker, Some(ParticipantId(2)), "Bo registered first");
}

// ---------------------------------------------------------------------------
// Silence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn silence_when_nobody_clears_the_threshold() {
    let reasoning = Arc::new(
        ScriptedReasoning::new(TurnPrediction::Anyone)
            .script(
                "Bo",
                "never spoken",
                &[(MentalObjectKind::ThoughtSystem2, "mild curiosity about kale", 0.2)],
            )
            .script(
                "Casey",
                "never spoken",
                &[(MentalObjectKind::ThoughtSystem2, "vague tomato memory", 0.3)],
            ),
    );
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");

    assert!(outcome.is_silence());
    assert!(outcome.utterance.is_empty());
    assert_eq!(conv.events().len(), 1, "nothing was recorded");
    assert_eq!(conv.turn_number(), 1);
    // The thinking still happened: thoughts are banked for future turns.
    assert_eq!(mind_of(&conv, 2).thoughts.len(), 1);
    assert_eq!(mind_of(&conv, 3).thoughts.len(), 1);
    assert_eq!(coord.phase(), TurnPhase::AwaitingEvent);
}

#[tokio::test]
async fn all_agents_failing_yields_silence_not_an_error() {
    // No scripts at all: every generation call fails.
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone));
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("degrades, not errors");
    assert!(outcome.is_silence());
    assert_eq!(conv.events().len(), 1);
}

// ---------------------------------------------------------------------------
// Per-agent degradation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn a_failing_agent_degrades_without_blocking_the_turn() {
    // Bo has no script (generation fails); Casey proceeds normally.
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone).script(
        "Casey",
        "Let me check the almanac.",
        &[(MentalObjectKind::ThoughtSystem2, "almanac says late frost", 0.8)],
    ));
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");

    assert_eq!(outcome.speaker, Some(ParticipantId(3)));
    // Bo still remembered the event: the short-term record lands before
    // generation is attempted.
    assert_eq!(mind_of(&conv, 2).memories.len(), 1);
    assert!(mind_of(&conv, 2).thoughts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn a_timed_out_agent_degrades_without_blocking_the_turn() {
    let reasoning = Arc::new(
        ScriptedReasoning::new(TurnPrediction::Anyone)
            .script(
                "Bo",
                "unreachable",
                &[(MentalObjectKind::ThoughtSystem2, "slow thought", 0.99)],
            )
            .slow_generation("Bo")
            .script(
                "Casey",
                "I vote squash.",
                &[(MentalObjectKind::ThoughtSystem2, "squash stores well", 0.8)],
            ),
    );
    let mut config = seeded_config();
    config.turn.call_timeout_ms = 100;
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");
    assert_eq!(outcome.speaker, Some(ParticipantId(3)), "only Casey finished");
    assert_eq!(outcome.utterance, "I vote squash.");
}

#[tokio::test]
async fn a_failed_evaluation_keeps_the_thought_but_never_nominates_it() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone).script(
        "Bo",
        "never spoken",
        &[
            (MentalObjectKind::ThoughtSystem2, "thought the evaluator drops", -9.0),
            (MentalObjectKind::ThoughtSystem2, "weak but scored", 0.2),
        ],
    ));
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);

    let mut conv = Conversation::new("Planning the spring planting over tea");
    conv.add_participant(Participant::human(ParticipantId(1), "Ann"))
        .expect("add Ann");
    conv.add_participant(steady_agent(2, "Bo")).expect("add Bo");
    conv.record_event(spoken_event(1, 1, "What should we plant this spring?").await)
        .expect("turn 1");

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");
    assert!(outcome.is_silence());

    let mind = mind_of(&conv, 2);
    assert_eq!(mind.thoughts.len(), 2, "both thoughts were banked");
    let unscored = mind
        .thoughts
        .iter()
        .find(|t| t.object.content == "thought the evaluator drops")
        .expect("banked");
    assert!(!unscored.is_evaluated(), "failed evaluation leaves the sentinel");
    let scored = mind
        .thoughts
        .iter()
        .find(|t| t.object.content == "weak but scored")
        .expect("banked");
    assert!((scored.score() - 0.2).abs() < f32::EPSILON);
}

#[tokio::test]
async fn articulation_failure_degrades_to_silence() {
    let reasoning = Arc::new(
        ScriptedReasoning::new(TurnPrediction::Anyone)
            .script(
                "Casey",
                "unreachable",
                &[(MentalObjectKind::ThoughtSystem2, "strong idea, lost words", 0.9)],
            )
            .failing_articulation("Casey"),
    );
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("degrades, not errors");
    assert!(outcome.is_silence());
    assert_eq!(conv.events().len(), 1, "no event without an utterance");
    let casey = conv.participant(ParticipantId(3)).expect("registered");
    assert_eq!(casey.last_spoken_turn, None);
}

// ---------------------------------------------------------------------------
// Floor handling: granted, claimed, unknown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn a_granted_floor_lets_a_weak_thought_speak() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Named("Bo".into())).script(
        "Bo",
        "Oh. Um, whatever you think is best.",
        &[(MentalObjectKind::ThoughtSystem2, "no strong opinion", 0.1)],
    ));
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");
    assert_eq!(outcome.speaker, Some(ParticipantId(2)), "the floor was Bo's");
}

#[tokio::test]
async fn interrupting_a_claimed_floor_needs_the_higher_bar() {
    // The floor is predicted for Ann (a human). Bo at 0.8 stays quiet;
    // Casey at 0.9 clears the interrupt threshold of 0.85.
    let reasoning = Arc::new(
        ScriptedReasoning::new(TurnPrediction::Named("Ann".into()))
            .script(
                "Bo",
                "never spoken",
                &[(MentalObjectKind::ThoughtSystem2, "polite hesitation", 0.8)],
            )
            .script(
                "Casey",
                "Sorry to cut in, but the frost date moved!",
                &[(MentalObjectKind::ThoughtSystem2, "frost date changed", 0.9)],
            ),
    );
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");
    assert_eq!(outcome.speaker, Some(ParticipantId(3)), "only Casey may interrupt");
}

#[tokio::test]
async fn a_claimed_floor_silences_sub_threshold_agents() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Named("Ann".into())).script(
        "Bo",
        "never spoken",
        &[(MentalObjectKind::ThoughtSystem2, "polite hesitation", 0.8)],
    ));
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");
    assert!(outcome.is_silence(), "0.8 does not clear the 0.85 interrupt bar");
}

#[tokio::test]
async fn unknown_predicted_names_leave_the_floor_open() {
    // "Zelda" is not in the roster. Were the floor treated as claimed, Bo's
    // 0.8 would lose to the 0.85 interrupt bar; an open floor admits it.
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Named("Zelda".into())).script(
        "Bo",
        "Radishes come up fast.",
        &[(MentalObjectKind::ThoughtSystem2, "radishes sprout quickly", 0.8)],
    ));
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);
    let mut conv = garden_conversation().await;

    let outcome = coord.run_turn(&mut conv).await.expect("turn runs");
    assert_eq!(outcome.speaker, Some(ParticipantId(2)));
    // The event annotation records what the engine acted on.
    let annotated = conv.event(1).expect("event").predicted_next_turn.clone();
    assert_eq!(annotated, Some(TurnPrediction::Anyone));
}

// ---------------------------------------------------------------------------
// Memory side effects of a turn
// ---------------------------------------------------------------------------

#[tokio::test]
async fn the_event_speakers_memories_skip_recalibration() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone));
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);

    let mut conv = Conversation::new("Planning the spring planting over tea");
    conv.add_participant(steady_agent(2, "Bo")).expect("add Bo");
    conv.add_participant(steady_agent(3, "Casey")).expect("add Casey");

    let content = "I already started the tomato seedlings.";
    let embedder = HashEmbeddingProvider::new(EMBED_DIMS);
    // Both agents hold one long-term memory with a pre-set saliency. Casey's
    // has the event text itself, so recalibration would drive it to 1.0.
    for (id, memory_id) in [(2u64, 901u64), (3, 902)] {
        let mind = conv
            .participant_mut(ParticipantId(id))
            .expect("registered")
            .mind_mut()
            .expect("agent");
        let mut memory = MentalObject::new(
            MentalObjectId(memory_id),
            ParticipantId(id),
            MentalObjectKind::MemoryLongTerm,
            content,
            embedder.embed(content).await.expect("embed"),
            0,
        );
        memory.saliency = 0.42;
        mind.memories.add(memory).expect("seed memory");
    }

    // Bo spoke the event, so Bo's stores skip recalibration this turn.
    conv.record_event(spoken_event(2, 1, content).await)
        .expect("turn 1");
    coord.run_turn(&mut conv).await.expect("turn runs");

    let bo_saliency = mind_of(&conv, 2)
        .memories
        .get(MentalObjectId(901))
        .expect("seeded")
        .saliency;
    assert!((bo_saliency - 0.42).abs() < f32::EPSILON, "speaker skipped");

    let casey_saliency = mind_of(&conv, 3)
        .memories
        .get(MentalObjectId(902))
        .expect("seeded")
        .saliency;
    assert!(
        (casey_saliency - 1.0).abs() < 1e-5,
        "listener recalibrated to full similarity, got {casey_saliency}"
    );

    // Both agents, speaker included, remembered the event itself.
    assert_eq!(mind_of(&conv, 2).memories.len(), 2);
    assert_eq!(mind_of(&conv, 3).memories.len(), 2);
}

#[tokio::test]
async fn thoughts_and_memories_accumulate_across_turns() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone).script(
        "Bo",
        "never spoken",
        &[
            (MentalObjectKind::ThoughtSystem1, "quick reaction", 0.1),
            (MentalObjectKind::ThoughtSystem2, "careful plan", 0.2),
        ],
    ));
    let config = seeded_config();
    let mut coord = coordinator(reasoning.clone(), &config);

    let mut conv = Conversation::new("Planning the spring planting over tea");
    conv.add_participant(Participant::human(ParticipantId(1), "Ann"))
        .expect("add Ann");
    conv.add_participant(steady_agent(2, "Bo")).expect("add Bo");

    conv.record_event(spoken_event(1, 1, "What should we plant this spring?").await)
        .expect("turn 1");
    coord.run_turn(&mut conv).await.expect("first turn");
    conv.record_event(spoken_event(1, 2, "I was thinking about root vegetables.").await)
        .expect("turn 2");
    coord.run_turn(&mut conv).await.expect("second turn");

    let mind = mind_of(&conv, 2);
    assert_eq!(mind.memories.len(), 2, "one short-term record per event");
    assert_eq!(mind.thoughts.len(), 4, "two thoughts per turn");

    // The provider saw one think pass per event, in order.
    let contexts = reasoning.seen_contexts.lock().expect("context log lock");
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0].turn_number, 1);
    assert_eq!(contexts[1].turn_number, 2);
}

#[tokio::test]
async fn generation_context_carries_history_persona_and_silence() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone));
    let config = seeded_config();
    let mut coord = coordinator(reasoning.clone(), &config);
    let mut conv = garden_conversation().await;

    coord.run_turn(&mut conv).await.expect("turn runs");

    let contexts = reasoning.seen_contexts.lock().expect("context log lock");
    assert_eq!(contexts.len(), 2, "one think pass per agent");
    let bo_ctx = contexts
        .iter()
        .find(|c| c.agent_name == "Bo")
        .expect("Bo thought");
    assert_eq!(bo_ctx.scene, "Planning the spring planting over tea");
    assert!(bo_ctx.persona.contains("gardening collective"));
    assert_eq!(bo_ctx.recent_events.len(), 1);
    assert_eq!(bo_ctx.recent_events[0].speaker, "Ann");
    assert_eq!(
        bo_ctx.recent_events[0].content,
        "What should we plant this spring?"
    );
    assert_eq!(
        bo_ctx.participant_names,
        vec!["Ann", "Bo", "Casey"],
        "full roster in roster order"
    );
    assert_eq!(bo_ctx.turns_silent, 1, "never spoke, one turn elapsed");
    assert!(bo_ctx.salient_memories.is_empty(), "fresh mind");
}

#[tokio::test]
async fn the_evaluator_reads_a_wider_memory_excerpt_than_the_generator() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone));
    let config = seeded_config();
    let mut coord = coordinator(reasoning.clone(), &config);
    let mut conv = garden_conversation().await;

    // Twelve long-term memories that all recalibrate to full similarity
    // against the opening question, so both excerpts fill to their caps.
    let embedder = HashEmbeddingProvider::new(EMBED_DIMS);
    let aligned = embedder
        .embed("What should we plant this spring?")
        .await
        .expect("embed");
    let mind = conv
        .participant_mut(ParticipantId(2))
        .expect("registered")
        .mind_mut()
        .expect("agent");
    for i in 0..12u64 {
        mind.memories
            .add(MentalObject::new(
                MentalObjectId(900 + i),
                ParticipantId(2),
                MentalObjectKind::MemoryLongTerm,
                format!("Garden note {i}"),
                aligned.clone(),
                0,
            ))
            .expect("seed memory");
    }

    coord.run_turn(&mut conv).await.expect("turn runs");

    let contexts = reasoning.seen_contexts.lock().expect("context log lock");
    let bo_ctx = contexts
        .iter()
        .find(|c| c.agent_name == "Bo")
        .expect("Bo thought");
    assert_eq!(bo_ctx.salient_memories.len(), 5, "generation keeps the tight slice");
    assert_eq!(bo_ctx.evaluation_memories.len(), 10, "evaluation reads the wide slice");

    // Equal saliency breaks ties by insertion order, so the generation
    // excerpt is a prefix of the evaluation excerpt.
    let gen_ids: Vec<_> = bo_ctx.salient_memories.iter().map(|m| m.id).collect();
    let eval_ids: Vec<_> = bo_ctx.evaluation_memories.iter().map(|m| m.id).collect();
    assert_eq!(&eval_ids[..5], &gen_ids[..]);
}

#[tokio::test]
async fn stimulus_provenance_survives_into_the_banked_thought() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone).script(
        "Bo",
        "never spoken",
        &[(MentalObjectKind::ThoughtSystem2, "careful plan", 0.2)],
    ));
    let config = seeded_config();
    let mut coord = coordinator(reasoning, &config);

    let mut conv = Conversation::new("Planning the spring planting over tea");
    conv.add_participant(Participant::human(ParticipantId(1), "Ann"))
        .expect("add Ann");
    conv.add_participant(steady_agent(2, "Bo")).expect("add Bo");
    conv.record_event(spoken_event(1, 1, "What should we plant this spring?").await)
        .expect("turn 1");
    coord.run_turn(&mut conv).await.expect("turn runs");

    let thought = mind_of(&conv, 2)
        .thoughts
        .iter()
        .next()
        .expect("one banked thought");
    assert_eq!(thought.stimuli, vec![StimulusRef::Event(1)]);
}

// ---------------------------------------------------------------------------
// Contract errors surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clashing_id_allocators_surface_as_contract_errors() {
    let reasoning = Arc::new(ScriptedReasoning::new(TurnPrediction::Anyone).script(
        "Bo",
        "unreachable",
        &[(MentalObjectKind::ThoughtSystem2, "careful plan", 0.9)],
    ));
    let config = seeded_config();
    // The coordinator allocates mental ids from 1. Seeding a mind with id 1
    // from a separate allocator is host misuse and must not be swallowed.
    let mut coord = coordinator(reasoning, &config);

    let mut conv = Conversation::new("Planning the spring planting over tea");
    conv.add_participant(steady_agent(2, "Bo")).expect("add Bo");
    {
        let mind = conv
            .participant_mut(ParticipantId(2))
            .expect("registered")
            .mind_mut()
            .expect("agent");
        let rogue = MentalObject::new(
            MentalObjectId(1),
            ParticipantId(2),
            MentalObjectKind::MemoryLongTerm,
            "seeded with a clashing id",
            HashEmbeddingProvider::new(EMBED_DIMS)
                .embed("clash")
                .await
                .expect("embed"),
            0,
        );
        mind.memories.add(rogue).expect("seed");
    }
    conv.record_event(spoken_event(2, 1, "Talking to myself about seeds.").await)
        .expect("turn 1");

    let err = coord.run_turn(&mut conv).await.expect_err("duplicate id");
    assert!(matches!(err, ConfabError::DuplicateId(MentalObjectId(1))));
    assert_eq!(conv.events().len(), 1, "no event on a failed turn");
}
