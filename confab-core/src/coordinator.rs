//! Turn orchestration: broadcast → predict → think (concurrent) → arbitrate
//! → articulate → record.
//!
//! The coordinator is the single writer of conversation state. Think tasks
//! run concurrently — one per agent — but each mutates only its own agent's
//! mind and reads an owned snapshot of the transcript, so there is no lock
//! anywhere in the engine. The fan-out borrows each mind rather than moving
//! it into a spawned task: agents can never be lost to a panicked task, and
//! `join_all` returns results in roster order, which is exactly the order
//! arbitration breaks ties in.
//!
//! Failure policy, per call site:
//!   - prediction fails → the floor is treated as open;
//!   - anything external fails inside an agent's think pass → that agent
//!     simply doesn't nominate (other agents are unaffected);
//!   - articulation or utterance-embedding fails → the whole turn degrades
//!     to silence;
//!   - contract violations (degenerate embeddings, reservoir misuse) are
//!     never swallowed — they surface from [`TurnCoordinator::run_turn`]
//!     after every pipeline has finished.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, join_all};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{ConfabConfig, SaliencyParams, TurnConfig};
use crate::conversation::{Conversation, Event};
use crate::embedding::EmbeddingProvider;
use crate::error::{ConfabError, Result};
use crate::mental::{AsMentalObject, MentalObject, StimulusRef, Thought};
use crate::participant::{AgentMind, IdAllocator, Participant};
use crate::reasoning::{
    EventExcerpt, MentalExcerpt, PredictContext, ReasoningProvider, ThinkContext,
};
use crate::saliency;
use crate::selector::{FloorStatus, ProactivitySelector};
use crate::types::{MentalObjectId, MentalObjectKind, ParticipantId, TurnPrediction};

// ---------------------------------------------------------------------------
// Phases and outcomes
// ---------------------------------------------------------------------------

/// Where the coordinator currently is in the turn cycle. Transitions are
/// logged at debug level; [`TurnPhase::Closed`] is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Resting state between turns.
    AwaitingEvent,
    /// Notifying participants of the newest event.
    Broadcasting,
    /// Per-agent think pipelines are in flight.
    ConcurrentThinking,
    /// Choosing a winner among nominations.
    Arbitrating,
    /// Converting the winning thought to an utterance.
    Articulating,
    /// The new event has been appended.
    EventRecorded,
    /// No participants remain; the conversation is over.
    Closed,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AwaitingEvent => "awaiting_event",
            Self::Broadcasting => "broadcasting",
            Self::ConcurrentThinking => "concurrent_thinking",
            Self::Arbitrating => "arbitrating",
            Self::Articulating => "articulating",
            Self::EventRecorded => "event_recorded",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// What a completed turn produced. Silence — nobody wanted the floor, or
/// the winner's articulation degraded — is a valid outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// The speaker, when someone took the floor.
    pub speaker: Option<ParticipantId>,
    /// The utterance text; empty on silence.
    pub utterance: String,
}

impl TurnOutcome {
    /// The silent outcome.
    #[must_use]
    pub fn silence() -> Self {
        Self {
            speaker: None,
            utterance: String::new(),
        }
    }

    /// True when nobody spoke.
    #[must_use]
    pub fn is_silence(&self) -> bool {
        self.speaker.is_none()
    }
}

/// One agent's bid for the floor: the thought it wants to speak and the
/// context that produced it (kept for articulation).
#[derive(Debug, Clone)]
struct Nomination {
    participant: ParticipantId,
    thought_id: MentalObjectId,
    score: f32,
    ctx: ThinkContext,
}

/// Identity facts about one agent, copied out of the roster before the
/// fan-out so think tasks hold only the mind borrow.
struct AgentRef {
    id: ParticipantId,
    name: String,
    last_spoken_turn: Option<u64>,
}

/// Owned snapshot of everything think tasks read, captured once per turn so
/// concurrent pipelines never borrow the conversation itself.
struct TurnSnapshot {
    scene: String,
    latest: Event,
    recent: Vec<EventExcerpt>,
    speaker_name: String,
    participant_names: Vec<String>,
}

impl TurnSnapshot {
    fn capture(conversation: &Conversation, window: usize) -> Option<Self> {
        let latest = conversation.latest_event()?.clone();
        let name_of = |id: ParticipantId| {
            conversation
                .participant(id)
                .map_or_else(|| id.to_string(), |p| p.name.clone())
        };
        let recent = conversation
            .last_n_events(window)
            .iter()
            .map(|e| EventExcerpt {
                turn: e.turn_number,
                speaker: name_of(e.participant),
                content: e.content.clone(),
            })
            .collect();
        Some(Self {
            scene: conversation.context.clone(),
            speaker_name: name_of(latest.participant),
            participant_names: conversation.participant_names(),
            recent,
            latest,
        })
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Drives one conversation through turn cycles.
pub struct TurnCoordinator {
    reasoning: Arc<dyn ReasoningProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    ids: Arc<IdAllocator>,
    turn_config: TurnConfig,
    saliency_params: SaliencyParams,
    rng: StdRng,
    phase: TurnPhase,
}

impl TurnCoordinator {
    /// Build a coordinator. The RNG seeds from `config.turn.rng_seed` when
    /// set (replays and tests), from entropy otherwise.
    #[must_use]
    pub fn new(
        reasoning: Arc<dyn ReasoningProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        ids: Arc<IdAllocator>,
        config: &ConfabConfig,
    ) -> Self {
        let rng = config
            .turn
            .rng_seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            reasoning,
            embedder,
            ids,
            turn_config: config.turn.clone(),
            saliency_params: config.saliency,
            rng,
            phase: TurnPhase::AwaitingEvent,
        }
    }

    /// The current phase of the turn cycle.
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Run one full turn cycle against the latest recorded event.
    ///
    /// Returns the speaker and utterance, or the silent outcome when nobody
    /// takes the floor (including the all-pipelines-failed case).
    ///
    /// # Errors
    /// [`ConfabError::ConversationClosed`] with no participants,
    /// [`ConfabError::EmptyConversation`] with no events, and any
    /// programming-contract violation raised inside the cycle.
    pub async fn run_turn(&mut self, conversation: &mut Conversation) -> Result<TurnOutcome> {
        if conversation.is_closed() {
            self.set_phase(TurnPhase::Closed);
            return Err(ConfabError::ConversationClosed);
        }

        self.set_phase(TurnPhase::Broadcasting);
        conversation.broadcast_latest()?;
        let Some(snapshot) = TurnSnapshot::capture(conversation, self.turn_config.history_window)
        else {
            return Err(ConfabError::EmptyConversation);
        };

        // Late-bound annotation: who did the latest speaker leave the floor to?
        let prediction = self.predict_floor(&snapshot).await;
        if let Some(event) = conversation.latest_event_mut() {
            event.set_predicted_next_turn(prediction.clone());
        }

        self.set_phase(TurnPhase::ConcurrentThinking);
        let reports = self
            .run_think_phase(conversation, &snapshot, &prediction)
            .await;

        self.set_phase(TurnPhase::Arbitrating);
        let mut nominations = Vec::new();
        let mut contract_error = None;
        for (agent, outcome) in reports {
            match outcome {
                Ok(Some(nomination)) => nominations.push(nomination),
                Ok(None) => {}
                Err(err) if err.is_external() => {
                    warn!(agent = %agent, error = %err, "Think pipeline degraded; no nomination");
                }
                Err(err) => {
                    // Surface the first contract violation, but only after
                    // every pipeline has finished with its mind intact.
                    contract_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = contract_error {
            return Err(err);
        }

        let Some(winner) = self.arbitrate(&nominations).cloned() else {
            debug!("No nominations; the floor stays silent");
            self.set_phase(TurnPhase::AwaitingEvent);
            return Ok(TurnOutcome::silence());
        };

        self.set_phase(TurnPhase::Articulating);
        let thought = conversation
            .participant(winner.participant)
            .and_then(Participant::mind)
            .and_then(|mind| mind.thoughts.get(winner.thought_id))
            .ok_or(ConfabError::NotFound(winner.thought_id))?;
        let uttered = match self
            .call("articulation", self.reasoning.articulate(&winner.ctx, thought))
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(speaker = %winner.participant, error = %err,
                      "Articulation failed; the turn falls silent");
                self.set_phase(TurnPhase::AwaitingEvent);
                return Ok(TurnOutcome::silence());
            }
        };

        let embedding = match self.call("embedding", self.embedder.embed(&uttered)).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(speaker = %winner.participant, error = %err,
                      "Utterance embedding failed; the turn falls silent");
                self.set_phase(TurnPhase::AwaitingEvent);
                return Ok(TurnOutcome::silence());
            }
        };

        let turn_number = conversation.next_turn_number();
        conversation.record_event(Event::new(
            winner.participant,
            turn_number,
            uttered.clone(),
            embedding,
        ))?;
        if let Some(speaker) = conversation.participant_mut(winner.participant) {
            speaker.last_spoken_turn = Some(turn_number);
        }
        self.set_phase(TurnPhase::EventRecorded);
        debug!(speaker = %winner.participant, turn = turn_number, score = winner.score,
               "Turn complete");
        self.set_phase(TurnPhase::AwaitingEvent);
        Ok(TurnOutcome {
            speaker: Some(winner.participant),
            utterance: uttered,
        })
    }

    // -- phase plumbing -----------------------------------------------------

    fn set_phase(&mut self, phase: TurnPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "Phase transition");
            self.phase = phase;
        }
    }

    /// Wrap an external call in the per-call timeout, mapping elapsed
    /// timeouts into external-call failures.
    async fn call<T>(
        &self,
        service: &'static str,
        fut: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        let budget = Duration::from_millis(self.turn_config.call_timeout_ms);
        match timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(ConfabError::external(
                service,
                format!("timed out after {}ms", self.turn_config.call_timeout_ms),
            )),
        }
    }

    // -- prediction ---------------------------------------------------------

    /// Ask the provider who the floor was left to. Unknown names and any
    /// failure degrade to an open floor.
    async fn predict_floor(&self, snapshot: &TurnSnapshot) -> TurnPrediction {
        let ctx = PredictContext {
            scene: snapshot.scene.clone(),
            recent_events: snapshot.recent.clone(),
            speaker_name: snapshot.speaker_name.clone(),
            participant_names: snapshot.participant_names.clone(),
        };
        match self
            .call("prediction", self.reasoning.predict_next_turn(&ctx))
            .await
        {
            Ok(TurnPrediction::Named(name)) => {
                if snapshot.participant_names.iter().any(|n| *n == name) {
                    TurnPrediction::Named(name)
                } else {
                    warn!(name = %name, "Predictor named an unknown participant; floor stays open");
                    TurnPrediction::Anyone
                }
            }
            Ok(TurnPrediction::Anyone) => TurnPrediction::Anyone,
            Err(err) => {
                warn!(error = %err, "Turn prediction failed; floor stays open");
                TurnPrediction::Anyone
            }
        }
    }

    // -- think phase --------------------------------------------------------

    /// Fan out one borrowed, concurrent think pipeline per agent and join
    /// them all. Results come back in roster order regardless of completion
    /// order.
    async fn run_think_phase(
        &mut self,
        conversation: &mut Conversation,
        snapshot: &TurnSnapshot,
        prediction: &TurnPrediction,
    ) -> Vec<(ParticipantId, Result<Option<Nomination>>)> {
        // Seeds are drawn up front, in roster order, so a fixed master seed
        // yields identical per-agent draws no matter how tasks interleave.
        let seeds: Vec<u64> = conversation
            .participants()
            .iter()
            .map(|_| self.rng.next_u64())
            .collect();
        let this = &*self;

        let mut pipelines: Vec<BoxFuture<'_, (ParticipantId, Result<Option<Nomination>>)>> =
            Vec::new();
        for (participant, seed) in conversation.participants_mut().iter_mut().zip(seeds) {
            let agent = AgentRef {
                id: participant.id,
                name: participant.name.clone(),
                last_spoken_turn: participant.last_spoken_turn,
            };
            let Some(mind) = participant.mind_mut() else {
                continue; // humans don't think through the engine
            };
            pipelines.push(Box::pin(async move {
                let outcome = this
                    .think_pipeline(&agent, mind, snapshot, prediction, seed)
                    .await;
                (agent.id, outcome)
            }));
        }
        join_all(pipelines).await
    }

    /// One agent's full think pass: recalibrate → remember the event →
    /// generate → evaluate → select.
    async fn think_pipeline(
        &self,
        agent: &AgentRef,
        mind: &mut AgentMind,
        snapshot: &TurnSnapshot,
        prediction: &TurnPrediction,
        seed: u64,
    ) -> Result<Option<Nomination>> {
        let latest = &snapshot.latest;
        let is_speaker = latest.participant == agent.id;

        // The speaker's own words say nothing new about its memory.
        if !is_speaker {
            saliency::recalibrate_all(
                mind.memories
                    .iter_mut()
                    .filter(|m| m.kind == MentalObjectKind::MemoryLongTerm),
                latest,
                &self.saliency_params,
            )?;
            saliency::recalibrate_all(mind.thoughts.iter_mut(), latest, &self.saliency_params)?;
        }

        // Everyone remembers the event, speaker included.
        let short_term = MentalObject::new(
            self.ids.mental_object_id(),
            agent.id,
            MentalObjectKind::MemoryShortTerm,
            latest.content.clone(),
            latest.embedding.clone(),
            latest.turn_number,
        );
        mind.memories.add(short_term)?;

        let ctx = self.build_think_context(agent, mind, snapshot);

        let candidates = self
            .call("generation", self.reasoning.generate_thoughts(&ctx))
            .await?;
        if candidates.is_empty() {
            debug!(agent = %agent.id, "No candidate thoughts this turn");
            return Ok(None);
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .call("embedding", self.embedder.embed_batch(&texts))
            .await?;
        if embeddings.len() != candidates.len() {
            return Err(ConfabError::external(
                "embedding",
                format!(
                    "asked for {} embeddings, got {}",
                    candidates.len(),
                    embeddings.len()
                ),
            ));
        }

        let mut batch_ids = Vec::with_capacity(candidates.len());
        for (candidate, embedding) in candidates.into_iter().zip(embeddings) {
            if !candidate.kind.is_thought() {
                warn!(agent = %agent.id, kind = %candidate.kind,
                      "Provider proposed a non-thought kind; dropped");
                continue;
            }
            let stimuli = resolve_stimuli(candidate.stimuli, mind, latest.turn_number);
            let object = MentalObject::new(
                self.ids.mental_object_id(),
                agent.id,
                candidate.kind,
                candidate.content,
                embedding,
                latest.turn_number,
            );
            let mut thought = Thought::new(object, stimuli);

            match self
                .call("evaluation", self.reasoning.evaluate_motivation(&ctx, &thought))
                .await
            {
                Ok(motivation) if (0.0..=1.0).contains(&motivation.score) => {
                    thought.set_motivation(motivation);
                }
                Ok(motivation) => {
                    warn!(agent = %agent.id, score = motivation.score,
                          "Evaluator returned an out-of-range score; thought stays unevaluated");
                }
                Err(err) => {
                    warn!(agent = %agent.id, error = %err,
                          "Evaluation failed; thought stays unevaluated");
                }
            }

            let thought_id = thought.object.id;
            mind.thoughts.add(thought)?;
            batch_ids.push(thought_id);
        }

        let floor = FloorStatus::resolve(Some(prediction), &agent.name);
        let selector = ProactivitySelector::new(mind.proactivity);
        let mut task_rng = StdRng::seed_from_u64(seed);
        let batch: Vec<&Thought> = batch_ids
            .iter()
            .filter_map(|tid| mind.thoughts.get(*tid))
            .collect();
        let selected = selector
            .select(&batch, floor, &mut task_rng)
            .map(|t| (t.object.id, t.score()));

        Ok(selected.map(|(thought_id, score)| Nomination {
            participant: agent.id,
            thought_id,
            score,
            ctx,
        }))
    }

    /// Assemble the structured context for generation/evaluation, bumping
    /// access bookkeeping on every memory and thought in the generation
    /// excerpts. The wider evaluation excerpt is a pure read.
    fn build_think_context(
        &self,
        agent: &AgentRef,
        mind: &mut AgentMind,
        snapshot: &TurnSnapshot,
    ) -> ThinkContext {
        let turn = snapshot.latest.turn_number;

        let memory_ids: Vec<MentalObjectId> = mind
            .memories
            .retrieve_top_k(
                self.turn_config.memory_top_k,
                self.turn_config.memory_threshold,
                Some(MentalObjectKind::MemoryLongTerm),
            )
            .iter()
            .map(|m| m.id)
            .collect();
        let mut salient_memories = Vec::with_capacity(memory_ids.len());
        for mid in memory_ids {
            if let Some(memory) = mind.memories.get_mut(mid) {
                memory.record_access(turn);
                salient_memories.push(MentalExcerpt {
                    id: mid,
                    content: memory.content.clone(),
                });
            }
        }

        // The evaluator reads more of the long-term store than the
        // generator, without touching access bookkeeping.
        let evaluation_memories: Vec<MentalExcerpt> = mind
            .memories
            .retrieve_top_k(
                self.turn_config.evaluation_top_k,
                self.turn_config.memory_threshold,
                Some(MentalObjectKind::MemoryLongTerm),
            )
            .iter()
            .map(|m| MentalExcerpt {
                id: m.id,
                content: m.content.clone(),
            })
            .collect();

        let thought_ids: Vec<MentalObjectId> = mind
            .thoughts
            .retrieve_top_k(
                self.turn_config.thought_top_k,
                self.turn_config.thought_threshold,
                Some(MentalObjectKind::ThoughtSystem2),
            )
            .iter()
            .map(|t| t.mental().id)
            .collect();
        let mut salient_thoughts = Vec::with_capacity(thought_ids.len());
        for tid in thought_ids {
            if let Some(thought) = mind.thoughts.get_mut(tid) {
                thought.mental_mut().record_access(turn);
                salient_thoughts.push(MentalExcerpt {
                    id: tid,
                    content: thought.mental().content.clone(),
                });
            }
        }

        ThinkContext {
            scene: snapshot.scene.clone(),
            agent_name: agent.name.clone(),
            persona: mind.persona.clone(),
            turn_number: turn,
            recent_events: snapshot.recent.clone(),
            participant_names: snapshot.participant_names.clone(),
            salient_memories,
            salient_thoughts,
            evaluation_memories,
            turns_silent: agent
                .last_spoken_turn
                .map_or(turn, |spoke| turn.saturating_sub(spoke)),
            system2_count: self.turn_config.system2_thoughts,
        }
    }

    // -- arbitration --------------------------------------------------------

    /// Choose among nominations: the strictly-highest motivation wins, with
    /// exact ties going to the earliest nomination. `nominations` arrives in
    /// roster order, so "earliest" means "registered first". When every
    /// nomination somehow carries the unevaluated sentinel, fall back to a
    /// uniform random pick among them.
    fn arbitrate<'a>(&mut self, nominations: &'a [Nomination]) -> Option<&'a Nomination> {
        if nominations.is_empty() {
            return None;
        }
        let mut best: Option<&Nomination> = None;
        for nomination in nominations.iter().filter(|n| n.score >= 0.0) {
            match best {
                Some(leader) if nomination.score > leader.score => best = Some(nomination),
                None => best = Some(nomination),
                _ => {}
            }
        }
        if best.is_some() {
            return best;
        }
        let idx = self.rng.gen_range(0..nominations.len());
        Some(&nominations[idx])
    }
}

/// Drop stimulus references that don't resolve: event refs must point at a
/// recorded turn, mental refs at something in this agent's stores. Order of
/// the survivors is preserved.
fn resolve_stimuli(
    stimuli: Vec<StimulusRef>,
    mind: &AgentMind,
    latest_turn: u64,
) -> Vec<StimulusRef> {
    stimuli
        .into_iter()
        .filter(|stimulus| match stimulus {
            StimulusRef::Event(turn) => *turn >= 1 && *turn <= latest_turn,
            StimulusRef::Mental(mid) => {
                mind.memories.get(*mid).is_some() || mind.thoughts.get(*mid).is_some()
            }
        })
        .collect()
}
