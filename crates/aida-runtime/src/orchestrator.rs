//! One chat turn from request to reply.
//!
//! Stage order:
//! 1. validation
//! 2. safety gate (nothing persisted on a bypass)
//! 3. baseline and reading persistence
//! 4. phase rules, then nutrition rules
//! 5. context assembly and model call

use std::sync::Arc;

use aida_core::messages::{history_plain, last_user_content, non_system_tail};
use aida_core::{ChatMessage, Phase, ValidationError};
use aida_llm::{ChatProvider, CompletionOptions};
use aida_progress::{WINDOW, compute_metrics, render_progress};
use aida_rules::extract::{detect_moment, extract_baseline, extract_glucose, extract_symptoms, is_confirmation};
use aida_rules::{BypassReason, RuleContext, RuleMatch, RuleSet, SafetyDecision, SafetyEvaluator};
use aida_settings::AidaSettings;
use aida_store::CoachStore;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::context::{ContextBundle, memory_context, onboarding_context, protocol_context};
use crate::directive::SituationDirective;
use crate::errors::RuntimeError;
use crate::prompt::system_prompt;
use crate::protocol::ProtocolDocument;

/// Reply used when the model returns no text.
pub const FALLBACK_REPLY: &str = "No pude generar respuesta en este momento.";

/// Inbound turn.
#[derive(Clone, Debug, Default)]
pub struct TurnRequest {
    /// Opaque device identifier used as the user id.
    pub device_id: String,
    /// Full client-side conversation.
    pub messages: Vec<ChatMessage>,
    /// Free-form onboarding answers.
    pub onboarding: Option<Value>,
}

/// Which stage produced the reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnSource {
    /// Safety gate.
    Safety(BypassReason),
    /// Phase rule with the given id.
    PhaseRule(&'static str),
    /// Nutrition rule with the given id.
    NutritionRule(&'static str),
    /// Language model.
    Model,
}

impl TurnSource {
    /// Metrics label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Safety(_) => "safety",
            Self::PhaseRule(_) => "phase_rule",
            Self::NutritionRule(_) => "nutrition_rule",
            Self::Model => "model",
        }
    }

    /// Only safety replies count as a bypass on the wire.
    pub fn is_bypass(self) -> bool {
        matches!(self, Self::Safety(_))
    }
}

/// Result of a completed turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Text for the user.
    pub reply: String,
    /// Producing stage.
    pub source: TurnSource,
}

impl TurnOutcome {
    /// Shorthand for [`TurnSource::is_bypass`].
    pub fn bypass(&self) -> bool {
        self.source.is_bypass()
    }
}

/// Knobs the orchestrator reads on every turn.
#[derive(Clone, Debug)]
pub struct CoachConfig {
    /// Phase used by the phase rules.
    pub phase: Phase,
    /// Minimum weeks stated in the system prompt.
    pub phase_min_weeks: u32,
    /// Non-system messages fed to the safety gate.
    pub history_window: usize,
    /// Non-system messages sent to the model.
    pub conversation_window: usize,
    /// Readings listed in the memory block.
    pub recent_readings: usize,
    /// Contact appended to severe safety replies.
    pub escalation_contact: String,
    /// Model parameters.
    pub completion: CompletionOptions,
}

impl CoachConfig {
    /// Derive from loaded settings.
    pub fn from_settings(settings: &AidaSettings) -> Self {
        Self {
            phase: settings.coach.phase,
            phase_min_weeks: settings.coach.phase_min_weeks,
            history_window: settings.coach.history_window,
            conversation_window: settings.coach.conversation_window,
            recent_readings: settings.coach.recent_readings,
            escalation_contact: settings.coach.escalation_contact.clone(),
            completion: CompletionOptions {
                model: settings.llm.model.clone(),
                temperature: settings.llm.temperature,
                max_tokens: settings.llm.max_tokens,
            },
        }
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self::from_settings(&AidaSettings::default())
    }
}

/// Runs turns against a store and a provider.
pub struct TurnOrchestrator {
    store: Arc<dyn CoachStore>,
    provider: Arc<dyn ChatProvider>,
    protocol: ProtocolDocument,
    config: CoachConfig,
    safety: SafetyEvaluator,
    phase_rules: RuleSet,
    nutrition_rules: RuleSet,
}

impl TurnOrchestrator {
    /// Build with the built-in rule sets.
    pub fn new(
        store: Arc<dyn CoachStore>,
        provider: Arc<dyn ChatProvider>,
        protocol: ProtocolDocument,
        config: CoachConfig,
    ) -> Self {
        Self {
            safety: SafetyEvaluator::new(config.escalation_contact.clone()),
            phase_rules: aida_rules::phase_rules(),
            nutrition_rules: aida_rules::nutrition_rules(),
            store,
            provider,
            protocol,
            config,
        }
    }

    /// Loaded protocol.
    pub fn protocol(&self) -> &ProtocolDocument {
        &self.protocol
    }

    /// Process one turn.
    #[instrument(skip_all, fields(user_id = %request.device_id.trim()))]
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome, RuntimeError> {
        if request.messages.is_empty() {
            return Err(ValidationError::InvalidMessages.into());
        }
        let user_id = request.device_id.trim();
        if user_id.is_empty() {
            return Err(ValidationError::MissingDeviceId.into());
        }

        let last_user = last_user_content(&request.messages);
        let history = history_plain(&request.messages, self.config.history_window);

        let (moment_hint, glucose_hint) = match self.safety.evaluate(last_user, &history) {
            SafetyDecision::Bypass(bypass) => {
                info!(reason = %bypass.reason, "safety bypass");
                metrics::counter!("safety_bypass_total", "reason" => bypass.reason.as_str())
                    .increment(1);
                return Ok(Self::finish(bypass.reply, TurnSource::Safety(bypass.reason)));
            }
            SafetyDecision::Proceed { moment, glucose } => (moment, glucose),
        };
        debug!(moment = %moment_hint, glucose = ?glucose_hint, "safety gate passed");

        let _ = self.store.get_or_create_user_state(user_id).await?;

        let baseline = extract_baseline(last_user);
        if !baseline.is_empty() {
            let _ = self
                .store
                .upsert_baseline(user_id, baseline.a1c, baseline.avg_glucose)
                .await?;
            info!(a1c = ?baseline.a1c, avg_glucose = ?baseline.avg_glucose, "baseline updated");
        }

        let confirmation = is_confirmation(last_user);
        let moment = detect_moment(last_user);
        let glucose = extract_glucose(last_user);
        let symptoms = extract_symptoms(last_user);

        if let Some(value) = glucose {
            let reading = self
                .store
                .create_reading(user_id, value, moment, symptoms)
                .await?;
            info!(reading_id = reading.id, glucose = value, moment = %moment, "reading stored");
        }

        let ctx = RuleContext {
            phase: self.config.phase,
            moment,
            glucose,
            symptoms,
        };
        if let Some(hit) = self.phase_rules.evaluate(last_user, &ctx) {
            return Ok(Self::intercept(hit, TurnSource::PhaseRule));
        }
        if let Some(hit) = self.nutrition_rules.evaluate(last_user, &ctx) {
            return Ok(Self::intercept(hit, TurnSource::NutritionRule));
        }

        let last = self.store.find_last_reading(user_id).await?;
        let recent = self
            .store
            .find_recent_readings(user_id, self.config.recent_readings)
            .await?;
        let window = self.store.find_recent_readings(user_id, WINDOW).await?;
        let state = self.store.get_or_create_user_state(user_id).await?;

        let values: Vec<u16> = window.iter().map(|r| r.glucose).collect();
        let progress = compute_metrics(&values, &state.baseline);

        let bundle = ContextBundle {
            system_prompt: system_prompt(self.protocol.name(), self.config.phase_min_weeks),
            memory: memory_context(&state.baseline, last.as_ref(), &recent),
            progress: render_progress(&progress),
            onboarding: onboarding_context(request.onboarding.as_ref()),
            protocol: protocol_context(&self.protocol),
            directive: SituationDirective::select(moment, confirmation, glucose.is_some())
                .text()
                .to_string(),
        };
        let messages = bundle.into_messages(non_system_tail(
            &request.messages,
            self.config.conversation_window,
        ));

        let reply = self
            .provider
            .complete(&messages, &self.config.completion)
            .await?
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());

        Ok(Self::finish(reply, TurnSource::Model))
    }

    fn intercept(hit: RuleMatch, source: fn(&'static str) -> TurnSource) -> TurnOutcome {
        info!(engine = hit.engine, rule = hit.rule_id, "rule intercepted turn");
        metrics::counter!("rule_intercepts_total", "engine" => hit.engine, "rule" => hit.rule_id)
            .increment(1);
        Self::finish(hit.reply, source(hit.rule_id))
    }

    fn finish(reply: String, source: TurnSource) -> TurnOutcome {
        metrics::counter!("chat_turns_total", "source" => source.label()).increment(1);
        TurnOutcome { reply, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use aida_core::{Moment, Role};
    use aida_llm::{ProviderError, ProviderResult};
    use aida_store::SqliteStore;
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingProvider {
        reply: Option<String>,
        fail: bool,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl RecordingProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> ProviderResult<Option<String>> {
            self.calls.lock().unwrap().push(messages.to_vec());
            if self.fail {
                return Err(ProviderError::Other {
                    message: "upstream down".into(),
                });
            }
            Ok(self.reply.clone())
        }
    }

    fn setup(provider: RecordingProvider) -> (TurnOrchestrator, Arc<SqliteStore>, Arc<RecordingProvider>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let provider = Arc::new(provider);
        let orchestrator = TurnOrchestrator::new(
            store.clone(),
            provider.clone(),
            ProtocolDocument::default(),
            CoachConfig::default(),
        );
        (orchestrator, store, provider)
    }

    fn turn(text: &str) -> TurnRequest {
        TurnRequest {
            device_id: "dev-1".into(),
            messages: vec![ChatMessage::user(text)],
            onboarding: None,
        }
    }

    #[tokio::test]
    async fn empty_messages_rejected() {
        let (orch, _, _) = setup(RecordingProvider::default());
        let err = orch
            .handle_turn(TurnRequest {
                device_id: "dev-1".into(),
                ..TurnRequest::default()
            })
            .await
            .unwrap_err();
        assert_matches!(err, RuntimeError::Validation(ValidationError::InvalidMessages));
    }

    #[tokio::test]
    async fn blank_device_id_rejected() {
        let (orch, _, _) = setup(RecordingProvider::default());
        let err = orch
            .handle_turn(TurnRequest {
                device_id: "   ".into(),
                ..turn("hola")
            })
            .await
            .unwrap_err();
        assert_matches!(err, RuntimeError::Validation(ValidationError::MissingDeviceId));
    }

    #[tokio::test]
    async fn hypo_bypass_persists_nothing() {
        let (orch, store, provider) = setup(RecordingProvider::replying("no"));
        let outcome = orch.handle_turn(turn("traigo 45 y mareo")).await.unwrap();
        assert_eq!(outcome.source, TurnSource::Safety(BypassReason::HypoSafety));
        assert!(outcome.bypass());
        assert!(outcome.reply.starts_with("Tu glucosa está baja"));
        assert!(store.find_recent_readings("dev-1", 10).await.unwrap().is_empty());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn bypass_sees_earlier_history() {
        let (orch, _, _) = setup(RecordingProvider::replying("no"));
        let request = TurnRequest {
            device_id: "dev-1".into(),
            messages: vec![
                ChatMessage::user("me salió 380"),
                ChatMessage::assistant("¿Fue en ayuno?"),
                ChatMessage::user("tengo vómito"),
            ],
            onboarding: None,
        };
        let outcome = orch.handle_turn(request).await.unwrap();
        assert_eq!(outcome.source, TurnSource::Safety(BypassReason::HyperSevereSafety));
    }

    #[tokio::test]
    async fn phase_rule_intercepts_before_model() {
        let (orch, _, provider) = setup(RecordingProvider::replying("no"));
        let outcome = orch
            .handle_turn(turn("¿puedo comer tortilla con fritura?"))
            .await
            .unwrap();
        assert_eq!(outcome.source, TurnSource::PhaseRule("tortilla"));
        assert!(!outcome.bypass());
        assert!(outcome.reply.contains("evitar la tortilla"));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn nutrition_hunger_rule_still_stores_reading() {
        let (orch, store, provider) = setup(RecordingProvider::replying("no"));
        let outcome = orch.handle_turn(turn("tengo hambre, salí 110")).await.unwrap();
        assert_eq!(outcome.source, TurnSource::NutritionRule("hunger"));
        assert!(provider.calls().is_empty());
        let last = store.find_last_reading("dev-1").await.unwrap().unwrap();
        assert_eq!(last.glucose, 110);
    }

    #[tokio::test]
    async fn model_turn_assembles_six_segments() {
        let (orch, store, provider) = setup(RecordingProvider::replying("¡Bien! Desayuna con proteína."));
        let request = TurnRequest {
            device_id: "dev-1".into(),
            messages: vec![
                ChatMessage::system("client system text"),
                ChatMessage::user("cené temprano anoche, hoy en ayunas salió 130"),
            ],
            onboarding: Some(serde_json::json!({"edad": 52})),
        };
        let outcome = orch.handle_turn(request).await.unwrap();
        assert_eq!(outcome.source, TurnSource::Model);
        assert_eq!(outcome.reply, "¡Bien! Desayuna con proteína.");

        let saved = store.find_last_reading("dev-1").await.unwrap().unwrap();
        assert_eq!(saved.glucose, 130);
        assert_eq!(saved.moment, Moment::Fasting);

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let sent = &calls[0];
        assert_eq!(sent.len(), 7);
        assert!(sent[..6].iter().all(|m| m.role == Role::System));
        assert!(sent[0].content.starts_with("Eres AIDA"));
        assert!(sent[1].content.contains("Última lectura: 130 mg/dL (AYUNO)"));
        assert!(sent[2].content.starts_with("PROGRESO (sin baseline):"));
        assert_eq!(sent[3].content, "Datos base del usuario (onboarding):\n{\"edad\":52}");
        assert!(sent[4].content.starts_with("Reglas del protocolo actual"));
        assert_eq!(sent[5].content, SituationDirective::Fasting.text());
        assert_eq!(sent[6], ChatMessage::user("cené temprano anoche, hoy en ayunas salió 130"));
    }

    #[tokio::test]
    async fn baseline_is_stored_and_shown() {
        let (orch, store, provider) = setup(RecordingProvider::replying("ok"));
        let _ = orch
            .handle_turn(turn("mi a1c es 8.5 y mi promedio anda en 190"))
            .await
            .unwrap();
        let state = store.get_or_create_user_state("dev-1").await.unwrap();
        assert_eq!(state.baseline.a1c, Some(8.5));
        assert_eq!(state.baseline.avg_glucose, Some(190));

        let calls = provider.calls();
        assert!(calls[0][1].content.contains("Baseline registrado: A1c=8.5 | Promedio=190"));
        assert!(calls[0][2].content.starts_with("PROGRESO (con baseline):"));
    }

    #[tokio::test]
    async fn half_hour_reading_leaves_baseline_untouched() {
        let (orch, store, _provider) = setup(RecordingProvider::replying("ok"));
        let _ = orch
            .handle_turn(turn("a la media hora de comer salió 180"))
            .await
            .unwrap();
        let state = store.get_or_create_user_state("dev-1").await.unwrap();
        assert!(!state.baseline.is_set());
        assert_eq!(state.baseline.avg_glucose, None);
        let saved = store.find_last_reading("dev-1").await.unwrap().unwrap();
        assert_eq!(saved.glucose, 180);
    }

    #[tokio::test]
    async fn greeting_gets_no_reading_directive() {
        let (orch, store, provider) = setup(RecordingProvider::replying("¡Hola!"));
        let _ = orch.handle_turn(turn("hola buen día")).await.unwrap();
        assert!(store.find_last_reading("dev-1").await.unwrap().is_none());
        let calls = provider.calls();
        assert_eq!(calls[0][5].content, SituationDirective::NoReading.text());
        assert!(calls[0][1].content.contains("Última lectura: no hay."));
        assert_eq!(calls[0][3].content, "No hay datos de onboarding.");
    }

    #[tokio::test]
    async fn empty_completion_falls_back() {
        let (orch, _, _) = setup(RecordingProvider::default());
        let outcome = orch.handle_turn(turn("hola")).await.unwrap();
        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert_eq!(outcome.source, TurnSource::Model);
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let (orch, _, _) = setup(RecordingProvider {
            fail: true,
            ..RecordingProvider::default()
        });
        let err = orch.handle_turn(turn("hola")).await.unwrap_err();
        assert_matches!(err, RuntimeError::Provider(_));
        assert_eq!(err.kind(), "provider");
    }

    #[tokio::test]
    async fn conversation_window_is_applied() {
        let (orch, _, provider) = setup(RecordingProvider::replying("ok"));
        let mut messages = Vec::new();
        for _ in 0..15 {
            messages.push(ChatMessage::user("¿qué desayuno?"));
            messages.push(ChatMessage::assistant("Huevo con verduras."));
        }
        messages.push(ChatMessage::user("hola"));
        let request = TurnRequest {
            device_id: "dev-1".into(),
            messages,
            onboarding: None,
        };
        let _ = orch.handle_turn(request).await.unwrap();
        let sent = &provider.calls()[0];
        assert_eq!(sent.len(), 6 + 20);
        assert_eq!(sent.last().unwrap().content, "hola");
    }
}
