// SPDX-License-Identifier: MIT

//! Step engine
//!
//! The engine holds a wizard's step definitions and cumulative schemas and
//! drives a caller-owned [`WizardState`] through them. Forward moves are gated
//! on the current step's cumulative schema; steps that declare an
//! `on_advance` effect call the [`CodeVerifier`] first and only move on
//! success. Blocked transitions never change the step and are reported as
//! [`Transition::Blocked`], not as errors.

use std::sync::Arc;

use super::registry::StepSchemaRegistry;
use super::sink::SubmissionSink;
use super::state::{FieldMap, FieldType, FieldValue, Violation, WizardState};
use super::types::{StepDefinition, StepEffect, WizardDefinition};
use crate::error::{VerifyError, WizardError};
use crate::phone;
use crate::verify::CodeVerifier;

/// Why a transition did not happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocked {
    /// Retreat requested on step 1
    AtFirstStep,
    /// Advance requested on the last step
    AtLastStep,
    /// Submit requested before the last step
    NotAtLastStep,
    /// A collaborator call is still outstanding
    InFlight,
    /// Fields do not satisfy the current step's schema
    Invalid(Vec<Violation>),
    /// The collaborator call failed or returned no token
    RemoteCallFailed(String),
    /// The step changed while the collaborator call was outstanding
    Stale { started_at: usize, now_at: usize },
}

/// Outcome of `advance`, `retreat` and `begin_advance`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Moved { from: usize, to: usize },
    /// A collaborator call must complete before moving; only returned by
    /// [`WizardEngine::begin_advance`]
    Pending(PendingEffect),
    Blocked(Blocked),
}

/// Outcome of `submit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Submitted,
    Blocked(Blocked),
}

/// A collaborator call awaiting completion
///
/// Captures the values read at the time the call was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEffect {
    pub from: usize,
    pub effect: StepEffect,
    /// Phone number, digits only
    pub phone: String,
    pub code: Option<String>,
}

/// Result of a successful collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    CodeSent,
    Confirmed { token: String },
}

impl Transition {
    pub fn moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }
}

/// Drives wizard state through a definition's steps
pub struct WizardEngine {
    definition: WizardDefinition,
    registry: StepSchemaRegistry,
    verifier: Option<Arc<dyn CodeVerifier>>,
}

impl WizardEngine {
    /// Build an engine for `definition`
    ///
    /// Fails when step indices are not `1..=n`, when a step redefines a field
    /// with a different type or gives a date field a text rule, when an effect
    /// reads a field that its step's cumulative schema does not declare as
    /// text, or when an effect exists without a verifier.
    pub fn new(
        definition: WizardDefinition,
        verifier: Option<Arc<dyn CodeVerifier>>,
    ) -> Result<Self, WizardError> {
        if definition.steps.is_empty() {
            return Err(WizardError::config(format!(
                "wizard '{}' has no steps",
                definition.name
            )));
        }

        let registry = StepSchemaRegistry::from_steps(&definition.steps)?;

        for step in &definition.steps {
            let Some(effect) = &step.on_advance else {
                continue;
            };
            if verifier.is_none() {
                return Err(WizardError::config(format!(
                    "step {} of '{}' runs {} but no verifier is configured",
                    step.index,
                    definition.name,
                    effect.name()
                )));
            }
            let schema = registry.lookup(step.index)?;
            for field in effect.reads() {
                match schema.get(field) {
                    None => {
                        return Err(WizardError::config(format!(
                            "step {} of '{}' reads undeclared field '{}'",
                            step.index, definition.name, field
                        )))
                    }
                    Some(def) if def.field_type != FieldType::Text => {
                        return Err(WizardError::config(format!(
                            "step {} of '{}' reads '{}' as text but it is declared {}",
                            step.index, definition.name, field, def.field_type
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        log::debug!(
            "Built wizard '{}' with {} steps",
            definition.name,
            registry.max_steps()
        );

        Ok(Self {
            definition,
            registry,
            verifier,
        })
    }

    pub fn definition(&self) -> &WizardDefinition {
        &self.definition
    }

    pub fn registry(&self) -> &StepSchemaRegistry {
        &self.registry
    }

    pub fn max_steps(&self) -> usize {
        self.registry.max_steps()
    }

    /// Definition of step `index`
    pub fn step(&self, index: usize) -> Result<&StepDefinition, WizardError> {
        index
            .checked_sub(1)
            .and_then(|i| self.definition.steps.get(i))
            .ok_or(WizardError::UnknownStep {
                step: index,
                max: self.max_steps(),
            })
    }

    /// Definition of the step `state` is on
    pub fn current_step(&self, state: &WizardState) -> Result<&StepDefinition, WizardError> {
        self.step(state.step())
    }

    /// Label for the forward button on the current step
    pub fn forward_label(&self, state: &WizardState) -> &str {
        if state.step() == self.max_steps() {
            &self.definition.submit_label
        } else {
            &self.definition.next_label
        }
    }

    /// Fresh state on step 1 with declared defaults filled in
    pub fn start(&self) -> Result<WizardState, WizardError> {
        let mut fields = FieldMap::new();
        if let Ok(schema) = self.registry.lookup(self.max_steps()) {
            for (name, def) in &schema.fields {
                if let Some(raw) = &def.default {
                    fields.insert(name.clone(), def.parse(name, raw)?);
                }
            }
        }
        let state = WizardState::new(fields);
        log::info!("Started wizard '{}' session {}", self.definition.name, state.id());
        Ok(state)
    }

    /// Convert raw input to the value kind a field declares
    pub fn parse_field(&self, name: &str, raw: &str) -> Result<FieldValue, WizardError> {
        let schema = self.registry.lookup(self.max_steps())?;
        let def = schema
            .get(name)
            .ok_or_else(|| WizardError::invalid_value(name, "no such field"))?;
        def.parse(name, raw)
    }

    /// Record a field edit; validity is evaluated lazily
    pub fn set_field(
        &self,
        state: &mut WizardState,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) {
        let name = name.into();
        log::debug!("Session {} set field '{}'", state.id(), name);
        state.set_field(name, value);
    }

    /// Check fields against the cumulative schema of the current step
    pub fn validate(&self, state: &WizardState) -> Result<(), Vec<Violation>> {
        match self.registry.lookup(state.step()) {
            Ok(schema) => schema.validate(state.fields()),
            Err(e) => Err(vec![Violation::new("step", e.to_string())]),
        }
    }

    pub fn is_valid(&self, state: &WizardState) -> bool {
        self.validate(state).is_ok()
    }

    /// Move forward one step, running the step's effect first if it has one
    ///
    /// Dropping the returned future while the call is outstanding clears the
    /// in-flight flag and leaves the step unchanged, so the advance can be
    /// retried.
    pub async fn advance(&self, state: &mut WizardState) -> Transition {
        match self.begin_advance(state) {
            Transition::Pending(pending) => {
                let mut guard = InFlightGuard {
                    engine: self,
                    state: Some(state),
                };
                let result = self.run_effect(&pending).await;
                match guard.state.take() {
                    Some(state) => self.finish_advance(state, &pending, result),
                    None => Transition::Blocked(Blocked::InFlight),
                }
            }
            other => other,
        }
    }

    /// Give up on a call started with [`begin_advance`](Self::begin_advance)
    ///
    /// Clears the in-flight flag without moving. A result for the abandoned
    /// call must not be passed to [`finish_advance`](Self::finish_advance)
    /// afterwards.
    pub fn abort_advance(&self, state: &mut WizardState) {
        if state.in_flight {
            log::warn!(
                "Session {} abandoned its call on step {}",
                state.id(),
                state.step()
            );
        }
        state.in_flight = false;
    }

    /// First half of [`advance`](Self::advance)
    ///
    /// Moves immediately when the step has no effect. Otherwise raises the
    /// in-flight flag and returns the call to make; the caller runs it with
    /// [`run_effect`](Self::run_effect) and hands the result to
    /// [`finish_advance`](Self::finish_advance).
    pub fn begin_advance(&self, state: &mut WizardState) -> Transition {
        let from = state.step();

        if state.in_flight() {
            return Transition::Blocked(Blocked::InFlight);
        }
        if from >= self.max_steps() {
            return Transition::Blocked(Blocked::AtLastStep);
        }
        if let Err(violations) = self.validate(state) {
            log::debug!(
                "Session {} cannot leave step {}: {} violation(s)",
                state.id(),
                from,
                violations.len()
            );
            return Transition::Blocked(Blocked::Invalid(violations));
        }

        let effect = match self.step(from).map(|s| s.on_advance.clone()) {
            Ok(Some(effect)) => effect,
            _ => return self.move_forward(state),
        };

        let pending = match Self::capture(state, from, effect) {
            Ok(pending) => pending,
            Err(e) => return Transition::Blocked(Blocked::RemoteCallFailed(e.to_string())),
        };

        state.in_flight = true;
        log::info!(
            "Session {} running {} before leaving step {}",
            state.id(),
            pending.effect.name(),
            from
        );
        Transition::Pending(pending)
    }

    /// Perform the collaborator call for a pending effect
    pub async fn run_effect(&self, pending: &PendingEffect) -> Result<EffectOutcome, VerifyError> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or(VerifyError::NotConfigured)?;

        match &pending.effect {
            StepEffect::SendCode { .. } => {
                verifier.send_code(&pending.phone).await?;
                Ok(EffectOutcome::CodeSent)
            }
            StepEffect::ConfirmCode { code_field, .. } => {
                let code = pending
                    .code
                    .as_deref()
                    .ok_or_else(|| VerifyError::MissingField(code_field.clone()))?;
                match verifier.confirm_code(&pending.phone, code).await? {
                    Some(token) => Ok(EffectOutcome::Confirmed { token }),
                    None => Err(VerifyError::MissingToken),
                }
            }
        }
    }

    /// Second half of [`advance`](Self::advance)
    ///
    /// Always clears the in-flight flag. Moves forward only when the call
    /// succeeded, the state is still on the step the call was made from and
    /// the fields are still valid.
    pub fn finish_advance(
        &self,
        state: &mut WizardState,
        pending: &PendingEffect,
        result: Result<EffectOutcome, VerifyError>,
    ) -> Transition {
        state.in_flight = false;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!(
                    "Session {} {} failed, staying on step {}: {}",
                    state.id(),
                    pending.effect.name(),
                    state.step(),
                    e
                );
                return Transition::Blocked(Blocked::RemoteCallFailed(e.to_string()));
            }
        };

        if state.step() != pending.from {
            log::warn!(
                "Session {} {} completed for step {} but session is on step {}",
                state.id(),
                pending.effect.name(),
                pending.from,
                state.step()
            );
            return Transition::Blocked(Blocked::Stale {
                started_at: pending.from,
                now_at: state.step(),
            });
        }

        if let Err(violations) = self.validate(state) {
            return Transition::Blocked(Blocked::Invalid(violations));
        }

        if let EffectOutcome::Confirmed { token } = outcome {
            state.token = Some(token);
        }
        self.move_forward(state)
    }

    /// Move back one step; effects already performed are not undone
    pub fn retreat(&self, state: &mut WizardState) -> Transition {
        let from = state.step();
        if from <= 1 {
            return Transition::Blocked(Blocked::AtFirstStep);
        }
        state.step = from - 1;
        log::debug!("Session {} moved back to step {}", state.id(), state.step);
        Transition::Moved {
            from,
            to: state.step,
        }
    }

    /// Hand the final fields to `sink`
    ///
    /// Only allowed on the last step with valid fields. The step is left as
    /// is; the caller drops the state afterwards.
    pub fn submit(
        &self,
        state: &WizardState,
        sink: &mut dyn SubmissionSink,
    ) -> Result<Submission, WizardError> {
        if state.step() != self.max_steps() {
            return Ok(Submission::Blocked(Blocked::NotAtLastStep));
        }
        if state.in_flight() {
            return Ok(Submission::Blocked(Blocked::InFlight));
        }
        if let Err(violations) = self.validate(state) {
            return Ok(Submission::Blocked(Blocked::Invalid(violations)));
        }

        sink.present(state.fields())?;
        log::info!(
            "Session {} submitted wizard '{}'",
            state.id(),
            self.definition.name
        );
        Ok(Submission::Submitted)
    }

    fn move_forward(&self, state: &mut WizardState) -> Transition {
        let from = state.step();
        state.step = from + 1;
        log::debug!("Session {} moved to step {}", state.id(), state.step);
        Transition::Moved {
            from,
            to: state.step,
        }
    }

    fn capture(
        state: &WizardState,
        from: usize,
        effect: StepEffect,
    ) -> Result<PendingEffect, VerifyError> {
        let read = |field: &str| {
            state
                .text(field)
                .map(str::to_string)
                .ok_or_else(|| VerifyError::MissingField(field.to_string()))
        };

        let (phone, code) = match &effect {
            StepEffect::SendCode { phone_field } => (read(phone_field.as_str())?, None),
            StepEffect::ConfirmCode {
                phone_field,
                code_field,
            } => (
                read(phone_field.as_str())?,
                Some(read(code_field.as_str())?),
            ),
        };

        Ok(PendingEffect {
            from,
            effect,
            phone: phone::unformat(&phone),
            code,
        })
    }
}

/// Aborts the outstanding call if `advance` is dropped before it completes
struct InFlightGuard<'a> {
    engine: &'a WizardEngine,
    state: Option<&'a mut WizardState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.engine.abort_advance(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::sink::CollectingSink;
    use crate::wizard::state::{FieldDef, Rule, StepSchema};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records calls and answers with a fixed token
    struct MockVerifier {
        token: Option<String>,
        fail_send: bool,
        calls: Mutex<Vec<String>>,
    }

    impl MockVerifier {
        fn new(token: Option<&str>) -> Self {
            Self {
                token: token.map(str::to_string),
                fail_send: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail_send: true,
                ..Self::new(None)
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CodeVerifier for MockVerifier {
        async fn send_code(&self, phone: &str) -> Result<(), VerifyError> {
            self.calls.lock().unwrap().push(format!("send:{}", phone));
            if self.fail_send {
                return Err(VerifyError::rejected("send-code", 500, "boom"));
            }
            Ok(())
        }

        async fn confirm_code(
            &self,
            phone: &str,
            code: &str,
        ) -> Result<Option<String>, VerifyError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("confirm:{}:{}", phone, code));
            Ok(self.token.clone())
        }
    }

    fn login_definition() -> WizardDefinition {
        WizardDefinition {
            name: "login".to_string(),
            description: String::new(),
            next_label: "Next".to_string(),
            submit_label: "Sign in".to_string(),
            steps: vec![
                StepDefinition::new(1, "Phone")
                    .with_fields(StepSchema::new().with_field(
                        "phone",
                        FieldDef::text().with_default("").with_rule(Rule::Phone),
                    ))
                    .with_effect(StepEffect::send_code()),
                StepDefinition::new(2, "Code")
                    .with_fields(StepSchema::new().with_field(
                        "code",
                        FieldDef::text().with_rule(Rule::MinLength { value: 4 }),
                    ))
                    .with_effect(StepEffect::confirm_code()),
                StepDefinition::new(3, "Done"),
            ],
        }
    }

    fn engine_with(verifier: Arc<MockVerifier>) -> WizardEngine {
        let verifier: Arc<dyn CodeVerifier> = verifier;
        WizardEngine::new(login_definition(), Some(verifier)).unwrap()
    }

    #[test]
    fn test_start_applies_defaults() {
        let engine = engine_with(Arc::new(MockVerifier::new(Some("t"))));
        let state = engine.start().unwrap();

        assert_eq!(state.step(), 1);
        assert_eq!(state.text("phone"), Some(""));
        assert!(!engine.is_valid(&state));
        assert_eq!(engine.forward_label(&state), "Next");
    }

    #[test]
    fn test_new_rejects_effect_without_verifier() {
        let result = WizardEngine::new(login_definition(), None);
        assert!(matches!(result, Err(WizardError::Config(_))));
    }

    #[test]
    fn test_new_rejects_empty_definition() {
        let mut def = login_definition();
        def.steps.clear();
        assert!(matches!(
            WizardEngine::new(def, None),
            Err(WizardError::Config(_))
        ));
    }

    #[test]
    fn test_new_rejects_effect_reading_undeclared_field() {
        let mut def = login_definition();
        def.steps[0].on_advance = Some(StepEffect::confirm_code());
        let verifier: Arc<dyn CodeVerifier> = Arc::new(MockVerifier::new(None));

        let err = WizardEngine::new(def, Some(verifier)).err().unwrap();
        assert!(err.to_string().contains("undeclared field 'code'"));
    }

    #[test]
    fn test_new_rejects_effect_reading_date_field() {
        let mut def = login_definition();
        def.steps[0].fields = StepSchema::new().with_field("phone", FieldDef::date());
        let verifier: Arc<dyn CodeVerifier> = Arc::new(MockVerifier::new(None));

        let err = WizardEngine::new(def, Some(verifier)).err().unwrap();
        assert!(matches!(err, WizardError::Config(_)));
        assert!(err.to_string().contains("'phone' as text but it is declared date"));
    }

    #[test]
    fn test_step_lookup() {
        let engine = engine_with(Arc::new(MockVerifier::new(None)));
        assert_eq!(engine.step(2).unwrap().title, "Code");
        assert!(matches!(
            engine.step(4),
            Err(WizardError::UnknownStep { step: 4, max: 3 })
        ));
    }

    #[tokio::test]
    async fn test_advance_blocked_when_invalid() {
        let verifier = Arc::new(MockVerifier::new(Some("t")));
        let engine = engine_with(verifier.clone());
        let mut state = engine.start().unwrap();
        engine.set_field(&mut state, "phone", "(27) 9123");

        let transition = engine.advance(&mut state).await;
        assert!(matches!(transition, Transition::Blocked(Blocked::Invalid(_))));
        assert_eq!(state.step(), 1);
        assert!(verifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_advance_sends_unformatted_phone() {
        let verifier = Arc::new(MockVerifier::new(Some("t")));
        let engine = engine_with(verifier.clone());
        let mut state = engine.start().unwrap();
        engine.set_field(&mut state, "phone", "(27) 91234-5678");

        let transition = engine.advance(&mut state).await;
        assert_eq!(transition, Transition::Moved { from: 1, to: 2 });
        assert!(!state.in_flight());
        assert_eq!(verifier.calls(), vec!["send:27912345678"]);
        // Stored value keeps its display form
        assert_eq!(state.text("phone"), Some("(27) 91234-5678"));
    }

    #[tokio::test]
    async fn test_failed_send_leaves_step_and_clears_flag() {
        let verifier = Arc::new(MockVerifier::failing());
        let engine = engine_with(verifier.clone());
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");

        let transition = engine.advance(&mut state).await;
        assert!(matches!(
            transition,
            Transition::Blocked(Blocked::RemoteCallFailed(_))
        ));
        assert_eq!(state.step(), 1);
        assert!(!state.in_flight());

        // Retry reaches the collaborator again
        engine.advance(&mut state).await;
        assert_eq!(verifier.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_confirm_without_token_stays() {
        let verifier = Arc::new(MockVerifier::new(None));
        let engine = engine_with(verifier.clone());
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");
        assert!(engine.advance(&mut state).await.moved());

        state.set_field("code", "1234");
        let transition = engine.advance(&mut state).await;

        assert_eq!(
            transition,
            Transition::Blocked(Blocked::RemoteCallFailed(
                VerifyError::MissingToken.to_string()
            ))
        );
        assert_eq!(state.step(), 2);
        assert!(!state.in_flight());
        assert!(state.token().is_none());
    }

    #[tokio::test]
    async fn test_confirm_with_token_moves_and_stores_token() {
        let verifier = Arc::new(MockVerifier::new(Some("tok-1")));
        let engine = engine_with(verifier.clone());
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");
        engine.advance(&mut state).await;
        state.set_field("code", "1234");

        assert_eq!(
            engine.advance(&mut state).await,
            Transition::Moved { from: 2, to: 3 }
        );
        assert_eq!(state.token(), Some("tok-1"));
        assert_eq!(
            verifier.calls(),
            vec!["send:27912345678", "confirm:27912345678:1234"]
        );
        assert_eq!(engine.forward_label(&state), "Sign in");
    }

    #[test]
    fn test_in_flight_suppresses_repeated_advance() {
        let engine = engine_with(Arc::new(MockVerifier::new(Some("t"))));
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");

        let pending = match engine.begin_advance(&mut state) {
            Transition::Pending(p) => p,
            other => panic!("expected pending, got {:?}", other),
        };
        assert!(state.in_flight());
        assert_eq!(pending.phone, "27912345678");
        assert_eq!(
            engine.begin_advance(&mut state),
            Transition::Blocked(Blocked::InFlight)
        );

        let transition = engine.finish_advance(&mut state, &pending, Ok(EffectOutcome::CodeSent));
        assert_eq!(transition, Transition::Moved { from: 1, to: 2 });
        assert!(!state.in_flight());
    }

    #[test]
    fn test_abort_advance_allows_retry() {
        let engine = engine_with(Arc::new(MockVerifier::new(Some("t"))));
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");

        assert!(matches!(
            engine.begin_advance(&mut state),
            Transition::Pending(_)
        ));
        engine.abort_advance(&mut state);

        assert!(!state.in_flight());
        assert_eq!(state.step(), 1);
        assert!(matches!(
            engine.begin_advance(&mut state),
            Transition::Pending(_)
        ));
    }

    /// Sends hang on the first call only
    #[derive(Default)]
    struct SlowFirstSend {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl CodeVerifier for SlowFirstSend {
        async fn send_code(&self, _phone: &str) -> Result<(), VerifyError> {
            if self.sends.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(())
        }

        async fn confirm_code(
            &self,
            _phone: &str,
            _code: &str,
        ) -> Result<Option<String>, VerifyError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_dropped_advance_clears_in_flight() {
        let slow = Arc::new(SlowFirstSend::default());
        let verifier: Arc<dyn CodeVerifier> = slow.clone();
        let engine = WizardEngine::new(login_definition(), Some(verifier)).unwrap();
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");

        let timed_out = tokio::time::timeout(
            Duration::from_millis(50),
            engine.advance(&mut state),
        )
        .await
        .is_err();
        assert!(timed_out);
        assert!(!state.in_flight());
        assert_eq!(state.step(), 1);

        assert_eq!(
            engine.advance(&mut state).await,
            Transition::Moved { from: 1, to: 2 }
        );
        assert_eq!(slow.sends.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stale_result_after_retreat_does_not_move() {
        let engine = engine_with(Arc::new(MockVerifier::new(Some("t"))));
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");
        state.step = 2;
        state.set_field("code", "1234");

        let pending = match engine.begin_advance(&mut state) {
            Transition::Pending(p) => p,
            other => panic!("expected pending, got {:?}", other),
        };
        assert!(engine.retreat(&mut state).moved());

        let transition = engine.finish_advance(
            &mut state,
            &pending,
            Ok(EffectOutcome::Confirmed {
                token: "t".to_string(),
            }),
        );
        assert_eq!(
            transition,
            Transition::Blocked(Blocked::Stale {
                started_at: 2,
                now_at: 1
            })
        );
        assert_eq!(state.step(), 1);
        assert!(!state.in_flight());
        assert!(state.token().is_none());
    }

    #[test]
    fn test_edit_during_flight_revalidated() {
        let engine = engine_with(Arc::new(MockVerifier::new(Some("t"))));
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");

        let Transition::Pending(pending) = engine.begin_advance(&mut state) else {
            panic!("expected pending");
        };
        state.set_field("phone", "(27)");

        let transition = engine.finish_advance(&mut state, &pending, Ok(EffectOutcome::CodeSent));
        assert!(matches!(transition, Transition::Blocked(Blocked::Invalid(_))));
        assert_eq!(state.step(), 1);
    }

    #[tokio::test]
    async fn test_retreat_bounds_and_keeps_fields() {
        let engine = engine_with(Arc::new(MockVerifier::new(Some("t"))));
        let mut state = engine.start().unwrap();

        assert_eq!(
            engine.retreat(&mut state),
            Transition::Blocked(Blocked::AtFirstStep)
        );

        state.set_field("phone", "(27) 91234-5678");
        engine.advance(&mut state).await;
        state.set_field("code", "12");
        assert_eq!(
            engine.retreat(&mut state),
            Transition::Moved { from: 2, to: 1 }
        );
        assert_eq!(state.text("code"), Some("12"));
    }

    #[tokio::test]
    async fn test_advance_blocked_at_last_step_and_submit() {
        let engine = engine_with(Arc::new(MockVerifier::new(Some("t"))));
        let mut state = engine.start().unwrap();
        let mut sink = CollectingSink::default();

        assert_eq!(
            engine.submit(&state, &mut sink).unwrap(),
            Submission::Blocked(Blocked::NotAtLastStep)
        );

        state.set_field("phone", "(27) 91234-5678");
        engine.advance(&mut state).await;
        state.set_field("code", "1234");
        engine.advance(&mut state).await;
        assert_eq!(state.step(), 3);

        assert_eq!(
            engine.advance(&mut state).await,
            Transition::Blocked(Blocked::AtLastStep)
        );
        assert_eq!(state.step(), 3);

        assert_eq!(engine.submit(&state, &mut sink).unwrap(), Submission::Submitted);
        assert_eq!(state.step(), 3);
        assert_eq!(sink.submissions.len(), 1);
        assert_eq!(
            sink.submissions[0].get("code"),
            Some(&FieldValue::from("1234"))
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_fields() {
        let engine = engine_with(Arc::new(MockVerifier::new(Some("t"))));
        let mut state = engine.start().unwrap();
        state.set_field("phone", "(27) 91234-5678");
        engine.advance(&mut state).await;
        state.set_field("code", "1234");
        engine.advance(&mut state).await;

        state.set_field("code", "1");
        let mut sink = CollectingSink::default();
        assert!(matches!(
            engine.submit(&state, &mut sink).unwrap(),
            Submission::Blocked(Blocked::Invalid(_))
        ));
        assert!(sink.submissions.is_empty());
    }

    #[test]
    fn test_parse_field() {
        let engine = engine_with(Arc::new(MockVerifier::new(None)));
        assert_eq!(
            engine.parse_field("code", "1234").unwrap(),
            FieldValue::from("1234")
        );
        assert!(matches!(
            engine.parse_field("nope", "x"),
            Err(WizardError::InvalidValue { .. })
        ));
    }
}
