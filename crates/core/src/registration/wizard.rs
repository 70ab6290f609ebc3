use super::{spec_for, FieldKind, StepSpec, WizardSpec};
use crate::auth::RegistrationProvider;
use crate::constants::{MSG_NETWORK_ERROR, MSG_REGISTRATION_FAILED};
use crate::{PortalError, PortalResult};
use api_shared::{RegisterReq, RegisterResponse, Role};
use portal_types::{NonEmptyText, PhoneNumber};
use std::collections::BTreeMap;

/// Fields filled in so far. Whitespace-only values are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    fields: BTreeMap<String, String>,
    documents: Vec<String>,
}

impl RegistrationDraft {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }
}

/// How far a wizard has got.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardState {
    /// Editing `step` (1-based).
    Draft { step: u8 },
    /// Accepted by the provider with this `profileCompletionStep`.
    Submitted { step: u8 },
}

/// Role-parameterised registration wizard.
#[derive(Clone, Debug)]
pub struct RegistrationWizard {
    spec: &'static WizardSpec,
    phone: PhoneNumber,
    draft: RegistrationDraft,
    state: WizardState,
    error: Option<String>,
}

impl RegistrationWizard {
    pub fn new(role: Role, phone: PhoneNumber) -> Self {
        Self {
            spec: spec_for(role),
            phone,
            draft: RegistrationDraft::default(),
            state: WizardState::Draft { step: 1 },
            error: None,
        }
    }

    pub fn role(&self) -> Role {
        self.spec.role
    }

    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn total_steps(&self) -> u8 {
        self.spec.total_steps()
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn current_step(&self) -> u8 {
        match self.state {
            WizardState::Draft { step } | WizardState::Submitted { step } => step,
        }
    }

    pub fn current_step_spec(&self) -> &'static StepSpec {
        &self.spec.steps[usize::from(self.current_step().clamp(1, self.total_steps())) - 1]
    }

    fn draft_step(&self, operation: &'static str) -> PortalResult<u8> {
        match self.state {
            WizardState::Draft { step } => Ok(step),
            WizardState::Submitted { step } => {
                tracing::warn!("{} on a submitted {} registration", operation, self.role());
                Err(PortalError::AlreadySubmitted(step))
            }
        }
    }

    /// Sets a field. An empty or whitespace-only value clears it.
    ///
    /// # Errors
    ///
    /// `UnknownField` if the role has no such field, `AlreadySubmitted` after submission.
    pub fn set_field(&mut self, name: &str, value: &str) -> PortalResult<()> {
        self.draft_step("set_field")?;
        if self.spec.field(name).is_none() {
            return Err(PortalError::UnknownField {
                role: self.role(),
                field: name.to_string(),
            });
        }

        match NonEmptyText::new(value) {
            Ok(text) => {
                self.draft
                    .fields
                    .insert(name.to_string(), text.as_str().to_string());
            }
            Err(_) => {
                self.draft.fields.remove(name);
            }
        }
        self.error = None;
        Ok(())
    }

    /// Attaches a document reference (e.g. an uploaded file id).
    pub fn add_document(&mut self, reference: impl Into<String>) -> PortalResult<()> {
        self.draft_step("add_document")?;
        self.draft.documents.push(reference.into());
        self.error = None;
        Ok(())
    }

    fn check_formats(&self, step: &StepSpec) -> PortalResult<()> {
        for field in step.fields {
            let Some(value) = self.draft.get(field.name) else {
                continue;
            };
            match field.kind {
                FieldKind::Text => {}
                FieldKind::Choice(options) => {
                    if !options.contains(&value) {
                        return Err(PortalError::InvalidInput(format!(
                            "{} must be one of {}",
                            field.name,
                            options.join(", ")
                        )));
                    }
                }
                FieldKind::UnsignedInt => {
                    if value.parse::<u32>().is_err() {
                        return Err(PortalError::InvalidInput(format!(
                            "{} must be a whole number",
                            field.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_step(&self, step: &StepSpec) -> PortalResult<()> {
        for field in step.fields.iter().filter(|f| f.required) {
            if self.draft.get(field.name).is_none() {
                return Err(PortalError::MissingField(field.name));
            }
        }
        self.check_formats(step)
    }

    fn record<T>(&mut self, result: PortalResult<T>) -> PortalResult<T> {
        if let Err(e) = &result {
            self.error = Some(e.user_message());
        }
        result
    }

    /// True while the current step asks for uploads and none are attached.
    pub fn documents_pending(&self) -> bool {
        matches!(self.state, WizardState::Draft { .. })
            && self.current_step_spec().expects_document
            && self.draft.documents.is_empty()
    }

    /// Validates the current step and moves to the next one.
    pub fn next(&mut self) -> PortalResult<u8> {
        let step = self.draft_step("next")?;
        if step >= self.total_steps() {
            return Err(PortalError::InvalidTransition {
                operation: "next",
                state: "Draft(last step)",
            });
        }
        let checked = self.check_step(self.current_step_spec());
        self.record(checked)?;

        self.state = WizardState::Draft { step: step + 1 };
        self.error = None;
        Ok(step + 1)
    }

    /// Goes back one step, keeping everything entered so far.
    pub fn back(&mut self) -> PortalResult<u8> {
        let step = self.draft_step("back")?;
        if step <= 1 {
            return Err(PortalError::InvalidTransition {
                operation: "back",
                state: "Draft(first step)",
            });
        }
        self.state = WizardState::Draft { step: step - 1 };
        self.error = None;
        Ok(step - 1)
    }

    /// The request that would be sent with `profileCompletionStep = step`.
    pub fn submission(&self, step: u8) -> RegisterReq {
        RegisterReq {
            phone: self.phone.to_string(),
            fields: self.draft.fields.clone(),
            profile_completion_step: step,
            documents: self.draft.documents.clone(),
        }
    }

    /// Submits what has been filled in so far, recording the current step.
    ///
    /// Only allowed after the first step, which always has to be completed.
    pub async fn skip(
        &mut self,
        provider: &dyn RegistrationProvider,
    ) -> PortalResult<RegisterResponse> {
        let step = self.draft_step("skip")?;
        if step <= 1 {
            return Err(PortalError::InvalidTransition {
                operation: "skip",
                state: "Draft(first step)",
            });
        }
        let checked = self
            .spec
            .steps
            .iter()
            .try_for_each(|s| self.check_formats(s));
        self.record(checked)?;

        self.submit(provider, step).await
    }

    /// Validates every step and submits from the last one.
    ///
    /// Multi-step wizards record `profileCompletionStep = steps + 1` (everything done);
    /// single-step wizards record `1`.
    pub async fn complete(
        &mut self,
        provider: &dyn RegistrationProvider,
    ) -> PortalResult<RegisterResponse> {
        let step = self.draft_step("complete")?;
        if step != self.total_steps() {
            return Err(PortalError::InvalidTransition {
                operation: "complete",
                state: "Draft(not last step)",
            });
        }
        let checked = self.spec.steps.iter().try_for_each(|s| self.check_step(s));
        self.record(checked)?;

        let completion_step = if self.total_steps() > 1 {
            self.total_steps() + 1
        } else {
            1
        };
        self.submit(provider, completion_step).await
    }

    async fn submit(
        &mut self,
        provider: &dyn RegistrationProvider,
        completion_step: u8,
    ) -> PortalResult<RegisterResponse> {
        self.error = None;
        let req = self.submission(completion_step);

        match provider.register(self.role(), &req).await {
            Ok(resp) if resp.success => {
                tracing::info!(
                    "{} registration submitted at step {}",
                    self.role(),
                    completion_step
                );
                self.state = WizardState::Submitted {
                    step: completion_step,
                };
                Ok(resp)
            }
            Ok(resp) => {
                self.error = Some(
                    resp.message
                        .clone()
                        .unwrap_or_else(|| MSG_REGISTRATION_FAILED.into()),
                );
                Ok(resp)
            }
            Err(e) => {
                tracing::error!("registration failed: {:?}", e);
                self.error = Some(MSG_NETWORK_ERROR.into());
                Err(e)
            }
        }
    }
}
