//! Role-specific registration.
//!
//! A [`RegistrationWizard`] collects a role's profile fields across one or more steps and
//! submits them through a [`RegistrationProvider`](crate::auth::RegistrationProvider). Which
//! fields exist, which are required, and on which step, is described by a static
//! [`WizardSpec`] per role.

pub mod wizard;

use api_shared::Role;

pub use wizard::{RegistrationDraft, RegistrationWizard, WizardState};

/// Shape of a field's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// One of a fixed set of values.
    Choice(&'static [&'static str]),
    /// A non-negative whole number, e.g. years of experience.
    UnsignedInt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: true,
            kind,
        }
    }

    const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: false,
            kind,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepSpec {
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
    /// The step asks for uploads. Advisory only: submission goes ahead without them.
    pub expects_document: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WizardSpec {
    pub role: Role,
    pub steps: &'static [StepSpec],
}

impl WizardSpec {
    pub fn total_steps(&self) -> u8 {
        self.steps.len() as u8
    }

    /// Finds a field on any step.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.steps
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.name == name)
    }
}

pub const GENDERS: &[&str] = &["Male", "Female", "Other"];

const PATIENT_STEPS: &[StepSpec] = &[StepSpec {
    title: "Personal Information",
    fields: &[
        FieldSpec::required("name", FieldKind::Text),
        FieldSpec::required("dob", FieldKind::Text),
        FieldSpec::required("gender", FieldKind::Choice(GENDERS)),
    ],
    expects_document: false,
}];

const DOCTOR_STEPS: &[StepSpec] = &[
    StepSpec {
        title: "Personal Information",
        fields: &[
            FieldSpec::required("name", FieldKind::Text),
            FieldSpec::optional("email", FieldKind::Text),
            FieldSpec::optional("dateOfBirth", FieldKind::Text),
            FieldSpec::optional("gender", FieldKind::Text),
            FieldSpec::optional("address", FieldKind::Text),
        ],
        expects_document: false,
    },
    StepSpec {
        title: "Professional Information",
        fields: &[
            FieldSpec::required("specialization", FieldKind::Text),
            FieldSpec::optional("registrationNumber", FieldKind::Text),
            FieldSpec::optional("yearsOfExperience", FieldKind::UnsignedInt),
            FieldSpec::optional("qualification", FieldKind::Text),
            FieldSpec::optional("hospitalAffiliation", FieldKind::Text),
        ],
        expects_document: false,
    },
    StepSpec {
        title: "Document Verification",
        fields: &[],
        expects_document: true,
    },
];

const LAB_STEPS: &[StepSpec] = &[StepSpec {
    title: "Lab Information",
    fields: &[
        FieldSpec::required("labName", FieldKind::Text),
        FieldSpec::required("ownerName", FieldKind::Text),
        FieldSpec::required("address", FieldKind::Text),
    ],
    expects_document: false,
}];

static PATIENT_WIZARD: WizardSpec = WizardSpec {
    role: Role::Patient,
    steps: PATIENT_STEPS,
};

static DOCTOR_WIZARD: WizardSpec = WizardSpec {
    role: Role::Doctor,
    steps: DOCTOR_STEPS,
};

static LAB_WIZARD: WizardSpec = WizardSpec {
    role: Role::Lab,
    steps: LAB_STEPS,
};

/// The wizard layout for `role`.
pub fn spec_for(role: Role) -> &'static WizardSpec {
    match role {
        Role::Patient => &PATIENT_WIZARD,
        Role::Doctor => &DOCTOR_WIZARD,
        Role::Lab => &LAB_WIZARD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_counts_per_role() {
        assert_eq!(spec_for(Role::Patient).total_steps(), 1);
        assert_eq!(spec_for(Role::Lab).total_steps(), 1);
        assert_eq!(spec_for(Role::Doctor).total_steps(), 3);
    }

    #[test]
    fn test_field_lookup_spans_steps() {
        let doctor = spec_for(Role::Doctor);
        assert!(doctor.field("name").unwrap().required);
        assert_eq!(
            doctor.field("yearsOfExperience").unwrap().kind,
            FieldKind::UnsignedInt
        );
        assert!(doctor.field("labName").is_none());
    }
}
