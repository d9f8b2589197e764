// SPDX-License-Identifier: MIT

//! Appointment booking: pick service and slot, identify, verify, confirm

use once_cell::sync::Lazy;

use crate::wizard::state::{FieldDef, Mask, Rule, StepSchema};
use crate::wizard::{StepDefinition, StepEffect, WizardDefinition};

pub const NAME: &str = "scheduling";

pub const SERVICES: &[&str] = &["Depilação facial", "Corte"];

pub const HOURS: &[&str] = &["12:30 - 13:30", "13:30 - 14:30", "15:30 - 16:30"];

/// Shortest accepted full name
pub const MIN_NAME_LEN: usize = 4;

fn one_of(options: &[&str]) -> Rule {
    Rule::OneOf {
        values: options.iter().map(|s| s.to_string()).collect(),
    }
}

static DEFINITION: Lazy<WizardDefinition> = Lazy::new(|| WizardDefinition {
    name: NAME.to_string(),
    description: "Agendamento de serviço".to_string(),
    next_label: "Próximo".to_string(),
    submit_label: "Confirmar".to_string(),
    steps: vec![
        StepDefinition::new(1, "Você está entrando na agenda de Salão Pratrícia Pimentel")
            .with_fields(
                StepSchema::new()
                    .with_field("service", FieldDef::text().with_rule(one_of(SERVICES)))
                    .with_field("date", FieldDef::date())
                    .with_field("hour", FieldDef::text().with_rule(one_of(HOURS))),
            ),
        StepDefinition::new(2, "Por favor, digite o seu número de celular.")
            .with_fields(
                StepSchema::new()
                    .with_field(
                        "phone",
                        FieldDef::text()
                            .with_default("")
                            .with_mask(Mask::Phone)
                            .with_rule(Rule::Phone),
                    )
                    .with_field(
                        "name",
                        FieldDef::text().with_rule(Rule::MinLength {
                            value: MIN_NAME_LEN,
                        }),
                    ),
            )
            .with_effect(StepEffect::send_code()),
        StepDefinition::new(3, "Por favor, verifique o seu número de celular.")
            .with_description(
                "Um código de verificação foi enviado para {phone}. Insira o código abaixo.",
            )
            .with_fields(StepSchema::new().with_field(
                "code",
                FieldDef::text()
                    .with_default("")
                    .with_rule(Rule::Length {
                        value: super::auth::CODE_LEN,
                    })
                    .with_rule(Rule::Digits),
            ))
            .with_effect(StepEffect::confirm_code()),
        StepDefinition::new(4, "Seu número foi verificado!").with_description(
            "Nós agradecemos a verificação do seu número de celular. Clique em CONFIRMAR para confirmar seu agendamento.",
        ),
    ],
});

pub fn definition() -> WizardDefinition {
    DEFINITION.clone()
}
