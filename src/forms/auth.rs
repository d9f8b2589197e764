// SPDX-License-Identifier: MIT

//! Phone login: enter phone, enter code, done

use once_cell::sync::Lazy;

use crate::wizard::state::{FieldDef, Mask, Rule, StepSchema};
use crate::wizard::{StepDefinition, StepEffect, WizardDefinition};

pub const NAME: &str = "auth";

/// Length of the one-time code
pub const CODE_LEN: usize = 4;

static DEFINITION: Lazy<WizardDefinition> = Lazy::new(|| WizardDefinition {
    name: NAME.to_string(),
    description: "Login com número de celular".to_string(),
    next_label: "Próximo".to_string(),
    submit_label: "Entrar".to_string(),
    steps: vec![
        StepDefinition::new(1, "Você está entrando na agenda de Salão Pratrícia Pimentel")
            .with_fields(StepSchema::new().with_field(
                "phone",
                FieldDef::text()
                    .with_default("")
                    .with_mask(Mask::Phone)
                    .with_rule(Rule::Phone),
            ))
            .with_effect(StepEffect::send_code()),
        StepDefinition::new(2, "Por favor, verifique o seu número de celular.")
            .with_description(
                "Um código de verificação foi enviado para {phone}. Insira o código abaixo.",
            )
            .with_fields(StepSchema::new().with_field(
                "code",
                FieldDef::text()
                    .with_default("")
                    .with_rule(Rule::Length { value: CODE_LEN })
                    .with_rule(Rule::Digits),
            ))
            .with_effect(StepEffect::confirm_code()),
        StepDefinition::new(3, "Seu número foi verificado!")
            .with_description("Nós agradecemos a verificação do seu número de celular."),
    ],
});

pub fn definition() -> WizardDefinition {
    DEFINITION.clone()
}
