use clap::{Parser, Subcommand};
use dotenv::dotenv;
use stepwise_rs::error::WizardError;
use stepwise_rs::forms;
use stepwise_rs::phone;
use stepwise_rs::verify::{CodeVerifier, DryRunVerifier, HttpVerifier};
use stepwise_rs::wizard::loader::WizardLoader;
use stepwise_rs::wizard::sink::JsonSink;
use stepwise_rs::wizard::state::Mask;
use stepwise_rs::wizard::{Blocked, Submission, Transition, WizardDefinition, WizardEngine};

use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Phone number formatting helpers
    Phone {
        #[command(subcommand)]
        action: PhoneAction,
    },
    /// Print a wizard definition as YAML
    Show {
        /// Built-in wizard name
        #[arg(long, conflicts_with = "file")]
        form: Option<String>,

        /// Path to a wizard definition file
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Replay scripted answers through a wizard and submit
    Run {
        /// Built-in wizard name
        #[arg(long, conflicts_with = "file")]
        form: Option<String>,

        /// Path to a wizard definition file
        #[arg(short, long)]
        file: Option<String>,

        /// YAML list with one map of field answers per step
        #[arg(short, long)]
        answers: String,

        /// Log verification calls instead of hitting the endpoint
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PhoneAction {
    /// Render digits as (DD) DDDDD-DDDD
    Format { input: String },
    /// Strip formatting back to digits
    Unformat { input: String },
}

fn load_definition(
    form: Option<String>,
    file: Option<String>,
) -> Result<WizardDefinition, WizardError> {
    match (form, file) {
        (_, Some(path)) => WizardLoader::new().load_wizard(path),
        (Some(name), None) => forms::builtin(&name).ok_or_else(|| {
            WizardError::config(format!(
                "unknown form '{}', expected one of: {}",
                name,
                forms::NAMES.join(", ")
            ))
        }),
        (None, None) => Err(WizardError::config("either --form or --file is required")),
    }
}

fn load_answers(path: &str) -> Result<Vec<BTreeMap<String, String>>, WizardError> {
    let content = std::fs::read_to_string(path)?;
    let raw: Vec<BTreeMap<String, serde_yaml::Value>> = serde_yaml::from_str(&content)?;

    raw.into_iter()
        .map(|step| {
            step.into_iter()
                .map(|(name, value)| {
                    let text = match value {
                        serde_yaml::Value::String(s) => s,
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        serde_yaml::Value::Null => String::new(),
                        _ => {
                            return Err(WizardError::invalid_value(
                                name,
                                "answers must be plain scalars",
                            ))
                        }
                    };
                    Ok((name, text))
                })
                .collect()
        })
        .collect()
}

/// Answers are replayed one map per step; more maps than steps is an error
fn check_answer_count(answers: usize, steps: usize) -> Result<(), WizardError> {
    if answers > steps {
        return Err(WizardError::config(format!(
            "answers has {} entries but the wizard has {} steps",
            answers, steps
        )));
    }
    Ok(())
}

fn describe(blocked: &Blocked) -> String {
    match blocked {
        Blocked::Invalid(violations) => violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; "),
        other => format!("{:?}", other),
    }
}

async fn run(
    definition: WizardDefinition,
    answers: Vec<BTreeMap<String, String>>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let needs_verifier = definition.steps.iter().any(|s| s.on_advance.is_some());
    let verifier: Option<Arc<dyn CodeVerifier>> = if !needs_verifier {
        None
    } else if dry_run {
        Some(Arc::new(DryRunVerifier::new()))
    } else {
        Some(Arc::new(HttpVerifier::from_env()?))
    };

    let engine = WizardEngine::new(definition, verifier)?;
    check_answer_count(answers.len(), engine.max_steps())?;
    let mut state = engine.start()?;
    let final_schema = engine.registry().lookup(engine.max_steps())?.clone();

    for step_answers in answers {
        let step = engine.current_step(&state)?;
        println!("[{}/{}] {}", step.index, engine.max_steps(), step.title);

        for (name, raw) in step_answers {
            let raw = match final_schema.get(&name).and_then(|d| d.mask) {
                Some(Mask::Phone) => phone::format(&raw),
                None => raw,
            };
            let value = engine.parse_field(&name, &raw)?;
            engine.set_field(&mut state, name, value);
        }

        if let Some(description) = step.render_description(state.fields()) {
            println!("    {}", description);
        }

        if state.step() == engine.max_steps() {
            break;
        }

        match engine.advance(&mut state).await {
            Transition::Moved { .. } => {}
            Transition::Blocked(blocked) => {
                return Err(format!(
                    "cannot leave step {}: {}",
                    state.step(),
                    describe(&blocked)
                )
                .into());
            }
            Transition::Pending(_) => unreachable!("advance resolves pending effects"),
        }
    }

    let last = engine.current_step(&state)?;
    if state.step() != engine.max_steps() {
        return Err(format!("answers ended on step {} ({})", state.step(), last.title).into());
    }
    println!("[{}/{}] {}", last.index, engine.max_steps(), last.title);

    let mut sink = JsonSink::new(std::io::stdout());
    match engine.submit(&state, &mut sink)? {
        Submission::Submitted => Ok(()),
        Submission::Blocked(blocked) => {
            Err(format!("cannot {}: {}", engine.forward_label(&state), describe(&blocked)).into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Phone { action } => match action {
            PhoneAction::Format { input } => println!("{}", phone::format(&input)),
            PhoneAction::Unformat { input } => println!("{}", phone::unformat(&input)),
        },
        Commands::Show { form, file } => {
            let definition = load_definition(form, file)?;
            print!("{}", serde_yaml::to_string(&definition)?);
        }
        Commands::Run {
            form,
            file,
            answers,
            dry_run,
        } => {
            let definition = load_definition(form, file)?;
            log::info!("Running wizard: {}", definition.name);
            let answers = load_answers(&answers)?;
            run(definition, answers, dry_run).await?;
        }
    }

    Ok(())
}
