//! `tasklet workflow`: List workflows and drive one interactively.
//!
//! `run` talks to the controller in-process: every interaction request is
//! turned into terminal prompts and sent back as a continue call, so the
//! task goes through exactly the same start/continue cycle as over HTTP.

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use serde_json::Value;

use tasklet_core::envelope::{EnvelopeKind, Reply};
use tasklet_core::state::AppState;
use tasklet_core::{ContinueRequest, FieldKind, FormField, InteractionRequest, Message, Param, StartRequest};

use super::print_json;

/// Print the registered workflows as a table.
pub async fn list(state: &AppState) -> Result<(), String> {
    let workflows = state.registry.list();
    if workflows.is_empty() {
        println!("No workflows registered.");
        return Ok(());
    }

    println!("{:<22} {:<28} {}", "NAME", "TITLE", "PARAMS");
    for summary in &workflows {
        let params: Vec<&str> = summary.params.iter().map(Param::as_str).collect();
        println!(
            "{:<22} {:<28} {}",
            summary.name,
            summary.title,
            params.join(", ")
        );
        if !summary.description.is_empty() {
            println!("{:<22} {}", "", style(&summary.description).dim());
        }
    }
    Ok(())
}

/// Start `name` and keep answering its prompts until it finishes.
pub async fn run(
    state: &AppState,
    name: &str,
    input: Option<String>,
    model: Option<String>,
) -> Result<(), String> {
    let descriptor = state
        .registry
        .get(name)
        .ok_or_else(|| format!("Unknown workflow: {} (see `tasklet workflow list`)", name))?;

    let input = match input {
        Some(input) => Some(input),
        None if descriptor.requires(Param::Input) => Some(prompt_text("Input", true)?),
        None => None,
    };

    println!("{}", style(format!("▶ Running workflow: {}", descriptor.title)).bold().cyan());

    let mut envelope = state
        .controller
        .start(StartRequest {
            workflow_id: name.to_string(),
            user_input: input,
            model,
        })
        .await;

    loop {
        for message in &envelope.messages {
            print_message(message);
        }

        let reply = match &envelope.kind {
            EnvelopeKind::Progress(message) => {
                print_message(message);
                Reply::new()
            }
            EnvelopeKind::Interaction(request) => prompt_reply(request)?,
            EnvelopeKind::Success(payload) => {
                println!("\n{}", style("✅ Workflow completed").bold().green());
                if !payload.is_empty() {
                    print_json(&Value::Object(payload.clone()));
                }
                return Ok(());
            }
            EnvelopeKind::Failure(err) => return Err(err.to_string()),
        };

        let task_id = envelope
            .task_id
            .clone()
            .ok_or_else(|| "Suspended envelope without a task id".to_string())?;
        envelope = state
            .controller
            .continue_task(ContinueRequest {
                task_id,
                user_input: Some(Value::Object(reply)),
            })
            .await;
    }
}

fn print_message(message: &Message) {
    println!("{} {}", style(format!("• {}", message.title)).bold(), message.body);
}

fn prompt_reply(request: &InteractionRequest) -> Result<Reply, String> {
    println!("\n{}", style(&request.message.title).bold().yellow());
    if !request.message.body.is_empty() {
        println!("{}", request.message.body);
    }

    let mut reply = Reply::new();
    for field in &request.fields {
        let value = match field.kind {
            FieldKind::Select => prompt_select(field)?,
            FieldKind::Text => prompt_text(&field.label, field.required)?,
        };
        if !value.is_empty() {
            reply.insert(field.name.clone(), Value::String(value));
        }
    }
    Ok(reply)
}

fn prompt_select(field: &FormField) -> Result<String, String> {
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(&field.label)
        .items(&field.options)
        .default(0)
        .interact()
        .map_err(|e| format!("Prompt failed: {}", e))?;
    field
        .options
        .get(index)
        .cloned()
        .ok_or_else(|| format!("No option at index {}", index))
}

fn prompt_text(label: &str, required: bool) -> Result<String, String> {
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(label)
        .allow_empty(!required)
        .validate_with(|value: &String| -> Result<(), &str> {
            if required && value.trim().is_empty() {
                Err("a value is required")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map_err(|e| format!("Prompt failed: {}", e))
}
