//! Built-in workflows shipped with the engine.

use serde_json::{json, Value};

use super::{Param, WorkflowArgs, WorkflowContext, WorkflowDescriptor, WorkflowError};
use crate::envelope::{FormField, InteractionRequest, Reply};

pub fn builtin_workflows() -> Vec<WorkflowDescriptor> {
    vec![
        WorkflowDescriptor::from_fn("echo", echo)
            .title("Echo")
            .description("Returns the input unchanged.")
            .param(Param::Input),
        WorkflowDescriptor::from_fn("echo_with_confirm", echo_with_confirm)
            .title("Echo with confirmation")
            .description("Streams the input back, then asks for a Yes/No confirmation.")
            .param(Param::Input),
        WorkflowDescriptor::from_fn("draft_note", draft_note)
            .title("Draft a note")
            .description("Drafts a note from the input, asks for a title and whether to keep it.")
            .param(Param::Input)
            .param(Param::Model),
    ]
}

fn reply_str(reply: &Reply, field: &str) -> String {
    reply
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Completes immediately with the input; never suspends.
async fn echo(args: WorkflowArgs, _ctx: WorkflowContext) -> Result<Value, WorkflowError> {
    Ok(json!({ "echo": args.input() }))
}

async fn echo_with_confirm(
    args: WorkflowArgs,
    ctx: WorkflowContext,
) -> Result<Value, WorkflowError> {
    ctx.progress("got", args.input()).await?;

    let reply = ctx
        .ask(
            InteractionRequest::new("Confirmation required", "Do you confirm the input?")
                .field(FormField::select("confirm", "Confirm?", ["Yes", "No"])),
        )
        .await?;

    Ok(json!({ "confirmed": reply_str(&reply, "confirm") }))
}

async fn draft_note(args: WorkflowArgs, ctx: WorkflowContext) -> Result<Value, WorkflowError> {
    let body = args.input().trim().to_string();
    let model = args.model.unwrap_or_else(|| "none".to_string());
    ctx.progress("Draft", format!("{} (model: {})", body, model))
        .await?;

    let reply = ctx
        .ask(
            InteractionRequest::new("Name the note", "Give the draft a title.")
                .field(FormField::text("title", "Title"))
                .field(FormField::select("keep", "Keep this note?", ["Yes", "No"])),
        )
        .await?;

    let title = reply_str(&reply, "title");
    if reply_str(&reply, "keep") != "Yes" {
        return Ok(json!({ "kept": false, "title": title }));
    }

    ctx.progress("Saved", format!("Note '{}' kept", title)).await?;
    Ok(json!({
        "kept": true,
        "title": title,
        "note": body,
        "model": model,
    }))
}
