//! Stage directives
//!
//! Fixed system directives for the planner and coder, and the helpers that
//! fill in per-turn context.

use crate::types::{Instruction, Plan};

/// Planner system directive
pub const PLANNER_DIRECTIVE: &str = r#"You are the Planning Agent. Interpret the user's request and produce a structured plan for a single-page website.

Capabilities:
1. Sections: decompose the page into sections such as Hero, Features, Testimonials, Gallery, Pricing, Contact.
2. AI chatbot: if the user asks for a "chatbot", "AI agent", "support bot" or similar, include an "AI Chat Widget" in the plan.
3. Box editing: if the user references "Box N" (or a box is selected), identify which part of the page they mean and limit the change to it.

Return a concise JSON object summarizing the requirements."#;

/// Coder system directive; placeholders are filled by [`coder_directive`]
pub const CODER_DIRECTIVE_TEMPLATE: &str = r#"You are the Code Agent, an expert Tailwind CSS and HTML developer.
Generate the FULL HTML document for a single-page website based on the plan.

STRICT RULES:
1. Framework: Tailwind CSS via CDN (<script src="https://cdn.tailwindcss.com"></script>).
2. Responsiveness: mobile-first design.
3. Box system: tag every major element (section, heading, paragraph, button, image, container div) with data-vibe-box="N", where N is a unique sequential number starting from 1 in document order.
4. Images: use <img data-image-prompt="Detailed description..." data-vibe-box="N" alt="..."> instead of a final src. The Image Agent replaces these.
5. AI chatbot: if the plan includes a chatbot, add a fixed floating action button (bottom-right) and a simple chat window, hidden by default and toggled by the button. UI only, no backend logic.
6. Output: return the raw HTML only. No markdown, no code fences, no commentary.

CONTEXT:
Previous HTML: {PREVIOUS_HTML}
User Request: {USER_REQUEST}
Selected Box: {SELECTED_BOX}
Plan: {PLAN}"#;

/// User turn sent to the coder
pub const CODER_USER_TURN: &str = "Generate the website HTML now.";

/// Context hint for the planner
///
/// `Editing existing site` or `New site`, plus the selected box if any.
#[must_use]
pub fn planning_context(instruction: &Instruction) -> String {
    let mut context = if instruction.is_edit() {
        "Editing existing site".to_string()
    } else {
        "New site".to_string()
    };
    if let Some(id) = instruction.selected_box {
        context.push_str(&format!(". Selected element: Box {id}"));
    }
    context
}

/// Planner user text as sent to a chat backend
#[must_use]
pub fn planner_user_text(request: &str, context: &str) -> String {
    format!("User request: {request}. Current context: {context}")
}

/// Coder directive with this turn's context substituted
#[must_use]
pub fn coder_directive(instruction: &Instruction, plan: &Plan) -> String {
    let previous = instruction
        .prior_document
        .as_ref()
        .filter(|d| !d.is_empty())
        .map_or("None", |d| d.markup());
    let selected = instruction
        .selected_box
        .map_or_else(|| "None".to_string(), |id| format!("Box {id}"));

    fill_template(
        CODER_DIRECTIVE_TEMPLATE,
        &[
            ("PREVIOUS_HTML", previous),
            ("USER_REQUEST", &instruction.text),
            ("SELECTED_BOX", &selected),
            ("PLAN", plan.text()),
        ],
    )
}

/// Substitute `{KEY}` markers of the template in a single pass
///
/// Substituted values are never scanned again.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let marker = &rest[start + 1..];
        let hit = values.iter().find_map(|(key, value)| {
            let after = marker.strip_prefix(key)?.strip_prefix('}')?;
            Some((value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = marker;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Suggested instruction prefix after selecting a box
#[must_use]
pub fn selection_hint(id: vibe_document::BoxId) -> String {
    format!("Change Box {id} to ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_document::{BoxId, Document};

    #[test]
    fn new_site_context() {
        let instruction = Instruction::new("a bakery site");
        assert_eq!(planning_context(&instruction), "New site");
        assert_eq!(
            planner_user_text(&instruction.text, &planning_context(&instruction)),
            "User request: a bakery site. Current context: New site"
        );
    }

    #[test]
    fn edit_context_names_selected_box() {
        let instruction = Instruction::new("make it red")
            .with_prior(Document::new("<p data-vibe-box=\"1\">x</p>"))
            .with_selection(BoxId::new(1));
        assert_eq!(
            planning_context(&instruction),
            "Editing existing site. Selected element: Box 1"
        );
    }

    #[test]
    fn coder_directive_substitutes_context() {
        let instruction = Instruction::new("add pricing");
        let plan = Plan::from_response(Some("{\"sections\":[\"pricing\"]}".into()));
        let directive = coder_directive(&instruction, &plan);

        assert!(directive.contains("Previous HTML: None"));
        assert!(directive.contains("User Request: add pricing"));
        assert!(directive.contains("Selected Box: None"));
        assert!(directive.contains("Plan: {\"sections\":[\"pricing\"]}"));
        assert!(!directive.contains("{PLAN}"));
    }

    #[test]
    fn user_text_with_markers_is_not_expanded() {
        let instruction = Instruction::new("write {PLAN} literally");
        let plan = Plan::from_response(Some("P".into()));
        let directive = coder_directive(&instruction, &plan);
        assert!(directive.contains("User Request: write {PLAN} literally"));
        assert!(directive.ends_with("Plan: P"));
    }
}
