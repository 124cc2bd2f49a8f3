//! Prompt templates for the tutoring LLM calls.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the tutor's behaviour (tone,
//!    grounding rules, reference format) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompt without
//!    spinning up a real model, making prompt regressions easy to catch.

use crate::context::PromptContext;

/// System prompt framing the model as a tutor over the supplied material.
///
/// The reference format matters: the response postprocessor rewrites
/// `Slide N` / `Slides X-Y` mentions into navigation anchors, so the model
/// is told to cite slides exactly that way.
pub const TUTOR_SYSTEM_PROMPT: &str = r#"You are an AI tutor helping a student understand lecture slides and PDF course notes.

Follow these rules:

1. GROUNDING
   - Answer only from the provided slide content and attached images
   - If the content does not answer the question, say so plainly
   - Never invent slide numbers or content that is not in the context

2. REFERENCES
   - Refer to locations as "Slide N" (e.g. "Slide 4"), or "Slides X-Y" for ranges
   - Point the student to the most relevant slides for further reading

3. STYLE
   - Explain at the level of the material itself
   - Use **bold** for key terms and *italics* for emphasis
   - Keep answers focused; do not restate the whole deck"#;

/// Build the user prompt for one question from an assembled context.
pub fn question_prompt(context: &PromptContext) -> String {
    let mut prompt = format!(
        "As an AI tutor, please answer this question based on the slide content.\n\n\
         {}\n\n\
         Context from slides:\n{}\n",
        context.scope_notice, context.context_text
    );

    if let Some(ref summary) = context.visual_summary {
        prompt.push_str("\n");
        prompt.push_str(summary);
        prompt.push('\n');
    }
    if !context.attachments.is_empty() {
        prompt.push_str("\nThe attached images show the referenced slides and regions.\n");
    }

    prompt.push_str(&format!("\nQuestion: {}", context.question));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> PromptContext {
        PromptContext {
            question: "What does Bragg's law state?".into(),
            scope_notice: "This answer is based only on slide 2 of 3.".into(),
            context_text: "Bragg's law\nnλ = 2d sinθ".into(),
            visual_summary: None,
            attachments: vec![],
        }
    }

    #[test]
    fn prompt_carries_scope_context_and_question() {
        let p = question_prompt(&context());
        assert!(p.starts_with("As an AI tutor"));
        assert!(p.contains("slide 2 of 3"));
        assert!(p.contains("Context from slides:\nBragg's law"));
        assert!(p.ends_with("Question: What does Bragg's law state?"));
    }

    #[test]
    fn visual_summary_is_included_when_present() {
        let mut ctx = context();
        ctx.visual_summary = Some("Visual assets on slide 2: 1 formula region(s).".into());
        let p = question_prompt(&ctx);
        assert!(p.contains("1 formula region(s)"));
    }

    #[test]
    fn system_prompt_pins_the_reference_format() {
        assert!(TUTOR_SYSTEM_PROMPT.contains("Slide N"));
    }
}
