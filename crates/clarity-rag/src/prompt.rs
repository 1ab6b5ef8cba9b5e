//! Prompt templates and rendering.
//!
//! Templates use `{name}` placeholders. Rendering is single pass: text that
//! came in through a value is never expanded again, and unknown placeholders
//! are left as written.

use clarity_core::RetrievedSet;

pub const TRANSLATOR_TEMPLATE: &str = "Your are a translator from vague boss language into an everyday language. Translate
the VAGUE statement or question based on the CONTEXT.
Provide a clear and concise answer.

VAGUE: {vague}

CONTEXT: {context}";

pub const AMBIGUITY_RESOLVER_TEMPLATE: &str = "You are an Ambiguity Resolver for tech management communication. Your task is to:

1. Interpret the VAGUE STATEMENT from an IT manager
2. Consider the given CONTEXT
3. Rewrite the statement in clear, specific, and actionable terms

Provide only the rewritten statement without additional commentary.

VAGUE STATEMENT: {vague}

CONTEXT: {context}

CLEAR STATEMENT:";

/// Rubric for the judge. Criterion labels here must match [`clarity_core::Criterion::label`].
pub const JUDGE_TEMPLATE: &str = "LLM-as-a-Judge Prompt for RAG Evaluation
You are an expert judge evaluating the performance of a Retrieval-Augmented Generation (RAG) system. This system is designed to translate vague statements from IT bosses into their actual meanings. Your task is to assess the quality and accuracy of the RAG system's translations.
For each example, you will be provided with:

The original vague statement or question from the IT boss
The RAG system's translation

Input Data
Please evaluate the following translation:
Vague IT boss question: {vague}
RAG Translation: {translation}

Evaluation Criteria
Your job is to:

Analyze the RAG system's translation.
Evaluate the translation on the following criteria:
a. Accuracy: How well does the translation capture the intended meaning?
b. Clarity: Is the translation clear and easy to understand?
c. Completeness: Does the translation cover all important aspects of the actual meaning?
d. Relevance: Does the translation focus on the most important parts of the vague statement?
Provide a score for each criterion on a scale of 1-5, where:
1 = Poor
2 = Fair
3 = Good
4 = Very Good
5 = Excellent
Give an overall score (1-5) for the translation.
Provide a brief explanation (2-3 sentences) for your scoring, highlighting strengths and areas for improvement.
If the translation is incorrect or misleading, explain what went wrong and suggest how it could be improved.

Output Format
Please structure your evaluation like this:
Criteria Scores:

Accuracy: [Score]
Clarity: [Score]
Completeness: [Score]
Relevance: [Score]

Overall Score: [Score]
Explanation: [Your brief explanation]
Improvement Suggestions (if necessary): [Your suggestions]
Please provide your evaluation for the given example.";

pub const GROUND_TRUTH_TEMPLATE: &str = r#"You are an AI assistant tasked with creating slight variations of IT manager statements.
Your job is to take a vague, jargon-filled IT statement and create 5 slightly modified
versions of it.

Guidelines:
1. Keep the overall structure and tone of the original statement.
2. Make minor changes to wording, but maintain the same level of jargon and vagueness.
3. Preserve any tech terminology, buzzwords, or acronyms present in the original.
4. Ensure the core meaning remains intact.
5. Aim for variations that an IT manager might use interchangeably in different
conversations.

The original vague IT statement:
{question}

Provide the output as a list of 5 Python strings in parsable JSON format, like this:
["variant_1", "variant_2", "variant_3", "variant_4", "variant_5"]

Do not include additional information or code blocks.

Remember, the goal is to create statements that are very similar to the original, with
only minor variations. They should all sound like they could have been said by the same
IT manager in slightly different contexts.

Example:
Original: "Lets put our ducks in a row and get this cluster untangled before it
goes pear-shaped."
Variations:
[
  "We need to get our ducks in a row and untangle this cluster before it goes pear-shaped.",
  "Time to line up our ducks and sort out this cluster before we hit pear-shaped territory.",
  "Lets align our ducks and detangle this cluster situation before pear-shaped becomes our reality.",
  "We should organize our ducks and unravel this cluster mess before pear-shaped is on the horizon.",
  "Its crucial we arrange our ducks and resolve this cluster tangle before pear-shaped strikes."
]"#;

/// Substitute `{name}` placeholders from `vars` in one left-to-right pass.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter().find(|(k, _)| *k == name).map(|(_, v)| (close, *v))
        });
        match value {
            Some((close, v)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// `vague: ..\nactual: ..\n\n` for every retrieved document, in rank order.
pub fn format_context(retrieved: &RetrievedSet) -> String {
    retrieved.iter().map(|d| format!("vague: {}\nactual: {}\n\n", d.vague, d.actual)).collect()
}

/// Renders a query and its retrieved context with a fixed template.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>) -> Self { Self { template: template.into() } }

    pub fn translator() -> Self { Self::new(TRANSLATOR_TEMPLATE) }

    pub fn ambiguity_resolver() -> Self { Self::new(AMBIGUITY_RESOLVER_TEMPLATE) }

    pub fn build(&self, vague: &str, retrieved: &RetrievedSet) -> String {
        render(&self.template, &[("vague", vague), ("context", &format_context(retrieved))])
    }
}

impl Default for PromptBuilder {
    fn default() -> Self { Self::translator() }
}
