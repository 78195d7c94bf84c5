//! crates/study_assistant_core/src/prompts.rs
//!
//! The fixed instruction texts sent to the remote assistant.

use crate::domain::{Difficulty, GenerationRequest};

/// Standing instructions the assistant resource is created with.
pub const ASSISTANT_INSTRUCTIONS: &str = "Use British English for spelling and grammar. \
You are a helpful AI tutor that creates study material from documents. \
Generate clear, comprehensive and concise summaries and multiple choice questions with detailed answers.";

const NOTES_PROMPT: &str = r#"You are a helpful AI tutor. Generate clear, comprehensive and well-structured study notes from the uploaded document, good enough to ace the course.

1. Coverage
   - Address every page and every section of the document. Cover 100% of its content.
   - Do not skip material, even when it looks repetitive.
   - Reorganise fragmented points into a logical flow.

2. Structure
   - Main topics and subtopics, using headings and bullet points.
   - Key concepts and definitions, explained in simple terms.
   - Important facts, figures and examples: highlight data, formulas and cases.
   - Diagrams and tables described in words where present.
   - Finish with a concise summary of 3 to 5 bullet points.

3. Style
   - British English spelling and grammar.
   - Clear, student-friendly language suitable for exam revision.
   - Bullet points, numbered lists and bold/italic text for emphasis.

4. Depth
   - Expand with short explanations, context or examples where possible.
   - Add thinking points.
   - Rephrase rather than copy sentences verbatim.

5. Study techniques
   - Active recall: 2 to 3 practice questions per major topic (short answer and multiple choice), with answers given separately.
   - Elaboration: short "Why does this matter?" or "How does this connect?" notes.
   - Chunking: group related ideas into numbered or bulleted clusters.
   - Dual coding: suggest how content could be visualised (timeline, diagram, table).
   - Prioritisation: mark must-know concepts with a ⭐ so the student knows what to memorise first.

Output the notes in a structured format ready to be used as a study guide. Make sure every page of the document is covered and end with the concise summary."#;

const QUIZ_PROMPT_TEMPLATE: &str = r#"You are a helpful AI tutor that creates multiple choice questions from the uploaded document.
Create multiple choice questions with exactly 4 options each, and give the correct answer with a detailed explanation.
Cover all the main topics and subtopics of the document.
Keep each question clear and concise, testing understanding of key concepts and important facts.

The difficulty of the questions must be {difficulty}.
Requirements for this difficulty level: {guidance}

Respond with JSON only, in exactly this shape:
{
    "questions": [
        {
            "question": "your question here",
            "options": ["option 1", "option 2", "option 3", "option 4"],
            "answer": "the correct option, copied exactly from options",
            "explanation": "why this answer is correct"
        }
    ]
}

Every question must have the fields question (string), options (list of strings), answer (string) and explanation (string).
Do not copy the example above. Write your own questions about the uploaded file's content."#;

fn difficulty_guidance(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => {
            "Keep the questions straightforward, testing basic understanding of the key concepts."
        }
        Difficulty::Medium => {
            "Make the questions moderately difficult, requiring application and analysis of the concepts."
        }
        Difficulty::Hard => {
            "Challenge the student's comprehension, critical thinking and problem-solving skills. \
Test the entire topic and every subtopic down to the fine details; there is no limit on the number \
of questions as long as everything is covered. Include questions that need higher-order thinking."
        }
    }
}

/// Builds the single user message for a generation request.
pub fn render(request: GenerationRequest) -> String {
    match request {
        GenerationRequest::Notes => NOTES_PROMPT.to_string(),
        GenerationRequest::Quiz(difficulty) => QUIZ_PROMPT_TEMPLATE
            .replace("{difficulty}", difficulty.as_str())
            .replace("{guidance}", difficulty_guidance(difficulty)),
    }
}
