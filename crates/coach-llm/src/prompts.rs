//! Prompt construction and reply parsing.

use coach_session::{ClarificationRequest, CollaboratorError, FollowupRequest};

pub const SCORE_SYSTEM: &str = "You are a strict but fair data science interviewer.";
pub const FEEDBACK_SYSTEM: &str =
    "You are a supportive interview coach. Be conversational, brief, and encouraging.";
pub const FOLLOWUP_SYSTEM: &str =
    "You are an expert technical interviewer. Generate natural, probing follow-up questions.";
pub const CLARIFY_SYSTEM: &str =
    "You are a supportive data science tutor who gives clear explanations with examples.";

pub fn score_prompt(question: &str, answer: &str) -> String {
    format!(
        r#"Rate this data science interview answer strictly on a 1-5 scale:

1 = Very poor (major gaps, oversimplified, or wrong)
2 = Poor (shows some awareness but significant issues)
3 = Average (covers basics but lacks depth/examples)
4 = Good (solid understanding with minor gaps)
5 = Excellent (comprehensive, accurate, well-explained)

Be harsh but fair: most real interview answers are 2-3/5.

QUESTION: {question}
ANSWER: {answer}

Consider: does this answer demonstrate job-ready knowledge?

Respond with just the number (1-5)."#
    )
}

pub fn feedback_prompt(question: &str, answer: &str, iteration: u32) -> String {
    format!(
        r#"You are a friendly data science interview coach giving conversational feedback.

QUESTION: {question}
STUDENT ANSWER: {answer}
ATTEMPT: {iteration}

Give brief, encouraging feedback directly to the student (use "you"):

1. POSITIVE: something they got right
2. KEY GAP: the most important thing they missed (don't explain it fully)
3. NEXT STEP: one specific suggestion to improve their answer

Keep it conversational and concise (max 4-5 sentences). Don't give away the full answer."#
    )
}

pub fn followup_prompt(request: &FollowupRequest) -> String {
    let pattern_context = if request.patterns.is_empty() {
        "No specific patterns found.".to_string()
    } else {
        let lines: Vec<String> = request
            .patterns
            .iter()
            .map(|p| format!("- {} (Category: {})", p.text, p.category))
            .collect();
        format!(
            "Similar follow-up questions from interview database:\n{}",
            lines.join("\n")
        )
    };

    let concept_context = if request.key_points.is_empty() {
        String::new()
    } else {
        format!("Key concept areas: {}", request.key_points.join(", "))
    };

    let red_flags = if request.red_flags.is_empty() {
        String::new()
    } else {
        format!("Common mistakes to probe: {}", request.red_flags.join(", "))
    };

    format!(
        r#"You are conducting a technical interview. Based on the candidate's answer, generate ONE natural follow-up question.

ORIGINAL QUESTION: {question}
CANDIDATE'S ANSWER: {answer}
ANSWER QUALITY: {score}/5
FEEDBACK GIVEN: {feedback}
FOLLOWUP TYPE NEEDED: {category}

{pattern_context}

{concept_context}
{red_flags}

Generate a single, specific follow-up question that:
1. Builds naturally on their answer
2. Tests deeper understanding ({category})
3. Feels like a real interview conversation
4. Is different from the original question

Return only the question, no extra text."#,
        question = request.question,
        answer = request.answer,
        score = request.quality_score,
        feedback = request.feedback,
        category = request.category,
    )
}

pub fn clarify_prompt(request: &ClarificationRequest) -> String {
    format!(
        r#"You are a patient data science tutor helping a student understand concepts.

ORIGINAL INTERVIEW QUESTION: {question}
THEIR RECENT ANSWER: {answer}
STUDENT'S QUESTION: {student_question}

RELEVANT KNOWLEDGE:
{context}

Give a clear explanation that directly answers their question, uses a concrete
example, and references their previous answer. Keep it concise and
interview-focused."#,
        question = request.question,
        answer = request.answer,
        student_question = request.student_question,
        context = request.context,
    )
}

/// First integer in the reply, rejected outside 1..=5.
pub fn parse_score(reply: &str) -> Result<u8, CollaboratorError> {
    let digits: String = reply
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return Err(CollaboratorError::Parse(format!(
            "no score in reply: {:?}",
            reply.trim()
        )));
    }

    let value: i64 = digits
        .parse()
        .map_err(|_| CollaboratorError::OutOfRange(i64::MAX))?;
    if (1..=5).contains(&value) {
        Ok(value as u8)
    } else {
        Err(CollaboratorError::OutOfRange(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_retrieval::FollowupPattern;
    use coach_types::FollowupCategory;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("4").unwrap(), 4);
        assert_eq!(parse_score(" Score: 3/5\n").unwrap(), 3);
        assert!(matches!(parse_score("7"), Err(CollaboratorError::OutOfRange(7))));
        assert!(matches!(parse_score("0"), Err(CollaboratorError::OutOfRange(0))));
        assert!(matches!(parse_score("great"), Err(CollaboratorError::Parse(_))));
    }

    #[test]
    fn test_followup_prompt_includes_grounding() {
        let request = FollowupRequest {
            question: "What is a p-value?".to_string(),
            answer: "The chance H0 is true".to_string(),
            quality_score: 2,
            feedback: "Unclear".to_string(),
            category: FollowupCategory::Clarification,
            concept_id: "p_value".to_string(),
            key_points: vec!["Affected by sample size".to_string()],
            red_flags: vec!["Defining as probability null is true".to_string()],
            patterns: vec![FollowupPattern {
                concept_id: "p_value".to_string(),
                category: "clarification".to_string(),
                text: "What does p = 0.03 mean?".to_string(),
            }],
        };
        let prompt = followup_prompt(&request);
        assert!(prompt.contains("FOLLOWUP TYPE NEEDED: clarification"));
        assert!(prompt.contains("- What does p = 0.03 mean? (Category: clarification)"));
        assert!(prompt.contains("Key concept areas: Affected by sample size"));
        assert!(prompt.contains("ANSWER QUALITY: 2/5"));

        let bare = FollowupRequest {
            patterns: vec![],
            key_points: vec![],
            red_flags: vec![],
            ..request
        };
        assert!(followup_prompt(&bare).contains("No specific patterns found."));
    }
}
