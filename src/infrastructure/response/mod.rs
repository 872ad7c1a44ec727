use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

// Agent-style transcripts end with "Final Answer: ..."
static FINAL_ANSWER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)final answer\s*:").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Reduce a raw model reply to the answer text shown to the user
pub fn clean_answer(response: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    if let Some(marker) = FINAL_ANSWER_PATTERN.find_iter(&cleaned).last() {
        cleaned = cleaned[marker.end()..].to_string();
    }

    cleaned = cleaned.trim().to_string();

    MULTIPLE_NEWLINES_PATTERN
        .replace_all(&cleaned, "\n\n")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_think_tags() {
        let input = "<think>Count the rows first</think>There are 3 rows.";
        assert_eq!(clean_answer(input), "There are 3 rows.");
    }

    #[test]
    fn test_clean_self_closing_think() {
        assert_eq!(clean_answer("<think />3"), "3");
    }

    #[test]
    fn test_clean_reasoning_tags() {
        let input = "<reasoning>len(df)</reasoning>3";
        assert_eq!(clean_answer(input), "3");
    }

    #[test]
    fn test_extracts_last_final_answer() {
        let input = "Thought: I should count rows.\nAction: python_repl_ast\nObservation: 3\nFinal Answer: The table has 3 rows.";
        assert_eq!(clean_answer(input), "The table has 3 rows.");

        let input = "final answer: draft\nFINAL ANSWER:  done ";
        assert_eq!(clean_answer(input), "done");
    }

    #[test]
    fn test_clean_multiple_newlines() {
        let input = "Line 1\n\n\n\n\nLine 2";
        assert_eq!(clean_answer(input), "Line 1\n\nLine 2");
    }

    #[test]
    fn test_clean_preserves_normal_text() {
        let input = "The average age is 27.5.";
        assert_eq!(clean_answer(input), "The average age is 27.5.");
    }
}
