//! Keyword classification of questions, used to pick an answer style

/// Kind of answer a question asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// Asks for a diagram or drawing
    Diagram,
    /// Asks to compare things
    Comparison,
    /// Asks for a definition
    Definition,
    /// Anything else
    Explanation,
}

impl QuestionKind {
    /// Classify by case-insensitive keyword; earlier kinds take precedence
    pub fn classify(question: &str) -> Self {
        let question = question.to_lowercase();

        if question.contains("diagram") || question.contains("draw") {
            QuestionKind::Diagram
        } else if question.contains("compare") {
            QuestionKind::Comparison
        } else if question.contains("define") {
            QuestionKind::Definition
        } else {
            QuestionKind::Explanation
        }
    }

    /// Style instruction added to the answer prompt
    pub fn answer_style(&self) -> &'static str {
        match self {
            QuestionKind::Diagram => {
                "Describe the diagram in words as the content presents it, naming its parts and how they connect"
            }
            QuestionKind::Comparison => {
                "Compare the items point by point, keeping each difference the content states on its own line"
            }
            QuestionKind::Definition => {
                "Open with a one-sentence definition taken from the content, then add supporting detail"
            }
            QuestionKind::Explanation => "Explain in clear paragraphs using the content",
        }
    }
}
