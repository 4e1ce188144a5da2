//! Structured outputs of the interview models

use crate::conversation::Question;
use crate::llm::ResponseFormat;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const QUESTIONS_SCHEMA: &str = "QuestionsSchema";
pub const EVALUATION_SCHEMA: &str = "EvaluationSchema";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionsSchema {
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Good,
    Average,
    Bad,
}

/// Rating and feedback for one answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    pub question: String,
    pub answer: String,
    pub rating: Rating,
    /// What went wrong and how to improve it
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub confidence: String,
    pub answering_patterns: String,
    pub clarity_within_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub verdict: String,
    /// Prioritized reasons; empty for a positive verdict
    #[serde(default)]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSchema {
    pub evaluations: Vec<AnswerEvaluation>,
    pub performance: Performance,
    pub verdict: Verdict,
}

pub fn questions_format() -> ResponseFormat {
    ResponseFormat::json_schema(
        QUESTIONS_SCHEMA,
        json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "description": "Interview questions for the candidate",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question": {"type": "string", "description": "Text of the question"},
                            "type": {"type": "string", "enum": ["practical", "theory"]},
                            "companies": {
                                "type": "array",
                                "items": {"type": "string"},
                                "description": "Companies that usually ask this question"
                            }
                        },
                        "required": ["question", "type", "companies"]
                    }
                }
            },
            "required": ["questions"]
        }),
    )
}

pub fn evaluation_format() -> ResponseFormat {
    ResponseFormat::json_schema(
        EVALUATION_SCHEMA,
        json!({
            "type": "object",
            "properties": {
                "evaluations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question": {"type": "string"},
                            "answer": {"type": "string"},
                            "rating": {"type": "string", "enum": ["Good", "Average", "Bad"]},
                            "feedback": {"type": "string", "description": "What went wrong and how to improve it"}
                        },
                        "required": ["question", "answer", "rating", "feedback"]
                    }
                },
                "performance": {
                    "type": "object",
                    "properties": {
                        "confidence": {"type": "string"},
                        "answering_patterns": {"type": "string"},
                        "clarity_within_time": {"type": "string"}
                    },
                    "required": ["confidence", "answering_patterns", "clarity_within_time"]
                },
                "verdict": {
                    "type": "object",
                    "properties": {
                        "verdict": {"type": "string"},
                        "reasons": {"type": "array", "items": {"type": "string"}}
                    },
                    "required": ["verdict", "reasons"]
                }
            },
            "required": ["evaluations", "performance", "verdict"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_parses_model_output() {
        let evaluation: EvaluationSchema = serde_json::from_value(json!({
            "evaluations": [{
                "question": "Q1",
                "answer": "A1",
                "rating": "Average",
                "feedback": "Mention ownership rules"
            }],
            "performance": {
                "confidence": "steady",
                "answering_patterns": "starts with examples",
                "clarity_within_time": "mostly"
            },
            "verdict": {"verdict": "Capable", "reasons": []}
        }))
        .unwrap();
        assert_eq!(evaluation.evaluations[0].rating, Rating::Average);
    }

    #[test]
    fn test_schema_names() {
        assert_eq!(questions_format().name, QUESTIONS_SCHEMA);
        assert_eq!(evaluation_format().name, EVALUATION_SCHEMA);
    }
}
