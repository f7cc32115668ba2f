use learnpath_core::{
    AppViewModel, DomainResult, FailureKind, OperationRow, OperationState, ToolResult,
};

/// Lines describing every operation slot, in key order.
pub(crate) fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    for row in &view.operations {
        lines.extend(render_row(row));
    }
    if view.cached_audio > 0 {
        lines.push(format!("cached audio clips: {}", view.cached_audio));
    }
    lines
}

fn render_row(row: &OperationRow) -> Vec<String> {
    let label = row.key.to_string();
    match &row.state {
        OperationState::Idle => vec![format!("[{label}] idle")],
        OperationState::Loading { message } => vec![format!("[{label}] {message}")],
        OperationState::Error(failure) => vec![format!(
            "[{label}] failed ({}): {}",
            failure_label(failure.kind),
            failure.message
        )],
        OperationState::Success(result) => {
            let mut lines = vec![format!("[{label}] {}", summary(result))];
            lines.extend(details(result).into_iter().map(|line| format!("    {line}")));
            lines
        }
    }
}

fn summary(result: &DomainResult) -> String {
    match result {
        DomainResult::StudyPath(path) => format!(
            "study path {} on {:?} with {} modules",
            path.id,
            path.topic,
            path.modules.len()
        ),
        DomainResult::Quiz(quiz) => format!(
            "quiz {:?} with {} questions",
            quiz.quiz.title,
            quiz.questions.len()
        ),
        DomainResult::Audio(audio) => format!("audio ready: {}", audio.audio_url),
    }
}

fn details(result: &DomainResult) -> Vec<String> {
    match result {
        DomainResult::StudyPath(path) => path
            .modules
            .iter()
            .enumerate()
            .map(|(index, module)| {
                if module.subtopics.is_empty() {
                    format!("{}. {}", index + 1, module.title)
                } else {
                    format!(
                        "{}. {} ({})",
                        index + 1,
                        module.title,
                        module.subtopics.join(", ")
                    )
                }
            })
            .collect(),
        DomainResult::Quiz(quiz) => quiz
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                format!(
                    "{}. {} [{}]",
                    index + 1,
                    question.question,
                    question.options.join(" / ")
                )
            })
            .collect(),
        DomainResult::Audio(_) => Vec::new(),
    }
}

fn failure_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Submission => "submission",
        FailureKind::BackendFailure => "backend",
        FailureKind::Timeout => "timeout",
        FailureKind::MalformedResult => "unexpected response",
        FailureKind::Network => "network",
    }
}

/// Renders an agent tool result given as JSON text.
pub(crate) fn tool_result(json: &str) -> serde_json::Result<String> {
    let value = serde_json::from_str(json)?;
    Ok(ToolResult::from_json(value).describe())
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::{
        GeneratedQuiz, OpFailure, OpKey, QuizInfo, QuizQuestion, StudyModule, StudyPathRecord,
        TtsAudio, UserId,
    };
    use pretty_assertions::assert_eq;

    fn row(key: OpKey, state: OperationState) -> OperationRow {
        OperationRow {
            key,
            in_flight: matches!(state, OperationState::Loading { .. }),
            state,
        }
    }

    #[test]
    fn renders_loading_error_and_audio_rows() {
        let view = AppViewModel {
            operations: vec![
                row(
                    OpKey::StudyPath,
                    OperationState::Loading {
                        message: "Generating study path with AI…".into(),
                    },
                ),
                row(
                    OpKey::Quiz {
                        module_id: "4".into(),
                    },
                    OperationState::Error(OpFailure::new(
                        FailureKind::Timeout,
                        "Still processing, try again later.",
                    )),
                ),
                row(
                    OpKey::Tts { module_id: None },
                    OperationState::Success(DomainResult::Audio(TtsAudio {
                        job_id: "j".into(),
                        audio_url: "https://cdn/a.mp3".into(),
                    })),
                ),
            ],
            cached_audio: 1,
            dirty: true,
        };

        assert_eq!(
            render(&view),
            vec![
                "[study path] Generating study path with AI…",
                "[quiz for module 4] failed (timeout): Still processing, try again later.",
                "[audio] audio ready: https://cdn/a.mp3",
                "cached audio clips: 1",
            ]
        );
    }

    #[test]
    fn study_path_lists_modules() {
        let record = StudyPathRecord {
            id: "sp-1".into(),
            topic: "Rust".into(),
            user_id: UserId(1),
            created_at: "2026-01-01T00:00:00Z".into(),
            modules: vec![
                StudyModule {
                    id: "1".into(),
                    title: "Ownership".into(),
                    description: String::new(),
                    subtopics: vec!["moves".into(), "borrows".into()],
                    image_url: None,
                },
                StudyModule {
                    id: "2".into(),
                    title: "Traits".into(),
                    description: String::new(),
                    subtopics: Vec::new(),
                    image_url: None,
                },
            ],
        };
        let lines = render_row(&row(
            OpKey::StudyPath,
            OperationState::Success(DomainResult::StudyPath(record)),
        ));

        assert_eq!(
            lines,
            vec![
                "[study path] study path sp-1 on \"Rust\" with 2 modules",
                "    1. Ownership (moves, borrows)",
                "    2. Traits",
            ]
        );
    }

    #[test]
    fn quiz_lists_questions_with_options() {
        let quiz = GeneratedQuiz {
            quiz: QuizInfo {
                id: "q".into(),
                module_id: "2".into(),
                title: "Traits".into(),
            },
            questions: vec![QuizQuestion {
                id: "1".into(),
                question: "What is a trait?".into(),
                options: vec!["An interface".into(), "A struct".into()],
                correct_answer: Some(0),
                explanation: None,
            }],
        };
        let lines = render_row(&row(
            OpKey::Quiz {
                module_id: "2".into(),
            },
            OperationState::Success(DomainResult::Quiz(quiz)),
        ));

        assert_eq!(
            lines[1],
            "    1. What is a trait? [An interface / A struct]"
        );
    }

    #[test]
    fn tool_result_rejects_invalid_json() {
        assert!(tool_result("{").is_err());
        assert_eq!(tool_result("\"done\"").unwrap(), "done");
    }
}
