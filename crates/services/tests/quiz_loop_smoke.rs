use std::collections::HashSet;
use std::sync::Arc;

use quiz_core::model::{AnswerSet, ModeTag, Question, QuestionBank, QuestionId, VariantTag};
use quiz_core::time::fixed_now;
use services::{Advance, Clock, EndReason, QuizCatalog, QuizLoopService, SessionError, TickOutcome};
use storage::InMemoryRepository;

const CATEGORIES: [&str; 8] = [
    "Scrum Framework",
    "Artefatti Scrum",
    "Ruoli Scrum",
    "Eventi Scrum",
    "Valori Scrum",
    "Scaling Scrum",
    "Adattamento Organizzativo",
    "Ispezione e Adattamento",
];

fn build_bank(tag: &str, count: u64) -> QuestionBank {
    let questions = (1..=count).map(|id| {
        let category = CATEGORIES[(id as usize) % CATEGORIES.len()];
        Question::new(
            QuestionId::from(id),
            format!("Question {id}"),
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            AnswerSet::single((id % 4) as usize),
            Some(category.to_owned()),
        )
        .unwrap()
    });
    QuestionBank::new(VariantTag::from(tag), questions)
}

fn loop_service(repo: &InMemoryRepository) -> QuizLoopService {
    QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(QuizCatalog::builtin().unwrap()),
    )
}

#[tokio::test]
async fn exam_session_runs_to_a_passing_report() {
    let repo = InMemoryRepository::new();
    repo.insert_bank(build_bank("psm1", 200)).unwrap();
    let svc = loop_service(&repo);

    let mut session = svc
        .start_session(&VariantTag::from("psm1"), ModeTag::TimedBalanced)
        .await
        .unwrap();
    assert_eq!(session.total(), 80);
    let ids: HashSet<_> = session.questions().iter().map(|q| q.id().clone()).collect();
    assert_eq!(ids.len(), 80);

    loop {
        let correct = session
            .current_question()
            .and_then(|q| q.answer().iter().next())
            .unwrap();
        session.toggle_current(correct).unwrap();
        assert_eq!(session.tick(), TickOutcome::Counted);
        if session.advance().unwrap() == Advance::Finished {
            break;
        }
    }

    let report = session.report().unwrap();
    assert_eq!(report.final_score, 80);
    assert_eq!(report.pass_threshold, 68);
    assert!(report.passed);
    assert!(report.mistakes.is_empty());
    assert_eq!(report.elapsed_secs, 80);
    assert_eq!(report.end_reason, EndReason::Completed);
}

#[tokio::test]
async fn practice_session_uses_the_whole_bank_and_restarts() {
    let repo = InMemoryRepository::new();
    repo.insert_bank(build_bank("glossario", 25)).unwrap();
    let svc = loop_service(&repo);

    let mut session = svc
        .start_session(&VariantTag::from("glossario"), ModeTag::UntimedFull)
        .await
        .unwrap();
    assert_eq!(session.total(), 25);
    assert_eq!(session.time_ceiling(), None);

    session.toggle_current(0).unwrap();
    session.finish().unwrap();
    let report = session.report().unwrap();
    assert_eq!(report.pass_threshold, 23);
    assert!(!report.passed);

    svc.restart(&mut session).await.unwrap();
    assert!(session.is_running());
    assert_eq!(session.total(), 25);
    assert!(session.answers().is_empty());
}

#[tokio::test]
async fn missing_bank_surfaces_storage_error() {
    let repo = InMemoryRepository::new();
    let svc = loop_service(&repo);

    let err = svc
        .start_session(&VariantTag::from("psm1"), ModeTag::TimedBalanced)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Storage(_)));

    let err = svc
        .start_session(&VariantTag::from("unknown"), ModeTag::TimedBalanced)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Catalog(_)));
}

#[tokio::test]
async fn timer_expiry_ends_the_exam_mid_way() {
    let repo = InMemoryRepository::new();
    repo.insert_bank(build_bank("psm1", 100)).unwrap();
    let svc = loop_service(&repo);

    let mut session = svc
        .start_session(&VariantTag::from("psm1"), ModeTag::TimedBalanced)
        .await
        .unwrap();
    session.toggle_current(0).unwrap();
    session.advance().unwrap();

    let mut outcome = TickOutcome::Counted;
    while outcome == TickOutcome::Counted {
        outcome = session.tick();
    }
    assert_eq!(outcome, TickOutcome::Expired);
    assert_eq!(session.elapsed_secs(), 3600);
    assert_eq!(session.current_index(), 1);

    let report = session.report().unwrap();
    assert_eq!(report.end_reason, EndReason::TimeExpired);
    assert_eq!(report.total, 80);
    assert!(report.mistakes.len() >= 79);
}
