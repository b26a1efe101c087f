use std::sync::{Arc, Barrier};
use std::thread;

use super::common::*;

use crate::workflows::evaluation::{
    CatalogError, Criterion, CriterionCatalog, Direction, DirectionId, EvaluationPolicy,
    EvaluationService, EvaluationServiceError, EvaluationStatus, RecordError, RepositoryError,
    ScoreSheet, ScoringError, ValidationIssue, Verdict,
};
use crate::workflows::staff::{Actor, StaffId, StaffRole};

#[test]
fn final_submission_is_scored_and_stored() {
    let (service, repository) = build_service();
    let mut submission =
        sales_submission(vec![Verdict::Correct, Verdict::Incorrect, Verdict::Correct]);
    submission.sheet = submission
        .sheet
        .with_comment(1, " skipped the budget question ");

    let record = service.submit(submission).expect("submission succeeds");

    assert_eq!(record.total_score, 80.0);
    assert_eq!(record.status, EvaluationStatus::Final);
    assert_eq!(record.phone_number, "+77015551234");
    assert_eq!(record.direction_name, "Sales");
    assert_eq!(
        record.combined_comment,
        "Needs discovery: skipped the budget question"
    );
    assert_eq!(record.scores.len(), 3);
    assert_eq!(record.criteria, sales_direction().criteria);
    assert_eq!(repository.len(), 1);
    assert_eq!(service.get(&record.id).expect("stored"), record);
}

#[test]
fn final_submission_must_pass_validation() {
    let (service, repository) = build_service();
    let err = service
        .submit(sales_submission(vec![Verdict::Incorrect]))
        .expect_err("comment missing");

    match err {
        EvaluationServiceError::Validation(report) => {
            assert!(matches!(
                report.reasons.as_slice(),
                [ValidationIssue::MissingComment { criterion, .. }] if criterion == "Greeting"
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repository.len(), 0);
}

#[test]
fn drafts_skip_validation_but_not_scoring() {
    let (service, _) = build_service();

    let mut draft = support_submission(vec![Verdict::Error]);
    draft.is_draft = true;
    draft.audio = None;
    let record = service.submit(draft).expect("draft stored while incomplete");
    assert!(record.is_draft());
    assert_eq!(record.total_score, 0.0);
    assert_eq!(record.critical_failure.as_deref(), Some("Rudeness"));

    let mut broken = sales_submission(vec![Verdict::Deficiency]);
    broken.is_draft = true;
    assert!(matches!(
        service.submit(broken),
        Err(EvaluationServiceError::Scoring(ScoringError::InvalidVerdict { .. }))
    ));
}

#[test]
fn recording_duration_is_checked_against_import() {
    let (service, _) = build_service();
    let mut submission = support_submission(vec![]);
    submission.expected_duration = Some(120.0);
    submission.audio = Some(recording(Some(100.0)));

    assert!(matches!(
        service.submit(submission.clone()),
        Err(EvaluationServiceError::Validation(report))
            if matches!(report.reasons.as_slice(), [ValidationIssue::DurationMismatch { .. }])
    ));

    submission.audio = Some(recording(Some(112.0)));
    service.submit(submission).expect("within tolerance");
}

#[test]
fn metadata_problems_are_reported() {
    let (service, _) = build_service();

    let mut submission = sales_submission(vec![]);
    submission.phone_number = "12-3".to_string();
    assert!(matches!(
        service.submit(submission),
        Err(EvaluationServiceError::Record(RecordError::InvalidPhoneNumber(_)))
    ));

    let mut submission = sales_submission(vec![]);
    submission.assigned_month = "March".to_string();
    assert!(matches!(
        service.submit(submission),
        Err(EvaluationServiceError::Record(RecordError::InvalidMonth(_)))
    ));

    let mut submission = sales_submission(vec![]);
    submission.direction_id = DirectionId(99);
    assert!(matches!(
        service.submit(submission),
        Err(EvaluationServiceError::UnknownDirection(DirectionId(99)))
    ));
}

#[test]
fn monthly_limit_counts_final_evaluations_only() {
    let (service, _) = build_service_with(EvaluationPolicy {
        monthly_limit: 2,
        ..EvaluationPolicy::default()
    });

    let mut draft = sales_submission(vec![]);
    draft.is_draft = true;
    service.submit(draft.clone()).expect("draft");
    service.submit(sales_submission(vec![])).expect("first");
    service.submit(sales_submission(vec![])).expect("second");
    service.submit(draft).expect("drafts are never capped");

    let err = service
        .submit(sales_submission(vec![]))
        .expect_err("limit reached");
    assert!(matches!(
        err,
        EvaluationServiceError::MonthlyLimitReached { limit: 2, ref month, .. } if month == "2025-03"
    ));

    let mut next_month = sales_submission(vec![]);
    next_month.assigned_month = "2025-04".to_string();
    service.submit(next_month).expect("new month starts fresh");
}

#[test]
fn correction_supersedes_previous_version() {
    let (service, _) = build_service();
    let original = service
        .submit(sales_submission(vec![]))
        .expect("original stored");

    let mut revised = sales_submission(vec![Verdict::Correct, Verdict::Deficiency]);
    revised.is_draft = true;
    revised.operator_id = StaffId(999);
    let corrected = service
        .correct(&original.id, revised)
        .expect("correction stored");

    assert_eq!(corrected.status, EvaluationStatus::Final);
    assert_eq!(corrected.operator_id, original.operator_id);
    assert_eq!(corrected.total_score, 80.0);
    assert_eq!(corrected.previous_version_id.as_ref(), Some(&original.id));

    let previous = service.get(&original.id).expect("previous kept");
    assert_eq!(previous.status, EvaluationStatus::Superseded);
    assert_eq!(previous.superseded_by.as_ref(), Some(&corrected.id));
    assert!(!previous.is_current());

    let history = service.history(&corrected.id).expect("lineage");
    let ids: Vec<_> = history.iter().map(|record| record.id.clone()).collect();
    assert_eq!(ids, vec![original.id.clone(), corrected.id.clone()]);

    assert!(matches!(
        service.correct(&original.id, sales_submission(vec![])),
        Err(EvaluationServiceError::NotCurrent(_))
    ));
}

#[test]
fn correction_keeps_stored_recording() {
    let (service, _) = build_service();
    let mut original = support_submission(vec![]);
    original.expected_duration = Some(120.0);
    let original = service.submit(original).expect("original stored");

    let mut revised = support_submission(vec![Verdict::Correct, Verdict::Incorrect]);
    revised.audio = None;
    revised.sheet = revised.sheet.with_comment(1, "issue left open");
    let corrected = service
        .correct(&original.id, revised)
        .expect("recording inherited");

    assert_eq!(corrected.audio, original.audio);
    assert_eq!(corrected.expected_duration, Some(120.0));
    assert_eq!(corrected.total_score, 40.0);
}

#[test]
fn drafts_cannot_be_corrected() {
    let (service, _) = build_service();
    let mut draft = sales_submission(vec![]);
    draft.is_draft = true;
    let draft = service.submit(draft).expect("draft stored");

    assert!(matches!(
        service.correct(&draft.id, sales_submission(vec![])),
        Err(EvaluationServiceError::NotCurrent(_))
    ));
}

#[test]
fn corrections_do_not_count_twice() {
    let (service, _) = build_service();
    let first = service.submit(sales_submission(vec![])).expect("first");
    service
        .correct(
            &first.id,
            sales_submission(vec![Verdict::Correct, Verdict::Correct, Verdict::NotApplicable]),
        )
        .expect("corrected");
    let mut second = sales_submission(vec![Verdict::Incorrect]);
    second.sheet = second.sheet.with_comment(0, "no greeting");
    service.submit(second).expect("second");

    let mut draft = sales_submission(vec![Verdict::Incorrect]);
    draft.is_draft = true;
    service.submit(draft).expect("draft");

    let summary = service
        .monthly_summary(OPERATOR, "2025-03")
        .expect("summary");
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.average_score, Some(75.0));
    assert_eq!(summary.remaining(), 18);

    let empty = service
        .monthly_summary(StaffId(12345), "2025-03")
        .expect("summary");
    assert_eq!(empty.evaluated, 0);
    assert!(empty.average_score.is_none());
}

#[test]
fn drafts_are_deleted_only_by_their_evaluator() {
    let (service, repository) = build_service();
    let mut draft = sales_submission(vec![]);
    draft.is_draft = true;
    let draft = service.submit(draft).expect("draft stored");
    let finalized = service.submit(sales_submission(vec![])).expect("final");

    assert!(matches!(
        service.delete_draft(&draft.id, StaffId(12)),
        Err(EvaluationServiceError::NotOwner(_))
    ));
    assert!(matches!(
        service.delete_draft(&finalized.id, EVALUATOR),
        Err(EvaluationServiceError::NotDraft(_))
    ));

    service
        .delete_draft(&draft.id, EVALUATOR)
        .expect("owner deletes draft");
    assert_eq!(repository.len(), 1);
    assert!(matches!(
        service.get(&draft.id),
        Err(EvaluationServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn reevaluation_requests_follow_roles() {
    let (service, _) = build_service();
    let record = service.submit(sales_submission(vec![])).expect("final");
    let operator = Actor::new(OPERATOR, StaffRole::Operator);

    assert!(matches!(
        service.request_reevaluation(&record.id, operator, "please recheck"),
        Err(EvaluationServiceError::Forbidden(StaffRole::Operator))
    ));

    let requested = service
        .request_reevaluation(&record.id, supervisor(), "  caller was transferred  ")
        .expect("supervisor request");
    let request = requested.supervisor_request.as_ref().expect("request stored");
    assert_eq!(request.comment, "caller was transferred");
    assert!(request.is_pending());
    assert!(requested.status_view().reevaluation_requested);

    assert!(matches!(
        service.request_reevaluation(&record.id, supervisor(), "again"),
        Err(EvaluationServiceError::RequestPending(_))
    ));
    assert!(matches!(
        service.approve_reevaluation(&record.id, supervisor()),
        Err(EvaluationServiceError::Forbidden(StaffRole::Supervisor))
    ));

    let approved = service
        .approve_reevaluation(&record.id, admin())
        .expect("admin approves");
    let request = approved.supervisor_request.expect("request kept");
    assert_eq!(request.approved_by, Some(admin().user_id));
    assert!(request.approved_at.is_some());

    assert!(matches!(
        service.approve_reevaluation(&record.id, admin()),
        Err(EvaluationServiceError::NoPendingRequest(_))
    ));
}

#[test]
fn reevaluation_requires_a_final_record() {
    let (service, _) = build_service();
    let mut draft = sales_submission(vec![]);
    draft.is_draft = true;
    let draft = service.submit(draft).expect("draft");

    assert!(matches!(
        service.request_reevaluation(&draft.id, supervisor(), "check"),
        Err(EvaluationServiceError::NotCurrent(_))
    ));
}

#[test]
fn catalog_save_requires_balanced_weights() {
    let (service, _) = build_service();
    let mut lopsided = sales_direction();
    lopsided.criteria[2] = Criterion::weighted("Closing", 10.0);

    let err = service
        .save_catalog(CriterionCatalog::new(vec![lopsided]))
        .expect_err("total is 90");
    assert!(matches!(
        err,
        EvaluationServiceError::Catalog(CatalogError::WeightTotal { total, .. }) if total == 90.0
    ));
    assert_eq!(service.catalog(), catalog());

    let mut retention = Direction::new(DirectionId(3), "Retention", false);
    retention
        .add_criterion(Criterion::weighted("Offer", 100.0))
        .expect("fits");
    let mut directions = catalog().directions().to_vec();
    directions.push(retention);
    let updated = CriterionCatalog::new(directions);
    service.save_catalog(updated.clone()).expect("balanced");
    assert_eq!(service.catalog(), updated);

    let preview = service
        .score_preview(DirectionId(3), &ScoreSheet::default(), &Default::default())
        .expect("new direction scores");
    assert_eq!(preview.total_score, 100.0);
    assert!(preview.valid);
}

#[test]
fn service_refuses_invalid_initial_catalog() {
    let mut broken = sales_direction();
    broken.criteria.pop();
    let result = EvaluationService::new(
        Arc::new(MemoryRepository::default()),
        CriterionCatalog::new(vec![broken]),
        EvaluationPolicy::default(),
    );
    assert!(matches!(
        result,
        Err(EvaluationServiceError::Catalog(CatalogError::WeightTotal { .. }))
    ));
}

#[test]
fn repository_failures_surface() {
    let service = service_over(UnavailableRepository);
    assert!(matches!(
        service.submit(sales_submission(vec![])),
        Err(EvaluationServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[test]
fn concurrent_corrections_leave_one_current_version() {
    let records = MemoryRepository::default();
    let service = service_over(GatedRepository::new(records.clone(), 2));
    let original = service
        .submit(sales_submission(vec![]))
        .expect("original stored");

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = [
            sales_submission(vec![Verdict::Correct, Verdict::Deficiency]),
            sales_submission(vec![]),
        ]
        .into_iter()
        .map(|revised| {
            let service = &service;
            let id = &original.id;
            scope.spawn(move || service.correct(id, revised))
        })
        .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("correction thread finished"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(EvaluationServiceError::NotCurrent(_)))));

    let finals = records.finals();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].previous_version_id.as_ref(), Some(&original.id));
    assert_eq!(records.len(), 2);

    let previous = service.get(&original.id).expect("previous kept");
    assert_eq!(previous.superseded_by.as_ref(), Some(&finals[0].id));
}

#[test]
fn failed_correction_write_keeps_lineage_intact() {
    let records = MemoryRepository::default();
    let service = service_over(FlakySupersedeRepository {
        inner: records.clone(),
    });
    let original = service
        .submit(sales_submission(vec![]))
        .expect("original stored");

    assert!(matches!(
        service.correct(&original.id, sales_submission(vec![])),
        Err(EvaluationServiceError::Repository(RepositoryError::Unavailable(_)))
    ));

    let finals = records.finals();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].id, original.id);
    assert!(finals[0].superseded_by.is_none());
    assert_eq!(records.len(), 1);
    assert_eq!(service.history(&original.id).expect("lineage").len(), 1);
}

#[test]
fn concurrent_final_submissions_respect_monthly_limit() {
    let (service, repository) = build_service_with(EvaluationPolicy {
        monthly_limit: 1,
        ..EvaluationPolicy::default()
    });
    let start = Barrier::new(2);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    start.wait();
                    service.submit(sales_submission(vec![]))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("submission thread finished"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(EvaluationServiceError::MonthlyLimitReached { limit: 1, .. })
    )));
    assert_eq!(repository.finals().len(), 1);
}

#[test]
fn concurrent_reevaluation_requests_do_not_overwrite_each_other() {
    let records = MemoryRepository::default();
    let service = service_over(GatedRepository::new(records.clone(), 2));
    let record = service.submit(sales_submission(vec![])).expect("final");

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = [StaffId(7), StaffId(8)]
            .into_iter()
            .map(|supervisor_id| {
                let service = &service;
                let id = &record.id;
                scope.spawn(move || {
                    service.request_reevaluation(
                        id,
                        Actor::new(supervisor_id, StaffRole::Supervisor),
                        "operator disagrees",
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("request thread finished"))
            .collect()
    });

    let winners: Vec<_> = outcomes.iter().filter_map(|outcome| outcome.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(EvaluationServiceError::Modified(_)))));

    let stored = service.get(&record.id).expect("stored");
    assert_eq!(stored.supervisor_request, winners[0].supervisor_request);
}

#[test]
fn recording_of_unknown_length_blocks_when_duration_is_expected() {
    let (service, _) = build_service();
    let mut submission = support_submission(vec![]);
    submission.expected_duration = Some(120.0);

    for duration in [None, Some(f64::NAN)] {
        submission.audio = Some(recording(duration));
        assert!(matches!(
            service.submit(submission.clone()),
            Err(EvaluationServiceError::Validation(report))
                if report.reasons == vec![ValidationIssue::UnknownRecordingLength { expected: 120.0 }]
        ));
    }

    submission.is_draft = true;
    let draft = service
        .submit(submission.clone())
        .expect("drafts may wait for the length");
    assert_eq!(
        draft.audio.as_ref().and_then(|audio| audio.duration_seconds),
        None
    );

    submission.is_draft = false;
    submission.expected_duration = None;
    submission.audio = Some(recording(None));
    service
        .submit(submission)
        .expect("nothing to compare without an expectation");
}

#[test]
fn drafts_are_edited_by_their_evaluator_and_finalized_in_place() {
    let (service, repository) = build_service();
    let mut draft = sales_submission(vec![Verdict::Incorrect]);
    draft.is_draft = true;
    let draft = service.submit(draft).expect("draft stored");

    let mut edit = sales_submission(vec![Verdict::Correct, Verdict::Deficiency]);
    edit.is_draft = true;
    assert!(matches!(
        service.update_draft(&draft.id, StaffId(12), edit.clone()),
        Err(EvaluationServiceError::NotOwner(_))
    ));

    let saved = service
        .update_draft(&draft.id, EVALUATOR, edit.clone())
        .expect("draft saved");
    assert!(saved.is_draft());
    assert_eq!(saved.id, draft.id);
    assert_eq!(saved.total_score, 80.0);
    assert_eq!(saved.created_at, draft.created_at);

    edit.is_draft = false;
    let finalized = service
        .update_draft(&draft.id, EVALUATOR, edit)
        .expect("draft finalized");
    assert_eq!(finalized.status, EvaluationStatus::Final);
    assert_eq!(finalized.id, draft.id);
    assert_eq!(repository.len(), 1);

    let summary = service
        .monthly_summary(OPERATOR, "2025-03")
        .expect("summary");
    assert_eq!(summary.evaluated, 1);

    assert!(matches!(
        service.update_draft(&draft.id, EVALUATOR, sales_submission(vec![])),
        Err(EvaluationServiceError::NotDraft(_))
    ));
}

#[test]
fn finalizing_a_draft_is_validated_and_capped() {
    let (service, _) = build_service_with(EvaluationPolicy {
        monthly_limit: 1,
        ..EvaluationPolicy::default()
    });
    let mut draft = sales_submission(vec![]);
    draft.is_draft = true;
    let draft = service.submit(draft).expect("draft stored");

    assert!(matches!(
        service.update_draft(&draft.id, EVALUATOR, sales_submission(vec![Verdict::Incorrect])),
        Err(EvaluationServiceError::Validation(_))
    ));

    service
        .submit(sales_submission(vec![]))
        .expect("month's only final");
    assert!(matches!(
        service.update_draft(&draft.id, EVALUATOR, sales_submission(vec![])),
        Err(EvaluationServiceError::MonthlyLimitReached { limit: 1, .. })
    ));
    assert!(service.get(&draft.id).expect("draft kept").is_draft());
}

#[test]
fn operators_dispute_their_own_final_evaluations() {
    let (service, _) = build_service();
    let record = service.submit(sales_submission(vec![])).expect("final");
    let operator = Actor::new(OPERATOR, StaffRole::Operator);

    assert!(matches!(
        service.dispute(&record.id, supervisor(), "unfair"),
        Err(EvaluationServiceError::Forbidden(StaffRole::Supervisor))
    ));
    assert!(matches!(
        service.dispute(&record.id, Actor::new(StaffId(502), StaffRole::Operator), "unfair"),
        Err(EvaluationServiceError::NotOwner(_))
    ));
    assert!(matches!(
        service.dispute(&record.id, operator, "   "),
        Err(EvaluationServiceError::EmptyDispute)
    ));

    let disputed = service
        .dispute(&record.id, operator, " the caller asked for a callback ")
        .expect("dispute stored");
    let dispute = disputed.dispute.as_ref().expect("dispute kept");
    assert_eq!(dispute.message, "the caller asked for a callback");
    assert_eq!(dispute.operator_id, OPERATOR);
    assert!(disputed.status_view().disputed);

    assert!(matches!(
        service.dispute(&record.id, operator, "again"),
        Err(EvaluationServiceError::AlreadyDisputed(_))
    ));

    let mut draft = sales_submission(vec![]);
    draft.is_draft = true;
    let draft = service.submit(draft).expect("draft");
    assert!(matches!(
        service.dispute(&draft.id, operator, "not finished"),
        Err(EvaluationServiceError::NotCurrent(_))
    ));
}
