use crate::infra::{
    default_catalog, InMemoryEvaluationRepository, InMemoryStaffRepository, InMemoryTaskRepository,
};
use call_qa::config::AppConfig;
use call_qa::error::AppError;
use call_qa::workflows::evaluation::{
    format_seconds, preview_rubric, AudioReference, DirectionId, EvaluationPolicy,
    EvaluationRecord, EvaluationService, EvaluationServiceError, EvaluationSubmission,
    RubricInput, ScoreSheet, Verdict,
};
use call_qa::workflows::salary::{calculate, BonusInputs, ExperienceBand, KpiInputs};
use call_qa::workflows::staff::{
    Actor, EmploymentStatus, NewStaff, StaffId, StaffRole, StaffService, StatusChange,
};
use call_qa::workflows::tasks::{NewTask, TaskAction, TaskService, TaskTag};
use chrono::{Days, Local};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

const SALES: DirectionId = DirectionId(1);
const SUPPORT: DirectionId = DirectionId(2);
const ADMIN: Actor = Actor::new(StaffId(1), StaffRole::Admin);
const SUPERVISOR: Actor = Actor::new(StaffId(7), StaffRole::Supervisor);

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding `criteria`, `verdicts`, `comments`, and optional audio state
    #[arg(long)]
    pub(crate) input: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct SalaryArgs {
    /// Months the operator has worked in the team
    #[arg(long)]
    pub(crate) experience_months: u32,
    /// Share of calls without quality remarks, 0-100
    #[arg(long)]
    pub(crate) quality_percent: f64,
    /// Average customer rating, 0-5
    #[arg(long)]
    pub(crate) average_score: f64,
    /// Average first response time in minutes
    #[arg(long)]
    pub(crate) response_minutes: f64,
    #[arg(long)]
    pub(crate) chats_per_hour: f64,
    /// Hours planned for the month
    #[arg(long)]
    pub(crate) hours_norm: f64,
    #[arg(long)]
    pub(crate) hours_worked: f64,
    /// Operator completed the monthly training
    #[arg(long)]
    pub(crate) training: bool,
    /// Number of referred hires
    #[arg(long)]
    pub(crate) referrals: Option<u32>,
    /// Number of filmed training sessions
    #[arg(long)]
    pub(crate) filming: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Month the demo evaluations count towards (YYYY-MM). Defaults to the current month.
    #[arg(long, value_parser = crate::infra::parse_month)]
    pub(crate) month: Option<String>,
    /// Operator being evaluated.
    #[arg(long, default_value_t = 501)]
    pub(crate) operator: u64,
    /// Skip the task hand-off portion of the demo.
    #[arg(long)]
    pub(crate) skip_tasks: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let raw = std::fs::read_to_string(&args.input)?;
    let input: RubricInput = serde_json::from_str(&raw)?;

    let preview = preview_rubric(input, &config.evaluation.duration_tolerance)
        .map_err(EvaluationServiceError::from)?;
    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}

pub(crate) fn run_salary(args: SalaryArgs) -> Result<(), AppError> {
    let kpi = KpiInputs {
        experience: ExperienceBand::from_months(args.experience_months),
        quality_percent: args.quality_percent,
        average_score: args.average_score,
        response_minutes: args.response_minutes,
        chats_per_hour: args.chats_per_hour,
        hours_norm: args.hours_norm,
        hours_worked: args.hours_worked,
    };
    let bonuses = BonusInputs {
        training: args.training,
        referrals: args.referrals,
        filming: args.filming,
    };

    let breakdown = calculate(&kpi, &bonuses)?;
    println!("Salary for experience band {}", kpi.experience.label());
    println!(
        "- KPI points {:.1} | hours {:.0}/{:.0} ({:.1}%) | coefficient {:.2}",
        breakdown.kpi_points,
        breakdown.hours_worked,
        breakdown.hours_norm,
        breakdown.hours_percentage,
        breakdown.premium_coefficient
    );
    println!(
        "- base {:.0} + premium {:.0} + bonuses {:.0} = {:.0}",
        breakdown.base_salary, breakdown.premium_part, breakdown.bonuses, breakdown.final_salary
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        month,
        operator,
        skip_tasks,
    } = args;
    let month = month.unwrap_or_else(|| Local::now().format("%Y-%m").to_string());
    let operator = StaffId(operator);
    let evaluator = SUPERVISOR.user_id;

    let service = EvaluationService::new(
        Arc::new(InMemoryEvaluationRepository::default()),
        default_catalog(),
        EvaluationPolicy::default(),
    )?;

    println!("Call quality demo for operator {operator}, month {month}");
    println!("\nDirections");
    for direction in service.catalog().directions() {
        println!(
            "- {} ({} criteria, weight {:.0}, recording {})",
            direction.name,
            direction.criteria.len(),
            direction.total_weight(),
            if direction.has_file_upload {
                "required"
            } else {
                "optional"
            }
        );
    }

    let submission = |direction_id: DirectionId, sheet: ScoreSheet| EvaluationSubmission {
        operator_id: operator,
        evaluator_id: evaluator,
        direction_id,
        phone_number: "+7 701 555 12 34".to_string(),
        appeal_date: None,
        assigned_month: month.clone(),
        is_draft: false,
        sheet,
        audio: None,
        expected_duration: None,
    };

    println!("\nSales call");
    let sheet = ScoreSheet::new(vec![
        Verdict::Correct,
        Verdict::Deficiency,
        Verdict::Incorrect,
        Verdict::Correct,
    ])
    .with_comment(2, "listed features without linking them to the request");
    let first = service.submit(submission(SALES, sheet))?;
    render_record(&first);

    let disputed = service.dispute(
        &first.id,
        Actor::new(operator, StaffRole::Operator),
        "the product was presented the way the script asks",
    )?;
    if let Some(dispute) = &disputed.dispute {
        println!("- operator disputes: {}", dispute.message);
    }

    let requested = service.request_reevaluation(
        &first.id,
        SUPERVISOR,
        "operator disputes the presentation remark",
    )?;
    if let Some(request) = &requested.supervisor_request {
        println!(
            "- re-evaluation requested by {}: {}",
            request.requested_by, request.comment
        );
    }
    service.approve_reevaluation(&first.id, ADMIN)?;
    println!("- request approved by admin {}", ADMIN.user_id);

    let sheet = ScoreSheet::new(vec![
        Verdict::Correct,
        Verdict::Correct,
        Verdict::Deficiency,
        Verdict::Correct,
    ]);
    let corrected = service.correct(&first.id, submission(SALES, sheet))?;
    render_record(&corrected);
    let history = service.history(&corrected.id)?;
    println!("- history holds {} versions", history.len());

    println!("\nDraft follow-up call");
    let mut draft = submission(SALES, ScoreSheet::new(vec![Verdict::Correct, Verdict::Incorrect]));
    draft.is_draft = true;
    let draft = service.submit(draft)?;
    render_record(&draft);
    let finished = ScoreSheet::new(vec![Verdict::Correct, Verdict::Incorrect])
        .with_comment(1, "did not ask about the delivery date");
    let finalized = service.update_draft(&draft.id, evaluator, submission(SALES, finished))?;
    render_record(&finalized);

    println!("\nSupport call");
    let sheet = ScoreSheet::all_correct(4);
    match service.submit(submission(SUPPORT, sheet.clone())) {
        Err(EvaluationServiceError::Validation(report)) => {
            for reason in &report.reasons {
                println!("- blocked: {reason}");
            }
        }
        Err(err) => return Err(err.into()),
        Ok(record) => render_record(&record),
    }

    let mut sheet = sheet.with_comment(0, "hung up on the customer mid-sentence");
    sheet.set(0, Verdict::Error);
    let mut with_audio = submission(SUPPORT, sheet);
    with_audio.expected_duration = Some(120.0);
    with_audio.audio = Some(AudioReference {
        storage_key: "recordings/demo-support.mp3".to_string(),
        duration_seconds: Some(118.0),
    });
    println!(
        "- recording {} against expected {}",
        format_seconds(Some(118.0)),
        format_seconds(Some(120.0))
    );
    let support = service.submit(with_audio)?;
    render_record(&support);

    let summary = service.monthly_summary(operator, &month)?;
    println!(
        "\nMonthly summary: {} of {} evaluations used, {} remaining, average {}",
        summary.evaluated,
        summary.limit,
        summary.remaining(),
        summary
            .average_score
            .map(|score| format!("{score:.1}"))
            .unwrap_or_else(|| "n/a".to_string())
    );

    run_staff_demo()?;
    if !skip_tasks {
        run_task_demo(operator)?;
    }

    let kpi = KpiInputs {
        experience: ExperienceBand::from_months(14),
        quality_percent: 96.0,
        average_score: 4.7,
        response_minutes: 2.0,
        chats_per_hour: 8.0,
        hours_norm: 160.0,
        hours_worked: 152.0,
    };
    let breakdown = calculate(&kpi, &BonusInputs::default())?;
    println!(
        "\nSalary preview: {:.1} KPI points, final {:.0}",
        breakdown.kpi_points, breakdown.final_salary
    );

    Ok(())
}

fn run_staff_demo() -> Result<(), AppError> {
    let service = StaffService::new(Arc::new(InMemoryStaffRepository::default()));
    let today = Local::now().date_naive();

    println!("\nTeam roster");
    let hire = service.create(
        SUPERVISOR,
        NewStaff {
            name: "New operator".to_string(),
            role: StaffRole::Operator,
            rate: 0.75,
            hire_date: Some(today),
            birth_date: None,
            direction_id: Some(SALES),
            supervisor_id: None,
        },
    )?;
    println!("- {} hired at rate {:.2}", hire.name, hire.rate);

    let leave_start = today + Days::new(7);
    let change = StatusChange::to(EmploymentStatus::AnnualLeave)
        .between(leave_start, leave_start.checked_add_days(Days::new(13)));
    let updated = service.change_status(SUPERVISOR, hire.id, change)?;
    println!(
        "- status {} ({} on {leave_start})",
        updated.status.label(),
        updated.status_on(leave_start).label()
    );
    println!(
        "- team of supervisor {} has {} operator(s)",
        SUPERVISOR.user_id,
        service.team(SUPERVISOR.user_id)?.len()
    );
    Ok(())
}

fn run_task_demo(operator: StaffId) -> Result<(), AppError> {
    let service = TaskService::new(Arc::new(InMemoryTaskRepository::default()));
    let assignee = Actor::new(operator, StaffRole::Operator);

    println!("\nTask hand-off");
    let task = service.create(
        SUPERVISOR,
        NewTask {
            subject: "Listen back to the escalated support call".to_string(),
            description: "Write down what should have been said instead.".to_string(),
            tag: TaskTag::Problem,
            assignee: operator,
        },
    )?;
    println!("- #{} '{}' {}", task.id, task.subject, task.status.label());

    let steps = [
        (assignee, TaskAction::InProgress, None),
        (
            assignee,
            TaskAction::Completed,
            Some("notes shared with the team lead"),
        ),
        (SUPERVISOR, TaskAction::Accepted, None),
    ];
    for (actor, action, note) in steps {
        let updated = service.transition(task.id, actor, action, note)?;
        println!(
            "- {} by {} -> {}",
            action.label(),
            actor.role.label(),
            updated.status.label()
        );
    }
    Ok(())
}

fn render_record(record: &EvaluationRecord) {
    let view = record.status_view();
    println!(
        "- {} [{}] {:.0} points ({})",
        view.evaluation_id, view.status, view.total_score, view.band
    );
    if let Some(criterion) = &record.critical_failure {
        println!("  critical failure: {criterion}");
    }
    if !record.combined_comment.is_empty() {
        println!("  comments: {}", record.combined_comment);
    }
}
