use chrono::{Duration, Utc};
use student_retroplanner::{
    calendar::{project, DayCapacity},
    coordinator::{ProgressReport, RetroplanCoordinator},
    models::{AcademicEvent, AcademicEventType, GenerateRetroplanRequest, Priority, UserProfile},
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Student Retroplanner starting");

    let coordinator = RetroplanCoordinator::default();

    // Sample goal: 1200 over ten weeks with a midterm in week 4
    let today = Utc::now().date_naive();
    let request = GenerateRetroplanRequest {
        user_id: Uuid::new_v4(),
        goal_id: Uuid::new_v4(),
        goal_amount: 1200.0,
        deadline: today + Duration::weeks(10),
        start_date: Some(today),
        user_profile: UserProfile {
            default_hourly_rate: Some(15.0),
            available_hours: Some(18.0),
        },
        academic_events: vec![AcademicEvent {
            event_type: AcademicEventType::ExamPeriod,
            name: "Midterms".to_string(),
            start_date: today + Duration::weeks(3),
            end_date: today + Duration::weeks(3) + Duration::days(4),
            capacity_impact: None,
            priority: Priority::Normal,
            recurring: false,
        }],
        commitments: vec![],
        energy_history: vec![],
        config_overrides: None,
    };
    let goal_id = request.goal_id;

    let plan = coordinator.generate(request).await?;

    println!("\n=== RETROPLAN ===");
    println!("Plan ID: {}", plan.id);
    println!("Feasibility: {:.2}", plan.feasibility_score);
    println!(
        "Confidence: {:.0} - {:.0}",
        plan.confidence_interval.low, plan.confidence_interval.high
    );
    println!("Front-loaded: {:.1}%", plan.front_loaded_percentage);
    println!("\nWeek | Target | Cumulative | Capacity | Difficulty");
    for m in &plan.milestones {
        println!(
            "{:>4} | {:>6.0} | {:>10.0} | {} | {}",
            m.week_number,
            m.adjusted_target,
            m.cumulative_target,
            m.capacity.capacity_category,
            m.difficulty
        );
    }

    // Fall behind after two weeks
    let planned = plan.milestones.get(1).map(|m| m.cumulative_target).unwrap_or(0.0);
    let result = coordinator
        .record_progress(
            goal_id,
            ProgressReport {
                current_week: 2,
                actual_progress: (planned - 120.0).max(0.0),
            },
        )
        .await?;

    println!("\n=== CATCH-UP AT WEEK 2 ===");
    println!("Deficit: {:.0}", result.deficit);
    println!("Absorbed: {:.0}", result.absorbed);
    println!("Unresolved: {:.0}", result.unresolved);
    println!("Catch-up weeks: {:?}", result.catch_up_weeks);
    for risk in &result.plan.risk_factors {
        println!("Risk: {}", risk);
    }

    println!("\n=== CALENDAR ===");
    for month in project(&result.plan) {
        println!("{} (target {:.0})", month.label, month.total_target);
        for week in &month.weeks {
            let days: String = week
                .days
                .iter()
                .map(|d| match d.capacity {
                    DayCapacity::Full => 'o',
                    DayCapacity::Partial => '~',
                    DayCapacity::Blocked => 'x',
                })
                .collect();
            println!("  week {:>2} {} {:>6.0}", week.week_number, days, week.target);
        }
    }

    Ok(())
}
