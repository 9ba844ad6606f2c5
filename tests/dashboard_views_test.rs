//! Progress, performance and drill-down tables served by the dashboard service

mod common;

use chrono::NaiveDate;
use common::{harness, raw, Harness};
use learner_metrics::metrics::WeekRange;
use learner_metrics::views::{
    GradePerformanceFilter, LearnerDetailFilter, LearnersListFilter, QsetPerformanceFilter, QsetScore,
};

const NOW: &str = "2024-03-13 12:00:00";

fn classroom() -> Harness {
    let mut rows = Vec::new();
    for learner in ["L1", "L2", "L3"] {
        rows.push(raw(learner, "2024-03-11 10:00:00"));
    }
    let mut moved_up = raw("L4", "2024-03-12 09:20:00");
    moved_up.qset_grade_identifier = Some("grd-2".to_string());
    rows.push(raw("L4", "2024-03-12 09:00:00"));
    rows.push(moved_up);
    harness(rows, NOW)
}

fn score(qset: &str, name: &str, value: f64) -> QsetScore {
    QsetScore {
        operation: Some("Addition".to_string()),
        qset_grade: Some("class-one".to_string()),
        question_set_id: qset.to_string(),
        qset_name: Some(name.to_string()),
        score: Some(value),
    }
}

#[tokio::test]
async fn test_learner_progress_shares() {
    let h = classroom();
    let rows = h.service.learner_progress(None).await.unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.operation, "Addition");
    assert_eq!(row.starting_grade, "class-one");
    assert_eq!(row.target_grade, "class-one");
    assert_eq!(row.learners_count, 4);
    assert_eq!(row.total_count, 4);
    assert_eq!(row.share("class-one"), Some("75.0 %"));
    assert_eq!(row.share("class-two"), Some("25.0 %"));

    let elsewhere = h.service.learner_progress(Some("Elsewhere")).await.unwrap();
    assert!(elsewhere.is_empty());
}

#[tokio::test]
async fn test_grade_performance_from_report_source() {
    let h = classroom();
    *h.source.qset_scores.lock().unwrap() = vec![score("qs-1", "Easy Set", 1.0), score("qs-2", "Mid Set", 0.5)];

    let rows = h
        .service
        .grade_performance(&GradePerformanceFilter::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].attempts_count, 2);
    assert_eq!(rows[0].median_accuracy.as_deref(), Some("75 %"));
    assert_eq!(rows[0].average_accuracy.as_deref(), Some("75 %"));
    assert_eq!(rows[0].easy_qsets, "Easy Set");
    assert_eq!(rows[0].difficult_qsets, "");
}

#[tokio::test]
async fn test_empty_qset_filter_skips_the_source() {
    let h = classroom();
    let rows = h
        .service
        .qset_performance(&QsetPerformanceFilter::default())
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert_eq!(h.source.report_calls(), 0);
}

#[tokio::test]
async fn test_qset_catalogue_is_sorted_and_distinct() {
    let h = classroom();
    *h.source.catalogue.lock().unwrap() = vec!["QS-B".to_string(), "QS-A".to_string(), "QS-B".to_string()];

    let ids = h.service.qset_catalogue(Some("Core Maths")).await.unwrap();
    assert_eq!(ids, vec!["QS-A", "QS-B"]);
}

#[tokio::test]
async fn test_learners_list_for_one_week() {
    let h = classroom();
    let week = WeekRange::containing(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());

    let rows = h
        .service
        .learners_list(&LearnersListFilter::for_week("Addition", week))
        .await
        .unwrap();

    let ids: Vec<&str> = rows.iter().map(|row| row.learner_id.as_str()).collect();
    assert_eq!(ids, vec!["L1", "L2", "L3", "L4"]);
    assert_eq!(rows[3].questions_attempted.get("class-two"), Some(&1));
    assert_eq!(rows[3].accuracy.get("class-one"), Some(&100.0));
}

#[tokio::test]
async fn test_unknown_learner_has_no_detail() {
    let h = classroom();
    let filter = LearnerDetailFilter {
        learner_id: "nobody".to_string(),
        ..Default::default()
    };

    assert!(h.service.learner_detail(&filter).await.unwrap().is_none());
}
