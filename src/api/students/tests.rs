use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn enroll_is_guarded_by_unique_membership() {
    let ctx = test_support::setup_test_context().await;

    let instructor = test_support::insert_instructor(
        ctx.state.db(),
        "teach@example.com",
        "Instructor",
        "instructor-pass",
    )
    .await;
    let course = test_support::insert_course(
        ctx.state.db(),
        "Membership Course",
        "Enrollment should be recorded exactly once",
        &instructor.id,
    )
    .await;
    let first = test_support::insert_reading(ctx.state.db(), &course.id, "Welcome").await;
    let second = test_support::insert_reading(ctx.state.db(), &course.id, "Basics").await;

    let student = test_support::insert_student(
        ctx.state.db(),
        "joiner@example.com",
        "Joiner",
        "student-pass",
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/enroll/{}", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("enroll");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["is_enrolled"], true);
    assert_eq!(body["progress"]["total_lectures"], 2);

    // Enrolling hands back the full course projection.
    assert_eq!(body["course"]["instructor"]["id"], instructor.id.as_str());
    assert_eq!(body["course"]["instructor"]["email"], "teach@example.com");
    assert_eq!(body["course"]["students_enrolled"], 1);
    assert_eq!(body["course"]["lectures"][0]["id"], first.id.as_str());
    assert_eq!(body["course"]["lectures"][0]["order"], 1);
    assert_eq!(body["course"]["lectures"][1]["id"], second.id.as_str());
    assert_eq!(body["course"]["lectures"][1]["order"], 2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/enroll/{}", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("enroll again");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Instructors have no enrollment path at all.
    let instructor_token = test_support::bearer_token(&instructor.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/enroll/{}", course.id),
            Some(&instructor_token),
            None,
        ))
        .await
        .expect("enroll as instructor");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unenroll_discards_progress() {
    let ctx = test_support::setup_test_context().await;

    let instructor = test_support::insert_instructor(
        ctx.state.db(),
        "drop@example.com",
        "Instructor",
        "instructor-pass",
    )
    .await;
    let course = test_support::insert_course(
        ctx.state.db(),
        "Droppable Course",
        "Leaving a course wipes the progress ledger",
        &instructor.id,
    )
    .await;
    let reading = test_support::insert_reading(ctx.state.db(), &course.id, "Reading").await;

    let student = test_support::insert_student(
        ctx.state.db(),
        "dropper@example.com",
        "Dropper",
        "student-pass",
    )
    .await;
    test_support::enroll(ctx.state.db(), &student.id, &course.id).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/complete", reading.id),
            Some(&token),
            Some(json!({ "course_id": course.id, "outcome": { "kind": "reading" } })),
        ))
        .await
        .expect("complete reading");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/students/enroll/{}", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("unenroll");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let entries = repositories::progress::list_for_pair(ctx.state.db(), &student.id, &course.id)
        .await
        .expect("list progress after unenroll");
    assert!(entries.is_empty());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/students/enroll/{}", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("unenroll again");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gating_blocks_locked_lectures() {
    let ctx = test_support::setup_test_context().await;

    let instructor = test_support::insert_instructor(
        ctx.state.db(),
        "gate@example.com",
        "Instructor",
        "instructor-pass",
    )
    .await;
    let course = test_support::insert_course(
        ctx.state.db(),
        "Gated Course",
        "A later lecture cannot be touched before the earlier one",
        &instructor.id,
    )
    .await;
    test_support::insert_reading(ctx.state.db(), &course.id, "First Reading").await;
    let quiz = test_support::insert_quiz(
        ctx.state.db(),
        &course.id,
        "Locked Quiz",
        vec![test_support::quiz_question("Is the borrow checker your friend?")],
    )
    .await;

    let student = test_support::insert_student(
        ctx.state.db(),
        "eager@example.com",
        "Eager",
        "student-pass",
    )
    .await;
    test_support::enroll(ctx.state.db(), &student.id, &course.id).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/start", quiz.id),
            Some(&token),
            Some(json!({ "course_id": course.id })),
        ))
        .await
        .expect("start locked quiz");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/complete", quiz.id),
            Some(&token),
            Some(json!({
                "course_id": course.id,
                "outcome": { "kind": "quiz", "correct_answers": 1, "total_questions": 1 }
            })),
        ))
        .await
        .expect("complete locked quiz");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reading_then_quiz_with_retry() {
    let ctx = test_support::setup_test_context().await;

    let instructor = test_support::insert_instructor(
        ctx.state.db(),
        "flow@example.com",
        "Instructor",
        "instructor-pass",
    )
    .await;
    let course = test_support::insert_course(
        ctx.state.db(),
        "Two Step Course",
        "Reading first, then a strict quiz",
        &instructor.id,
    )
    .await;
    let reading = test_support::insert_reading(ctx.state.db(), &course.id, "Reading").await;
    let quiz = test_support::insert_quiz(
        ctx.state.db(),
        &course.id,
        "Final Quiz",
        vec![
            test_support::quiz_question("Does Vec grow?"),
            test_support::quiz_question("Is String UTF-8?"),
        ],
    )
    .await;

    let student = test_support::insert_student(
        ctx.state.db(),
        "walker@example.com",
        "Walker",
        "student-pass",
    )
    .await;
    test_support::enroll(ctx.state.db(), &student.id, &course.id).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/students/courses/{}/progress", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("initial progress");
    let body = test_support::read_json(response).await;
    assert_eq!(body["lectures"][0]["unlocked"], true);
    assert_eq!(body["lectures"][1]["unlocked"], false);
    assert_eq!(body["summary"]["progress_percentage"], 0);

    // Starting twice stays idempotent.
    for _ in 0..2 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/students/lectures/{}/start", reading.id),
                Some(&token),
                Some(json!({ "course_id": course.id })),
            ))
            .await
            .expect("start reading");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["state"], "started");
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/complete", reading.id),
            Some(&token),
            Some(json!({ "course_id": course.id, "outcome": { "kind": "reading" } })),
        ))
        .await
        .expect("complete reading");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_completed"], true);
    assert_eq!(body["summary"]["progress_percentage"], 50);

    // Failed attempt: completes nothing but keeps the quiz unlocked.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/complete", quiz.id),
            Some(&token),
            Some(json!({
                "course_id": course.id,
                "outcome": { "kind": "quiz", "correct_answers": 1, "total_questions": 2 }
            })),
        ))
        .await
        .expect("fail quiz");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_completed"], false);
    assert_eq!(body["is_passed"], false);
    assert_eq!(body["entry"]["state"], "failed");
    assert_eq!(body["summary"]["progress_percentage"], 50);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/students/courses/{}/progress", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("progress after failed quiz");
    let body = test_support::read_json(response).await;
    assert_eq!(body["lectures"][1]["unlocked"], true);

    // The retry overwrites the failed attempt instead of appending.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/complete", quiz.id),
            Some(&token),
            Some(json!({
                "course_id": course.id,
                "outcome": { "kind": "quiz", "correct_answers": 2, "total_questions": 2 }
            })),
        ))
        .await
        .expect("retry quiz");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_completed"], true);
    assert_eq!(body["is_passed"], true);
    assert_eq!(body["summary"]["progress_percentage"], 100);

    let entries = repositories::progress::list_for_pair(ctx.state.db(), &student.id, &course.id)
        .await
        .expect("list progress");
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn completion_requires_matching_outcome_kind() {
    let ctx = test_support::setup_test_context().await;

    let instructor = test_support::insert_instructor(
        ctx.state.db(),
        "kinds@example.com",
        "Instructor",
        "instructor-pass",
    )
    .await;
    let course = test_support::insert_course(
        ctx.state.db(),
        "Kind Course",
        "Submission kinds must match the lecture kind",
        &instructor.id,
    )
    .await;
    let quiz = test_support::insert_quiz(
        ctx.state.db(),
        &course.id,
        "Only Quiz",
        vec![test_support::quiz_question("Is this a quiz?")],
    )
    .await;

    let student = test_support::insert_student(
        ctx.state.db(),
        "mismatch@example.com",
        "Mismatch",
        "student-pass",
    )
    .await;
    test_support::enroll(ctx.state.db(), &student.id, &course.id).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/complete", quiz.id),
            Some(&token),
            Some(json!({ "course_id": course.id, "outcome": { "kind": "reading" } })),
        ))
        .await
        .expect("reading outcome on quiz");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The legacy percentage path is still strict: 99% fails, 100% passes.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/complete", quiz.id),
            Some(&token),
            Some(json!({
                "course_id": course.id,
                "outcome": { "kind": "legacy_score", "percent": 99.0 }
            })),
        ))
        .await
        .expect("legacy 99%");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_completed"], false);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/students/lectures/{}/complete", quiz.id),
            Some(&token),
            Some(json!({
                "course_id": course.id,
                "outcome": { "kind": "legacy_score", "percent": 100.0 }
            })),
        ))
        .await
        .expect("legacy 100%");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_completed"], true);
    assert_eq!(body["entry"]["score"], 100.0);
}

#[tokio::test]
async fn enrolled_courses_and_status_views() {
    let ctx = test_support::setup_test_context().await;

    let instructor = test_support::insert_instructor(
        ctx.state.db(),
        "views@example.com",
        "Instructor",
        "instructor-pass",
    )
    .await;
    let enrolled_course = test_support::insert_course(
        ctx.state.db(),
        "Joined Course",
        "The student is a member of this one",
        &instructor.id,
    )
    .await;
    let other_course = test_support::insert_course(
        ctx.state.db(),
        "Other Course",
        "The student never joined this one",
        &instructor.id,
    )
    .await;

    let student = test_support::insert_student(
        ctx.state.db(),
        "viewer@example.com",
        "Viewer",
        "student-pass",
    )
    .await;
    test_support::enroll(ctx.state.db(), &student.id, &enrolled_course.id).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/courses",
            Some(&token),
            None,
        ))
        .await
        .expect("enrolled courses");
    let body = test_support::read_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], enrolled_course.id.as_str());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/students/courses/{}/status", other_course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("status of other course");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_enrolled"], false);
    assert!(body["progress"].is_null());
    assert_eq!(body["course"]["id"], other_course.id.as_str());
    assert_eq!(body["course"]["instructor"]["id"], instructor.id.as_str());

    // Progress view of a course the student never joined is forbidden.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/students/courses/{}/progress", other_course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("progress of other course");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
