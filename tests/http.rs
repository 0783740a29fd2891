//! End-to-end tests against the real router with a temporary database.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use daily_problems::config::Settings;
use daily_problems::db::{self, DbPool};
use daily_problems::domain::problem::parse_date;
use daily_problems::domain::{Difficulty, ProblemDraft};
use daily_problems::routes::build_router;
use daily_problems::state::AppState;

const ADMIN: &str = "teacher";

struct TestApp {
    _temp: TempDir,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("problems.db");
        let pool = db::init_db(&path).unwrap();
        let mut settings = Settings::with_database(path);
        settings.admin_usernames = vec![ADMIN.to_string()];
        Self {
            _temp: temp,
            state: AppState::new(pool, settings),
        }
    }

    fn pool(&self) -> &DbPool {
        &self.state.db
    }

    /// A server with its own cookie jar (one browser)
    fn server(&self) -> TestServer {
        TestServer::builder()
            .save_cookies()
            .build(build_router(self.state.clone()))
            .unwrap()
    }

    /// A signed-in browser for a freshly registered user
    async fn signed_in(&self, username: &str) -> TestServer {
        let server = self.server();
        let email = format!("{}@example.com", username);
        let res = server
            .post("/register")
            .form(&[
                ("username", username),
                ("email", email.as_str()),
                ("password", "correct horse"),
                ("confirm_password", "correct horse"),
            ])
            .await;
        res.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");
        server
    }

    fn add_problem(&self, date: &str, content: &str) -> i64 {
        let conn = self.pool().lock().unwrap();
        let draft = ProblemDraft {
            content: content.to_string(),
            publish_date: parse_date(date),
            ..Default::default()
        };
        db::create_problem(&conn, &draft).unwrap()
    }
}

fn location(res: &axum_test::TestResponse) -> String {
    res.header("location").to_str().unwrap().to_string()
}

// ==================== Auth ====================

#[tokio::test]
async fn test_home_requires_login() {
    let app = TestApp::new();
    let res = app.server().get("/").await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn test_api_requires_login_with_json_401() {
    let app = TestApp::new();
    let res = app
        .server()
        .post("/api/chat")
        .json(&json!({"messages": [{"role": "user", "content": "hi"}]}))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>()["error"], "Authentication required");
}

#[tokio::test]
async fn test_register_login_logout() {
    let app = TestApp::new();
    let server = app.signed_in("alice").await;
    server.get("/").await.assert_status_ok();

    server.post("/logout").await.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&server.get("/").await), "/login");

    let bad = server
        .post("/login")
        .form(&[("username", "alice"), ("password", "wrong password")])
        .await;
    bad.assert_status_ok();
    assert!(bad.text().contains("Invalid username or password"));

    let good = server
        .post("/login")
        .form(&[("username", "alice"), ("password", "correct horse")])
        .await;
    good.assert_status(StatusCode::SEE_OTHER);
    server.get("/").await.assert_status_ok();
}

#[tokio::test]
async fn test_register_rejects_duplicate_username() {
    let app = TestApp::new();
    app.signed_in("alice").await;

    let res = app
        .server()
        .post("/register")
        .form(&[
            ("username", "ALICE"),
            ("email", "other@example.com"),
            ("password", "correct horse"),
            ("confirm_password", "correct horse"),
        ])
        .await;
    res.assert_status_ok();
    assert!(res.text().contains("Username already exists"));
}

#[tokio::test]
async fn test_non_admin_gets_403_on_admin_pages() {
    let app = TestApp::new();
    let server = app.signed_in("alice").await;
    server.get("/admin/courses").await.assert_status(StatusCode::FORBIDDEN);
    server
        .post("/api/generate-hint")
        .json(&json!({"problem": "x", "hintLevel": "subtle"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bootstrap_admin_sees_admin_pages() {
    let app = TestApp::new();
    let server = app.signed_in(ADMIN).await;
    server.get("/admin/courses").await.assert_status_ok();
    server.get("/admin/schedule").await.assert_status_ok();
    server.get("/admin/users").await.assert_status_ok();
}

// ==================== Problem of the day ====================

#[tokio::test]
async fn test_home_shows_problem_for_date() {
    let app = TestApp::new();
    app.add_problem("2024-03-01", "What is 2+2?");
    let server = app.signed_in("alice").await;

    let page = server.get("/").add_query_param("date", "2024-03-01").await;
    page.assert_status_ok();
    assert!(page.text().contains("What is 2+2?"));

    let empty = server.get("/").add_query_param("date", "2024-03-02").await;
    assert!(empty.text().contains("No problem available for this date"));
}

#[tokio::test]
async fn test_bookmark_rating_and_note() {
    let app = TestApp::new();
    let id = app.add_problem("2024-03-01", "Find the limit");
    let server = app.signed_in("alice").await;

    let res = server.post(&format!("/problems/{}/bookmark", id)).await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/?date=2024-03-01&notice=Bookmark%20added");

    let res = server.post(&format!("/problems/{}/bookmark", id)).await;
    assert_eq!(location(&res), "/?date=2024-03-01&notice=Bookmark%20removed");

    server
        .post(&format!("/problems/{}/rating", id))
        .form(&[("rating", "medium")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    server
        .post(&format!("/problems/{}/rating", id))
        .form(&[("rating", "hard")])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    server
        .post(&format!("/problems/{}/note", id))
        .form(&[("content", "try squeeze theorem")])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let conn = app.pool().lock().unwrap();
    let (user_id, _) = daily_problems::auth::db::get_user_by_username(&conn, "alice")
        .unwrap()
        .unwrap();
    assert!(!db::is_bookmarked(&conn, user_id, id).unwrap());
    assert_eq!(db::list_ratings(&conn, user_id).unwrap().len(), 1);
    assert_eq!(db::get_rating(&conn, user_id, id).unwrap(), Some(Difficulty::Hard));
    assert_eq!(db::note_content(&conn, user_id, id).unwrap(), "try squeeze theorem");
}

#[tokio::test]
async fn test_rating_unknown_problem_redirects_with_error() {
    let app = TestApp::new();
    let server = app.signed_in("alice").await;
    let res = server.post("/problems/999/rating").form(&[("rating", "easy")]).await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert!(location(&res).contains("error=Problem%20not%20found"));
}

// ==================== Exams ====================

#[tokio::test]
async fn test_exam_generation_and_view() {
    let app = TestApp::new();
    let first = app.add_problem("2024-03-01", "First problem");
    let second = app.add_problem("2024-03-02", "Second problem");
    let server = app.signed_in("alice").await;

    for id in [first, second] {
        server
            .post(&format!("/problems/{}/rating", id))
            .form(&[("rating", "easy")])
            .await;
    }

    let res = server
        .post("/exam")
        .form(&[("difficulty", "easy"), ("difficulty", "hard")])
        .await;
    res.assert_status(StatusCode::SEE_OTHER);
    let exam_url = location(&res);
    assert!(exam_url.starts_with("/exam/"));

    let page = server.get(&exam_url).await;
    page.assert_status_ok();
    let body = page.text();
    assert!(body.contains("First problem") && body.contains("Second problem"));
    assert!(body.contains("Your exam has 2 problems"));

    // Another user cannot open it
    let other = app.signed_in("bob").await;
    let res = other.get(&exam_url).await;
    assert!(location(&res).contains("error=Exam%20not%20found"));
}

#[tokio::test]
async fn test_exam_requires_difficulty_and_ratings() {
    let app = TestApp::new();
    let server = app.signed_in("alice").await;

    let res = server.post("/exam").form(&Vec::<(&str, &str)>::new()).await;
    assert!(location(&res).contains("error=Select%20at%20least%20one%20difficulty"));

    let res = server.post("/exam").form(&[("difficulty", "easy")]).await;
    assert!(location(&res).contains("error=No%20rated%20problems"));
}

// ==================== Admin: taxonomy and problems ====================

#[tokio::test]
async fn test_course_and_topic_management() {
    let app = TestApp::new();
    let server = app.signed_in(ADMIN).await;

    let res = server.post("/admin/courses").form(&[("name", "  ")]).await;
    assert!(location(&res).contains("error=Course%20name%20is%20required"));

    let res = server
        .post("/admin/courses")
        .form(&[("name", "Calculus"), ("description", "Limits and series")])
        .await;
    assert!(location(&res).starts_with("/admin/courses?course="));

    let course_id = {
        let conn = app.pool().lock().unwrap();
        db::list_courses(&conn).unwrap()[0].id
    };

    let res = server.post("/admin/topics").form(&[("name", "Limits"), ("course_id", "")]).await;
    assert!(location(&res).contains("error=Topic%20name%20and%20course%20selection%20are%20required"));

    let course = course_id.to_string();
    for name in ["Limits", "Series"] {
        server
            .post("/admin/topics")
            .form(&[("name", name), ("course_id", course.as_str())])
            .await
            .assert_status(StatusCode::SEE_OTHER);
    }

    let page = server.get("/admin/courses").add_query_param("q", "ser").await;
    page.assert_status_ok();
    let body = page.text();
    assert!(body.contains("Series") && !body.contains(">Limits<"));

    let topics = {
        let conn = app.pool().lock().unwrap();
        db::list_topics(&conn, Some(course_id)).unwrap()
    };
    assert_eq!(topics.iter().map(|t| t.sort_order).collect::<Vec<_>>(), vec![10, 20]);

    // Reverse the order
    let order = format!("{},{}", topics[1].id, topics[0].id);
    server
        .post(&format!("/admin/courses/{}/sort", course_id))
        .form(&[("order", order.as_str())])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    {
        let conn = app.pool().lock().unwrap();
        let names: Vec<_> = db::list_topics(&conn, Some(course_id))
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Series", "Limits"]);
    }

    // Delete needs the exact name
    let limits = topics[0].id;
    let res = server
        .post(&format!("/admin/topics/{}/delete", limits))
        .form(&[("confirmation", "limits")])
        .await;
    assert!(location(&res).contains("error=Confirmation"));

    let res = server
        .post(&format!("/admin/topics/{}/delete", limits))
        .form(&[("confirmation", "Limits")])
        .await;
    assert!(location(&res).contains("notice=Topic%20deleted"));
    let conn = app.pool().lock().unwrap();
    assert!(db::get_topic(&conn, limits).unwrap().is_none());
}

#[tokio::test]
async fn test_save_problem_creates_then_updates_by_date() {
    let app = TestApp::new();
    let topic = {
        let conn = app.pool().lock().unwrap();
        let course = db::create_course(&conn, "Algebra", "").unwrap();
        db::create_topic(&conn, course, "Quadratics", "").unwrap()
    };
    let server = app.signed_in(ADMIN).await;
    let topic = topic.to_string();

    let res = server
        .post("/admin/problems")
        .form(&[("date", "2024-03-01"), ("content", "")])
        .await;
    assert!(location(&res).contains("error=Please%20fill%20in%20all%20required%20fields"));

    let res = server
        .post("/admin/problems")
        .form(&[
            ("date", "2024-03-01"),
            ("content", "Solve $x^2 = 4$"),
            ("tags", "roots, quadratics"),
            ("topic_ids", topic.as_str()),
        ])
        .await;
    assert!(location(&res).contains("notice=Problem%20created"));

    let res = server
        .post("/admin/problems")
        .form(&[
            ("date", "2024-03-01"),
            ("content", "Solve $x^2 = 9$"),
            ("tags", "roots, quadratics"),
        ])
        .await;
    assert!(location(&res).contains("notice=Problem%20updated"));

    let form = server.get("/admin/problems/new").add_query_param("date", "2024-03-01").await;
    form.assert_status_ok();
    let body = form.text();
    assert!(body.contains("Existing problem loaded for this date"));
    assert!(body.contains("x^2 = 9"));

    let conn = app.pool().lock().unwrap();
    let problem = db::get_problem_by_date(&conn, parse_date("2024-03-01").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(problem.tags, vec!["roots", "quadratics"]);
    // Topic deselected on the second save
    assert!(db::get_problem_topic_ids(&conn, problem.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_move_problem_rejects_taken_date() {
    let app = TestApp::new();
    let first = app.add_problem("2024-03-01", "First");
    app.add_problem("2024-03-02", "Second");
    let server = app.signed_in(ADMIN).await;

    let res = server
        .post(&format!("/api/problems/{}/move", first))
        .json(&json!({"date": "2024-03-02"}))
        .await;
    res.assert_status(StatusCode::CONFLICT);

    let res = server
        .post(&format!("/api/problems/{}/move", first))
        .json(&json!({"date": "2024-03-05"}))
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>(), json!({"ok": true, "id": first, "date": "2024-03-05"}));

    server
        .post("/api/problems/999/move")
        .json(&json!({"date": "2024-03-09"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ==================== JSON API ====================

#[tokio::test]
async fn test_generation_validates_input_before_calling_llm() {
    let app = TestApp::new();
    let server = app.signed_in(ADMIN).await;

    let res = server
        .post("/api/generate-hint")
        .json(&json!({"problem": "", "hintLevel": "subtle"}))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["error"], "Problem and hint level are required");

    let res = server
        .post("/api/generate-problem")
        .json(&json!({"subject": "probability"}))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["error"], "Subject and problem idea are required");
}

#[tokio::test]
async fn test_generation_without_api_key_is_500() {
    let app = TestApp::new();
    let server = app.signed_in(ADMIN).await;

    let res = server
        .post("/api/generate-hint")
        .json(&json!({"problem": "Integrate x", "hintLevel": "detailed"}))
        .await;
    res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.json::<Value>()["error"], "OpenAI API key is not configured");
}

#[tokio::test]
async fn test_send_email_validation_and_failure() {
    let app = TestApp::new();
    let server = app.signed_in("alice").await;

    server
        .post("/api/send-email")
        .json(&json!({"subject": "Help", "message": "  "}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let res = server
        .post("/api/send-email")
        .json(&json!({"subject": "Help", "message": "The hint is blank"}))
        .await;
    res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.json::<Value>()["error"], "Failed to send email");
}

#[tokio::test]
async fn test_katex_macros_are_public() {
    let app = TestApp::new();
    let res = app.server().get("/api/katex-macros").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["\\RR"], "\\mathbb{R}");
}
