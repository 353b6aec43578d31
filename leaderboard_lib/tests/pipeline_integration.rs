use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use leaderboard_lib::exceptions::parse_exceptions;
use leaderboard_lib::snapshot::render;
use leaderboard_lib::{
    CodeforcesClient, Credentials, LeaderboardConfig, ManualInputs, RetryPolicy, SolveType,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GROUP: &str = "G1";
const NOW: i64 = 1_777_000_000;

const GROUP_START: i64 = 1_768_500_000;
const GROUP_END: i64 = GROUP_START + 10_800;
const ROUND_START: i64 = 1_770_000_000;

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": "OK", "result": result }))
}

fn contest(id: i64, name: &str, start: i64, duration: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "CF",
        "phase": "FINISHED",
        "frozen": false,
        "durationSeconds": duration,
        "startTimeSeconds": start
    })
}

fn submission(id: i64, contest_id: i64, index: &str, verdict: &str, at: i64) -> Value {
    json!({
        "id": id,
        "contestId": contest_id,
        "creationTimeSeconds": at,
        "problem": { "contestId": contest_id, "index": index, "name": "p" },
        "verdict": verdict
    })
}

fn standings(contest_id: i64, indices: &[&str]) -> Value {
    let problems: Vec<Value> = indices
        .iter()
        .map(|i| json!({ "contestId": contest_id, "index": i, "name": format!("Problem {}", i) }))
        .collect();
    json!({
        "contest": contest(contest_id, "c", GROUP_START, 10_800),
        "problems": problems,
        "rows": []
    })
}

fn config(server: &MockServer) -> LeaderboardConfig {
    let mut config = LeaderboardConfig::from_constants().unwrap();
    config.group_code = GROUP.to_string();
    config.api_base_url = format!("{}/api", server.uri());
    config.site_base_url = server.uri();
    config.min_request_interval = Duration::ZERO;
    config.retry = RetryPolicy::new(2, Duration::from_millis(1));
    config
}

fn client(server: &MockServer) -> CodeforcesClient {
    CodeforcesClient::new(
        &config(server),
        Some(Credentials::new("test-key", "test-secret")),
    )
    .unwrap()
}

fn inputs() -> ManualInputs {
    let exceptions = parse_exceptions(
        r#"
- handle: carol
  competition_id: 600001
  problem_id: a
  solve_type: upsolve
- handle: alice
  competition_id: 2093
  problem_id: B
  credits: 0
  remark: duplicate of teammate's code
- handle: bob
  competition_id: 999
  problem_id: X
"#,
    )
    .unwrap();
    ManualInputs {
        exceptions,
        excluded: ["mallory".to_string()].into_iter().collect::<HashSet<_>>(),
    }
}

async fn mount_remote(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .and(query_param("groupCode", GROUP))
        .respond_with(ok(json!([
            contest(600001, "Week 1 Practice", GROUP_START, 10_800),
            contest(600002, "Week 20 Practice", 1_800_000_000, 10_800),
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .and(query_param_is_missing("groupCode"))
        .respond_with(ok(json!([
            contest(2095, "Codeforces Round (Div. 3)", ROUND_START, 7200),
            contest(2094, "Codeforces Round (Div. 1)", ROUND_START + 86_400, 7200),
            contest(2093, "Codeforces Round (Div. 2)", ROUND_START, 7200),
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/contest.standings"))
        .and(query_param("contestId", "600001"))
        .and(query_param("count", "1"))
        .respond_with(ok(standings(600001, &["A", "B"])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/contest.standings"))
        .and(query_param("contestId", "2093"))
        .respond_with(ok(standings(2093, &["A", "B", "C"])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/contest.standings"))
        .and(query_param("contestId", "2094"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "FAILED",
            "comment": "contestId: Contest with id 2094 has not started"
        })))
        .mount(server)
        .await;

    let members = r#"<table>
        <tr><td><a href="/profile/alice" class="rated-user">alice</a></td></tr>
        <tr><td><a href="/profile/Bob" class="rated-user">Bob</a></td></tr>
        <tr><td><a href="/profile/Mallory" class="rated-user">Mallory</a></td></tr>
    </table>"#;
    Mock::given(method("GET"))
        .and(path(format!("/group/{}/members", GROUP)))
        .respond_with(ResponseTemplate::new(200).set_body_string(members))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/contest.status"))
        .and(query_param("contestId", "600001"))
        .and(query_param("handle", "alice"))
        .respond_with(ok(json!([
            submission(3, 600001, "A", "OK", GROUP_START + 100),
            submission(2, 600001, "B", "WRONG_ANSWER", GROUP_START + 80),
            submission(1, 600001, "A", "OK", GROUP_START + 50),
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/contest.status"))
        .and(query_param("contestId", "600001"))
        .and(query_param("handle", "Bob"))
        .respond_with(ok(json!([submission(
            4,
            600001,
            "b",
            "OK",
            GROUP_END + 3600
        )])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/contest.status"))
        .respond_with(ok(json!([])))
        .with_priority(10)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/user.status"))
        .and(query_param("handle", "alice"))
        .and(query_param("from", "1"))
        .respond_with(ok(json!([
            submission(12, 2093, "C", "OK", ROUND_START + 300),
            submission(11, 2093, "B", "OK", ROUND_START + 200),
            submission(10, 2093, "A", "OK", ROUND_START + 100),
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user.status"))
        .respond_with(ok(json!([])))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_run_builds_expected_snapshot() {
    let server = MockServer::start().await;
    mount_remote(&server).await;

    let client = client(&server);
    let outcome = leaderboard_lib::run(&client, &config(&server), inputs(), NOW)
        .await
        .unwrap();
    let snapshot = &outcome.snapshot;

    let ids: Vec<i64> = snapshot.competitions.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![600001, 2093, 2094]);
    assert_eq!(
        snapshot.competitions[0].link,
        format!("{}/group/G1/contest/600001", server.uri())
    );
    assert_eq!(snapshot.competitions[1].problems.len(), 3);
    assert!(snapshot.competitions[2].problems.is_empty());

    let handles: Vec<&str> = snapshot.records_by_handle.handles().collect();
    assert_eq!(handles, vec!["alice", "Bob", "carol"]);

    let alice = snapshot.records_by_handle.get("alice").unwrap();
    assert_eq!(alice.competitions.len(), 2);
    let week1 = &alice.competitions[0];
    assert_eq!(week1.competition_id, 600001);
    assert_eq!(week1.problems.len(), 1);
    assert_eq!(week1.problems[0].submitted_epoch, GROUP_START + 50);
    assert_eq!(week1.problems[0].credits, 2);

    let round = &alice.competitions[1];
    let credits: Vec<(&str, u32)> = round
        .problems
        .iter()
        .map(|p| (p.problem_id.as_str(), p.credits))
        .collect();
    assert_eq!(credits, vec![("A", 0), ("B", 0), ("C", 2)]);
    assert_eq!(
        round.problems[1].remark.as_deref(),
        Some("duplicate of teammate's code")
    );
    assert_eq!(alice.total_credits, 4);
    assert_eq!(alice.total_live_credits, 4);

    let bob = snapshot.records_by_handle.get("Bob").unwrap();
    let solve = &bob.competitions[0].problems[0];
    assert_eq!(solve.problem_id, "B");
    assert_eq!(solve.solve_type, SolveType::Upsolve);
    assert_eq!(solve.credits, 1);
    assert_eq!(bob.total_live_credits, 0);

    let carol = snapshot.records_by_handle.get("carol").unwrap();
    let synthetic = &carol.competitions[0].problems[0];
    assert_eq!(synthetic.submitted_epoch, GROUP_END + 1);
    assert_eq!(synthetic.solve_type, SolveType::Upsolve);
    assert_eq!(carol.total_credits, 1);

    let unapplied: Vec<String> = outcome.unapplied.iter().map(|k| k.to_string()).collect();
    assert_eq!(unapplied, vec!["bob::999::X"]);

    assert!(snapshot.records_by_handle.get("Mallory").is_none());
}

#[tokio::test]
async fn runs_are_byte_identical() {
    let server = MockServer::start().await;
    mount_remote(&server).await;
    let client = client(&server);
    let config = config(&server);

    let first = leaderboard_lib::run(&client, &config, inputs(), NOW).await.unwrap();
    let second = leaderboard_lib::run(&client, &config, inputs(), NOW).await.unwrap();

    let path = Path::new("leaderboard.yaml");
    assert_eq!(
        render(path, &first.snapshot).unwrap(),
        render(path, &second.snapshot).unwrap()
    );
}

#[tokio::test]
async fn group_problem_list_failure_aborts_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .and(query_param("groupCode", GROUP))
        .respond_with(ok(json!([contest(600001, "Week 1", GROUP_START, 10_800)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .and(query_param_is_missing("groupCode"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/contest.standings"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "FAILED",
            "comment": "You have no access to the contest"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = leaderboard_lib::run(&client, &config(&server), ManualInputs::default(), NOW)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("contest.standings(600001)"));
}

#[tokio::test]
async fn missing_credentials_fail_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = CodeforcesClient::new(&config(&server), None).unwrap();
    let err = leaderboard_lib::run(&client, &config(&server), ManualInputs::default(), NOW)
        .await
        .unwrap_err();
    assert!(matches!(err, leaderboard_lib::LeaderboardError::Api { .. }));
}
