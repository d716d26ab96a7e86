//! Run lifecycle against a mock server: create, get, wait, cancel.

mod common;

use common::MockServerFixture;
use mockito::Matcher;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use subconscious::{
    engines, Error, OutputSchema, PollOptions, RunInput, RunOptions, RunStatus, Tool,
};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn run_returns_immediately_without_await() {
    let mut fx = MockServerFixture::new().await;
    let create = fx
        .server
        .mock("POST", "/runs")
        .match_header("authorization", "Bearer sk-test-key")
        .match_body(Matcher::PartialJson(json!({
            "engine": "tim-gpt",
            "input": {"instructions": "Hello", "tools": []}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"runId":"run_1","status":"queued"}"#)
        .expect(1)
        .create_async()
        .await;
    let poll = fx.mock_unreachable("GET", "/runs/run_1").await;

    let run = fx
        .client()
        .run(engines::TIM_GPT, &RunInput::new("Hello"), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(run.run_id, "run_1");
    assert_eq!(run.status, RunStatus::Queued);
    assert!(run.result.is_none());
    create.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn run_with_await_polls_to_completion() {
    let mut fx = MockServerFixture::new().await;
    let create = fx
        .mock_json("POST", "/runs", 200, r#"{"runId":"run_2"}"#, 1)
        .await;
    let running = fx
        .mock_json("GET", "/runs/run_2", 200, r#"{"runId":"run_2","status":"running"}"#, 2)
        .await;
    let done_body = json!({
        "runId": "run_2",
        "status": "succeeded",
        "result": {
            "answer": "Paris",
            "reasoning": {
                "title": "Capital lookup",
                "thought": "Search then answer",
                "subtask": [{"title": "search", "tooluse": [{"tool": "parallel_search"}]}],
                "conclusion": "Paris"
            }
        },
        "usage": {
            "models": [{"engine": "tim-gpt", "inputTokens": 120, "outputTokens": 30, "totalTokens": 150}],
            "platformTools": [{"toolId": "parallel_search", "calls": 2}]
        }
    })
    .to_string();
    let done = fx.mock_json("GET", "/runs/run_2", 200, &done_body, 1).await;

    let input = RunInput::new("Capital of France?").tool(Tool::platform("parallel_search"));
    let run = fx
        .client()
        .run(
            engines::TIM_GPT,
            &input,
            RunOptions::awaiting().with_poll(PollOptions::new(1, 5)),
        )
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.answer(), Some("Paris"));
    let result = run.result.as_ref().unwrap();
    assert_eq!(result.reasoning.len(), 1);
    let titles: Vec<&str> = result.reasoning[0].walk().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Capital lookup", "search"]);
    let usage = run.usage.as_ref().unwrap();
    assert_eq!(usage.total_tokens(), 150);
    assert_eq!(usage.platform_tools[0].calls, 2);

    create.assert_async().await;
    running.assert_async().await;
    done.assert_async().await;
}

#[tokio::test]
async fn wait_gives_up_after_max_attempts() {
    let mut fx = MockServerFixture::new().await;
    let running = fx
        .mock_json("GET", "/runs/slow", 200, r#"{"runId":"slow","status":"running"}"#, 3)
        .await;

    let err = assert_err!(fx.client().wait("slow", Some(PollOptions::new(1, 3))).await);

    match err {
        Error::Timeout { run_id, attempts } => {
            assert_eq!(run_id, "slow");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected Timeout, got {:?}", other),
    }
    running.assert_async().await;
}

#[tokio::test]
async fn server_timed_out_status_is_a_result() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json(
            "GET",
            "/runs/r9",
            200,
            r#"{"runId":"r9","status":"timed_out","error":{"code":"timeout","message":"engine budget exceeded"}}"#,
            1,
        )
        .await;

    let run = fx.client().wait("r9", None).await.unwrap();
    assert_eq!(run.status, RunStatus::TimedOut);
    assert!(run.is_terminal());
    assert_eq!(run.error.as_ref().unwrap().message, "engine budget exceeded");
    assert!(run.answer().is_none());
}

#[tokio::test]
async fn get_unknown_run_is_not_found() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json(
            "GET",
            "/runs/nope",
            404,
            r#"{"error":{"code":"not_found","message":"Run not found"}}"#,
            1,
        )
        .await;

    let err = fx.client().get("nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Not found: Run not found");
}

#[tokio::test]
async fn cancel_posts_to_cancel_endpoint() {
    let mut fx = MockServerFixture::new().await;
    let cancel = fx
        .mock_json("POST", "/runs/r1/cancel", 200, r#"{"runId":"r1","status":"canceled"}"#, 1)
        .await;

    assert_ok!(fx.client().cancel("r1").await);
    cancel.assert_async().await;
}

#[tokio::test]
async fn cancel_of_finished_run_succeeds() {
    let mut fx = MockServerFixture::new().await;
    let cancel = fx
        .mock_json(
            "POST",
            "/runs/r2/cancel",
            409,
            r#"{"error":{"code":"conflict","message":"Run already finished"}}"#,
            1,
        )
        .await;
    let get = fx
        .mock_json(
            "GET",
            "/runs/r2",
            200,
            r#"{"runId":"r2","status":"succeeded","result":{"answer":"ok"}}"#,
            1,
        )
        .await;

    assert_ok!(fx.client().cancel("r2").await);
    cancel.assert_async().await;
    get.assert_async().await;
}

#[derive(Debug, Deserialize, JsonSchema, PartialEq)]
struct Forecast {
    city: String,
    high_c: i32,
}

#[tokio::test]
async fn structured_answer_round_trip() {
    let mut fx = MockServerFixture::new().await;
    let create = fx
        .server
        .mock("POST", "/runs")
        .match_body(Matcher::PartialJson(json!({
            "input": {
                "answerFormat": {
                    "type": "object",
                    "title": "Forecast",
                    "additionalProperties": false
                }
            }
        })))
        .with_status(200)
        .with_body(r#"{"runId":"f1","status":"running"}"#)
        .create_async()
        .await;
    let _done = fx
        .mock_json(
            "GET",
            "/runs/f1",
            200,
            r#"{"runId":"f1","status":"succeeded","result":{"answer":"{\"city\":\"Paris\",\"high_c\":21}","reasoning":[]}}"#,
            1,
        )
        .await;

    let input =
        RunInput::new("Forecast for Paris").answer_format(OutputSchema::from_type::<Forecast>());
    let run = fx
        .client()
        .run(engines::TIM_GPT_HEAVY, &input, RunOptions::awaiting())
        .await
        .unwrap();

    let forecast: Forecast = run.result.unwrap().parse_answer().unwrap();
    assert_eq!(
        forecast,
        Forecast {
            city: "Paris".into(),
            high_c: 21
        }
    );
    create.assert_async().await;
}
