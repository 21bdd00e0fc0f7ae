use actix_cors::Cors;
use actix_web::{
    get, post, web, web::Bytes, App, HttpResponse, HttpServer, Responder,
    Result as ActixResult,
};
use actix_ws::Message;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vizcore::{EngineError, ExecutionEvent, RunId, WorkflowStructure};
use vizruntime::{NodeRegistry, RunState, RuntimeConfig, VizRuntime};

/// Application state shared across handlers
struct AppState {
    runtime: Arc<VizRuntime>,
}

/// Response for an accepted workflow
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    run_id: Uuid,
    message: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(err: &EngineError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        EngineError::InvalidGraph(_) => HttpResponse::BadRequest().json(body),
        EngineError::RunNotFound(_) => HttpResponse::NotFound().json(body),
        EngineError::RunAlreadyStarted(_) => HttpResponse::Conflict().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// One Server-Sent-Events frame
fn sse_frame(event: &ExecutionEvent) -> Bytes {
    Bytes::from(format!("event: {}\ndata: {}\n\n", event.name(), event.data()))
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "vizflow"
    }))
}

/// Definitions of every registered node type, keyed by tag
#[get("/api/nodes/node-definitions")]
async fn node_definitions(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    Ok(HttpResponse::Ok().json(data.runtime.registry().definitions()))
}

/// Accept a workflow; it starts once a client subscribes to its events
#[post("/api/workflow/execute-workflow")]
async fn execute_workflow(
    data: web::Data<AppState>,
    workflow: web::Json<WorkflowStructure>,
) -> ActixResult<impl Responder> {
    match data.runtime.submit(workflow.into_inner()).await {
        Ok(run_id) => Ok(HttpResponse::Accepted().json(SubmitResponse {
            run_id,
            message: "Workflow received".to_string(),
        })),
        Err(e) => {
            warn!("Rejected workflow: {}", e);
            Ok(error_response(&e))
        }
    }
}

/// Event stream of one run as Server-Sent Events
#[get("/api/workflow/execute-workflow-stream/{run_id}")]
async fn execute_workflow_stream(
    data: web::Data<AppState>,
    path: web::Path<RunId>,
) -> ActixResult<impl Responder> {
    let run_id = path.into_inner();
    let events = match data.runtime.subscribe(run_id).await {
        Ok(events) => events,
        Err(e) => return Ok(error_response(&e)),
    };

    info!("SSE connection established for run {}", run_id);

    let body = events.map(|event| Ok::<_, actix_web::Error>(sse_frame(&event)));
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body))
}

/// Event stream of one run over a WebSocket, one JSON event per message
#[get("/api/workflow/runs/{run_id}/ws")]
async fn run_events_ws(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
    path: web::Path<RunId>,
) -> ActixResult<HttpResponse> {
    let run_id = path.into_inner();
    let mut events = match data.runtime.subscribe(run_id).await {
        Ok(events) => events,
        Err(e) => return Ok(error_response(&e)),
    };

    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected to run {}", run_id);

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.next() => {
                    match event {
                        Some(event) => {
                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    if session.text(json).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => error!("Failed to serialize event: {}", e),
                            }
                        }
                        // Terminal event delivered
                        None => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected from run {}", run_id);
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// Result of a finished run
#[get("/api/workflow/runs/{run_id}")]
async fn run_result(
    data: web::Data<AppState>,
    path: web::Path<RunId>,
) -> ActixResult<impl Responder> {
    let run_id = path.into_inner();
    match data.runtime.result(run_id).await {
        Ok(Some(result)) => Ok(HttpResponse::Ok().json(result.as_ref())),
        Ok(None) => {
            let state = match data.runtime.state(run_id).await {
                Some(RunState::Pending) => "pending",
                _ => "running",
            };
            Ok(HttpResponse::Conflict().json(ErrorResponse {
                error: format!("Run {} is still {}", run_id, state),
            }))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting workflow server");

    let mut registry = NodeRegistry::new();
    viznodes::register_all(&mut registry);

    let runtime = VizRuntime::with_registry(Arc::new(registry), RuntimeConfig::from_env());

    info!(
        "✅ Runtime initialized with {} node types",
        runtime.registry().len()
    );

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(node_definitions)
            .service(execute_workflow)
            .service(execute_workflow_stream)
            .service(run_events_ws)
            .service(run_result)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as http_test};
    use serde_json::{json, Value};

    fn app_state() -> web::Data<AppState> {
        let mut registry = NodeRegistry::new();
        viznodes::register_all(&mut registry);
        web::Data::new(AppState {
            runtime: Arc::new(VizRuntime::with_registry(
                Arc::new(registry),
                RuntimeConfig::default(),
            )),
        })
    }

    fn start_workflow() -> Value {
        json!({
            "nodes": [{ "id": "1", "type": "StartNode", "position": { "x": 0, "y": 0 }, "data": { "label": "Start" } }],
            "edges": []
        })
    }

    #[test]
    fn sse_frames_carry_name_and_data() {
        let event = ExecutionEvent::NodeError {
            node_id: "3".to_string(),
            error: "boom".to_string(),
        };
        assert_eq!(
            sse_frame(&event),
            Bytes::from("event: nodeError\ndata: {\"error\":\"boom\",\"nodeId\":\"3\"}\n\n")
        );
    }

    #[actix_web::test]
    async fn submit_stream_then_fetch_result() {
        let app = http_test::init_service(
            App::new()
                .app_data(app_state())
                .service(execute_workflow)
                .service(execute_workflow_stream)
                .service(run_result),
        )
        .await;

        let req = http_test::TestRequest::post()
            .uri("/api/workflow/execute-workflow")
            .set_json(start_workflow())
            .to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body: Value = http_test::read_body_json(resp).await;
        let run_id = body["runId"].as_str().unwrap().to_string();

        let req = http_test::TestRequest::get()
            .uri(&format!("/api/workflow/runs/{}", run_id))
            .to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = http_test::TestRequest::get()
            .uri(&format!("/api/workflow/execute-workflow-stream/{}", run_id))
            .to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = http_test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.starts_with("event: nodeExecuted\n"));
        assert!(text.ends_with("event: workflowCompleted\ndata: {}\n\n"));
    }

    #[actix_web::test]
    async fn invalid_and_unknown_runs_are_rejected() {
        let app = http_test::init_service(
            App::new()
                .app_data(app_state())
                .service(execute_workflow)
                .service(run_result),
        )
        .await;

        let req = http_test::TestRequest::post()
            .uri("/api/workflow/execute-workflow")
            .set_json(json!({ "nodes": [], "edges": [] }))
            .to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = http_test::TestRequest::get()
            .uri(&format!("/api/workflow/runs/{}", Uuid::new_v4()))
            .to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
