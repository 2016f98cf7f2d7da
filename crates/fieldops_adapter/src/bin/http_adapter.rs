#![forbid(unsafe_code)]

use std::{
    env,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fieldops_adapter::{
    AdapterHealthResponse, AdapterRuntime, AuthzCheckAdapterRequest, AuthzCheckAdapterResponse,
    ChecklistToggleAdapterRequest, ContactGrantAdapterRequest, ContactGrantAdapterResponse,
    FileVisibilityAdapterRequest, FileVisibilityAdapterResponse, HubAccessAdapterRequest,
    HubAccessAdapterResponse, HubMessageAdapterRequest, HubMessageAdapterResponse,
    StatusTransitionAdapterRequest, TaskProgressAdapterRequest, TaskProgressAdapterResponse,
    WorkOrderAdapterResponse, OUTCOME_FORBIDDEN, OUTCOME_INVALID, OUTCOME_MISSING_REASON,
    OUTCOME_NOT_FOUND, OUTCOME_TRANSPORT,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = env::var("FIELDOPS_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let runtime = Arc::new(Mutex::new(AdapterRuntime::new_in_memory()));
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/authz/check", post(check_authz))
        .route("/v1/work_orders/status", post(transition_status))
        .route("/v1/files/visibility", post(toggle_file_visibility))
        .route("/v1/work_orders/hub/access", post(hub_access))
        .route("/v1/work_orders/hub/messages", post(post_hub_message))
        .route("/v1/contacts/grants", post(contact_grant))
        .route("/v1/tasks/checklist", post(toggle_checklist_item))
        .route("/v1/tasks/progress", post(task_progress))
        .with_state(runtime);

    println!("fieldops_http listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

type SharedRuntime = Arc<Mutex<AdapterRuntime>>;

fn status_for(outcome: &str) -> StatusCode {
    match outcome {
        OUTCOME_FORBIDDEN => StatusCode::FORBIDDEN,
        OUTCOME_MISSING_REASON => StatusCode::UNPROCESSABLE_ENTITY,
        OUTCOME_NOT_FOUND => StatusCode::NOT_FOUND,
        OUTCOME_INVALID => StatusCode::BAD_REQUEST,
        OUTCOME_TRANSPORT => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    }
}

async fn healthz(
    State(runtime): State<SharedRuntime>,
) -> (StatusCode, Json<AdapterHealthResponse>) {
    match runtime.lock() {
        Ok(runtime) => (StatusCode::OK, Json(runtime.health_report())),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AdapterHealthResponse {
                status: "error".to_string(),
                outcome: "UNHEALTHY".to_string(),
                reason: Some("adapter runtime lock poisoned".to_string()),
                actor_count: 0,
                work_order_count: 0,
            }),
        ),
    }
}

async fn check_authz(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<AuthzCheckAdapterRequest>,
) -> (StatusCode, Json<AuthzCheckAdapterResponse>) {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AuthzCheckAdapterResponse {
                    status: "error".to_string(),
                    outcome: OUTCOME_TRANSPORT.to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    allowed: false,
                }),
            );
        }
    };
    let response = runtime.check_authz(&request);
    (status_for(&response.outcome), Json(response))
}

async fn transition_status(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<StatusTransitionAdapterRequest>,
) -> (StatusCode, Json<WorkOrderAdapterResponse>) {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WorkOrderAdapterResponse {
                    status: "error".to_string(),
                    outcome: OUTCOME_TRANSPORT.to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    work_order: None,
                }),
            );
        }
    };
    let response = runtime.transition_status(&request);
    (status_for(&response.outcome), Json(response))
}

async fn toggle_file_visibility(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<FileVisibilityAdapterRequest>,
) -> (StatusCode, Json<FileVisibilityAdapterResponse>) {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FileVisibilityAdapterResponse {
                    status: "error".to_string(),
                    outcome: OUTCOME_TRANSPORT.to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    file_id: None,
                    visible_to_client: None,
                }),
            );
        }
    };
    let response = runtime.toggle_file_visibility(&request);
    (status_for(&response.outcome), Json(response))
}

async fn hub_access(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<HubAccessAdapterRequest>,
) -> (StatusCode, Json<HubAccessAdapterResponse>) {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HubAccessAdapterResponse {
                    status: "error".to_string(),
                    outcome: OUTCOME_TRANSPORT.to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    access: None,
                }),
            );
        }
    };
    let response = runtime.hub_access(&request);
    (status_for(&response.outcome), Json(response))
}

async fn post_hub_message(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<HubMessageAdapterRequest>,
) -> (StatusCode, Json<HubMessageAdapterResponse>) {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HubMessageAdapterResponse {
                    status: "error".to_string(),
                    outcome: OUTCOME_TRANSPORT.to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    message_id: None,
                    sender_display_name: None,
                    sender_company_name: None,
                }),
            );
        }
    };
    let response = runtime.post_hub_message(&request);
    (status_for(&response.outcome), Json(response))
}

async fn contact_grant(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<ContactGrantAdapterRequest>,
) -> (StatusCode, Json<ContactGrantAdapterResponse>) {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ContactGrantAdapterResponse {
                    status: "error".to_string(),
                    outcome: OUTCOME_TRANSPORT.to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                }),
            );
        }
    };
    let response = runtime.contact_grant(&request);
    (status_for(&response.outcome), Json(response))
}

async fn toggle_checklist_item(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<ChecklistToggleAdapterRequest>,
) -> (StatusCode, Json<TaskProgressAdapterResponse>) {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TaskProgressAdapterResponse {
                    status: "error".to_string(),
                    outcome: OUTCOME_TRANSPORT.to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    progress: None,
                }),
            );
        }
    };
    let response = runtime.toggle_checklist_item(&request);
    (status_for(&response.outcome), Json(response))
}

async fn task_progress(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<TaskProgressAdapterRequest>,
) -> (StatusCode, Json<TaskProgressAdapterResponse>) {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TaskProgressAdapterResponse {
                    status: "error".to_string(),
                    outcome: OUTCOME_TRANSPORT.to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    progress: None,
                }),
            );
        }
    };
    let response = runtime.task_progress(&request);
    (status_for(&response.outcome), Json(response))
}
