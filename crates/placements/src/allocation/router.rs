use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::coordinator::{AllocationService, AssignmentError};
use super::domain::{Actor, DepartmentId, FacultyId, InternshipId, Role, StudentId};
use super::notify::NotificationSender;
use super::store::{RecordStore, StoreError};

/// Router builder exposing the allocation endpoints.
pub fn allocation_router<S, N>(service: Arc<AllocationService<S, N>>) -> Router
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    Router::new()
        .route(
            "/api/v1/internships",
            post(create_handler::<S, N>).get(list_handler::<S, N>),
        )
        .route(
            "/api/v1/internships/:id",
            get(get_handler::<S, N>).delete(delete_handler::<S, N>),
        )
        .route(
            "/api/v1/internships/:id/faculty",
            put(assign_faculty_handler::<S, N>),
        )
        .route(
            "/api/v1/students/:id/internship",
            put(assign_student_handler::<S, N>),
        )
        .route(
            "/api/v1/internships/:id/students/:student_id",
            delete(unassign_student_handler::<S, N>),
        )
        .route("/api/v1/internships/:id/submit", put(submit_handler::<S, N>))
        .route(
            "/api/v1/internships/:id/approve",
            put(approve_handler::<S, N>),
        )
        .route("/api/v1/internships/:id/reject", put(reject_handler::<S, N>))
        .route(
            "/api/v1/internships/:id/complete",
            put(complete_handler::<S, N>),
        )
        .route(
            "/api/v1/departments/:id/batches",
            get(batches_handler::<S, N>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<S, N>))
        .with_state(service)
}

/// The identity provider fronting this service injects the caller into
/// headers; absent headers degrade to an anonymous focal person, since the
/// context is attribution-only.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let email = headers
        .get("x-actor-email")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous@portal.local")
        .to_string();
    let role = headers
        .get("x-actor-role")
        .and_then(|value| value.to_str().ok())
        .map(Role::from_str)
        .unwrap_or(Role::FocalPerson);
    Actor { email, role }
}

fn error_response(err: AssignmentError) -> Response {
    let status = match &err {
        AssignmentError::NotFound(_) => StatusCode::NOT_FOUND,
        AssignmentError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssignmentError::CapacityExceeded { .. }
        | AssignmentError::AlreadyAssignedElsewhere { .. }
        | AssignmentError::NotApproved
        | AssignmentError::Lifecycle(_)
        | AssignmentError::Conflict { .. } => StatusCode::CONFLICT,
        AssignmentError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AssignmentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({ "error": err.to_string() });
    (status, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(rename = "departmentId")]
    pub(crate) department_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignFacultyRequest {
    #[serde(rename = "facultyId")]
    pub(crate) faculty_id: FacultyId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignStudentRequest {
    #[serde(rename = "internshipId")]
    pub(crate) internship_id: InternshipId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    pub(crate) comment: String,
}

pub(crate) async fn create_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    headers: HeaderMap,
    Json(draft): Json<super::domain::InternshipDraft>,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.create(&actor, draft) {
        Ok(stored) => (StatusCode::CREATED, Json(stored.record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let department = query.department_id.map(DepartmentId);
    match service.internships(department.as_ref()) {
        Ok(listed) => (StatusCode::OK, Json(listed)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    match service.internship(&InternshipId(id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_faculty_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AssignFacultyRequest>,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.assign_faculty(&actor, &InternshipId(id), &request.faculty_id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_student_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AssignStudentRequest>,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.assign_student(&actor, &request.internship_id, &StudentId(id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn unassign_student_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path((id, student_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.unassign_student(&actor, &InternshipId(id), &StudentId(student_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.submit(&actor, &InternshipId(id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approve_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.approve(&actor, &InternshipId(id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RejectRequest>,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.reject(&actor, &InternshipId(id), &request.comment) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn complete_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.complete(&actor, &InternshipId(id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.delete(&actor, &InternshipId(id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn batches_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
    Path(id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    match service.batches(&DepartmentId(id)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn dashboard_handler<S, N>(
    State(service): State<Arc<AllocationService<S, N>>>,
) -> Response
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    match service.dashboard() {
        Ok(counts) => (StatusCode::OK, Json(counts)).into_response(),
        Err(err) => error_response(err),
    }
}
