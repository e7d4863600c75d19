//! Route handlers for managing subscription plans.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{AppState, Error, database_id::PlanId};

use super::core::{
    Plan, PlanForm, create_plan, delete_plan, get_all_plans, get_plan, update_plan,
};

/// The state needed by the plan endpoints.
#[derive(Debug, Clone)]
pub struct PlanState {
    /// The database connection for managing plans.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PlanState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

impl PlanState {
    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }
}

/// List every plan.
pub async fn get_plans_endpoint(State(state): State<PlanState>) -> Result<Json<Vec<Plan>>, Error> {
    let connection = state.connection()?;
    get_all_plans(&connection).map(Json)
}

/// Get a single plan.
pub async fn get_plan_endpoint(
    State(state): State<PlanState>,
    Path(plan_id): Path<PlanId>,
) -> Result<Json<Plan>, Error> {
    let connection = state.connection()?;
    get_plan(plan_id, &connection).map(Json)
}

/// Create a plan.
pub async fn create_plan_endpoint(
    State(state): State<PlanState>,
    Json(form): Json<PlanForm>,
) -> Result<impl IntoResponse, Error> {
    let connection = state.connection()?;
    let plan = create_plan(form, &connection)?;
    tracing::info!("created plan {} \"{}\"", plan.id, plan.name);

    Ok((StatusCode::CREATED, Json(plan)))
}

/// Replace a plan's fields.
pub async fn update_plan_endpoint(
    State(state): State<PlanState>,
    Path(plan_id): Path<PlanId>,
    Json(form): Json<PlanForm>,
) -> Result<Json<Plan>, Error> {
    let connection = state.connection()?;
    let plan = update_plan(plan_id, form, &connection)?;
    tracing::info!("updated plan {}", plan.id);

    Ok(Json(plan))
}

/// Delete a plan that no transaction refers to.
pub async fn delete_plan_endpoint(
    State(state): State<PlanState>,
    Path(plan_id): Path<PlanId>,
) -> Result<StatusCode, Error> {
    let connection = state.connection()?;
    delete_plan(plan_id, &connection)?;
    tracing::info!("deleted plan {plan_id}");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{
        build_router, endpoints,
        endpoints::format_endpoint,
        error::ErrorBody,
        plan::{Plan, PlanForm},
        test_utils::must_create_test_state,
    };

    fn get_test_server() -> TestServer {
        TestServer::try_new(build_router(must_create_test_state()))
            .expect("Could not create test server.")
    }

    fn basic_form() -> PlanForm {
        PlanForm {
            name: "Basic".to_owned(),
            price: 100.0,
            usage_limit: 5,
            period_days: 30,
            description: "Five posts a month".to_owned(),
        }
    }

    #[tokio::test]
    async fn create_then_list_plans() {
        let server = get_test_server();

        let response = server.post(endpoints::PLANS).json(&basic_form()).await;
        response.assert_status(StatusCode::CREATED);
        let created: Plan = response.json();

        let plans: Vec<Plan> = server.get(endpoints::PLANS).await.json();

        assert_eq!(plans, vec![created]);
    }

    #[tokio::test]
    async fn update_and_delete_plan() {
        let server = get_test_server();
        let created: Plan = server.post(endpoints::PLANS).json(&basic_form()).await.json();
        let plan_path = format_endpoint(endpoints::PLAN, created.id);

        let updated: Plan = server
            .put(&plan_path)
            .json(&PlanForm {
                price: 120.0,
                ..basic_form()
            })
            .await
            .json();
        assert_eq!(updated.price, 120.0);

        server
            .delete(&plan_path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&plan_path)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_plan_is_unprocessable() {
        let server = get_test_server();

        let response = server
            .post(endpoints::PLANS)
            .json(&PlanForm {
                name: String::new(),
                ..basic_form()
            })
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "plan name cannot be empty");
    }

    #[tokio::test]
    async fn oversized_period_is_unprocessable() {
        let server = get_test_server();

        let response = server
            .post(endpoints::PLANS)
            .json(&PlanForm {
                period_days: 10_000_000,
                ..basic_form()
            })
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let plans: Vec<Plan> = server.get(endpoints::PLANS).await.json();
        assert!(plans.is_empty());
    }
}
