//! Application router configuration.

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::{
    AppState,
    account::{create_account_endpoint, get_account_endpoint, list_accounts_endpoint},
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budget_summary_endpoint,
        list_budgets_endpoint, update_budget_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
        update_category_endpoint,
    },
    endpoints,
    not_found::get_404_not_found,
    recurring::{
        create_rule_endpoint, delete_rule_endpoint, list_rules_endpoint, run_rules_endpoint,
        update_rule_endpoint,
    },
    summary::get_summary_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, list_transactions_endpoint,
        update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(endpoints::ACCOUNT, get(get_account_endpoint))
        .route(endpoints::ACCOUNT_SUMMARY, get(get_summary_endpoint))
        .route(
            endpoints::ACCOUNT_CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(
            endpoints::ACCOUNT_TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::ACCOUNT_BUDGETS,
            get(list_budgets_endpoint).post(create_budget_endpoint),
        )
        .route(
            endpoints::ACCOUNT_BUDGET_SUMMARY,
            get(get_budget_summary_endpoint),
        )
        .route(
            endpoints::BUDGET,
            put(update_budget_endpoint).delete(delete_budget_endpoint),
        )
        .route(
            endpoints::ACCOUNT_RECURRING_RULES,
            get(list_rules_endpoint).post(create_rule_endpoint),
        )
        .route(
            endpoints::RECURRING_RULE,
            put(update_rule_endpoint).delete(delete_rule_endpoint),
        )
        .route(endpoints::RUN_RECURRING_RULES, post(run_rules_endpoint))
        .fallback(get_404_not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, DEFAULT_RUN_TIMEOUT, endpoints, endpoints::format_endpoint};

    use super::build_router;

    fn get_test_server() -> TestServer {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "Etc/UTC",
            DEFAULT_RUN_TIMEOUT,
        )
        .unwrap();

        TestServer::new(build_router(state))
    }

    async fn create_account(server: &TestServer) -> i64 {
        let response = server
            .post(endpoints::ACCOUNTS)
            .json(&json!({ "name": "Everyday" }))
            .await;
        response.assert_status(StatusCode::CREATED);

        response.json::<Value>()["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let server = get_test_server();

        let response = server.get("/api/nope").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["error"], "no route for /api/nope");
    }

    #[tokio::test]
    async fn create_and_run_monthly_rule() {
        let server = get_test_server();
        let account_id = create_account(&server).await;

        let response = server
            .post(&format_endpoint(
                endpoints::ACCOUNT_RECURRING_RULES,
                account_id,
            ))
            .json(&json!({
                "amount": 1200.0,
                "direction": "expense",
                "cadence": "monthly",
                "day_of_month": 31,
                "start_date": "2024-01-31",
                "description": "Rent",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let rule = response.json::<Value>();
        assert_eq!(rule["amount"], -1200.0);
        assert_eq!(rule["next_run_date"], "2024-01-31");

        let run_path = format_endpoint(endpoints::RUN_RECURRING_RULES, account_id);
        for (as_of, expected_next_run) in [
            ("2024-01-31", "2024-02-29"),
            ("2024-02-29", "2024-03-31"),
        ] {
            let response = server
                .post(&run_path)
                .add_query_param("as_of", as_of)
                .await;
            response.assert_status_ok();
            let report = response.json::<Value>();
            assert_eq!(report["posted_count"], 1);
            assert_eq!(report["outcomes"][0]["status"], "posted");
            assert_eq!(report["outcomes"][0]["next_run_date"], expected_next_run);
        }

        let transactions = server
            .get(&format_endpoint(endpoints::ACCOUNT_TRANSACTIONS, account_id))
            .await
            .json::<Value>();
        assert_eq!(transactions.as_array().unwrap().len(), 2);
        assert_eq!(transactions[0]["amount"], -1200.0);
        assert_eq!(transactions[0]["description"], "Rent");
    }

    #[tokio::test]
    async fn invalid_rule_is_bad_request() {
        let server = get_test_server();
        let account_id = create_account(&server).await;

        let response = server
            .post(&format_endpoint(
                endpoints::ACCOUNT_RECURRING_RULES,
                account_id,
            ))
            .json(&json!({ "amount": 10.0, "cadence": "yearly" }))
            .await;

        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>()["error"],
            "\"yearly\" is not a supported cadence"
        );
    }

    #[tokio::test]
    async fn rule_can_be_edited_and_deleted() {
        let server = get_test_server();
        let account_id = create_account(&server).await;
        let rule = server
            .post(&format_endpoint(
                endpoints::ACCOUNT_RECURRING_RULES,
                account_id,
            ))
            .json(&json!({
                "amount": 30.0,
                "cadence": "weekly",
                "weekday": 1,
                "start_date": "2024-03-04",
            }))
            .await
            .json::<Value>();
        let rule_path = format_endpoint(endpoints::RECURRING_RULE, rule["id"].as_i64().unwrap());

        let response = server
            .put(&rule_path)
            .json(&json!({ "active": false }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["active"], false);

        server
            .delete(&rule_path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&rule_path)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn summary_route_is_wired() {
        let server = get_test_server();
        let account_id = create_account(&server).await;

        let response = server
            .get(&format_endpoint(endpoints::ACCOUNT_SUMMARY, account_id))
            .add_query_param("as_of", "2024-03-15")
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["months"].as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn category_of_other_account_cannot_be_used() {
        let server = get_test_server();
        let everyday = create_account(&server).await;
        let savings = server
            .post(endpoints::ACCOUNTS)
            .json(&json!({ "name": "Savings" }))
            .await
            .json::<Value>()["id"]
            .as_i64()
            .unwrap();
        let foreign = server
            .post(&format_endpoint(endpoints::ACCOUNT_CATEGORIES, savings))
            .json(&json!({ "name": "Foreign" }))
            .await
            .json::<Value>()["id"]
            .as_i64()
            .unwrap();

        let response = server
            .post(&format_endpoint(endpoints::ACCOUNT_RECURRING_RULES, everyday))
            .json(&json!({
                "amount": 25.0,
                "cadence": "weekly",
                "weekday": 1,
                "start_date": "2024-03-04",
                "category_id": foreign,
            }))
            .await;
        response.assert_status_bad_request();

        let response = server
            .post(&format_endpoint(endpoints::ACCOUNT_TRANSACTIONS, everyday))
            .json(&json!({ "amount": -25.0, "category_id": foreign }))
            .await;
        response.assert_status_bad_request();

        let response = server
            .post(&format_endpoint(endpoints::ACCOUNT_BUDGETS, everyday))
            .json(&json!({ "name": "Food", "monthly_limit": 100.0, "category_id": foreign }))
            .await;
        response.assert_status_bad_request();

        let run = server
            .post(&format_endpoint(endpoints::RUN_RECURRING_RULES, everyday))
            .add_query_param("as_of", "2024-03-04")
            .await
            .json::<Value>();
        assert_eq!(run["posted_count"], 0);
    }

    #[tokio::test]
    async fn category_and_transaction_can_be_edited() {
        let server = get_test_server();
        let account_id = create_account(&server).await;
        let category = server
            .post(&format_endpoint(endpoints::ACCOUNT_CATEGORIES, account_id))
            .json(&json!({ "name": "Food", "color": "#00ff00" }))
            .await
            .json::<Value>();
        let category_id = category["id"].as_i64().unwrap();
        let transaction = server
            .post(&format_endpoint(endpoints::ACCOUNT_TRANSACTIONS, account_id))
            .json(&json!({ "amount": 12.0, "direction": "expense" }))
            .await
            .json::<Value>();

        let response = server
            .put(&format_endpoint(endpoints::CATEGORY, category_id))
            .json(&json!({ "name": "Groceries", "color": null }))
            .await;
        response.assert_status_ok();
        let category = response.json::<Value>();
        assert_eq!(category["name"], "Groceries");
        assert_eq!(category["color"], Value::Null);

        let response = server
            .put(&format_endpoint(
                endpoints::TRANSACTION,
                transaction["id"].as_i64().unwrap(),
            ))
            .json(&json!({
                "amount": 20.0,
                "direction": "expense",
                "category_id": category_id,
                "status": "pending",
            }))
            .await;
        response.assert_status_ok();
        let transaction = response.json::<Value>();
        assert_eq!(transaction["amount"], -20.0);
        assert_eq!(transaction["category_id"], category_id);
        assert_eq!(transaction["status"], "pending");

        server
            .put(&format_endpoint(endpoints::TRANSACTION, 999))
            .json(&json!({}))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn budget_lifecycle() {
        let server = get_test_server();
        let account_id = create_account(&server).await;
        server
            .post(&format_endpoint(endpoints::ACCOUNT_TRANSACTIONS, account_id))
            .json(&json!({ "amount": -80.0, "occurred_at": "2024-03-10T12:00:00Z" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post(&format_endpoint(endpoints::ACCOUNT_BUDGETS, account_id))
            .json(&json!({ "name": "Everything", "monthly_limit": 200.0 }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let budget_path = format_endpoint(
            endpoints::BUDGET,
            response.json::<Value>()["id"].as_i64().unwrap(),
        );

        let summary = server
            .get(&format_endpoint(endpoints::ACCOUNT_BUDGET_SUMMARY, account_id))
            .add_query_param("as_of", "2024-03-20")
            .await
            .json::<Value>();
        assert_eq!(summary["month_start"], "2024-03-01");
        assert_eq!(summary["items"][0]["spent"], 80.0);
        assert_eq!(summary["items"][0]["percent"], 40);

        let response = server
            .put(&budget_path)
            .json(&json!({ "monthly_limit": 50.0 }))
            .await;
        response.assert_status_ok();
        let summary = server
            .get(&format_endpoint(endpoints::ACCOUNT_BUDGET_SUMMARY, account_id))
            .add_query_param("as_of", "2024-03-20")
            .await
            .json::<Value>();
        assert_eq!(summary["items"][0]["remaining"], 0.0);
        assert_eq!(summary["items"][0]["percent"], 100);

        server
            .delete(&budget_path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let budgets = server
            .get(&format_endpoint(endpoints::ACCOUNT_BUDGETS, account_id))
            .await
            .json::<Value>();
        assert_eq!(budgets.as_array().unwrap().len(), 0);
    }
}
