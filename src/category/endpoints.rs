//! Category route handlers.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AccountId, AppState, Error,
    account::get_account,
    category::{
        Category, CategoryId, CategoryKind,
        core::{
            CategoryName, CategoryPatch, create_category, delete_category, list_categories,
            update_category,
        },
    },
    db::lock_connection,
    patch::deserialize_present,
};

/// The state needed for managing categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    /// The category name.
    pub name: String,
    /// `income` or `expense`, defaults to `expense`.
    #[serde(default)]
    pub kind: CategoryKind,
    /// An optional display colour.
    #[serde(default)]
    pub color: Option<String>,
}

/// The request body for editing a category. Missing fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryPatchForm {
    /// The new category name.
    pub name: Option<String>,
    /// The new kind.
    pub kind: Option<CategoryKind>,
    /// The new colour, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub color: Option<Option<String>>,
}

impl CategoryPatchForm {
    fn into_patch(self) -> Result<CategoryPatch, Error> {
        Ok(CategoryPatch {
            name: self.name.as_deref().map(CategoryName::new).transpose()?,
            kind: self.kind,
            color: self.color,
        })
    }
}

/// List the categories of an account.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    list_categories(account_id, &connection).map(Json)
}

/// Create a category for an account.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Path(account_id): Path<AccountId>,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let name = CategoryName::new(&form.name)?;
    let connection = lock_connection(&state.db_connection)?;

    let category = create_category(account_id, name, form.kind, form.color, &connection)?;
    tracing::info!(
        "Created category #{} \"{}\" for account #{account_id}",
        category.id,
        category.name
    );

    Ok((StatusCode::CREATED, Json(category)))
}

/// Edit the name, kind or colour of a category.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Path(category_id): Path<CategoryId>,
    Json(form): Json<CategoryPatchForm>,
) -> Result<Json<Category>, Error> {
    let patch = form.into_patch()?;
    let connection = lock_connection(&state.db_connection)?;

    let category = update_category(category_id, &patch, &connection)?;
    tracing::info!("Updated category #{category_id}");

    Ok(Json(category))
}

/// Delete a category.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_category(category_id, &connection)?;
    tracing::info!("Deleted category #{category_id}");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        Error,
        account::create_test_account,
        category::{CategoryKind, create_test_category},
        db::initialize,
    };

    use super::{
        CategoryForm, CategoryPatchForm, CategoryState, create_category_endpoint,
        delete_category_endpoint, list_categories_endpoint, update_category_endpoint,
    };

    fn get_test_state() -> CategoryState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_test_account(&conn);

        CategoryState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn create_defaults_to_expense() {
        let state = get_test_state();
        let form: CategoryForm = serde_json::from_str(r#"{"name": "Groceries"}"#).unwrap();

        let (status, Json(category)) = create_category_endpoint(State(state), Path(1), Json(form))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(category.kind, CategoryKind::Expense);
        assert_eq!(category.account_id, 1);
    }

    #[tokio::test]
    async fn list_for_missing_account_is_not_found() {
        let state = get_test_state();

        let result = list_categories_endpoint(State(state), Path(5)).await;

        assert_eq!(result.unwrap_err(), Error::NotFound);
    }

    #[tokio::test]
    async fn delete_then_list_is_empty() {
        let state = get_test_state();
        let category = {
            let connection = state.db_connection.lock().unwrap();
            create_test_category(1, "Rent", &connection)
        };

        let status = delete_category_endpoint(State(state.clone()), Path(category.id))
            .await
            .unwrap();
        let Json(categories) = list_categories_endpoint(State(state), Path(1))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(categories.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_category_is_not_found() {
        let state = get_test_state();

        let result = delete_category_endpoint(State(state), Path(3)).await;

        assert_eq!(result.unwrap_err(), Error::DeleteMissingCategory);
    }

    #[tokio::test]
    async fn update_sets_and_clears_color() {
        let state = get_test_state();
        let form: CategoryForm =
            serde_json::from_str(r##"{"name": "Rent", "color": "#336699"}"##).unwrap();
        let (_, Json(category)) =
            create_category_endpoint(State(state.clone()), Path(1), Json(form))
                .await
                .unwrap();
        assert_eq!(category.color.as_deref(), Some("#336699"));

        let form: CategoryPatchForm =
            serde_json::from_str(r#"{"kind": "income", "color": null}"#).unwrap();
        let Json(updated) = update_category_endpoint(State(state), Path(category.id), Json(form))
            .await
            .unwrap();

        assert_eq!(updated.name.as_ref(), "Rent");
        assert_eq!(updated.kind, CategoryKind::Income);
        assert_eq!(updated.color, None);
    }

    #[tokio::test]
    async fn update_with_blank_name_is_rejected() {
        let state = get_test_state();
        let category = {
            let connection = state.db_connection.lock().unwrap();
            create_test_category(1, "Rent", &connection)
        };
        let form: CategoryPatchForm = serde_json::from_str(r#"{"name": "  "}"#).unwrap();

        let result = update_category_endpoint(State(state), Path(category.id), Json(form)).await;

        assert_eq!(result.unwrap_err(), Error::EmptyName);
    }

    #[tokio::test]
    async fn update_missing_category_is_not_found() {
        let state = get_test_state();

        let result =
            update_category_endpoint(State(state), Path(8), Json(CategoryPatchForm::default()))
                .await;

        assert_eq!(result.unwrap_err(), Error::UpdateMissingCategory);
    }
}
