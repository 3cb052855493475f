use sea_orm::{ActiveModelTrait, ActiveValue, DbErr, SqlErr};
use task_server::entities::task;
use task_server::task::{NewTask, TaskChanges, TaskService};

mod common;

fn new_task(title: &str, color: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        color: color.to_string(),
        completed: false,
    }
}

#[tokio::test]
async fn can_create_task() {
    let state = common::setup().await.expect("Failed to setup test context");
    let service = TaskService::new(&state.db);

    let created = service
        .create(new_task("learn rust", "orange"))
        .await
        .expect("Failed to create task");

    assert_eq!(created.title(), "learn rust");
    assert_eq!(created.color(), "orange");
    assert!(!created.completed());
    assert_eq!(created.created_at(), created.updated_at());

    let found = service
        .find_by_id(created.id())
        .await
        .expect("Failed to find task");
    assert_eq!(found, Some(created));
}

#[tokio::test]
async fn assigns_distinct_ids() {
    let state = common::setup().await.expect("Failed to setup test context");
    let service = TaskService::new(&state.db);

    let first = service.create(new_task("one", "red")).await.unwrap();
    let second = service.create(new_task("two", "red")).await.unwrap();

    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn duplicate_title_violates_unique_constraint() {
    let state = common::setup().await.expect("Failed to setup test context");
    let service = TaskService::new(&state.db);

    service.create(new_task("same", "red")).await.unwrap();
    let error = service
        .create(new_task("same", "blue"))
        .await
        .expect_err("Duplicate title must be rejected");

    assert!(matches!(
        error.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_))
    ));
}

#[tokio::test]
async fn can_find_task_by_title() {
    let state = common::setup().await.expect("Failed to setup test context");
    let service = TaskService::new(&state.db);

    let active_model = task::ActiveModel {
        title: ActiveValue::Set("walk the dog".to_string()),
        color: ActiveValue::Set("green".to_string()),
        ..Default::default()
    };
    let inserted = active_model.insert(&state.db).await.unwrap();
    assert!(!inserted.completed);

    let found = service.find_by_title("walk the dog").await.unwrap();
    assert_eq!(found.map(|task| task.id()), Some(inserted.id));
    assert_eq!(service.find_by_title("Walk The Dog").await.unwrap(), None);
}

#[tokio::test]
async fn can_update_subset_of_fields() {
    let state = common::setup().await.expect("Failed to setup test context");
    let service = TaskService::new(&state.db);
    let created = service.create(new_task("paint", "white")).await.unwrap();

    let updated = service
        .update(
            created.id(),
            TaskChanges {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update task");

    assert_eq!(updated.id(), created.id());
    assert_eq!(updated.title(), "paint");
    assert_eq!(updated.color(), "white");
    assert!(updated.completed());
    assert!(updated.updated_at() >= created.updated_at());
}

#[tokio::test]
async fn update_of_missing_task_is_record_not_updated() {
    let state = common::setup().await.expect("Failed to setup test context");
    let service = TaskService::new(&state.db);

    let result = service
        .update(
            4242,
            TaskChanges {
                color: Some("black".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(DbErr::RecordNotUpdated) | Err(DbErr::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn can_delete_task() {
    let state = common::setup().await.expect("Failed to setup test context");
    let service = TaskService::new(&state.db);
    let created = service.create(new_task("temporary", "grey")).await.unwrap();

    service.delete(created.id()).await.expect("Failed to delete");

    assert_eq!(service.find_by_id(created.id()).await.unwrap(), None);
    assert!(matches!(
        service.delete(created.id()).await,
        Err(DbErr::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn can_list_tasks_in_id_order() {
    let state = common::setup().await.expect("Failed to setup test context");
    let service = TaskService::new(&state.db);
    assert!(service.list_all().await.unwrap().is_empty());

    let first = service.create(new_task("a", "red")).await.unwrap();
    let second = service.create(new_task("b", "red")).await.unwrap();

    let tasks = service.list_all().await.unwrap();
    assert_eq!(tasks, vec![first, second]);
}
