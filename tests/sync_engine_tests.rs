//! Integration tests for the sync engine: full cycles against a mock Jira
//! API, idempotent re-syncs, token refresh on 401 and per-connection
//! failure isolation.

use jiradash_sync::models::{assignee, board, connection, issue, sprint, sync_job};
use jiradash_sync::sync::SyncEngine;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod test_utils;
use test_utils::{insert_connection, setup_test_db, test_cipher, test_config};

fn agile_path(cloud_id: &str, rest: &str) -> String {
    format!("/ex/jira/{cloud_id}/rest/agile/1.0{rest}")
}

fn board_page(boards: &[(i64, &str)], is_last: bool) -> serde_json::Value {
    json!({
        "values": boards.iter().map(|(id, name)| json!({
            "id": id,
            "name": name,
            "type": "scrum",
        })).collect::<Vec<_>>(),
        "isLast": is_last,
        "startAt": 0,
        "maxResults": 50,
    })
}

fn empty_sprints() -> serde_json::Value {
    json!({"values": [], "isLast": true, "startAt": 0, "maxResults": 50})
}

fn empty_issues() -> serde_json::Value {
    json!({"issues": [], "startAt": 0, "maxResults": 50, "total": 0})
}

async fn mock_empty_board_children(server: &MockServer, cloud_id: &str, board_id: i64) {
    Mock::given(method("GET"))
        .and(path(agile_path(cloud_id, &format!("/board/{board_id}/sprint"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_sprints()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path(cloud_id, &format!("/board/{board_id}/issue"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_issues()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_cycle_persists_boards_sprints_issues_and_assignees() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let conn = insert_connection(&db, "cloud-1", "access-token", Some("refresh-token"))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .and(header("authorization", "Bearer access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "Team Alpha")], true)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/sprint")))
        .and(query_param("state", "active,future,closed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{
                "id": 101,
                "name": "Sprint 1",
                "state": "active",
                "startDate": "2025-11-01T09:00:00.000Z",
                "endDate": "2025-11-14T17:00:00.000Z",
                "goal": "Ship the prototype",
            }],
            "isLast": true,
            "startAt": 0,
            "maxResults": 50,
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/issue")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [{
                "id": "10001",
                "key": "PROJ-1",
                "fields": {
                    "summary": "Fix login flow",
                    "issuetype": {"name": "Bug"},
                    "status": {"name": "In Progress", "statusCategory": {"name": "In Progress"}},
                    "priority": {"name": "High"},
                    "assignee": {
                        "accountId": "acc-1",
                        "displayName": "Dana Scully",
                        "emailAddress": "dana@example.com",
                        "active": true,
                    },
                    "created": "2025-10-01T08:00:00.000+0000",
                    "updated": "2025-11-05T08:00:00.000+0000",
                },
            }],
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(db.clone(), &test_config(&server.uri(), &server.uri())).unwrap();
    let summary = engine.run_cycle().await.unwrap();

    assert_eq!(summary.connections, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);

    let boards = board::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].name, "Team Alpha");
    assert_eq!(boards[0].jira_id, "1");
    assert_eq!(boards[0].connection_id, conn.id);

    let sprints = sprint::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(sprints.len(), 1);
    assert_eq!(sprints[0].state, "active");
    assert_eq!(sprints[0].goal.as_deref(), Some("Ship the prototype"));
    assert!(sprints[0].start_date.is_some());

    let assignees = assignee::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(assignees.len(), 1);
    assert_eq!(assignees[0].display_name, "Dana Scully");

    let issues = issue::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].key, "PROJ-1");
    assert_eq!(issues[0].issue_type, "Bug");
    assert_eq!(issues[0].assignee_id, Some(assignees[0].id));
    assert!(issues[0].jira_created_at.is_some());

    let jobs = sync_job::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, "success");
    assert!(jobs[0].finished_at.is_some());
    assert!(jobs[0].error_message.is_none());
}

#[tokio::test]
async fn test_resync_updates_rows_in_place() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    insert_connection(&db, "cloud-1", "access-token", None)
        .await
        .unwrap();

    // First cycle sees the old board name, second cycle the new one
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "Old Name")], true)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "New Name")], true)))
        .mount(&server)
        .await;
    mock_empty_board_children(&server, "cloud-1", 1).await;

    let engine = SyncEngine::new(db.clone(), &test_config(&server.uri(), &server.uri())).unwrap();

    engine.run_cycle().await.unwrap();
    let first = board::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].name, "Old Name");

    engine.run_cycle().await.unwrap();
    let second = board::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(second.len(), 1, "re-sync must not duplicate the board");
    assert_eq!(second[0].name, "New Name");
    assert_eq!(second[0].id, first[0].id, "local id must stay stable");
}

#[tokio::test]
async fn test_board_pagination_follows_is_last() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    insert_connection(&db, "cloud-1", "access-token", None)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .and(query_param("startAt", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "First")], false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .and(query_param("startAt", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(2, "Second")], true)))
        .mount(&server)
        .await;
    mock_empty_board_children(&server, "cloud-1", 1).await;
    mock_empty_board_children(&server, "cloud-1", 2).await;

    let engine = SyncEngine::new(db.clone(), &test_config(&server.uri(), &server.uri())).unwrap();
    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.succeeded, 1);

    let boards = board::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(boards.len(), 2);
}

#[tokio::test]
async fn test_repeat_cycle_with_unchanged_data_leaves_rows_identical() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    insert_connection(&db, "cloud-1", "access-token", None)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "Team Alpha")], true)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/sprint")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": 101, "name": "Sprint 1", "state": "active"}],
            "isLast": true,
            "startAt": 0,
            "maxResults": 50,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/issue")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [{
                "id": "10001",
                "key": "PROJ-1",
                "fields": {
                    "summary": "Fix login flow",
                    "assignee": {"accountId": "acc-1", "displayName": "Dana Scully"},
                },
            }],
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(db.clone(), &test_config(&server.uri(), &server.uri())).unwrap();

    engine.run_cycle().await.unwrap();
    let boards_1 = board::Entity::find().all(db.as_ref()).await.unwrap();
    let sprints_1 = sprint::Entity::find().all(db.as_ref()).await.unwrap();
    let issues_1 = issue::Entity::find().all(db.as_ref()).await.unwrap();
    let assignees_1 = assignee::Entity::find().all(db.as_ref()).await.unwrap();

    engine.run_cycle().await.unwrap();
    let boards_2 = board::Entity::find().all(db.as_ref()).await.unwrap();
    let sprints_2 = sprint::Entity::find().all(db.as_ref()).await.unwrap();
    let issues_2 = issue::Entity::find().all(db.as_ref()).await.unwrap();
    let assignees_2 = assignee::Entity::find().all(db.as_ref()).await.unwrap();

    assert_eq!(boards_2.len(), 1);
    assert_eq!((boards_2[0].id, &boards_2[0].name), (boards_1[0].id, &boards_1[0].name));
    assert_eq!(sprints_2.len(), 1);
    assert_eq!(
        (sprints_2[0].id, &sprints_2[0].name, &sprints_2[0].state),
        (sprints_1[0].id, &sprints_1[0].name, &sprints_1[0].state)
    );
    assert_eq!(issues_2.len(), 1);
    assert_eq!(
        (issues_2[0].id, &issues_2[0].key, issues_2[0].assignee_id),
        (issues_1[0].id, &issues_1[0].key, issues_1[0].assignee_id)
    );
    assert_eq!(assignees_2.len(), 1);
    assert_eq!(assignees_2[0].id, assignees_1[0].id);
}

#[tokio::test]
async fn test_sprint_listing_400_skips_board_without_failing_connection() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    insert_connection(&db, "cloud-1", "access-token", None)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "Kanban")], true)))
        .mount(&server)
        .await;
    // Kanban boards reject the sprint listing with a 400
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/sprint")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"errorMessages": ["The board does not support sprints"]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/issue")))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_issues()))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(db.clone(), &test_config(&server.uri(), &server.uri())).unwrap();
    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(sprint::Entity::find().all(db.as_ref()).await.unwrap().len(), 0);
    let jobs = sync_job::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(jobs[0].status, "success");
}

#[tokio::test]
async fn test_sprint_listing_404_fails_connection() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    insert_connection(&db, "cloud-1", "access-token", None)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "Board")], true)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/sprint")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(db.clone(), &test_config(&server.uri(), &server.uri())).unwrap();
    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 1);

    let jobs = sync_job::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(jobs[0].status, "failed");
    assert!(jobs[0].error_message.as_deref().unwrap().contains("404"));
}

#[tokio::test]
async fn test_401_triggers_single_refresh_then_retries_pass() {
    let db = setup_test_db().await.unwrap();
    let api = MockServer::start().await;
    let oauth = MockServer::start().await;
    let conn = insert_connection(&db, "cloud-1", "stale-token", Some("refresh-token"))
        .await
        .unwrap();

    // Stale token is rejected, fresh one accepted
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "Team Alpha")], true)))
        .mount(&api)
        .await;
    mock_empty_board_children(&api, "cloud-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "refresh_token": "rotated-refresh",
            "expires_in": 3600,
            "scope": "offline_access read:jira-work",
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&oauth)
        .await;

    let engine = SyncEngine::new(db.clone(), &test_config(&api.uri(), &oauth.uri())).unwrap();
    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);

    let jobs = sync_job::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(jobs[0].status, "success");

    // Stored bundles now decrypt to the rotated token pair
    let updated = connection::Entity::find_by_id(conn.id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let cipher = test_cipher();
    let access = cipher
        .decrypt(&jiradash_sync::crypto::EncryptedToken::from_json(&updated.access_token_enc).unwrap())
        .unwrap();
    assert_eq!(access, "fresh-token");
    let refresh = cipher
        .decrypt(
            &jiradash_sync::crypto::EncryptedToken::from_json(
                updated.refresh_token_enc.as_ref().unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
    assert_eq!(refresh, "rotated-refresh");
}

#[tokio::test]
async fn test_401_without_refresh_token_fails_job_without_token_call() {
    let db = setup_test_db().await.unwrap();
    let api = MockServer::start().await;
    let oauth = MockServer::start().await;
    insert_connection(&db, "cloud-1", "stale-token", None)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&oauth)
        .await;

    let engine = SyncEngine::new(db.clone(), &test_config(&api.uri(), &oauth.uri())).unwrap();
    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.failed, 1);

    let jobs = sync_job::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(jobs[0].status, "failed");
    let message = jobs[0].error_message.as_deref().unwrap();
    assert!(message.contains("reconnect required"), "got: {message}");
}

#[tokio::test]
async fn test_second_401_after_refresh_is_terminal() {
    let db = setup_test_db().await.unwrap();
    let api = MockServer::start().await;
    let oauth = MockServer::start().await;
    insert_connection(&db, "cloud-1", "stale-token", Some("refresh-token"))
        .await
        .unwrap();

    // Even the refreshed token is rejected
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600,
            "scope": "read:jira-work",
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&oauth)
        .await;

    let engine = SyncEngine::new(db.clone(), &test_config(&api.uri(), &oauth.uri())).unwrap();
    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.failed, 1);

    let jobs = sync_job::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(jobs[0].status, "failed");
    assert!(
        jobs[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("reconnect required")
    );
}

#[tokio::test]
async fn test_connection_failure_does_not_block_others() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let broken = insert_connection(&db, "cloud-broken", "token-a", None)
        .await
        .unwrap();
    let healthy = insert_connection(&db, "cloud-healthy", "token-b", None)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-broken", "/board")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-healthy", "/board")))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "Healthy")], true)))
        .mount(&server)
        .await;
    mock_empty_board_children(&server, "cloud-healthy", 1).await;

    let engine = SyncEngine::new(db.clone(), &test_config(&server.uri(), &server.uri())).unwrap();
    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.connections, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let failed_jobs = sync_job::Entity::find()
        .filter(sync_job::Column::ConnectionId.eq(broken.id))
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(failed_jobs[0].status, "failed");

    let ok_jobs = sync_job::Entity::find()
        .filter(sync_job::Column::ConnectionId.eq(healthy.id))
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(ok_jobs[0].status, "success");

    let boards = board::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].connection_id, healthy.id);
}

#[tokio::test]
async fn test_unassigned_issue_and_missing_fields_use_defaults() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    insert_connection(&db, "cloud-1", "access-token", None)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board")))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_page(&[(1, "Board")], true)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/sprint")))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_sprints()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(agile_path("cloud-1", "/board/1/issue")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [{
                "id": "10002",
                "key": "PROJ-2",
                "fields": {
                    "summary": "Orphan task",
                    "created": "not a timestamp",
                },
            }],
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(db.clone(), &test_config(&server.uri(), &server.uri())).unwrap();
    engine.run_cycle().await.unwrap();

    let issues = issue::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].issue_type, "Unknown");
    assert_eq!(issues[0].status, "Unknown");
    assert!(issues[0].assignee_id.is_none());
    assert!(issues[0].jira_created_at.is_none(), "bad dates become NULL");
    assert_eq!(assignee::Entity::find().all(db.as_ref()).await.unwrap().len(), 0);
}
