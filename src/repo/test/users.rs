use testcontainers::clients;
use crate::repo;
use crate::repo::test::{create_user, create_user_flat, profile, start_postgres, FIRST_NAME, TG_UID};

#[tokio::test]
async fn test_create_or_update() {
    let docker = clients::Cli::default();
    let (_container, db) = start_postgres(&docker).await;
    let users = repo::Users::new(db.clone());

    let user = users.create_or_update(profile(TG_UID, Some("ru")))
        .await.expect("couldn't create a user");
    assert_eq!(user.tg_user_id, TG_UID);
    assert_eq!(user.first_name, FIRST_NAME);
    assert_eq!(user.language_code.as_deref(), Some("ru"));

    let mut changed_profile = profile(TG_UID, Some("en"));
    changed_profile.username = Some("ivan_the_second".to_owned());
    let updated = users.create_or_update(changed_profile)
        .await.expect("couldn't update the user");
    assert_eq!(updated.id, user.id);
    assert_eq!(updated.username.as_deref(), Some("ivan_the_second"));
    assert_eq!(updated.language_code.as_deref(), Some("en"));

    let another = users.create_or_update(profile(TG_UID + 1, None))
        .await.expect("couldn't create another user");
    assert_ne!(another.id, user.id);

    let fetched = users.get(user.id)
        .await
        .expect("couldn't fetch the user")
        .expect("the user must exist");
    assert_eq!(fetched.username.as_deref(), Some("ivan_the_second"));
}

#[tokio::test]
async fn test_concurrent_first_logins() {
    let docker = clients::Cli::default();
    let (_container, db) = start_postgres(&docker).await;
    let users = repo::Users::new(db.clone());

    let (first, second) = tokio::join!(
        users.create_or_update(profile(TG_UID, Some("ru"))),
        users.create_or_update(profile(TG_UID, Some("ru")))
    );
    let first = first.expect("couldn't create a user");
    let second = second.expect("couldn't create a user");
    assert_eq!(first.id, second.id);

    let users_count: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
        .fetch_one(&db)
        .await
        .expect("couldn't count the users");
    assert_eq!(users_count, 1);
}

#[tokio::test]
async fn test_notification_target() {
    let docker = clients::Cli::default();
    let (_container, db) = start_postgres(&docker).await;
    let users = repo::Users::new(db.clone());
    let user_id = create_user(&db).await;
    let flat_id = create_user_flat(&db, user_id, None).await;

    let target = users.find_notification_target(flat_id)
        .await
        .expect("couldn't find the target")
        .expect("the owner is bound to Telegram");
    assert_eq!(target.tg_user_id, TG_UID);
    assert_eq!(target.language_code.as_deref(), Some("ru"));
}

#[tokio::test]
async fn test_sessions() {
    let docker = clients::Cli::default();
    let (_container, db) = start_postgres(&docker).await;
    let sessions = repo::Sessions::new(db.clone());
    let user_id = create_user(&db).await;

    let session = sessions.create(user_id, 30)
        .await.expect("couldn't create a session");
    assert_eq!(session.user_id, user_id);
    assert!(session.expires_at > session.created_at);

    let found = sessions.find_valid(&session.token)
        .await
        .expect("couldn't find the session")
        .expect("the session must be valid");
    assert_eq!(found.user_id, user_id);
    assert!(sessions.find_valid("unknown").await.expect("couldn't query sessions").is_none());

    let expired = sessions.create(user_id, 0)
        .await.expect("couldn't create an expired session");
    assert!(sessions.find_valid(&expired.token).await.expect("couldn't query sessions").is_none());
    assert_eq!(sessions.delete_expired().await.expect("couldn't delete expired sessions"), 1);

    assert!(sessions.delete(&session.token).await.expect("couldn't delete the session"));
    assert!(!sessions.delete(&session.token).await.expect("couldn't delete the session"));
}
