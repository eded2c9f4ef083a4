//! Integration tests for review comment threads and URL ratings

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use sleuthdb::comments::{
    post_review_comment, replies, review_comments, url_rating, CommentError, NewReviewComment,
    WriterRef,
};

fn comment(review_id: i32, writer: WriterRef, root_id: Option<i32>, content: &str) -> NewReviewComment {
    NewReviewComment {
        review_id,
        writer,
        root_id,
        content: content.to_string(),
    }
}

#[actix_rt::test]
#[serial]
async fn test_thread_with_user_and_admin_writers() {
    let Some((config, db)) = bootstrapped("thread").await else {
        return;
    };
    let user = create_test_user(&db, "victim").await.unwrap();
    let admin = create_test_admin(&db, "analyst").await.unwrap();
    let review = create_test_review(&db, &admin, "Fake parcel SMS").await.unwrap();

    let root = post_review_comment(
        &db,
        comment(review.review_id, WriterRef::user(user.user_id), None, "Got this one too"),
    )
    .await
    .expect("Failed to post root comment");
    let reply = post_review_comment(
        &db,
        comment(
            review.review_id,
            WriterRef::admin(admin.admin_id),
            Some(root.comment_id),
            "  Thanks, added the sender number  ",
        ),
    )
    .await
    .expect("Failed to post reply");

    assert_eq!(reply.root_id, Some(root.comment_id));
    assert_eq!(reply.comment_content, "Thanks, added the sender number");
    assert_eq!(reply.writer().unwrap(), WriterRef::admin(admin.admin_id));
    assert_eq!(root.writer().unwrap(), WriterRef::user(user.user_id));

    let thread = review_comments(&db, review.review_id).await.unwrap();
    let ids: Vec<i32> = thread.iter().map(|c| c.comment_id).collect();
    assert_eq!(ids, vec![root.comment_id, reply.comment_id]);

    let children = replies(&db, root.comment_id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].comment_id, reply.comment_id);

    drop(db);
    drop_scratch(&config).await.expect("Failed to drop scratch database");
}

#[actix_rt::test]
#[serial]
async fn test_missing_root_is_rejected() {
    let Some((config, db)) = bootstrapped("missing_root").await else {
        return;
    };
    let user = create_test_user(&db, "reader").await.unwrap();
    let admin = create_test_admin(&db, "editor").await.unwrap();
    let review = create_test_review(&db, &admin, "Crypto doubling").await.unwrap();

    let result = post_review_comment(
        &db,
        comment(review.review_id, WriterRef::user(user.user_id), Some(999), "reply"),
    )
    .await;
    assert!(matches!(result, Err(CommentError::RootNotFound(999))));
    assert!(review_comments(&db, review.review_id).await.unwrap().is_empty());

    drop(db);
    drop_scratch(&config).await.expect("Failed to drop scratch database");
}

#[actix_rt::test]
#[serial]
async fn test_root_from_other_review_is_rejected() {
    let Some((config, db)) = bootstrapped("foreign_root").await else {
        return;
    };
    let user = create_test_user(&db, "reader").await.unwrap();
    let admin = create_test_admin(&db, "editor").await.unwrap();
    let first = create_test_review(&db, &admin, "Job offer").await.unwrap();
    let second = create_test_review(&db, &admin, "Rental deposit").await.unwrap();

    let root = post_review_comment(
        &db,
        comment(first.review_id, WriterRef::user(user.user_id), None, "Same here"),
    )
    .await
    .unwrap();

    let result = post_review_comment(
        &db,
        comment(
            second.review_id,
            WriterRef::user(user.user_id),
            Some(root.comment_id),
            "Wrong thread",
        ),
    )
    .await;
    assert!(matches!(
        result,
        Err(CommentError::RootInOtherReview { root_id, review_id })
            if root_id == root.comment_id && review_id == second.review_id
    ));

    drop(db);
    drop_scratch(&config).await.expect("Failed to drop scratch database");
}

#[actix_rt::test]
#[serial]
async fn test_writer_is_checked_against_its_role() {
    let Some((config, db)) = bootstrapped("writer").await else {
        return;
    };
    let user = create_test_user(&db, "only_user").await.unwrap();
    let admin = create_test_admin(&db, "only_admin").await.unwrap();
    let review = create_test_review(&db, &admin, "Lottery win").await.unwrap();

    // A user id does not make an admin
    let ghost = WriterRef::admin(user.user_id + admin.admin_id + 100);
    let result = post_review_comment(&db, comment(review.review_id, ghost, None, "hi")).await;
    assert!(matches!(result, Err(CommentError::WriterNotFound(w)) if w == ghost));

    let result = post_review_comment(
        &db,
        comment(review.review_id, WriterRef::user(user.user_id), None, "   "),
    )
    .await;
    assert!(matches!(result, Err(CommentError::EmptyContent)));

    let result = post_review_comment(
        &db,
        comment(review.review_id + 50, WriterRef::user(user.user_id), None, "hi"),
    )
    .await;
    assert!(matches!(result, Err(CommentError::ReviewNotFound(_))));

    drop(db);
    drop_scratch(&config).await.expect("Failed to drop scratch database");
}

#[actix_rt::test]
#[serial]
async fn test_schema_rejects_self_and_forward_roots() {
    let Some((config, db)) = bootstrapped("self_root").await else {
        return;
    };
    let admin = create_test_admin(&db, "moderator").await.unwrap();
    let review = create_test_review(&db, &admin, "Tech support call").await.unwrap();

    let insert = |comment_id: i32, root_id: i32| {
        Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO review_comment
                (comment_id, root_id, review_id, writer_id, writer_role, comment_content, created_at)
             VALUES ($1, $2, $3, $4, 'admin', 'loop', now())",
            vec![
                comment_id.into(),
                root_id.into(),
                review.review_id.into(),
                admin.admin_id.into(),
            ],
        )
    };

    assert!(db.execute(insert(500, 500)).await.is_err(), "self root accepted");
    assert!(db.execute(insert(501, 502)).await.is_err(), "forward root accepted");
    assert!(db.execute(insert(1000, 999)).await.is_err(), "missing root accepted");

    let bad_role = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "INSERT INTO review_comment
            (review_id, writer_id, writer_role, comment_content, created_at)
         VALUES ($1, $2, 'guest', 'hello', now())",
        vec![review.review_id.into(), admin.admin_id.into()],
    );
    assert!(db.execute(bad_role).await.is_err(), "unknown role accepted");

    drop(db);
    drop_scratch(&config).await.expect("Failed to drop scratch database");
}

#[actix_rt::test]
#[serial]
async fn test_url_rating_average() {
    let Some((config, db)) = bootstrapped("rating").await else {
        return;
    };
    let alice = create_test_user(&db, "alice").await.unwrap();
    let bob = create_test_user(&db, "bob").await.unwrap();
    let url = create_test_url(&db, "https://parcel-redelivery.example").await.unwrap();

    assert_eq!(url_rating(&db, url.url_id).await.unwrap(), None);

    rate_url(&db, &url, &alice, 4).await.unwrap();
    rate_url(&db, &url, &bob, 1).await.unwrap();

    let rating = url_rating(&db, url.url_id).await.unwrap().expect("Rating missing");
    assert_eq!(rating.count, 2);
    assert!((rating.average - 2.5).abs() < f64::EPSILON);

    drop(db);
    drop_scratch(&config).await.expect("Failed to drop scratch database");
}
