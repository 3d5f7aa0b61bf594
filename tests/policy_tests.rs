use chrono::Utc;
use blog_backend::{
    AppError,
    error::ResourceRef,
    models::{Comment, Post, Role, Tag},
    policy::{
        Operation, Principal, Requirement, authorize,
        guard::{self, OwnerAssignment},
        ownership::{is_admin, owns, owns_or_admin},
        require_principal,
        visibility::{self, CommentScope, PostQuery},
    },
};

const ADMIN: Principal = Principal { id: 1, role: Role::Admin };
const AUTHOR: Principal = Principal { id: 2, role: Role::Author };
const READER: Principal = Principal { id: 3, role: Role::Reader };

fn post(id: i64, author_id: i64, published: bool, tag: Option<Tag>) -> Post {
    let now = Utc::now();
    Post {
        id,
        author_id,
        title: format!("post {id}"),
        content: "body".to_string(),
        tag,
        published,
        published_at: None,
        likes_count: 0,
        created_at: now,
        updated_at: now,
    }
}

fn comment(id: i64, post_id: i64, author_id: i64) -> Comment {
    Comment {
        id,
        author_id,
        post_id,
        content: "c".to_string(),
        likes_count: 0,
        created_at: Utc::now(),
    }
}

// --- Requirement table ---

#[test]
fn test_public_operations_accept_anonymous() {
    for op in [
        Operation::ListPosts,
        Operation::ListPostsByTag,
        Operation::ReadPost,
        Operation::ListComments,
    ] {
        assert_eq!(op.requirement(), Requirement::Public);
        assert!(authorize(op, None).is_ok(), "{op} should be public");
    }
}

#[test]
fn test_everything_else_rejects_anonymous() {
    for op in [
        Operation::CreatePost,
        Operation::UpdatePost,
        Operation::DeletePost,
        Operation::LikePost,
        Operation::CreateComment,
        Operation::Follow,
        Operation::ListFollowers,
        Operation::DeleteAccount,
    ] {
        assert!(matches!(authorize(op, None), Err(AppError::Unauthenticated(Some(o))) if o == op));
    }
}

#[test]
fn test_role_gates() {
    assert!(authorize(Operation::CreatePost, Some(&AUTHOR)).is_ok());
    assert!(authorize(Operation::CreatePost, Some(&ADMIN)).is_ok());
    assert!(matches!(
        authorize(Operation::CreatePost, Some(&READER)),
        Err(AppError::Forbidden { operation: Operation::CreatePost, resource: None })
    ));

    assert!(authorize(Operation::Follow, Some(&READER)).is_ok());
    assert!(authorize(Operation::Follow, Some(&AUTHOR)).is_ok());
    assert!(matches!(
        authorize(Operation::Unfollow, Some(&ADMIN)),
        Err(AppError::Forbidden { .. })
    ));

    // Updating is gated by ownership, not role.
    assert!(authorize(Operation::UpdatePost, Some(&READER)).is_ok());
}

#[test]
fn test_require_principal_hands_back_the_caller() {
    let principal = require_principal(Operation::LikeComment, Some(&READER)).unwrap();
    assert_eq!(principal.id, READER.id);
    assert!(require_principal(Operation::ReadPost, None).is_err());
}

// --- Ownership ---

#[test]
fn test_ownership_helpers_are_false_for_anonymous() {
    assert!(!owns(None, 2));
    assert!(!is_admin(None));
    assert!(!owns_or_admin(None, 2));

    assert!(owns(Some(&AUTHOR), 2));
    assert!(!owns(Some(&READER), 2));
    assert!(owns_or_admin(Some(&ADMIN), 2));
}

// --- Visibility ---

#[test]
fn test_unpublished_post_visible_iff_owner_or_admin() {
    let draft = post(10, AUTHOR.id, false, None);
    let stranger = Principal::new(99, Role::Author);
    let cases = [
        (None, false),
        (Some(&READER), false),
        (Some(&AUTHOR), true),
        (Some(&ADMIN), true),
        (Some(&stranger), false),
    ];
    for (viewer, expected) in cases {
        assert_eq!(visibility::can_view_post(viewer, &draft), expected, "{viewer:?}");
    }

    let live = post(11, AUTHOR.id, true, None);
    assert!(visibility::can_view_post(None, &live));
}

#[test]
fn test_check_post_readable_distinguishes_anonymous() {
    let draft = post(10, AUTHOR.id, false, None);
    assert!(matches!(
        visibility::check_post_readable(None, &draft),
        Err(AppError::Unauthenticated(Some(Operation::ReadPost)))
    ));
    assert!(matches!(
        visibility::check_post_readable(Some(&READER), &draft),
        Err(AppError::Forbidden { resource: Some(ResourceRef::Post(10)), .. })
    ));
}

#[test]
fn test_post_listing_query() {
    let anonymous = visibility::post_listing(None, Some(2), None);
    assert_eq!(
        anonymous,
        PostQuery {
            published_only: true,
            author_id: Some(2),
            tag: None
        }
    );

    let admin = visibility::post_listing(Some(&ADMIN), None, Some(Tag::Technology));
    assert!(!admin.published_only);

    let author = visibility::post_listing(Some(&AUTHOR), None, None);
    assert!(author.published_only);
}

#[test]
fn test_post_query_matches() {
    let query = PostQuery {
        published_only: true,
        author_id: None,
        tag: Some(Tag::Technology),
    };
    assert!(query.matches(&post(1, 2, true, Some(Tag::Technology))));
    assert!(!query.matches(&post(1, 2, false, Some(Tag::Technology))));
    assert!(!query.matches(&post(1, 2, true, Some(Tag::Lifestyle))));
    assert!(!query.matches(&post(1, 2, true, None)));

    let own = PostQuery::owned_by(2);
    assert!(own.matches(&post(1, 2, false, None)));
    assert!(!own.matches(&post(1, 3, true, None)));
}

#[test]
fn test_comment_scope_precedence() {
    assert_eq!(
        visibility::comment_scope(None, Some(5), true).unwrap(),
        CommentScope::ByAuthor(5)
    );
    assert_eq!(visibility::comment_scope(None, None, true).unwrap(), CommentScope::All);
    assert_eq!(
        visibility::comment_scope(Some(&READER), None, false).unwrap(),
        CommentScope::Own(READER.id)
    );
    assert!(matches!(
        visibility::comment_scope(None, None, false),
        Err(AppError::Unauthenticated(Some(Operation::ListComments)))
    ));
}

#[test]
fn test_comment_scope_matches() {
    let own = CommentScope::Own(3);
    assert!(own.matches(1, &comment(1, 1, 3)));
    assert!(!own.matches(1, &comment(2, 1, 4)));
    assert!(!own.matches(2, &comment(3, 1, 3)));
    assert!(CommentScope::All.matches(1, &comment(4, 1, 9)));
}

#[test]
fn test_follow_subject_defaults_to_caller() {
    assert_eq!(
        visibility::follow_subject(Operation::ListFollowing, Some(&READER), None).unwrap(),
        READER.id
    );
    assert_eq!(
        visibility::follow_subject(Operation::ListFollowing, Some(&READER), Some(2)).unwrap(),
        2
    );
    assert!(visibility::follow_subject(Operation::ListFollowers, None, Some(2)).is_err());
}

#[test]
fn test_non_empty() {
    assert_eq!(visibility::non_empty(vec![1], ResourceRef::Posts).unwrap(), vec![1]);
    assert!(matches!(
        visibility::non_empty(Vec::<i32>::new(), ResourceRef::Comments),
        Err(AppError::NotFound(ResourceRef::Comments))
    ));
}

// --- Mutation guard ---

#[test]
fn test_post_owner_assignment() {
    assert_eq!(
        guard::post_owner(&ADMIN, Some(7)),
        OwnerAssignment { owner_id: 7, delegated: true }
    );
    assert_eq!(
        guard::post_owner(&ADMIN, Some(ADMIN.id)),
        OwnerAssignment { owner_id: ADMIN.id, delegated: false }
    );
    assert_eq!(
        guard::post_owner(&AUTHOR, Some(7)),
        OwnerAssignment { owner_id: AUTHOR.id, delegated: false }
    );
    assert_eq!(guard::post_owner(&ADMIN, None).owner_id, ADMIN.id);
}

#[test]
fn test_update_is_owner_only_but_delete_allows_admin() {
    let owned = post(1, AUTHOR.id, true, None);

    assert!(guard::ensure_can_update_post(&AUTHOR, &owned).is_ok());
    assert!(guard::ensure_can_update_post(&ADMIN, &owned).is_err());

    assert!(guard::ensure_can_delete_post(&AUTHOR, &owned).is_ok());
    assert!(guard::ensure_can_delete_post(&ADMIN, &owned).is_ok());
    assert!(matches!(
        guard::ensure_can_delete_post(&READER, &owned),
        Err(AppError::Forbidden { operation: Operation::DeletePost, resource: Some(ResourceRef::Post(1)) })
    ));
}

#[test]
fn test_comment_guard_has_no_admin_bypass() {
    let c = comment(4, 1, READER.id);
    assert!(guard::ensure_can_modify_comment(&READER, &c, Operation::DeleteComment).is_ok());
    assert!(guard::ensure_can_modify_comment(&ADMIN, &c, Operation::DeleteComment).is_err());
}

#[test]
fn test_self_follow_is_invalid() {
    assert!(matches!(
        guard::ensure_not_self_follow(&READER, READER.id),
        Err(AppError::Validation(_))
    ));
    assert!(guard::ensure_not_self_follow(&READER, AUTHOR.id).is_ok());
}
