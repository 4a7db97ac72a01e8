mod common;

use book_donation_api::{
    dto::{
        admin::BlockUserRequest,
        auth::{ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest},
        chat::{SendMessageRequest, StartConversationRequest},
        users::{ReportUserRequest, UpdateProfileRequest},
    },
    entity::{Users, users},
    error::AppError,
    middleware::auth::AuthUser,
    models::Role,
    routes::params::{Pagination, UserListQuery},
    services::{admin_service, auth_service, chat_service, user_service},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

// Both flows truncate the same tables, so they run in sequence. Each one
// migrates the same database again, which must be a no-op.
#[tokio::test]
async fn account_lifecycle_flows() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    signup_verify_login_and_reset(&database_url).await?;
    reporting_admin_and_chat(&database_url).await?;
    Ok(())
}

// Signup -> verify -> login, then password reset.
async fn signup_verify_login_and_reset(database_url: &str) -> anyhow::Result<()> {
    let (state, mailer) = common::database_state(database_url).await?;

    let profile = auth_service::signup(
        &state,
        SignupRequest {
            email: "  Ayu@Example.com ".into(),
            password: "first-pass".into(),
            name: "Ayu".into(),
            city: "Yogyakarta".into(),
            address: None,
            role: Role::Donor,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(profile.email, "ayu@example.com");
    assert!(!profile.is_verified);

    let verification = mailer.sent_to("ayu@example.com");
    assert_eq!(verification.len(), 1);
    assert!(verification[0].html.contains("/api/auth/verify?token="));

    let taken = auth_service::signup(
        &state,
        SignupRequest {
            email: "ayu@example.com".into(),
            password: "another-pass".into(),
            name: "Ayu Two".into(),
            city: "Yogyakarta".into(),
            address: None,
            role: Role::Recipient,
        },
    )
    .await;
    assert!(matches!(taken, Err(AppError::Conflict(_))));

    // Racing signups for one address create exactly one account.
    let twin = |name: &str| SignupRequest {
        email: "twin@example.com".into(),
        password: "twin-pass".into(),
        name: name.into(),
        city: "Solo".into(),
        address: None,
        role: Role::Recipient,
    };
    let (a, b) = tokio::join!(
        auth_service::signup(&state, twin("Twin A")),
        auth_service::signup(&state, twin("Twin B")),
    );
    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    assert!(matches!(a, Err(AppError::Conflict(_))) || matches!(b, Err(AppError::Conflict(_))));

    let unverified = auth_service::login(&state, login("ayu@example.com", "first-pass")).await;
    assert!(matches!(unverified, Err(AppError::Forbidden(_))));

    let token = stored_user(&state, "ayu@example.com")
        .await?
        .verify_token
        .expect("verify token");
    auth_service::verify_email(&state, &token).await?;
    let reused = auth_service::verify_email(&state, &token).await;
    assert!(matches!(reused, Err(AppError::BadRequest(_))));

    let wrong = auth_service::login(&state, login("ayu@example.com", "nope-nope")).await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

    let (cookie, resp) = auth_service::login(&state, login("AYU@example.com", "first-pass")).await?;
    let session = resp.data.unwrap();
    assert_eq!(cookie.name(), "token");
    assert_eq!(cookie.value(), session.token);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(session.user.role, Role::Donor);

    // Unknown addresses get the same answer and no mail.
    let sent_before = mailer.sent().len();
    auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: "ghost@example.com".into(),
        },
    )
    .await?;
    assert_eq!(mailer.sent().len(), sent_before);

    auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: "ayu@example.com".into(),
        },
    )
    .await?;
    assert!(
        mailer
            .sent_to("ayu@example.com")
            .iter()
            .any(|m| m.subject == "Reset your password")
    );

    let reset_token = stored_user(&state, "ayu@example.com")
        .await?
        .reset_token
        .expect("reset token");
    auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: reset_token.clone(),
            password: "second-pass".into(),
        },
    )
    .await?;
    let replay = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: reset_token,
            password: "third-pass".into(),
        },
    )
    .await;
    assert!(matches!(replay, Err(AppError::BadRequest(_))));

    let old = auth_service::login(&state, login("ayu@example.com", "first-pass")).await;
    assert!(matches!(old, Err(AppError::Unauthorized(_))));
    auth_service::login(&state, login("ayu@example.com", "second-pass")).await?;

    Ok(())
}

// Reports block a user at the threshold; an admin lifts the block; chat between users.
async fn reporting_admin_and_chat(database_url: &str) -> anyhow::Result<()> {
    let (state, _mailer) = common::database_state(database_url).await?;
    assert_eq!(state.config.report_block_threshold, 3);

    let admin = common::create_user(&state, Role::Admin, "admin@example.com", "Medan").await?;
    let target = common::create_user(&state, Role::Donor, "target@example.com", "Medan").await?;
    let mut reporters: Vec<AuthUser> = Vec::new();
    for n in 0..3 {
        let email = format!("reporter{n}@example.com");
        reporters.push(common::create_user(&state, Role::Recipient, &email, "Medan").await?);
    }

    let own = user_service::report_user(&state, &target, target.user_id, reason()).await;
    assert!(matches!(own, Err(AppError::BadRequest(_))));

    let first = user_service::report_user(&state, &reporters[0], target.user_id, reason())
        .await?
        .data
        .unwrap();
    assert_eq!(first.report_count, 1);
    assert!(!first.is_blocked);

    let repeat = user_service::report_user(&state, &reporters[0], target.user_id, reason()).await;
    assert!(matches!(repeat, Err(AppError::Conflict(_))));

    user_service::report_user(&state, &reporters[1], target.user_id, reason()).await?;
    let third = user_service::report_user(&state, &reporters[2], target.user_id, reason())
        .await?
        .data
        .unwrap();
    assert_eq!(third.report_count, 3);
    assert!(third.is_blocked);

    let blocked_login = auth_service::login(&state, login("target@example.com", common::PASSWORD)).await;
    assert!(matches!(blocked_login, Err(AppError::Forbidden(_))));

    // Admin surface.
    let not_admin = admin_service::dashboard_stats(&state, &target).await;
    assert!(matches!(not_admin, Err(AppError::Forbidden(_))));

    let stats = admin_service::dashboard_stats(&state, &admin).await?.data.unwrap();
    assert_eq!(stats.users.total, 5);
    assert_eq!(stats.users.recipients, 3);
    assert_eq!(stats.users.blocked, 1);
    assert_eq!(stats.books.total, 0);

    let blocked_users = admin_service::list_users(
        &state,
        &admin,
        UserListQuery {
            blocked: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(blocked_users.items.len(), 1);
    assert_eq!(blocked_users.items[0].id, target.user_id);

    let reports = admin_service::list_reports(&state, &admin, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(reports.items.len(), 3);

    let self_block = admin_service::set_blocked(
        &state,
        &admin,
        admin.user_id,
        BlockUserRequest { blocked: true },
    )
    .await;
    assert!(matches!(self_block, Err(AppError::BadRequest(_))));

    let restored = admin_service::set_blocked(
        &state,
        &admin,
        target.user_id,
        BlockUserRequest { blocked: false },
    )
    .await?
    .data
    .unwrap();
    assert!(!restored.is_blocked);
    assert_eq!(restored.report_count, 0);

    // Profile edits reject blank required fields.
    let blank = user_service::update_me(
        &state,
        &target,
        UpdateProfileRequest {
            name: Some("  ".into()),
            city: None,
            address: None,
            photo: None,
        },
    )
    .await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));
    let moved = user_service::update_me(
        &state,
        &target,
        UpdateProfileRequest {
            name: None,
            city: Some("Padang".into()),
            address: Some("Jl. Sudirman 5".into()),
            photo: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(moved.city, "Padang");

    // Chat: one conversation per pair, unread counts clear on read.
    let reader = &reporters[0];
    let conversation = chat_service::start_conversation(
        &state,
        &target,
        StartConversationRequest {
            participant_id: reader.user_id,
        },
    )
    .await?
    .data
    .unwrap();
    let same = chat_service::start_conversation(
        &state,
        reader,
        StartConversationRequest {
            participant_id: target.user_id,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(conversation.id, same.id);

    let empty = chat_service::send_message(
        &state,
        &target,
        conversation.id,
        SendMessageRequest { body: "   ".into() },
    )
    .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    chat_service::send_message(
        &state,
        &target,
        conversation.id,
        SendMessageRequest {
            body: "The book is still here if you want it".into(),
        },
    )
    .await?;

    let outsider = chat_service::list_messages(
        &state,
        &reporters[1],
        conversation.id,
        Pagination::default(),
    )
    .await;
    assert!(matches!(outsider, Err(AppError::Forbidden(_))));

    let inbox = chat_service::list_conversations(&state, reader, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(inbox.items.len(), 1);
    assert_eq!(inbox.items[0].unread, 1);

    let messages = chat_service::list_messages(&state, reader, conversation.id, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(messages.items.len(), 1);

    let inbox = chat_service::list_conversations(&state, reader, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(inbox.items[0].unread, 0);

    Ok(())
}

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.into(),
        password: password.into(),
    }
}

fn reason() -> ReportUserRequest {
    ReportUserRequest {
        reason: "Did not show up for pickup".into(),
    }
}

async fn stored_user(
    state: &book_donation_api::state::AppState,
    email: &str,
) -> anyhow::Result<users::Model> {
    Users::find()
        .filter(users::Column::Email.eq(email))
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {email} not found"))
}
