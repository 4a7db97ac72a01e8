mod common;

use book_donation_api::{
    dto::{
        books::{CreateBookRequest, UpdateBookRequest},
        donations::{ApproveDonationRequest, CreateDonationRequest, RejectDonationRequest},
        favourites::AddFavouriteRequest,
    },
    error::AppError,
    models::{BookCategory, BookCondition, BookStatus, DonationStatus, Role},
    routes::params::{BookQuery, DonationListQuery, Pagination},
    services::{book_service, donation_service, favourite_service},
};

// Donor lists a book, two recipients ask for it, the donor picks one.
#[tokio::test]
async fn request_approve_reject_and_favourites_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, mailer) = common::database_state(&database_url).await?;

    let donor = common::create_user(&state, Role::Donor, "donor@example.com", "Bandung").await?;
    let first = common::create_user(&state, Role::Recipient, "first@example.com", "Bandung").await?;
    let second =
        common::create_user(&state, Role::Recipient, "second@example.com", "Bandung").await?;
    let elsewhere =
        common::create_user(&state, Role::Recipient, "far@example.com", "Surabaya").await?;

    // Recipients cannot list books.
    let denied = book_service::create_book(&state, &first, new_book("Nope")).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let book = book_service::create_book(&state, &donor, new_book("Bumi Manusia"))
        .await?
        .data
        .unwrap();
    assert_eq!(book.status, BookStatus::Available);

    // Recipients see available books in their own city only.
    let nearby = book_service::list_books(&state, Some(&first), BookQuery::default())
        .await?
        .data
        .unwrap();
    assert!(nearby.items.iter().any(|b| b.id == book.id));
    let far = book_service::list_books(&state, Some(&elsewhere), BookQuery::default())
        .await?
        .data
        .unwrap();
    assert!(far.items.is_empty());

    let search = BookQuery {
        q: Some("manusia".into()),
        ..Default::default()
    };
    let found = book_service::list_books(&state, None, search).await?.data.unwrap();
    assert_eq!(found.items.len(), 1);

    let first_request = donation_service::request_book(&state, &first, request(book.id))
        .await?
        .data
        .unwrap();
    assert_eq!(first_request.donation.status, DonationStatus::Pending);

    let duplicate = donation_service::request_book(&state, &first, request(book.id)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let second_request = donation_service::request_book(&state, &second, request(book.id))
        .await?
        .data
        .unwrap();

    let incoming = donation_service::list_incoming(&state, &donor, DonationListQuery::default())
        .await?
        .data
        .unwrap();
    assert_eq!(incoming.items.len(), 2);

    // Only the owner decides.
    let stranger = donation_service::approve(
        &state,
        &second,
        first_request.donation.id,
        pickup("Jl. Braga 1"),
    )
    .await;
    assert!(matches!(stranger, Err(AppError::Forbidden(_))));

    let approved = donation_service::approve(
        &state,
        &donor,
        first_request.donation.id,
        pickup("Jl. Braga 1"),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(approved.donation.status, DonationStatus::Approved);
    assert_eq!(approved.donation.pickup_address.as_deref(), Some("Jl. Braga 1"));
    assert!(approved.donation.decided_at.is_some());
    assert_eq!(approved.book.map(|b| b.status), Some(BookStatus::Donated));

    let superseded = donation_service::get_donation(&state, &second, second_request.donation.id)
        .await?
        .data
        .unwrap();
    assert_eq!(superseded.donation.status, DonationStatus::Rejected);
    assert!(superseded.donation.rejection_reason.is_some());

    let approved_mail = mailer.sent_to("first@example.com");
    assert_eq!(approved_mail.len(), 1);
    assert!(approved_mail[0].subject.contains("approved"));
    assert!(approved_mail[0].html.contains("Jl. Braga 1"));
    let declined_mail = mailer.sent_to("second@example.com");
    assert_eq!(declined_mail.len(), 1);
    assert!(declined_mail[0].subject.contains("declined"));

    // A donated book is frozen.
    let late = donation_service::request_book(&state, &elsewhere, request(book.id)).await;
    assert!(matches!(late, Err(AppError::BadRequest(_))));
    let edit = book_service::update_book(
        &state,
        &donor,
        book.id,
        UpdateBookRequest {
            title: Some("Renamed".into()),
            author: None,
            description: None,
            image: None,
            condition: None,
            category: None,
        },
    )
    .await;
    assert!(matches!(edit, Err(AppError::BadRequest(_))));
    let erase = book_service::delete_book(&state, &donor, book.id).await;
    assert!(matches!(erase, Err(AppError::BadRequest(_))));
    let history = donation_service::get_donation(&state, &first, first_request.donation.id)
        .await?
        .data
        .unwrap();
    assert_eq!(history.donation.status, DonationStatus::Approved);

    // Rejection keeps the book available; a pending request can be withdrawn.
    let other = book_service::create_book(&state, &donor, new_book("Anak Semua Bangsa"))
        .await?
        .data
        .unwrap();
    let asked = donation_service::request_book(&state, &first, request(other.id))
        .await?
        .data
        .unwrap();
    let rejected = donation_service::reject(
        &state,
        &donor,
        asked.donation.id,
        RejectDonationRequest {
            reason: Some("Promised to a friend".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(rejected.donation.status, DonationStatus::Rejected);
    assert_eq!(rejected.book.map(|b| b.status), Some(BookStatus::Available));
    assert!(
        mailer
            .sent_to("first@example.com")
            .iter()
            .any(|m| m.html.contains("Promised to a friend"))
    );

    let again = donation_service::reject(&state, &donor, asked.donation.id, Default::default()).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    let pending = donation_service::request_book(&state, &second, request(other.id))
        .await?
        .data
        .unwrap();
    donation_service::cancel(&state, &second, pending.donation.id).await?;
    let outgoing = donation_service::list_outgoing(&state, &second, DonationListQuery::default())
        .await?
        .data
        .unwrap();
    assert!(outgoing.items.iter().all(|d| d.donation.id != pending.donation.id));

    // Favourites are idempotent both ways, even when the adds race.
    let (a, b) = tokio::join!(
        favourite_service::add_favourite(&state, &first, AddFavouriteRequest { book_id: other.id }),
        favourite_service::add_favourite(&state, &first, AddFavouriteRequest { book_id: other.id }),
    );
    assert_eq!(a?.data.unwrap().id, b?.data.unwrap().id);
    favourite_service::add_favourite(&state, &first, AddFavouriteRequest { book_id: other.id })
        .await?;
    let favourites = favourite_service::list_favourites(&state, &first, Pagination::new(1, 20))
        .await?
        .data
        .unwrap();
    assert_eq!(favourites.items.len(), 1);

    let removed = favourite_service::remove_favourite(&state, &first, other.id)
        .await?
        .data
        .unwrap();
    assert!(removed.removed);
    let removed = favourite_service::remove_favourite(&state, &first, other.id)
        .await?
        .data
        .unwrap();
    assert!(!removed.removed);

    // Deleting a listing takes its favourites and pending requests along.
    favourite_service::add_favourite(&state, &second, AddFavouriteRequest { book_id: other.id })
        .await?;
    donation_service::request_book(&state, &second, request(other.id)).await?;
    book_service::delete_book(&state, &donor, other.id).await?;
    let gone = book_service::get_book(&state, other.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));
    let missing = book_service::delete_book(&state, &donor, other.id).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    Ok(())
}

fn new_book(title: &str) -> CreateBookRequest {
    CreateBookRequest {
        title: title.to_string(),
        author: "Pramoedya Ananta Toer".to_string(),
        description: Some("Paperback, a little worn".to_string()),
        image: None,
        condition: BookCondition::Good,
        category: BookCategory::Fiction,
    }
}

fn request(book_id: uuid::Uuid) -> CreateDonationRequest {
    CreateDonationRequest {
        book_id,
        message: Some("I would love to read this".to_string()),
    }
}

fn pickup(address: &str) -> ApproveDonationRequest {
    ApproveDonationRequest {
        pickup_address: address.to_string(),
        pickup_date: chrono::Utc::now() + chrono::Duration::days(2),
        pickup_notes: Some("Ring the bell twice".to_string()),
    }
}
