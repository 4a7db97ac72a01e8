use book_donation_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};
use uuid::Uuid;

struct SeedUser<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
    city: &'a str,
    role: Role,
}

const USERS: [SeedUser<'static>; 3] = [
    SeedUser {
        email: "admin@example.com",
        password: "admin123",
        name: "Admin",
        city: "Jakarta",
        role: Role::Admin,
    },
    SeedUser {
        email: "donor@example.com",
        password: "donor123",
        name: "Dina Donor",
        city: "Jakarta",
        role: Role::Donor,
    },
    SeedUser {
        email: "recipient@example.com",
        password: "recipient123",
        name: "Rian Recipient",
        city: "Jakarta",
        role: Role::Recipient,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let mut donor_id = None;
    for user in &USERS {
        let id = ensure_user(&pool, user).await?;
        if user.role == Role::Donor {
            donor_id = Some(id);
        }
    }

    if let Some(donor_id) = donor_id {
        seed_books(&pool, donor_id).await?;
    }

    println!("Seed completed");
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, user: &SeedUser<'_>) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(user.password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, is_verified)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (email) DO UPDATE SET is_verified = TRUE
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO user_details (id, user_id, name, city, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(user.name)
    .bind(user.city)
    .bind(user.role.as_str())
    .execute(pool)
    .await?;

    println!("Ensured user {} (role={})", user.email, user.role.as_str());
    Ok(user_id)
}

async fn seed_books(pool: &sqlx::PgPool, owner_id: Uuid) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        println!("Donor already has {existing} books, skipping");
        return Ok(());
    }

    let books = [
        ("Laskar Pelangi", "Andrea Hirata", "good", "fiction"),
        ("The Rust Programming Language", "Steve Klabnik", "like_new", "academic"),
        ("Si Kancil", "Anonim", "fair", "children"),
        ("Atomic Habits", "James Clear", "new", "self_help"),
    ];

    for (title, author, condition, category) in books {
        sqlx::query(
            r#"
            INSERT INTO books (id, owner_id, title, author, condition, category)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .bind(author)
        .bind(condition)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded books");
    Ok(())
}
