//! Seed the database with a small demo catalog.
//!
//! Safe to run more than once: categories and the demo customer are
//! upserted, and books are only inserted when their ISBN is not present.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;

use bookshelf_core::CategoryId;

use super::CommandError;

/// Email of the demo customer.
pub const DEMO_CUSTOMER_EMAIL: &str = "reader@example.com";

const CATEGORIES: &[(&str, &str)] = &[
    ("Fiction", "Novels and short stories"),
    ("Science", "Popular science and natural history"),
    ("Programming", "Software engineering and computer science"),
];

struct SeedBook {
    title: &'static str,
    author: &'static str,
    category: &'static str,
    price: &'static str,
    stock: i32,
    isbn: &'static str,
    year: i32,
}

const BOOKS: &[SeedBook] = &[
    SeedBook {
        title: "The Left Hand of Darkness",
        author: "Ursula K. Le Guin",
        category: "Fiction",
        price: "15.99",
        stock: 12,
        isbn: "9780441478125",
        year: 1969,
    },
    SeedBook {
        title: "Piranesi",
        author: "Susanna Clarke",
        category: "Fiction",
        price: "18.00",
        stock: 3,
        isbn: "9781635575637",
        year: 2020,
    },
    SeedBook {
        title: "The Selfish Gene",
        author: "Richard Dawkins",
        category: "Science",
        price: "12.50",
        stock: 7,
        isbn: "9780198788607",
        year: 1976,
    },
    SeedBook {
        title: "Structure and Interpretation of Computer Programs",
        author: "Harold Abelson, Gerald Jay Sussman",
        category: "Programming",
        price: "55.00",
        stock: 2,
        isbn: "9780262510875",
        year: 1996,
    },
    SeedBook {
        title: "The Rust Programming Language",
        author: "Steve Klabnik, Carol Nichols",
        category: "Programming",
        price: "39.95",
        stock: 1,
        isbn: "9781718503106",
        year: 2023,
    },
];

/// Insert demo categories, books and a customer.
pub async fn run(pool: &PgPool) -> Result<(), CommandError> {
    let mut tx = pool.begin().await?;

    for (name, description) in CATEGORIES {
        sqlx::query(
            r"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
            ",
        )
        .bind(name)
        .bind(description)
        .execute(&mut *tx)
        .await?;
    }

    let mut inserted = 0_u64;
    for book in BOOKS {
        let price = Decimal::from_str(book.price)
            .map_err(|e| CommandError::InvalidInput(format!("{}: {e}", book.title)))?;
        let category_id =
            sqlx::query_scalar::<_, CategoryId>("SELECT id FROM categories WHERE name = $1")
                .bind(book.category)
                .fetch_one(&mut *tx)
                .await?;

        let result = sqlx::query(
            r"
            INSERT INTO books
                (title, author, price, stock_quantity, category_id, isbn, publication_year)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE NOT EXISTS (SELECT 1 FROM books WHERE isbn = $6)
            ",
        )
        .bind(book.title)
        .bind(book.author)
        .bind(price)
        .bind(book.stock)
        .bind(category_id)
        .bind(book.isbn)
        .bind(book.year)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    sqlx::query(
        r"
        INSERT INTO users (email, full_name)
        VALUES ($1, 'Demo Reader')
        ON CONFLICT (email) DO NOTHING
        ",
    )
    .bind(DEMO_CUSTOMER_EMAIL)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(
        categories = CATEGORIES.len(),
        books_inserted = inserted,
        customer = DEMO_CUSTOMER_EMAIL,
        "Seed complete"
    );
    Ok(())
}
