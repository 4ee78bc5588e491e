//! Catalog, reviews and the unauthenticated surface over HTTP.

#![allow(clippy::unwrap_used)] // Integration tests can unwrap for setup

mod common;

use axum::http::StatusCode;
use common::{TestApp, WithSession, body};
use serde_json::json;

fn new_book(title: &str, isbn: &str) -> serde_json::Value {
    json!({
        "title": title,
        "description": format!("{title} from first principles"),
        "author": "Tim McNamara",
        "price": 45.5,
        "rating": 4,
        "stock": 120,
        "category": "Programming",
        "publishedAt": "2021-08-10",
        "isbn": isbn
    })
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let app = TestApp::new();

    app.server.get("/health").await.assert_status_ok();
    app.server.get("/ready").await.assert_status_ok();
    // No recorder installed in tests
    app.server.get("/metrics").await.assert_status_not_found();

    let response = app.server.get("/api/nowhere").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(body(&response)["message"], "Can't find the route");
}

#[tokio::test]
async fn admin_manages_books() {
    let app = TestApp::new();
    let admin = app.logged_in_admin("admin@example.com").await;

    let response = app
        .server
        .post("/api/books/create")
        .with_session(&admin)
        .json(&new_book("Rust in Action", "9781617294556"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created = body(&response);
    assert_eq!(created["message"], "Successfully added a new book");
    assert_eq!(created["data"]["price"], 45.5);
    let book_id = created["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .post("/api/books/create")
        .with_session(&admin)
        .json(&new_book("Rust in Action", "9780306406157"))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(&response)["message"],
        "Book with the same title already exists"
    );

    let response = app
        .server
        .patch(&format!("/api/books/update/{book_id}"))
        .with_session(&admin)
        .json(&json!({"stock": 80}))
        .await;
    response.assert_status_ok();
    assert_eq!(body(&response)["data"]["stock"], 80);

    let response = app
        .server
        .patch(&format!("/api/books/update/{book_id}"))
        .with_session(&admin)
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(&response)["message"],
        "Can not update the book with an empty data"
    );

    let response = app
        .server
        .get(&format!("/api/books/details/{book_id}"))
        .await;
    response.assert_status_ok();
    let details = body(&response);
    assert_eq!(details["message"], "Successfully get the data");
    assert_eq!(details["data"]["result"]["title"], "Rust in Action");

    let response = app
        .server
        .delete(&format!("/api/books/delete/{book_id}"))
        .with_session(&admin)
        .await;
    response.assert_status_ok();
    assert_eq!(body(&response)["message"], "Deleted book successfully");

    let response = app
        .server
        .get(&format!("/api/books/details/{book_id}"))
        .await;
    response.assert_status_not_found();
    assert_eq!(body(&response)["message"], "No book found");
}

#[tokio::test]
async fn customers_cannot_create_books() {
    let app = TestApp::new();
    let customer = app.logged_in_customer("reader@example.com", 0).await;

    let response = app
        .server
        .post("/api/books/create")
        .with_session(&customer)
        .json(&new_book("Rust in Action", "9781617294556"))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn browse_the_catalog() {
    let app = TestApp::new();

    let response = app.server.get("/api/books/all").await;
    response.assert_status_ok();
    assert_eq!(body(&response)["message"], "No data found");
    assert_eq!(body(&response)["data"], json!([]));

    app.book("Rust Atomics and Locks", 50, 10).await;
    app.book("Rust for Rustaceans", 20, 10).await;
    app.book("Learning Go", 5, 10).await;

    let response = app
        .server
        .get("/api/books/all")
        .add_query_param("search", "rust")
        .add_query_param("sortBy", "price")
        .add_query_param("sortOrder", "asc")
        .await;
    response.assert_status_ok();
    let page = body(&response);
    assert_eq!(page["message"], "Successfully get the books");
    assert_eq!(page["data"]["totalData"], 2);
    assert_eq!(page["data"]["currentPage"], 1);
    assert_eq!(
        page["data"]["products"][0]["title"],
        "Rust for Rustaceans"
    );

    let response = app
        .server
        .get("/api/books/all")
        .add_query_param("colour", "red")
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(&response)["message"],
        "Invalid property provided book filtering"
    );

    let response = app
        .server
        .get("/api/books/all")
        .add_query_param("sortBy", "price")
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(&response)["data"]["sortOrder"],
        "Sort order is required when sortBy is selected"
    );
}

#[tokio::test]
async fn reviews_move_the_rating() {
    let app = TestApp::new();
    let first = app.logged_in_customer("first@example.com", 0).await;
    let second = app.logged_in_customer("second@example.com", 0).await;
    let third = app.logged_in_customer("third@example.com", 0).await;
    let book = app.book("Programming Rust", 100, 10).await;

    let response = app.server.get(&format!("/api/review/details/{}", book.id)).await;
    response.assert_status_not_found();
    assert_eq!(body(&response)["message"], "No reviews found");

    let response = app
        .server
        .post(&format!("/api/review/create/{}", book.id))
        .with_session(&first)
        .json(&json!({"rating": 4, "message": "Clear and thorough"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(body(&response)["data"]["rating"], 4.0);

    let response = app
        .server
        .post(&format!("/api/review/create/{}", book.id))
        .with_session(&first)
        .json(&json!({"rating": 2}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(&response)["message"],
        "You can not add more than one review"
    );

    let response = app
        .server
        .post(&format!("/api/review/create/{}", book.id))
        .with_session(&second)
        .json(&json!({"rating": 5}))
        .await;
    assert_eq!(body(&response)["data"]["rating"], 4.5);

    let response = app
        .server
        .patch(&format!("/api/review/update/{}", book.id))
        .with_session(&second)
        .json(&json!({"rating": 2, "message": "Too dense for me"}))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(body(&response)["message"], "Successfully updated the review");
    assert_eq!(body(&response)["data"]["rating"], 3.0);

    let response = app
        .server
        .post(&format!("/api/review/create/{}", book.id))
        .with_session(&third)
        .json(&json!({"rating": 4}))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(body(&response)["data"]["rating"], 10.0 / 3.0);

    let response = app
        .server
        .get(&format!("/api/review/details/{}", book.id))
        .await;
    response.assert_status_ok();
    assert_eq!(
        body(&response)["data"]["reviews"].as_array().unwrap().len(),
        3
    );

    let response = app
        .server
        .delete(&format!("/api/review/delete/{}", book.id))
        .with_session(&first)
        .await;
    response.assert_status_ok();
    assert_eq!(body(&response)["message"], "Deleted review successfully");
    assert_eq!(body(&response)["data"]["rating"], 3.0);

    let response = app
        .server
        .delete(&format!("/api/review/delete/{}", book.id))
        .with_session(&first)
        .await;
    response.assert_status_not_found();
    assert_eq!(body(&response)["message"], "No review found for this user");

    let response = app
        .server
        .post(&format!("/api/review/create/{}", book.id))
        .with_session(&first)
        .json(&json!({"rating": 9}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(&response)["data"]["rating"],
        "Rating must be between 1 and 5"
    );
}
