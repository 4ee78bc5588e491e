//! In-memory implementation of every store trait.

use bookstore_core::catalog::{BookPage, BookQuery};
use bookstore_core::checkout::{self, CheckoutPlan, CheckoutRejection};
use bookstore_core::error::{Result, StoreError};
use bookstore_core::review::{self, ReviewRejection};
use bookstore_core::store::{
    BookStore, CartStore, DiscountStore, ReviewStore, StoreFuture, TransactionStore, UserStore,
};
use bookstore_core::types::{
    Address, Book, BookId, BookReviews, Cart, CartId, Credential, Discount, DiscountId, Money,
    ReviewEntry, Transaction, User, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    credentials: HashMap<UserId, Credential>,
    books: Vec<Book>,
    reviews: HashMap<BookId, BookReviews>,
    carts: HashMap<UserId, Cart>,
    discounts: Vec<Discount>,
    transactions: Vec<Transaction>,
}

impl Tables {
    fn user_mut(&mut self, user_id: UserId) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == user_id)
    }

    fn book_mut(&mut self, book_id: BookId) -> Option<&mut Book> {
        self.books.iter_mut().find(|b| b.id == book_id)
    }

    fn set_rating(&mut self, book_id: BookId) -> f64 {
        let rating = self
            .reviews
            .get(&book_id)
            .map_or(review::DEFAULT_RATING, |bundle| {
                review::average_rating(&bundle.reviews)
            });
        if let Some(book) = self.book_mut(book_id) {
            book.rating = rating;
        }
        rating
    }

    fn unique_clash(&self, book: &Book) -> bool {
        self.books.iter().any(|b| {
            b.id != book.id
                && (b.title == book.title || b.description == book.description || b.isbn == book.isbn)
        })
    }

    fn discount_clash(&self, discount: &Discount) -> bool {
        self.discounts
            .iter()
            .filter(|d| d.id != discount.id)
            .any(|d| discount.book_ids.iter().any(|id| d.covers(*id)))
    }
}

/// In-memory store for tests.
///
/// Every operation runs under one mutex guard, so each call is atomic with
/// respect to the others, including [`TransactionStore::commit_checkout`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::DatabaseError("Mutex lock failed".to_string()))
    }

    /// Number of transactions recorded (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn transaction_count(&self) -> Result<usize> {
        Ok(self.lock()?.transactions.len())
    }
}

impl UserStore for InMemoryStore {
    fn create_account(&self, user: User, credential: Credential) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            if tables.credentials.values().any(|c| c.email == credential.email) {
                return Err(StoreError::Conflict(format!(
                    "email {} already registered",
                    credential.email
                )));
            }
            tables.credentials.insert(user.id, credential);
            tables.users.push(user);
            Ok(())
        })
    }

    fn find_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            Ok(self.lock()?.users.iter().find(|u| u.id == user_id).cloned())
        })
    }

    fn find_credential_by_email(&self, email: String) -> StoreFuture<'_, Option<Credential>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .credentials
                .values()
                .find(|c| c.email == email)
                .cloned())
        })
    }

    fn find_credential(&self, user_id: UserId) -> StoreFuture<'_, Option<Credential>> {
        Box::pin(async move { Ok(self.lock()?.credentials.get(&user_id).cloned()) })
    }

    fn mark_verified(&self, user_id: UserId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if let Some(credential) = self.lock()?.credentials.get_mut(&user_id) {
                credential.is_verified = true;
                credential.verification_code = None;
            }
            Ok(())
        })
    }

    fn set_restricted(&self, user_id: UserId, restricted: bool) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let Some(credential) = tables.credentials.get_mut(&user_id) else {
                return Ok(false);
            };
            credential.is_restricted = restricted;
            Ok(true)
        })
    }

    fn list_active_users(&self) -> StoreFuture<'_, Vec<User>> {
        Box::pin(async move {
            let tables = self.lock()?;
            Ok(tables
                .users
                .iter()
                .filter(|u| {
                    tables
                        .credentials
                        .get(&u.id)
                        .is_some_and(|c| !c.is_restricted)
                })
                .cloned()
                .collect())
        })
    }

    fn update_profile(
        &self,
        user_id: UserId,
        name: Option<String>,
        address: Option<Address>,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let Some(user) = tables.user_mut(user_id) else {
                return Ok(None);
            };
            if let Some(name) = name {
                user.name = name;
            }
            if let Some(address) = address {
                user.address = address;
            }
            user.updated_at = now;
            Ok(Some(user.clone()))
        })
    }

    fn add_balance(
        &self,
        user_id: UserId,
        amount: Money,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<Money>> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let Some(user) = tables.user_mut(user_id) else {
                return Ok(None);
            };
            user.balance = user
                .balance
                .checked_add(amount)
                .ok_or_else(|| StoreError::DatabaseError("Balance overflow".to_string()))?;
            user.updated_at = now;
            Ok(Some(user.balance))
        })
    }
}

impl BookStore for InMemoryStore {
    fn insert_book(&self, book: Book) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            if tables.unique_clash(&book) {
                return Err(StoreError::Conflict(format!("book {} is not unique", book.title)));
            }
            tables.books.push(book);
            Ok(())
        })
    }

    fn find_book(&self, book_id: BookId) -> StoreFuture<'_, Option<Book>> {
        Box::pin(async move {
            Ok(self.lock()?.books.iter().find(|b| b.id == book_id).cloned())
        })
    }

    fn find_books(&self, book_ids: Vec<BookId>) -> StoreFuture<'_, Vec<Book>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .books
                .iter()
                .filter(|b| book_ids.contains(&b.id))
                .cloned()
                .collect())
        })
    }

    fn find_conflict(
        &self,
        title: Option<String>,
        description: Option<String>,
        isbn: Option<String>,
        exclude: Option<BookId>,
    ) -> StoreFuture<'_, Option<Book>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .books
                .iter()
                .filter(|b| Some(b.id) != exclude)
                .find(|b| {
                    title.as_ref() == Some(&b.title)
                        || description.as_ref() == Some(&b.description)
                        || isbn.as_ref() == Some(&b.isbn)
                })
                .cloned())
        })
    }

    fn update_book(&self, book: Book) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            if tables.unique_clash(&book) {
                return Err(StoreError::Conflict(format!("book {} is not unique", book.title)));
            }
            match tables.book_mut(book.id) {
                Some(slot) => {
                    *slot = book;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete_book(&self, book_id: BookId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let before = tables.books.len();
            tables.books.retain(|b| b.id != book_id);
            tables.reviews.remove(&book_id);
            Ok(tables.books.len() != before)
        })
    }

    fn query_books(&self, query: BookQuery, now: DateTime<Utc>) -> StoreFuture<'_, BookPage> {
        Box::pin(async move {
            let tables = self.lock()?;
            let discount_pct = |book_id: BookId| {
                tables
                    .discounts
                    .iter()
                    .find(|d| d.is_open_at(now) && d.covers(book_id))
                    .map(|d| d.discount_percentage)
            };
            let mut matched: Vec<Book> = tables
                .books
                .iter()
                .filter(|b| query.matches(b, discount_pct(b.id)))
                .cloned()
                .collect();
            query.sort(&mut matched);

            let total = matched.len() as u64;
            let skip = usize::try_from(query.skip()).unwrap_or(usize::MAX);
            let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
            let products = matched.into_iter().skip(skip).take(limit).collect();
            Ok(BookPage::new(&query, total, products))
        })
    }
}

impl ReviewStore for InMemoryStore {
    fn reviews_for_book(&self, book_id: BookId) -> StoreFuture<'_, Option<BookReviews>> {
        Box::pin(async move { Ok(self.lock()?.reviews.get(&book_id).cloned()) })
    }

    fn add_review(&self, book_id: BookId, entry: ReviewEntry) -> StoreFuture<'_, f64> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let bundle = tables.reviews.remove(&book_id);
            let fallback = bundle.clone();
            match review::add_review(bundle, book_id, entry) {
                Ok(bundle) => {
                    tables.reviews.insert(book_id, bundle);
                    Ok(tables.set_rating(book_id))
                }
                Err(rejection) => {
                    if let Some(bundle) = fallback {
                        tables.reviews.insert(book_id, bundle);
                    }
                    Err(StoreError::Conflict(rejection.to_string()))
                }
            }
        })
    }

    fn update_review(
        &self,
        book_id: BookId,
        user_id: UserId,
        rating: f64,
        message: Option<String>,
    ) -> StoreFuture<'_, Option<f64>> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let Some(bundle) = tables.reviews.get_mut(&book_id) else {
                return Ok(None);
            };
            match review::update_review(bundle, user_id, rating, message) {
                Ok(()) => Ok(Some(tables.set_rating(book_id))),
                Err(ReviewRejection::NotReviewed) => Ok(None),
                Err(rejection) => Err(StoreError::Conflict(rejection.to_string())),
            }
        })
    }

    fn delete_review(&self, book_id: BookId, user_id: UserId) -> StoreFuture<'_, Option<f64>> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let Some(bundle) = tables.reviews.get_mut(&book_id) else {
                return Ok(None);
            };
            match review::remove_review(bundle, user_id) {
                Ok(now_empty) => {
                    if now_empty {
                        tables.reviews.remove(&book_id);
                    }
                    Ok(Some(tables.set_rating(book_id)))
                }
                Err(ReviewRejection::NotReviewed) => Ok(None),
                Err(rejection) => Err(StoreError::Conflict(rejection.to_string())),
            }
        })
    }
}

impl CartStore for InMemoryStore {
    fn find_cart_by_user(&self, user_id: UserId) -> StoreFuture<'_, Option<Cart>> {
        Box::pin(async move { Ok(self.lock()?.carts.get(&user_id).cloned()) })
    }

    fn find_cart(&self, cart_id: CartId) -> StoreFuture<'_, Option<Cart>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .carts
                .values()
                .find(|c| c.id == cart_id)
                .cloned())
        })
    }

    fn save_cart(&self, mut cart: Cart) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let stored = tables.carts.get(&cart.user_id).map_or(0, |c| c.version);
            if stored != cart.version {
                return Err(StoreError::ConcurrencyConflict(format!(
                    "cart of user {} is at version {stored}, expected {}",
                    cart.user_id, cart.version
                )));
            }
            cart.version += 1;
            let version = cart.version;
            tables.carts.insert(cart.user_id, cart);
            Ok(version)
        })
    }
}

impl DiscountStore for InMemoryStore {
    fn list_discounts(&self) -> StoreFuture<'_, Vec<Discount>> {
        Box::pin(async move { Ok(self.lock()?.discounts.clone()) })
    }

    fn find_discount(&self, discount_id: DiscountId) -> StoreFuture<'_, Option<Discount>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .discounts
                .iter()
                .find(|d| d.id == discount_id)
                .cloned())
        })
    }

    fn discounts_for_books(&self, book_ids: Vec<BookId>) -> StoreFuture<'_, Vec<Discount>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .discounts
                .iter()
                .filter(|d| book_ids.iter().any(|id| d.covers(*id)))
                .cloned()
                .collect())
        })
    }

    fn open_discounts(
        &self,
        now: DateTime<Utc>,
        book_ids: Vec<BookId>,
    ) -> StoreFuture<'_, Vec<Discount>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .discounts
                .iter()
                .filter(|d| d.is_open_at(now) && book_ids.iter().any(|id| d.covers(*id)))
                .cloned()
                .collect())
        })
    }

    fn insert_discount(&self, discount: Discount) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            if tables.discount_clash(&discount) {
                return Err(StoreError::Conflict("book already discounted".to_string()));
            }
            tables.discounts.push(discount);
            Ok(())
        })
    }

    fn update_discount(&self, discount: Discount) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            if tables.discount_clash(&discount) {
                return Err(StoreError::Conflict("book already discounted".to_string()));
            }
            match tables.discounts.iter_mut().find(|d| d.id == discount.id) {
                Some(slot) => {
                    *slot = discount;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete_discount(&self, discount_id: DiscountId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let before = tables.discounts.len();
            tables.discounts.retain(|d| d.id != discount_id);
            Ok(tables.discounts.len() != before)
        })
    }
}

impl TransactionStore for InMemoryStore {
    fn commit_checkout(&self, plan: CheckoutPlan) -> StoreFuture<'_, Transaction> {
        Box::pin(async move {
            let mut tables = self.lock()?;

            let cart_current = tables
                .carts
                .get(&plan.user_id)
                .is_some_and(|c| c.id == plan.cart_id && c.version == plan.cart_version);
            if !cart_current {
                return Err(CheckoutRejection::CartChanged.into());
            }

            let balance = tables
                .users
                .iter()
                .find(|u| u.id == plan.user_id)
                .map(|u| u.balance)
                .ok_or(CheckoutRejection::CartNotFound)?;
            checkout::check_balance(balance, plan.total)?;

            let stock: HashMap<BookId, u32> = tables
                .books
                .iter()
                .filter(|b| plan.lines.iter().any(|l| l.book_id == b.id))
                .map(|b| (b.id, b.stock))
                .collect();
            checkout::check_stock(&plan.lines, &stock)?;

            // All checks passed; nothing below can fail.
            for line in &plan.lines {
                if let Some(book) = tables.book_mut(line.book_id) {
                    book.stock -= line.quantity;
                }
            }
            if let Some(user) = tables.user_mut(plan.user_id) {
                user.balance = Money::from_cents(balance.cents() - plan.total.cents());
            }
            if let Some(cart) = tables.carts.get_mut(&plan.user_id) {
                cart.books.clear();
                cart.version += 1;
            }
            let transaction = plan.transaction();
            tables.transactions.push(transaction.clone());
            Ok(transaction)
        })
    }

    fn transactions_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Transaction>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .transactions
                .iter()
                .rev()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect())
        })
    }

    fn all_transactions(&self) -> StoreFuture<'_, Vec<Transaction>> {
        Box::pin(async move { Ok(self.lock()?.transactions.iter().rev().cloned().collect()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::fixtures::{BookBuilder, UserBuilder, open_discount};
    use crate::test_clock;
    use bookstore_core::cart;
    use bookstore_core::environment::Clock;
    use bookstore_core::types::{Country, PaymentMethod};

    async fn seeded() -> (InMemoryStore, User, Book) {
        let store = InMemoryStore::new();
        let (user, credential) = UserBuilder::new("buyer@example.com", test_clock().now())
            .balance(1000)
            .build();
        store.create_account(user.clone(), credential).await.unwrap();
        let book = BookBuilder::new("Programming Rust").price(100).stock(5).build();
        store.insert_book(book.clone()).await.unwrap();
        (store, user, book)
    }

    async fn cart_with(store: &InMemoryStore, user: &User, book: &Book, quantity: u32) -> Cart {
        let (mut cart, _) = cart::add_to_cart(None, user.id, book, quantity).unwrap();
        cart.version = store.save_cart(cart.clone()).await.unwrap();
        cart
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (store, _, _) = seeded().await;
        let (again, credential) = UserBuilder::new("buyer@example.com", test_clock().now()).build();
        assert!(matches!(
            store.create_account(again, credential).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn stale_cart_version_conflicts() {
        let (store, user, book) = seeded().await;
        let cart = cart_with(&store, &user, &book, 1).await;
        assert_eq!(cart.version, 1);

        let mut stale = cart.clone();
        stale.version = 0;
        assert!(matches!(
            store.save_cart(stale).await,
            Err(StoreError::ConcurrencyConflict(_))
        ));
        assert_eq!(store.save_cart(cart).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn checkout_applies_every_write() {
        let (store, user, book) = seeded().await;
        let cart = cart_with(&store, &user, &book, 3).await;
        let books = HashMap::from([(book.id, book.clone())]);
        let plan = checkout::plan_checkout(
            &user,
            Some(&cart),
            &books,
            &[],
            PaymentMethod::Cash,
            test_clock().now(),
        )
        .unwrap();

        let tx = store.commit_checkout(plan).await.unwrap();
        assert_eq!(tx.total_price, Money::from_units(300));
        assert_eq!(store.find_book(book.id).await.unwrap().unwrap().stock, 2);
        assert_eq!(
            store.find_user(user.id).await.unwrap().unwrap().balance,
            Money::from_units(700)
        );
        assert!(store.find_cart_by_user(user.id).await.unwrap().unwrap().is_empty());
        assert_eq!(store.transactions_for_user(user.id).await.unwrap(), vec![tx]);
    }

    #[tokio::test]
    async fn checkout_rejected_under_lock_changes_nothing() {
        let (store, user, book) = seeded().await;
        let cart = cart_with(&store, &user, &book, 3).await;
        let books = HashMap::from([(book.id, book.clone())]);
        let plan = checkout::plan_checkout(
            &user,
            Some(&cart),
            &books,
            &[],
            PaymentMethod::Cash,
            test_clock().now(),
        )
        .unwrap();

        // Stock drops after the plan was computed.
        let mut sold = book.clone();
        sold.stock = 2;
        store.update_book(sold).await.unwrap();

        assert_eq!(
            store.commit_checkout(plan).await.unwrap_err(),
            StoreError::CheckoutRejected(CheckoutRejection::InsufficientStock(vec![book.id]))
        );
        assert_eq!(
            store.find_user(user.id).await.unwrap().unwrap().balance,
            Money::from_units(1000)
        );
        assert_eq!(store.find_cart_by_user(user.id).await.unwrap().unwrap().books.len(), 1);
        assert_eq!(store.transaction_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn second_discount_on_same_book_conflicts() {
        let (store, _, book) = seeded().await;
        let now = test_clock().now();
        store
            .insert_discount(open_discount(10, vec![book.id], vec![Country::Bd], now))
            .await
            .unwrap();
        assert!(matches!(
            store
                .insert_discount(open_discount(20, vec![book.id], vec![Country::Us], now))
                .await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn review_mutations_keep_rating_in_step() {
        let (store, user, book) = seeded().await;
        let other = UserId::new();
        let entry = |user_id, rating| ReviewEntry {
            user_id,
            message: None,
            rating,
        };

        assert_eq!(store.add_review(book.id, entry(user.id, 5.0)).await.unwrap(), 5.0);
        assert_eq!(store.add_review(book.id, entry(other, 2.0)).await.unwrap(), 3.5);
        assert!(matches!(
            store.add_review(book.id, entry(other, 4.0)).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(
            store.update_review(book.id, other, 4.0, None).await.unwrap(),
            Some(4.5)
        );
        assert_eq!(store.delete_review(book.id, user.id).await.unwrap(), Some(4.0));
        assert_eq!(store.delete_review(book.id, other).await.unwrap(), Some(1.0));
        assert_eq!(store.reviews_for_book(book.id).await.unwrap(), None);
        assert_eq!(store.find_book(book.id).await.unwrap().unwrap().rating, 1.0);
    }
}
