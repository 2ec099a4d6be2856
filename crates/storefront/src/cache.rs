//! Per-user query cache and mutation descriptors.
//!
//! Reads (`cart`, `user-shipping-addresses`, `identification`) are cached per
//! user with `moka`. Every mutation names the queries it invalidates; the
//! HTTP layer drops those entries and announces them to the browser through
//! `HX-Trigger` so htmx fragments refetch.
//!
//! A read that races a mutation must not put its stale result back after the
//! mutation dropped it. Readers take a [`Generation`] before loading and hand
//! it back to [`QueryCache::insert`]; invalidation bumps the generation first,
//! so an insert that overlapped it is discarded.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;

use sacola_core::{CartItemId, Quantity, UserId, VariantId};

use crate::models::{CartView, IdentificationView, ShippingAddress};

/// Cached read queries.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum QueryKey {
    Cart,
    UserShippingAddresses,
    Identification,
}

impl QueryKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::UserShippingAddresses => "user-shipping-addresses",
            Self::Identification => "identification",
        }
    }

    /// Client event fired when this query is invalidated.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Cart => "cart-updated",
            Self::UserShippingAddresses => "shipping-addresses-updated",
            Self::Identification => "identification-updated",
        }
    }
}

/// Identifies a write and the queries it makes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKey {
    AddProductToCart {
        variant: VariantId,
        quantity: Quantity,
    },
    IncreaseProductFromCart(VariantId),
    DecreaseProductFromCart(CartItemId),
    RemoveProductFromCart(CartItemId),
    CreateShippingAddress,
    SelectShippingAddress,
    UpdateCartShippingAddress,
    FinishOrder,
}

impl MutationKey {
    /// Key segments, e.g. `["add-product-to-cart", "<variant>", "2"]`.
    #[must_use]
    pub fn parts(&self) -> Vec<String> {
        match self {
            Self::AddProductToCart { variant, quantity } => vec![
                "add-product-to-cart".to_owned(),
                variant.to_string(),
                quantity.to_string(),
            ],
            Self::IncreaseProductFromCart(variant) => {
                vec!["increase-product-from-cart".to_owned(), variant.to_string()]
            }
            Self::DecreaseProductFromCart(item) => {
                vec!["decrease-product-from-cart".to_owned(), item.to_string()]
            }
            Self::RemoveProductFromCart(item) => {
                vec!["remove-product-from-cart".to_owned(), item.to_string()]
            }
            Self::CreateShippingAddress => vec!["create-shipping-address".to_owned()],
            Self::SelectShippingAddress => vec!["select-shipping-address".to_owned()],
            Self::UpdateCartShippingAddress => vec!["update-cart-shipping-address".to_owned()],
            Self::FinishOrder => vec!["finish-order".to_owned()],
        }
    }

    /// Queries to drop once this mutation succeeds.
    #[must_use]
    pub const fn invalidates(&self) -> &'static [QueryKey] {
        match self {
            Self::AddProductToCart { .. }
            | Self::IncreaseProductFromCart(_)
            | Self::DecreaseProductFromCart(_)
            | Self::RemoveProductFromCart(_) => &[QueryKey::Cart],
            Self::CreateShippingAddress => &[
                QueryKey::Cart,
                QueryKey::UserShippingAddresses,
                QueryKey::Identification,
            ],
            Self::SelectShippingAddress
            | Self::UpdateCartShippingAddress
            | Self::FinishOrder => &[QueryKey::Cart, QueryKey::Identification],
        }
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, part) in self.parts().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "\"{part}\"")?;
        }
        f.write_str("]")
    }
}

/// Cached query results.
#[derive(Debug, Clone)]
pub enum CachedQuery {
    Cart(Box<CartView>),
    ShippingAddresses(Vec<ShippingAddress>),
    Identification(Box<IdentificationView>),
}

impl CachedQuery {
    const fn key(&self) -> QueryKey {
        match self {
            Self::Cart(_) => QueryKey::Cart,
            Self::ShippingAddresses(_) => QueryKey::UserShippingAddresses,
            Self::Identification(_) => QueryKey::Identification,
        }
    }
}

/// Number of generation counters users are spread over.
const GENERATION_STRIPES: usize = 64;

/// Invalidation counter observed before a read, see [`QueryCache::generation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    stripe: usize,
    value: u64,
}

/// Query results cached per user.
#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<(UserId, QueryKey), CachedQuery>,
    generations: Arc<[AtomicU64; GENERATION_STRIPES]>,
}

impl QueryCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .build();
        Self {
            cache,
            generations: Arc::new(std::array::from_fn(|_| AtomicU64::new(0))),
        }
    }

    #[allow(clippy::indexing_slicing)] // stripe < GENERATION_STRIPES
    fn counter(&self, stripe: usize) -> &AtomicU64 {
        &self.generations[stripe % GENERATION_STRIPES]
    }

    #[allow(clippy::cast_possible_truncation)]
    fn stripe(user: UserId) -> usize {
        (user.as_uuid().as_u128() % GENERATION_STRIPES as u128) as usize
    }

    /// Take before loading a query result for `user`.
    #[must_use]
    pub fn generation(&self, user: UserId) -> Generation {
        let stripe = Self::stripe(user);
        Generation {
            stripe,
            value: self.counter(stripe).load(Ordering::SeqCst),
        }
    }

    /// Store a result for `user` loaded after `seen` was taken.
    ///
    /// The entry is dropped again if any invalidation for the user's stripe
    /// happened since `seen`.
    pub async fn insert(&self, user: UserId, seen: Generation, value: CachedQuery) {
        let key = (user, value.key());
        self.cache.insert(key, value).await;
        if self.counter(seen.stripe).load(Ordering::SeqCst) != seen.value {
            self.cache.invalidate(&key).await;
            tracing::debug!(user_id = %user, query = key.1.as_str(), "discarded stale query result");
        }
    }

    pub async fn cart(&self, user: UserId) -> Option<CartView> {
        match self.cache.get(&(user, QueryKey::Cart)).await {
            Some(CachedQuery::Cart(view)) => Some(*view),
            _ => None,
        }
    }

    pub async fn shipping_addresses(&self, user: UserId) -> Option<Vec<ShippingAddress>> {
        match self.cache.get(&(user, QueryKey::UserShippingAddresses)).await {
            Some(CachedQuery::ShippingAddresses(addresses)) => Some(addresses),
            _ => None,
        }
    }

    pub async fn identification(&self, user: UserId) -> Option<IdentificationView> {
        match self.cache.get(&(user, QueryKey::Identification)).await {
            Some(CachedQuery::Identification(view)) => Some(*view),
            _ => None,
        }
    }

    /// Drop every query `mutation` makes stale for `user` and return them.
    pub async fn invalidate(&self, user: UserId, mutation: &MutationKey) -> &'static [QueryKey] {
        self.counter(Self::stripe(user)).fetch_add(1, Ordering::SeqCst);
        let keys = mutation.invalidates();
        for key in keys {
            self.cache.invalidate(&(user, *key)).await;
        }
        tracing::debug!(%mutation, user_id = %user, "queries invalidated");
        keys
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identification() -> IdentificationView {
        IdentificationView {
            addresses: Vec::new(),
            selected_shipping_address_id: None,
        }
    }

    async fn filled(user: UserId) -> QueryCache {
        let cache = QueryCache::new(Duration::from_secs(60));
        let seen = cache.generation(user);
        cache
            .insert(user, seen, CachedQuery::Cart(Box::new(CartView::empty())))
            .await;
        cache
            .insert(user, seen, CachedQuery::ShippingAddresses(Vec::new()))
            .await;
        cache
            .insert(user, seen, CachedQuery::Identification(Box::new(identification())))
            .await;
        cache
    }

    #[tokio::test]
    async fn test_cart_mutations_only_drop_cart() {
        let user = UserId::generate();
        let cache = filled(user).await;

        let dropped = cache
            .invalidate(user, &MutationKey::RemoveProductFromCart(CartItemId::generate()))
            .await;

        assert_eq!(dropped, &[QueryKey::Cart]);
        assert!(cache.cart(user).await.is_none());
        assert!(cache.shipping_addresses(user).await.is_some());
        assert!(cache.identification(user).await.is_some());
    }

    #[tokio::test]
    async fn test_create_address_drops_all_three() {
        let user = UserId::generate();
        let cache = filled(user).await;

        cache
            .invalidate(user, &MutationKey::CreateShippingAddress)
            .await;

        assert!(cache.cart(user).await.is_none());
        assert!(cache.shipping_addresses(user).await.is_none());
        assert!(cache.identification(user).await.is_none());
    }

    #[tokio::test]
    async fn test_select_address_keeps_address_list() {
        let user = UserId::generate();
        let cache = filled(user).await;

        cache
            .invalidate(user, &MutationKey::SelectShippingAddress)
            .await;

        assert!(cache.cart(user).await.is_none());
        assert!(cache.identification(user).await.is_none());
        assert!(cache.shipping_addresses(user).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidation_is_per_user() {
        let alice = UserId::generate();
        let bob = UserId::generate();
        let cache = filled(alice).await;
        cache
            .insert(
                bob,
                cache.generation(bob),
                CachedQuery::Cart(Box::new(CartView::empty())),
            )
            .await;

        cache.invalidate(alice, &MutationKey::FinishOrder).await;

        assert!(cache.cart(alice).await.is_none());
        assert!(cache.cart(bob).await.is_some());
    }

    #[tokio::test]
    async fn test_read_overlapping_invalidation_is_not_cached() {
        let user = UserId::generate();
        let cache = QueryCache::new(Duration::from_secs(60));

        // Reader loads the cart, then a write lands before it stores it
        let seen = cache.generation(user);
        cache
            .invalidate(
                user,
                &MutationKey::AddProductToCart {
                    variant: VariantId::generate(),
                    quantity: Quantity::ONE,
                },
            )
            .await;
        cache
            .insert(user, seen, CachedQuery::Cart(Box::new(CartView::empty())))
            .await;

        assert!(cache.cart(user).await.is_none());

        let fresh = cache.generation(user);
        cache
            .insert(user, fresh, CachedQuery::Cart(Box::new(CartView::empty())))
            .await;
        assert!(cache.cart(user).await.is_some());
    }

    #[test]
    fn test_mutation_key_display() {
        let variant = VariantId::generate();
        let key = MutationKey::AddProductToCart {
            variant,
            quantity: Quantity::new(2).unwrap(),
        };
        assert_eq!(
            key.to_string(),
            format!("[\"add-product-to-cart\", \"{variant}\", \"2\"]")
        );
        assert_eq!(
            MutationKey::FinishOrder.to_string(),
            "[\"finish-order\"]"
        );
    }
}
