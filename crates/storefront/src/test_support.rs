//! Fixtures shared by unit tests.

use std::time::Duration;

use secrecy::SecretString;

use sacola_core::{Email, Price, ProductId, UserId, VariantId};

use crate::config::{LogFormat, StorefrontConfig};
use crate::models::{CurrentUser, ProductVariant, ShippingAddressInput};
use crate::store::MemoryStore;

pub fn config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/sacola_test".to_owned()),
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: url::Url::parse("http://localhost:3000").unwrap_or_else(|e| panic!("{e}")),
        session_secret: SecretString::from("k".repeat(64)),
        query_cache_ttl: Duration::from_secs(60),
        rate_limit_enabled: false,
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

pub fn user() -> CurrentUser {
    let id = UserId::generate();
    CurrentUser {
        id,
        email: Email::parse(&format!("{id}@example.com")).unwrap_or_else(|e| panic!("{e}")),
    }
}

pub fn variant() -> ProductVariant {
    let id = VariantId::generate();
    ProductVariant {
        id,
        product_id: ProductId::generate(),
        name: "Azul / M".to_owned(),
        slug: format!("camiseta-azul-m-{id}"),
        color: "#1e3a8a".to_owned(),
        price: Price::from_cents(7990),
        image_url: "https://cdn.example.com/camiseta-azul.png".to_owned(),
    }
}

/// A store with one catalog variant.
pub fn seeded_store() -> (MemoryStore, ProductVariant) {
    let store = MemoryStore::new();
    let v = variant();
    store.insert_variant("Camiseta Básica", v.clone());
    (store, v)
}

pub fn address_input() -> ShippingAddressInput {
    ShippingAddressInput {
        email: "ana@example.com.br".to_owned(),
        recipient_name: "Ana Souza".to_owned(),
        cpf_or_cnpj: "123.456.789-09".to_owned(),
        phone: "(81) 99999-0000".to_owned(),
        zip_code: "50000-000".to_owned(),
        street: "Rua da Aurora".to_owned(),
        number: "10".to_owned(),
        complement: None,
        neighborhood: "Boa Vista".to_owned(),
        city: "Recife".to_owned(),
        state: "PE".to_owned(),
        country: None,
    }
}
