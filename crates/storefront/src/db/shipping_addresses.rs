//! Shipping address repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use sacola_core::{AddressId, Email, UserId};

use super::RepositoryError;
use crate::models::{AddressFields, NewShippingAddress, ShippingAddress};

#[derive(Debug, sqlx::FromRow)]
struct ShippingAddressRow {
    id: Uuid,
    user_id: Uuid,
    recipient_name: String,
    street: String,
    number: String,
    complement: Option<String>,
    neighborhood: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
    phone: String,
    email: String,
    cpf_or_cnpj: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShippingAddressRow> for ShippingAddress {
    type Error = RepositoryError;

    fn try_from(row: ShippingAddressRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            fields: AddressFields {
                recipient_name: row.recipient_name,
                street: row.street,
                number: row.number,
                complement: row.complement,
                neighborhood: row.neighborhood,
                city: row.city,
                state: row.state,
                zip_code: row.zip_code,
                country: row.country,
                phone: row.phone,
                email,
                cpf_or_cnpj: row.cpf_or_cnpj,
            },
            created_at: row.created_at,
        })
    }
}

/// Repository for shipping addresses.
pub struct ShippingAddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShippingAddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new address owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        address: &NewShippingAddress,
    ) -> Result<ShippingAddress, RepositoryError> {
        let f = &address.fields;
        let row = sqlx::query_as::<_, ShippingAddressRow>(
            r"
            INSERT INTO storefront.shipping_address
                (user_id, recipient_name, street, number, complement, neighborhood,
                 city, state, zip_code, country, phone, email, cpf_or_cnpj)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, user_id, recipient_name, street, number, complement, neighborhood,
                      city, state, zip_code, country, phone, email, cpf_or_cnpj, created_at
            ",
        )
        .bind(user_id)
        .bind(&f.recipient_name)
        .bind(&f.street)
        .bind(&f.number)
        .bind(f.complement.as_deref())
        .bind(&f.neighborhood)
        .bind(&f.city)
        .bind(&f.state)
        .bind(&f.zip_code)
        .bind(&f.country)
        .bind(&f.phone)
        .bind(f.email.as_str())
        .bind(&f.cpf_or_cnpj)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Get an address by ID regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: AddressId) -> Result<Option<ShippingAddress>, RepositoryError> {
        let row = sqlx::query_as::<_, ShippingAddressRow>(
            r"
            SELECT id, user_id, recipient_name, street, number, complement, neighborhood,
                   city, state, zip_code, country, phone, email, cpf_or_cnpj, created_at
            FROM storefront.shipping_address
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List a user's addresses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored email is invalid.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ShippingAddress>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShippingAddressRow>(
            r"
            SELECT id, user_id, recipient_name, street, number, complement, neighborhood,
                   city, state, zip_code, country, phone, email, cpf_or_cnpj, created_at
            FROM storefront.shipping_address
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
