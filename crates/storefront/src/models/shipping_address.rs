//! Shipping address types and validation.
//!
//! Addresses are immutable: "changing" the delivery address means creating a
//! new row and re-linking the cart to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sacola_core::{AddressId, Email, UserId};

use super::validation::ValidationErrors;

/// Every address ships within Brazil; the submitted country is ignored.
pub const COUNTRY: &str = "Brasil";

/// Minimum length of a formatted CPF (`000.000.000-00`).
const MIN_CPF_OR_CNPJ_LEN: usize = 14;
/// Minimum length of a formatted mobile number (`(00) 00000-0000`).
const MIN_PHONE_LEN: usize = 15;
/// Minimum length of a formatted CEP (`00000-000`).
const MIN_ZIP_CODE_LEN: usize = 9;

/// Address form as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingAddressInput {
    pub email: String,
    pub recipient_name: String,
    pub cpf_or_cnpj: String,
    pub phone: String,
    pub zip_code: String,
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    /// Accepted for compatibility with older clients and ignored; see [`COUNTRY`].
    #[serde(default)]
    pub country: Option<String>,
}

/// Postal and contact fields shared by saved addresses and order snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressFields {
    pub recipient_name: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
    pub email: Email,
    pub cpf_or_cnpj: String,
}

impl AddressFields {
    /// Single-line rendering used in address pickers, e.g.
    /// `Ana Souza • Rua A, 10, apto 2, Centro, Recife - PE • CEP: 50000-000`.
    #[must_use]
    pub fn one_line(&self) -> String {
        let complement = self
            .complement
            .as_deref()
            .map(|c| format!(", {c}"))
            .unwrap_or_default();
        format!(
            "{} • {}, {}{}, {}, {} - {} • CEP: {}",
            self.recipient_name,
            self.street,
            self.number,
            complement,
            self.neighborhood,
            self.city,
            self.state,
            self.zip_code
        )
    }
}

/// A validated address ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShippingAddress {
    pub fields: AddressFields,
}

impl ShippingAddressInput {
    /// Validate every field, collecting all failures.
    ///
    /// Text fields are trimmed, an empty complement becomes `None`, and the
    /// country is forced to [`COUNTRY`].
    ///
    /// # Errors
    ///
    /// Returns the full set of field errors when any field is invalid.
    pub fn validate(self) -> Result<NewShippingAddress, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = Email::parse(&self.email)
            .map_err(|_| errors.add("email", "Email inválido"))
            .ok();
        errors.require_min_len(
            "recipient_name",
            &self.recipient_name,
            1,
            "Nome completo é obrigatório",
        );
        errors.require_min_len(
            "cpf_or_cnpj",
            &self.cpf_or_cnpj,
            MIN_CPF_OR_CNPJ_LEN,
            "CPF inválido",
        );
        errors.require_min_len("phone", &self.phone, MIN_PHONE_LEN, "Celular inválido");
        errors.require_min_len("zip_code", &self.zip_code, MIN_ZIP_CODE_LEN, "CEP inválido");
        errors.require_min_len("street", &self.street, 1, "Endereço é obrigatório");
        errors.require_min_len("number", &self.number, 1, "Número é obrigatório");
        errors.require_min_len("neighborhood", &self.neighborhood, 1, "Bairro é obrigatório");
        errors.require_min_len("city", &self.city, 1, "Cidade é obrigatória");
        errors.require_min_len("state", &self.state, 1, "Estado é obrigatório");

        let Some(email) = email else {
            return Err(errors);
        };

        let complement = self
            .complement
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        errors.finish(NewShippingAddress {
            fields: AddressFields {
                recipient_name: self.recipient_name.trim().to_owned(),
                street: self.street.trim().to_owned(),
                number: self.number.trim().to_owned(),
                complement,
                neighborhood: self.neighborhood.trim().to_owned(),
                city: self.city.trim().to_owned(),
                state: self.state.trim().to_owned(),
                zip_code: self.zip_code.trim().to_owned(),
                country: COUNTRY.to_owned(),
                phone: self.phone.trim().to_owned(),
                email,
                cpf_or_cnpj: self.cpf_or_cnpj.trim().to_owned(),
            },
        })
    }
}

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingAddress {
    pub id: AddressId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub fields: AddressFields,
    pub created_at: DateTime<Utc>,
}

/// A saved address as listed in the address picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressOption {
    #[serde(flatten)]
    pub address: ShippingAddress,
    /// [`AddressFields::one_line`] of the address.
    pub label: String,
}

impl From<ShippingAddress> for AddressOption {
    fn from(address: ShippingAddress) -> Self {
        let label = address.fields.one_line();
        Self { address, label }
    }
}

/// Data behind the checkout identification step: the user's saved addresses
/// and which one (if any) is linked to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentificationView {
    pub addresses: Vec<AddressOption>,
    pub selected_shipping_address_id: Option<AddressId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_input() -> ShippingAddressInput {
        ShippingAddressInput {
            email: "ana@example.com.br".to_owned(),
            recipient_name: "Ana Souza".to_owned(),
            cpf_or_cnpj: "123.456.789-09".to_owned(),
            phone: "(81) 99999-0000".to_owned(),
            zip_code: "50000-000".to_owned(),
            street: "Rua da Aurora".to_owned(),
            number: "10".to_owned(),
            complement: Some("apto 2".to_owned()),
            neighborhood: "Boa Vista".to_owned(),
            city: "Recife".to_owned(),
            state: "PE".to_owned(),
            country: None,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        let address = valid_input().validate().unwrap();
        assert_eq!(address.fields.country, COUNTRY);
        assert_eq!(address.fields.email.as_str(), "ana@example.com.br");
    }

    #[test]
    fn test_country_is_forced() {
        let input = ShippingAddressInput {
            country: Some("Portugal".to_owned()),
            ..valid_input()
        };
        assert_eq!(input.validate().unwrap().fields.country, "Brasil");
    }

    #[test]
    fn test_blank_complement_becomes_none() {
        let input = ShippingAddressInput {
            complement: Some("   ".to_owned()),
            ..valid_input()
        };
        assert_eq!(input.validate().unwrap().fields.complement, None);
    }

    #[test]
    fn test_collects_every_failure() {
        let input = ShippingAddressInput {
            email: "not-an-email".to_owned(),
            cpf_or_cnpj: "123".to_owned(),
            phone: "9999".to_owned(),
            zip_code: "50000".to_owned(),
            city: "  ".to_owned(),
            ..valid_input()
        };
        let errors = input.validate().unwrap_err();

        for field in ["email", "cpf_or_cnpj", "phone", "zip_code", "city"] {
            assert!(errors.has(field), "expected error for {field}");
        }
        assert!(!errors.has("street"));
        assert_eq!(errors.fields().len(), 5);
    }

    #[test]
    fn test_one_line() {
        let address = valid_input().validate().unwrap();
        assert_eq!(
            address.fields.one_line(),
            "Ana Souza • Rua da Aurora, 10, apto 2, Boa Vista, Recife - PE • CEP: 50000-000"
        );
    }
}
