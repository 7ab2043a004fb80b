//! Delivery address fields held on a shopper's profile.

use serde::{Deserialize, Serialize};

/// Indian states accepted in the address form.
pub const STATES: [&str; 28] = [
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

const MAX_NAME_LEN: usize = 100;
const MAX_LOCALITY_LEN: usize = 100;
const MAX_CITY_LEN: usize = 50;

/// Address validation errors, one per offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("unknown state: {0}")]
    UnknownState(String),
    #[error("zipcode must be a 6-digit PIN code")]
    InvalidZipcode,
}

/// Address fields as stored on the profile.
///
/// Every field may be blank: profiles are created empty and filled in later.
/// [`ShippingAddress::is_complete`] decides whether the address can be used
/// for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub locality: String,
    pub city: String,
    pub state: String,
    pub zipcode: Option<i32>,
}

impl ShippingAddress {
    /// Build an address from raw form input, trimming and validating each
    /// field.
    ///
    /// # Errors
    ///
    /// Returns the first [`AddressError`] encountered.
    pub fn from_form(
        name: &str,
        locality: &str,
        city: &str,
        state: &str,
        zipcode: &str,
    ) -> Result<Self, AddressError> {
        let name = bounded("name", name, MAX_NAME_LEN)?;
        let locality = bounded("locality", locality, MAX_LOCALITY_LEN)?;
        let city = bounded("city", city, MAX_CITY_LEN)?;

        let state = state.trim();
        let state = if state.is_empty() {
            String::new()
        } else {
            STATES
                .iter()
                .find(|s| s.eq_ignore_ascii_case(state))
                .map(|s| (*s).to_owned())
                .ok_or_else(|| AddressError::UnknownState(state.to_owned()))?
        };

        let zipcode = zipcode.trim();
        let zipcode = if zipcode.is_empty() {
            None
        } else {
            Some(parse_pin_code(zipcode)?)
        };

        Ok(Self {
            name,
            locality,
            city,
            state,
            zipcode,
        })
    }

    /// Whether the address has every field needed for delivery.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.locality.is_empty()
            && !self.city.is_empty()
            && !self.state.is_empty()
            && self.zipcode.is_some()
    }

    /// One-line rendering used in order snapshots and emails.
    #[must_use]
    pub fn one_line(&self) -> String {
        let zipcode = self.zipcode.map(|z| z.to_string()).unwrap_or_default();
        [
            self.name.as_str(),
            self.locality.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            zipcode.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<String, AddressError> {
    let value = value.trim();
    if value.chars().count() > max {
        return Err(AddressError::TooLong { field, max });
    }
    Ok(value.to_owned())
}

fn parse_pin_code(value: &str) -> Result<i32, AddressError> {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) || value.starts_with('0') {
        return Err(AddressError::InvalidZipcode);
    }
    value.parse().map_err(|_| AddressError::InvalidZipcode)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_form_trims_and_canonicalizes_state() {
        let address =
            ShippingAddress::from_form(" Asha ", "MG Road", "Pune", "maharashtra", "411001").unwrap();
        assert_eq!(address.name, "Asha");
        assert_eq!(address.state, "Maharashtra");
        assert_eq!(address.zipcode, Some(411_001));
        assert!(address.is_complete());
    }

    #[test]
    fn test_blank_form_is_valid_but_incomplete() {
        let address = ShippingAddress::from_form("", "", "", "", "").unwrap();
        assert_eq!(address, ShippingAddress::default());
        assert!(!address.is_complete());
    }

    #[test]
    fn test_rejects_bad_zipcodes() {
        for zip in ["4110", "0411001", "41100a", "011001"] {
            assert_eq!(
                ShippingAddress::from_form("", "", "", "", zip),
                Err(AddressError::InvalidZipcode),
                "{zip}"
            );
        }
    }

    #[test]
    fn test_rejects_unknown_state_and_long_fields() {
        assert!(matches!(
            ShippingAddress::from_form("", "", "", "Atlantis", ""),
            Err(AddressError::UnknownState(_))
        ));
        let long_city = "x".repeat(51);
        assert_eq!(
            ShippingAddress::from_form("", "", &long_city, "", ""),
            Err(AddressError::TooLong {
                field: "city",
                max: 50
            })
        );
    }

    #[test]
    fn test_one_line_skips_blank_parts() {
        let address = ShippingAddress {
            name: String::new(),
            locality: "Sector 5".to_owned(),
            city: "Kochi".to_owned(),
            state: "Kerala".to_owned(),
            zipcode: Some(682_001),
        };
        assert_eq!(address.one_line(), "Sector 5, Kochi, Kerala, 682001");
    }
}
