use serde::{Deserialize, Serialize};

use mercato_core::{CustomerId, DomainError, DomainResult, Entity};

/// A stored customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Unique across customers.
    pub email: String,
    pub verified_email: bool,
    pub phone: Option<String>,
    pub picture: Option<String>,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Profile data used to create or refresh a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl CustomerProfile {
    /// Normalize and validate. Emails are trimmed and lower-cased so that the
    /// upsert key is case-insensitive.
    pub fn normalized(mut self) -> DomainResult<Self> {
        self.email = normalize_email(&self.email)?;
        self.name = self.name.trim().to_string();
        self.phone = self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        self.picture = self.picture.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        Ok(self)
    }
}

pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(DomainError::validation(format!("invalid email address: {email:?}"))),
    }
}
