use mercato_core::{CustomerId, DomainResult, Identity};

use crate::claims::JwtClaims;

/// Identity of an authenticated caller, as asserted by a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub customer_id: CustomerId,
    pub email: String,
    pub email_verified: bool,
}

impl Principal {
    /// The identity carried into core operations.
    pub fn identity(&self) -> DomainResult<Identity> {
        Ok(Identity::new(self.email.clone())?.with_customer_id(self.customer_id))
    }
}

impl From<JwtClaims> for Principal {
    fn from(claims: JwtClaims) -> Self {
        Self {
            customer_id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
        }
    }
}
