use serde::{Deserialize, Serialize};

use mercato_core::{CategoryId, DomainError, DomainResult, Entity};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    name: String,
}

impl Category {
    pub fn from_parts(id: CategoryId, name: String) -> Self {
        Self { id, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) -> DomainResult<()> {
        self.name = validate_category_name(&name.into())?;
        Ok(())
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A category that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            name: validate_category_name(&name.into())?,
        })
    }
}

fn validate_category_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("category name cannot be empty"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_rejects_blank_and_keeps_old_name() {
        let mut c = Category::from_parts(CategoryId::new(1), "Tools".into());
        assert!(c.rename(" ").is_err());
        assert_eq!(c.name(), "Tools");

        c.rename(" Garden ").unwrap();
        assert_eq!(c.name(), "Garden");
    }
}
