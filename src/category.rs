//! This file defines the `Category` type and the form used to create or edit one.
//! Budgets and transactions refer to a category by its ID.

use serde::{Deserialize, Serialize};

use crate::{Error, id::ResourceId};

/// The colour given to categories created without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#3498db";

/// A category for expenses and income, e.g., 'Groceries', 'Eating Out', 'Wages'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// The id of the category.
    pub id: ResourceId,

    /// The name of the category.
    pub name: String,

    /// The hex colour used when displaying the category, e.g. "#3498db".
    #[serde(default = "default_color")]
    pub color: String,

    /// An optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_owned()
}

/// The request body for creating or updating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryForm {
    name: String,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl CategoryForm {
    /// Create a category form.
    ///
    /// `color` defaults to [DEFAULT_CATEGORY_COLOR] and an empty description is
    /// treated as no description.
    ///
    /// # Errors
    ///
    /// This function will return an error if `name` is empty or only whitespace.
    pub fn new(name: &str, color: Option<&str>, description: Option<&str>) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            return Err(Error::EmptyCategoryName);
        }

        Ok(Self {
            name: name.to_owned(),
            color: color.unwrap_or(DEFAULT_CATEGORY_COLOR).to_owned(),
            description: description
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_owned),
        })
    }

    /// The validated category name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
