//! Category domain model

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;

/// Closed set of labels the classifier may answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryLabel {
    #[serde(rename = "Boodschappen")]
    Groceries,
    #[serde(rename = "Huur/Hypotheek")]
    Housing,
    #[serde(rename = "Energie")]
    Energy,
    #[serde(rename = "Water")]
    Water,
    #[serde(rename = "Verzekeringen")]
    Insurance,
    #[serde(rename = "Internet/TV")]
    InternetTv,
    #[serde(rename = "Mobiel")]
    Mobile,
    #[serde(rename = "Vervoer")]
    Transport,
    #[serde(rename = "Uitgaan")]
    GoingOut,
    #[serde(rename = "Kleding")]
    Clothing,
    #[serde(rename = "Persoonlijke verzorging")]
    PersonalCare,
    #[serde(rename = "Huishouden")]
    Household,
    #[serde(rename = "Cadeaus")]
    Gifts,
    #[serde(rename = "Goede doelen")]
    Charity,
    #[serde(rename = "Sparen")]
    Savings,
    #[serde(rename = "Overige")]
    Other,
    #[serde(rename = "Salaris")]
    Salary,
    #[serde(rename = "Toeslagen")]
    Allowances,
    #[serde(rename = "Teruggave")]
    Refund,
}

impl CategoryLabel {
    pub const ALL: [CategoryLabel; 19] = [
        CategoryLabel::Groceries,
        CategoryLabel::Housing,
        CategoryLabel::Energy,
        CategoryLabel::Water,
        CategoryLabel::Insurance,
        CategoryLabel::InternetTv,
        CategoryLabel::Mobile,
        CategoryLabel::Transport,
        CategoryLabel::GoingOut,
        CategoryLabel::Clothing,
        CategoryLabel::PersonalCare,
        CategoryLabel::Household,
        CategoryLabel::Gifts,
        CategoryLabel::Charity,
        CategoryLabel::Savings,
        CategoryLabel::Other,
        CategoryLabel::Salary,
        CategoryLabel::Allowances,
        CategoryLabel::Refund,
    ];

    /// Display name, also used as the persisted category name
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryLabel::Groceries => "Boodschappen",
            CategoryLabel::Housing => "Huur/Hypotheek",
            CategoryLabel::Energy => "Energie",
            CategoryLabel::Water => "Water",
            CategoryLabel::Insurance => "Verzekeringen",
            CategoryLabel::InternetTv => "Internet/TV",
            CategoryLabel::Mobile => "Mobiel",
            CategoryLabel::Transport => "Vervoer",
            CategoryLabel::GoingOut => "Uitgaan",
            CategoryLabel::Clothing => "Kleding",
            CategoryLabel::PersonalCare => "Persoonlijke verzorging",
            CategoryLabel::Household => "Huishouden",
            CategoryLabel::Gifts => "Cadeaus",
            CategoryLabel::Charity => "Goede doelen",
            CategoryLabel::Savings => "Sparen",
            CategoryLabel::Other => "Overige",
            CategoryLabel::Salary => "Salaris",
            CategoryLabel::Allowances => "Toeslagen",
            CategoryLabel::Refund => "Teruggave",
        }
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CategoryLabel::ALL
            .iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| Error::classifier(format!("unknown category label '{}'", s)))
    }
}

/// Income or expense classification of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "INCOME",
            CategoryType::Expense => "EXPENSE",
        }
    }

    /// Infer the type from a sample amount: strictly positive is income
    pub fn from_amount(amount_cents: i64) -> Self {
        if amount_cents > 0 {
            CategoryType::Income
        } else {
            CategoryType::Expense
        }
    }
}

impl FromStr for CategoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(CategoryType::Income),
            "EXPENSE" => Ok(CategoryType::Expense),
            other => Err(Error::validation(format!("unknown category type '{}'", other))),
        }
    }
}

/// A persisted category
///
/// `household_id == None` marks a shared default category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub household_id: Option<String>,
    pub name: String,
    pub category_type: CategoryType,
    pub is_fixed: bool,
    pub is_allowance: bool,
}

/// In-memory lookup of category ids by lower-cased name
///
/// Built once per import run and extended as categories get created, so
/// later chunks reuse what earlier chunks created.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_name: HashMap<String, Uuid>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from household and shared categories
    ///
    /// When a household category and a shared one have the same name, the
    /// household one wins.
    pub fn from_categories(categories: &[Category]) -> Self {
        let mut index = Self::new();
        for category in categories.iter().filter(|c| c.household_id.is_none()) {
            index.insert(&category.name, category.id);
        }
        for category in categories.iter().filter(|c| c.household_id.is_some()) {
            index.insert(&category.name, category.id);
        }
        index
    }

    pub fn get(&self, name: &str) -> Option<Uuid> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&name.to_lowercase())
    }

    pub fn insert(&mut self, name: &str, id: Uuid) {
        self.by_name.insert(name.to_lowercase(), id);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
