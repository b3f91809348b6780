use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::catalog::Product;

/// Item identifier as it arrives on a result record.
///
/// Retrieval emits integers, but records handed in over the API may carry
/// floats or strings, so coercion happens at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ItemId {
    /// Integer value of the id, if it has one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ItemId::Int(id) => Some(*id),
            ItemId::Float(id) => {
                let integral = id.is_finite() && id.fract() == 0.0;
                if integral && *id >= i64::MIN as f64 && *id <= i64::MAX as f64 {
                    Some(*id as i64)
                } else {
                    None
                }
            }
            ItemId::Text(id) => id.trim().parse::<i64>().ok(),
        }
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId::Int(id)
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Int(id) => write!(f, "{id}"),
            ItemId::Float(id) => write!(f, "{id}"),
            ItemId::Text(id) => write!(f, "{id}"),
        }
    }
}

/// A scored retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ItemId,

    #[serde(default)]
    pub score: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    /// Display fields this crate does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SearchHit {
    pub fn new(id: impl Into<ItemId>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            title: None,
            short_description: None,
            brand: None,
            color: None,
            category: None,
            image_url: None,
            price: None,
            rating: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn from_product(product: &Product, score: f32) -> Self {
        Self {
            title: product.title.clone(),
            short_description: product.short_description.clone(),
            brand: product.brand.clone(),
            color: product.color.clone(),
            category: product.category.clone(),
            image_url: product.image_url.clone(),
            price: product.price,
            rating: product.rating,
            ..Self::new(product.id, score)
        }
    }
}
