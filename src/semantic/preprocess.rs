//! Text preparation for embedding.

use crate::catalog::Product;

/// Separator between title and description in the embedded text.
const SEPARATOR: &str = " . ";

/// Text embedded for a product: `title . short_description`.
///
/// Missing fields are treated as empty strings so every row gets a vector
/// and index rows stay aligned with catalog rows.
pub fn document_text(product: &Product) -> String {
    format!(
        "{}{SEPARATOR}{}",
        product.title.as_deref().unwrap_or_default(),
        product.short_description.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_description() {
        let product = Product {
            id: 1,
            title: Some("Blue Runner".to_string()),
            short_description: Some("Light running shoe".to_string()),
            ..Default::default()
        };
        assert_eq!(document_text(&product), "Blue Runner . Light running shoe");
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let product = Product {
            id: 1,
            title: Some("Scarf".to_string()),
            ..Default::default()
        };
        assert_eq!(document_text(&product), "Scarf . ");
        assert_eq!(document_text(&Product::default()), " . ");
    }
}
