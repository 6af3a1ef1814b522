//! Product catalog use cases.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::Product;
use crate::error::{CheckoutError, CheckoutResult};
use crate::ports::ProductRepository;

pub struct ProductService {
    product_repository: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(product_repository: Arc<dyn ProductRepository>) -> Self {
        Self { product_repository }
    }

    pub async fn list_products(&self) -> CheckoutResult<Vec<Product>> {
        Ok(self.product_repository.list().await?)
    }

    pub async fn get_product(&self, id: Uuid) -> CheckoutResult<Product> {
        self.product_repository
            .find_by_id(id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(id))
    }

    /// Fetches the product, failing when it cannot cover `quantity` units.
    pub async fn get_available(&self, id: Uuid, quantity: i32) -> CheckoutResult<Product> {
        let product = self.get_product(id).await?;
        if !product.has_stock_for(quantity) {
            return Err(CheckoutError::ProductStockNotAvailable {
                product_id: id,
                requested: quantity,
                available: product.stock,
            });
        }
        Ok(product)
    }

    pub async fn decrement_stock(&self, id: Uuid, quantity: i32) -> CheckoutResult<()> {
        self.product_repository.update_stock(id, -quantity).await?;
        tracing::info!(product_id = %id, quantity, "Product stock decremented");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProductRepository;
    use bigdecimal::BigDecimal;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Cruiser wheels".to_string(),
            description: "60mm 78a".to_string(),
            price: BigDecimal::from(85000),
            stock,
            image: Some("wheels.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_get_available_checks_stock() {
        let stocked = product(3);
        let repository = Arc::new(InMemoryProductRepository::with_products(vec![stocked.clone()]));
        let service = ProductService::new(repository);

        assert!(service.get_available(stocked.id, 3).await.is_ok());
        let result = service.get_available(stocked.id, 4).await;
        assert!(matches!(
            result,
            Err(CheckoutError::ProductStockNotAvailable { requested: 4, available: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let service = ProductService::new(Arc::new(InMemoryProductRepository::default()));
        let id = Uuid::new_v4();

        let result = service.get_product(id).await;

        assert!(matches!(result, Err(CheckoutError::ProductNotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_decrement_stock_and_list() {
        let stocked = product(10);
        let repository = Arc::new(InMemoryProductRepository::with_products(vec![stocked.clone()]));
        let service = ProductService::new(repository);

        service.decrement_stock(stocked.id, 2).await.unwrap();

        let products = service.list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].stock, 8);
    }

    #[tokio::test]
    async fn test_decrement_stock_refuses_to_oversell() {
        let stocked = product(1);
        let repository = Arc::new(InMemoryProductRepository::with_products(vec![stocked.clone()]));
        let service = ProductService::new(repository);

        let result = service.decrement_stock(stocked.id, 2).await;

        assert!(matches!(
            result,
            Err(CheckoutError::ProductStockNotAvailable { requested: 2, available: 1, .. })
        ));
        assert_eq!(service.get_product(stocked.id).await.unwrap().stock, 1);
    }
}
