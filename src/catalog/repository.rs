//! Catalog queries

use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, QueryBuilder, Postgres, Row};

use super::models::{Product, ProductFilter, ProductStatus, ProductView, Provider, ProviderStatus};
use crate::gateway::types::PageWindow;

const PROVIDER_COLUMNS: &str =
    "id, name, code, logo, description, status, config, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "p.id, p.provider_id, p.name, p.code, p.product_type, p.region, \
                               p.zone, p.cpu, p.memory, p.storage, p.storage_type, p.bandwidth, \
                               p.traffic, p.os, p.price, p.original_price, p.status, \
                               p.description, p.features, p.created_at, p.updated_at";

fn map_provider(r: &PgRow) -> Result<Provider, sqlx::Error> {
    Ok(Provider {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        code: r.try_get("code")?,
        logo: r.try_get("logo")?,
        description: r.try_get("description")?,
        status: ProviderStatus::from(r.try_get::<i16, _>("status")?),
        config: r.try_get("config")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn map_product(r: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: r.try_get("id")?,
        provider_id: r.try_get("provider_id")?,
        name: r.try_get("name")?,
        code: r.try_get("code")?,
        product_type: r.try_get("product_type")?,
        region: r.try_get("region")?,
        zone: r.try_get("zone")?,
        cpu: r.try_get("cpu")?,
        memory: r.try_get("memory")?,
        storage: r.try_get("storage")?,
        storage_type: r.try_get("storage_type")?,
        bandwidth: r.try_get("bandwidth")?,
        traffic: r.try_get("traffic")?,
        os: r.try_get("os")?,
        price: r.try_get("price")?,
        original_price: r.try_get("original_price")?,
        status: ProductStatus::from(r.try_get::<i16, _>("status")?),
        description: r.try_get("description")?,
        features: r.try_get("features")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn map_product_view(r: &PgRow) -> Result<ProductView, sqlx::Error> {
    Ok(ProductView {
        product: map_product(r)?,
        provider_name: r.try_get("provider_name")?,
        provider_code: r.try_get("provider_code")?,
    })
}

pub struct CatalogRepository;

impl CatalogRepository {
    pub async fn list_active_providers(pool: &PgPool) -> Result<Vec<Provider>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM providers WHERE status = $1 ORDER BY id",
            PROVIDER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(ProviderStatus::Active.id())
            .fetch_all(pool)
            .await?;
        rows.iter().map(map_provider).collect()
    }

    /// Every provider regardless of status (admin views)
    pub async fn list_providers(pool: &PgPool) -> Result<Vec<Provider>, sqlx::Error> {
        let sql = format!("SELECT {} FROM providers ORDER BY id", PROVIDER_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(pool).await?;
        rows.iter().map(map_provider).collect()
    }

    pub async fn get_provider<'e, E: PgExecutor<'e>>(
        exec: E,
        provider_id: i64,
    ) -> Result<Option<Provider>, sqlx::Error> {
        let sql = format!("SELECT {} FROM providers WHERE id = $1", PROVIDER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(provider_id)
            .fetch_optional(exec)
            .await?;
        row.as_ref().map(map_provider).transpose()
    }

    pub async fn get_product<'e, E: PgExecutor<'e>>(
        exec: E,
        product_id: i64,
    ) -> Result<Option<Product>, sqlx::Error> {
        let sql = format!("SELECT {} FROM products p WHERE p.id = $1", PRODUCT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(product_id)
            .fetch_optional(exec)
            .await?;
        row.as_ref().map(map_product).transpose()
    }

    /// Online products of active providers, cheapest first within a provider
    pub async fn list_online_products(
        pool: &PgPool,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductView>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {}, v.name AS provider_name, v.code AS provider_code \
             FROM products p JOIN providers v ON v.id = p.provider_id \
             WHERE p.status = ",
            PRODUCT_COLUMNS
        ));
        qb.push_bind(ProductStatus::Online.id());
        qb.push(" AND v.status = ");
        qb.push_bind(ProviderStatus::Active.id());
        if let Some(provider_id) = filter.provider_id {
            qb.push(" AND p.provider_id = ");
            qb.push_bind(provider_id);
        }
        if let Some(region) = filter.region.as_deref().filter(|r| !r.is_empty()) {
            qb.push(" AND p.region = ");
            qb.push_bind(region.to_string());
        }
        if let Some(kind) = filter.product_type.as_deref().filter(|t| !t.is_empty()) {
            qb.push(" AND p.product_type = ");
            qb.push_bind(kind.to_string());
        }
        qb.push(" ORDER BY p.provider_id, p.price, p.id");

        let rows = qb.build().fetch_all(pool).await?;
        rows.iter().map(map_product_view).collect()
    }

    /// Admin product listing, any status
    pub async fn search_products(
        pool: &PgPool,
        provider_id: Option<i64>,
        window: PageWindow,
    ) -> Result<(Vec<ProductView>, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE ($1::BIGINT IS NULL OR provider_id = $1)",
        )
        .bind(provider_id)
        .fetch_one(pool)
        .await?;

        let sql = format!(
            "SELECT {}, v.name AS provider_name, v.code AS provider_code \
             FROM products p JOIN providers v ON v.id = p.provider_id \
             WHERE ($1::BIGINT IS NULL OR p.provider_id = $1) \
             ORDER BY p.id DESC LIMIT $2 OFFSET $3",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(provider_id)
            .bind(window.limit())
            .bind(window.offset())
            .fetch_all(pool)
            .await?;
        let items = rows
            .iter()
            .map(map_product_view)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    /// Returns false when no such product exists
    pub async fn set_product_status(
        pool: &PgPool,
        product_id: i64,
        status: ProductStatus,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE products SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status.id())
                .bind(product_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires PostgreSQL
    async fn test_seeded_catalog() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = PgPool::connect(&url).await.unwrap();

        let providers = CatalogRepository::list_active_providers(&pool).await.unwrap();
        assert!(providers.iter().any(|p| p.code == "tencent"));
        assert!(providers.iter().all(|p| p.code != "aliyun"));

        let products = CatalogRepository::list_online_products(
            &pool,
            &ProductFilter {
                region: Some("ap-guangzhou".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(products.windows(2).all(|w| {
            (w[0].product.provider_id, w[0].product.price)
                <= (w[1].product.provider_id, w[1].product.price)
        }));
    }
}
