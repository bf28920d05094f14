//! Partners, products, carriers and pricing reference data.

use rust_decimal::Decimal;
use sqlx::PgPool;

use channel_sync_core::{
    CarrierId, ChannelId, CurrencyCode, CurrencyId, PartnerId, PricelistId, ProductId,
};

use super::{RepositoryError, tax_ids_from_column, tax_ids_to_column};
use crate::models::{
    Carrier, Currency, NewPartner, NewProduct, Partner, Pricelist, Product, ProductMapping,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PartnerRow {
    id: i32,
    channel_id: i32,
    store_id: String,
    name: String,
    email: Option<String>,
    phone: String,
    street: String,
    street2: String,
    zip: String,
    city: String,
    country_code: String,
}

impl From<PartnerRow> for Partner {
    fn from(row: PartnerRow) -> Self {
        Self {
            id: PartnerId::new(row.id),
            channel_id: ChannelId::new(row.channel_id),
            store_id: row.store_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            street: row.street,
            street2: row.street2,
            zip: row.zip,
            city: row.city,
            country_code: row.country_code,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    default_code: Option<String>,
    barcode: Option<String>,
    list_price: Decimal,
    is_service: bool,
    tax_ids: Vec<i32>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            default_code: row.default_code,
            barcode: row.barcode,
            list_price: row.list_price,
            is_service: row.is_service,
            tax_ids: tax_ids_from_column(row.tax_ids),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductMappingRow {
    channel_id: i32,
    store_product_id: String,
    store_variant_id: String,
    product_id: i32,
    default_code: Option<String>,
    barcode: Option<String>,
}

impl From<ProductMappingRow> for ProductMapping {
    fn from(row: ProductMappingRow) -> Self {
        Self {
            channel_id: ChannelId::new(row.channel_id),
            store_product_id: row.store_product_id,
            store_variant_id: row.store_variant_id,
            product_id: ProductId::new(row.product_id),
            default_code: row.default_code,
            barcode: row.barcode,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CarrierRow {
    id: i32,
    name: String,
    product_id: Option<i32>,
}

impl From<CarrierRow> for Carrier {
    fn from(row: CarrierRow) -> Self {
        Self {
            id: CarrierId::new(row.id),
            name: row.name,
            product_id: row.product_id.map(ProductId::new),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CurrencyRow {
    id: i32,
    code: String,
    active: bool,
}

impl TryFrom<CurrencyRow> for Currency {
    type Error = RepositoryError;

    fn try_from(row: CurrencyRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CurrencyId::new(row.id),
            code: row
                .code
                .parse()
                .map_err(|e| RepositoryError::corrupt("currencies.code", e))?,
            active: row.active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PricelistRow {
    id: i32,
    name: String,
    currency_id: i32,
}

impl From<PricelistRow> for Pricelist {
    fn from(row: PricelistRow) -> Self {
        Self {
            id: PricelistId::new(row.id),
            name: row.name,
            currency_id: CurrencyId::new(row.currency_id),
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, default_code, barcode, list_price, is_service, tax_ids";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order reference data.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -------------------------------------------------------------------------
    // Partners
    // -------------------------------------------------------------------------

    /// Find a partner by store customer ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_partner(
        &self,
        channel_id: ChannelId,
        store_id: &str,
    ) -> Result<Option<Partner>, RepositoryError> {
        let row = sqlx::query_as::<_, PartnerRow>(
            r"
            SELECT id, channel_id, store_id, name, email, phone, street, street2,
                   zip, city, country_code
            FROM channel_sync.partners
            WHERE channel_id = $1 AND store_id = $2
            ",
        )
        .bind(channel_id)
        .bind(store_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Partner::from))
    }

    /// Get a partner by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_partner(&self, id: PartnerId) -> Result<Option<Partner>, RepositoryError> {
        let row = sqlx::query_as::<_, PartnerRow>(
            r"
            SELECT id, channel_id, store_id, name, email, phone, street, street2,
                   zip, city, country_code
            FROM channel_sync.partners
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Partner::from))
    }

    /// Insert a partner or refresh the one with the same store ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_partner(&self, partner: &NewPartner) -> Result<Partner, RepositoryError> {
        let row = sqlx::query_as::<_, PartnerRow>(
            r"
            INSERT INTO channel_sync.partners (
                channel_id, store_id, name, email, phone, street, street2,
                zip, city, country_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (channel_id, store_id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                street = EXCLUDED.street,
                street2 = EXCLUDED.street2,
                zip = EXCLUDED.zip,
                city = EXCLUDED.city,
                country_code = EXCLUDED.country_code
            RETURNING id, channel_id, store_id, name, email, phone, street, street2,
                      zip, city, country_code
            ",
        )
        .bind(partner.channel_id)
        .bind(&partner.store_id)
        .bind(&partner.name)
        .bind(partner.email.as_deref())
        .bind(&partner.phone)
        .bind(&partner.street)
        .bind(&partner.street2)
        .bind(&partner.zip)
        .bind(&partner.city)
        .bind(&partner.country_code)
        .fetch_one(self.pool)
        .await?;

        Ok(Partner::from(row))
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM channel_sync.products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Find the first product with a SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_product_by_code(&self, code: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM channel_sync.products WHERE default_code = $1 ORDER BY id LIMIT 1"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Find the first product with a barcode.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_product_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM channel_sync.products WHERE barcode = $1 ORDER BY id LIMIT 1"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(barcode)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO channel_sync.products (name, default_code, barcode, list_price, is_service, tax_ids)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&product.name)
            .bind(product.default_code.as_deref())
            .bind(product.barcode.as_deref())
            .bind(product.list_price)
            .bind(product.is_service)
            .bind(tax_ids_to_column(&product.tax_ids))
            .fetch_one(self.pool)
            .await?;

        Ok(Product::from(row))
    }

    /// Overwrite a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            UPDATE channel_sync.products
            SET name = $2, default_code = $3, barcode = $4, list_price = $5,
                is_service = $6, tax_ids = $7
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(&product.name)
            .bind(product.default_code.as_deref())
            .bind(product.barcode.as_deref())
            .bind(product.list_price)
            .bind(product.is_service)
            .bind(tax_ids_to_column(&product.tax_ids))
            .fetch_optional(self.pool)
            .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Find the mapping for a store product and variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_product_mapping(
        &self,
        channel_id: ChannelId,
        store_product_id: &str,
        store_variant_id: &str,
    ) -> Result<Option<ProductMapping>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductMappingRow>(
            r"
            SELECT channel_id, store_product_id, store_variant_id, product_id,
                   default_code, barcode
            FROM channel_sync.product_mappings
            WHERE channel_id = $1 AND store_product_id = $2 AND store_variant_id = $3
            ",
        )
        .bind(channel_id)
        .bind(store_product_id)
        .bind(store_variant_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ProductMapping::from))
    }

    /// Insert or repoint a product mapping.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product_mapping(
        &self,
        mapping: &ProductMapping,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO channel_sync.product_mappings (
                channel_id, store_product_id, store_variant_id, product_id,
                default_code, barcode
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (channel_id, store_product_id, store_variant_id) DO UPDATE SET
                product_id = EXCLUDED.product_id,
                default_code = EXCLUDED.default_code,
                barcode = EXCLUDED.barcode
            ",
        )
        .bind(mapping.channel_id)
        .bind(&mapping.store_product_id)
        .bind(&mapping.store_variant_id)
        .bind(mapping.product_id)
        .bind(mapping.default_code.as_deref())
        .bind(mapping.barcode.as_deref())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Carriers
    // -------------------------------------------------------------------------

    /// Find a carrier by exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_carrier(&self, name: &str) -> Result<Option<Carrier>, RepositoryError> {
        let row = sqlx::query_as::<_, CarrierRow>(
            "SELECT id, name, product_id FROM channel_sync.carriers WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Carrier::from))
    }

    /// Create a carrier, returning the existing one if the name is taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_carrier(
        &self,
        name: &str,
        product_id: Option<ProductId>,
    ) -> Result<Carrier, RepositoryError> {
        let row = sqlx::query_as::<_, CarrierRow>(
            r"
            INSERT INTO channel_sync.carriers (name, product_id)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, product_id
            ",
        )
        .bind(name)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(Carrier::from(row))
    }

    // -------------------------------------------------------------------------
    // Currencies & pricelists
    // -------------------------------------------------------------------------

    /// Find a currency by ISO code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_currency(
        &self,
        code: CurrencyCode,
    ) -> Result<Option<Currency>, RepositoryError> {
        let row = sqlx::query_as::<_, CurrencyRow>(
            "SELECT id, code, active FROM channel_sync.currencies WHERE code = $1",
        )
        .bind(code.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Currency::try_from).transpose()
    }

    /// Insert a currency or update its active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_currency(
        &self,
        code: CurrencyCode,
        active: bool,
    ) -> Result<Currency, RepositoryError> {
        let row = sqlx::query_as::<_, CurrencyRow>(
            r"
            INSERT INTO channel_sync.currencies (code, active)
            VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE SET active = EXCLUDED.active
            RETURNING id, code, active
            ",
        )
        .bind(code.as_str())
        .bind(active)
        .fetch_one(self.pool)
        .await?;

        Currency::try_from(row)
    }

    /// Find the first pricelist in a currency.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_pricelist(
        &self,
        currency_id: CurrencyId,
    ) -> Result<Option<Pricelist>, RepositoryError> {
        let row = sqlx::query_as::<_, PricelistRow>(
            r"
            SELECT id, name, currency_id
            FROM channel_sync.pricelists
            WHERE currency_id = $1
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(currency_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Pricelist::from))
    }

    /// Create a pricelist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_pricelist(
        &self,
        name: &str,
        currency_id: CurrencyId,
    ) -> Result<Pricelist, RepositoryError> {
        let row = sqlx::query_as::<_, PricelistRow>(
            r"
            INSERT INTO channel_sync.pricelists (name, currency_id)
            VALUES ($1, $2)
            RETURNING id, name, currency_id
            ",
        )
        .bind(name)
        .bind(currency_id)
        .fetch_one(self.pool)
        .await?;

        Ok(Pricelist::from(row))
    }
}
