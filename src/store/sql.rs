//! Statement text for the PostgreSQL backend.
//!
//! String ordering uses `COLLATE "C"` (byte order) and every `ORDER BY`
//! ends in a tie-breaker, so results do not depend on the server locale.

use crate::logic::{CleanupStep, Query};

pub const TABLE: &str = "inventory";

/// `VARCHAR` lengths of the text columns, in characters.
pub const CATEGORY_MAX_CHARS: usize = 120;
pub const NAME_MAX_CHARS: usize = 150;

pub const CREATE_TABLE: &str = r#"
CREATE TABLE inventory (
    sku_id SERIAL PRIMARY KEY,
    category VARCHAR(120),
    name VARCHAR(150) NOT NULL,
    mrp NUMERIC NOT NULL,
    discount_percent NUMERIC NOT NULL,
    available_quantity INTEGER NOT NULL,
    discounted_selling_price NUMERIC NOT NULL,
    weight_in_gms INTEGER NOT NULL,
    out_of_stock BOOLEAN NOT NULL,
    quantity INTEGER NOT NULL
)
"#;

pub const DROP_TABLE: &str = "DROP TABLE IF EXISTS inventory";

pub const TABLE_EXISTS: &str = "SELECT to_regclass('inventory') IS NOT NULL AS present";

/// Column list for inserts, in the order the export lists its columns.
pub const INSERT_COLUMNS: &str = "INSERT INTO inventory (category, name, mrp, discount_percent, available_quantity, discounted_selling_price, weight_in_gms, out_of_stock, quantity) ";

pub const COPY_CSV: &str = "COPY inventory (category, name, mrp, discount_percent, available_quantity, discounted_selling_price, weight_in_gms, out_of_stock, quantity) FROM STDIN WITH (FORMAT csv, HEADER true, ENCODING 'UTF8')";

pub const SELECT_ALL: &str = "SELECT sku_id, category, name, mrp, discount_percent, available_quantity, discounted_selling_price, weight_in_gms, out_of_stock, quantity FROM inventory ORDER BY sku_id";

pub fn cleanup(step: &CleanupStep) -> &'static str {
    match step {
        CleanupStep::DeleteZeroMrp => "DELETE FROM inventory WHERE mrp = 0",
        CleanupStep::DeleteZeroSellingPrice => {
            "DELETE FROM inventory WHERE discounted_selling_price = 0"
        }
        CleanupStep::ConvertPaiseToRupees { .. } => {
            "UPDATE inventory SET mrp = mrp / 100.0, discounted_selling_price = discounted_selling_price / 100.0 WHERE mrp > $1"
        }
    }
}

/// Statement text for a query. Parameters are bound in the order the
/// query's fields are declared.
pub fn query(query: &Query) -> &'static str {
    match query {
        Query::RowCount => "SELECT COUNT(*) AS count FROM inventory",
        Query::Sample { .. } => {
            "SELECT sku_id, category, name, mrp, discount_percent, available_quantity, discounted_selling_price, weight_in_gms, out_of_stock, quantity FROM inventory ORDER BY sku_id LIMIT $1"
        }
        Query::NullCategory => {
            "SELECT sku_id, category, name, mrp, discount_percent, available_quantity, discounted_selling_price, weight_in_gms, out_of_stock, quantity FROM inventory WHERE category IS NULL ORDER BY sku_id"
        }
        Query::DistinctCategories => {
            r#"SELECT DISTINCT category COLLATE "C" AS category FROM inventory WHERE category IS NOT NULL ORDER BY category"#
        }
        Query::StockStatus => {
            "SELECT out_of_stock, COUNT(sku_id) AS count FROM inventory GROUP BY out_of_stock ORDER BY out_of_stock"
        }
        Query::DuplicateNames => {
            r#"SELECT name, COUNT(sku_id) AS sku_count FROM inventory GROUP BY name HAVING COUNT(sku_id) > 1 ORDER BY sku_count DESC, name COLLATE "C""#
        }
        Query::ZeroPriced => {
            "SELECT sku_id, category, name, mrp, discount_percent, available_quantity, discounted_selling_price, weight_in_gms, out_of_stock, quantity FROM inventory WHERE mrp = 0 OR discounted_selling_price = 0 ORDER BY sku_id"
        }
        Query::TopDiscounts { .. } => {
            r#"SELECT name, mrp, discount_percent FROM (SELECT DISTINCT name, mrp, discount_percent FROM inventory) d ORDER BY discount_percent DESC, name COLLATE "C", mrp LIMIT $1"#
        }
        Query::OutOfStockHighMrp { .. } => {
            r#"SELECT name, mrp FROM (SELECT DISTINCT name, mrp FROM inventory WHERE out_of_stock = TRUE AND mrp > $1) d ORDER BY mrp DESC, name COLLATE "C""#
        }
        Query::RevenueByCategory => {
            r#"SELECT category, SUM(discounted_selling_price * available_quantity) AS total FROM inventory GROUP BY category ORDER BY total, category COLLATE "C" NULLS LAST"#
        }
        Query::PremiumLowDiscount { .. } => {
            r#"SELECT name, mrp, discount_percent FROM (SELECT DISTINCT name, mrp, discount_percent FROM inventory WHERE mrp > $1 AND discount_percent < $2) d ORDER BY mrp DESC, discount_percent DESC, name COLLATE "C""#
        }
        Query::TopCategoriesByDiscount { .. } => {
            r#"SELECT category, ROUND(AVG(discount_percent), 2) AS total FROM inventory GROUP BY category ORDER BY total DESC, category COLLATE "C" NULLS LAST LIMIT $1"#
        }
        Query::PricePerGram { .. } => {
            r#"SELECT name, weight_in_gms, discounted_selling_price, price_per_gram FROM (SELECT DISTINCT name, weight_in_gms, discounted_selling_price, ROUND(discounted_selling_price / weight_in_gms, 2) AS price_per_gram FROM inventory WHERE weight_in_gms >= $1 AND weight_in_gms > 0) d ORDER BY price_per_gram, name COLLATE "C", weight_in_gms, discounted_selling_price"#
        }
        Query::WeightBands => {
            r#"SELECT name, weight_in_gms, band FROM (SELECT DISTINCT name, weight_in_gms, CASE WHEN weight_in_gms < 1000 THEN 'Low' WHEN weight_in_gms < 5000 THEN 'Medium' ELSE 'Bulk' END AS band FROM inventory) d ORDER BY name COLLATE "C", weight_in_gms"#
        }
        Query::InventoryWeightByCategory => {
            r#"SELECT category, SUM(weight_in_gms::BIGINT * available_quantity) AS total FROM inventory GROUP BY category ORDER BY total, category COLLATE "C" NULLS LAST"#
        }
    }
}
