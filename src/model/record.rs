use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type SkuId = i32;

/// One row of the `inventory` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku_id: SkuId,
    pub category: Option<String>,
    pub name: String,
    pub mrp: Decimal,
    pub discount_percent: Decimal,
    pub available_quantity: i32,
    pub discounted_selling_price: Decimal,
    pub weight_in_gms: i32,
    pub out_of_stock: bool,
    /// Units per package, or grams for loose goods. The export overloads
    /// this column and nothing here tries to tell the two apart.
    pub quantity: i32,
}

/// A row as read from the snapshot, before the table assigns its `sku_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryRecord {
    pub category: Option<String>,
    pub name: String,
    pub mrp: Decimal,
    pub discount_percent: Decimal,
    pub available_quantity: i32,
    pub discounted_selling_price: Decimal,
    pub weight_in_gms: i32,
    pub out_of_stock: bool,
    pub quantity: i32,
}

impl NewInventoryRecord {
    pub fn into_record(self, sku_id: SkuId) -> InventoryRecord {
        InventoryRecord {
            sku_id,
            category: self.category,
            name: self.name,
            mrp: self.mrp,
            discount_percent: self.discount_percent,
            available_quantity: self.available_quantity,
            discounted_selling_price: self.discounted_selling_price,
            weight_in_gms: self.weight_in_gms,
            out_of_stock: self.out_of_stock,
            quantity: self.quantity,
        }
    }
}

impl InventoryRecord {
    /// Drop the table-assigned id, e.g. to compare two loads of the same file.
    pub fn without_id(&self) -> NewInventoryRecord {
        NewInventoryRecord {
            category: self.category.clone(),
            name: self.name.clone(),
            mrp: self.mrp,
            discount_percent: self.discount_percent,
            available_quantity: self.available_quantity,
            discounted_selling_price: self.discounted_selling_price,
            weight_in_gms: self.weight_in_gms,
            out_of_stock: self.out_of_stock,
            quantity: self.quantity,
        }
    }

    /// The price the record would have if `discounted_selling_price` were
    /// derived from `mrp` rather than stored alongside it.
    pub fn expected_selling_price(&self) -> Decimal {
        self.mrp * (Decimal::ONE_HUNDRED - self.discount_percent) / Decimal::ONE_HUNDRED
    }
}
