use std::fmt;

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Products,
    Sales,
    Clients,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Products, Self::Sales, Self::Clients];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Sales => "sales",
            Self::Clients => "clients",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a live-store entity came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Legacy,
    App,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::App => "app",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub index: u64,
    pub sku: String,
    /// SKU field was blank and `LEGACY-<index>` was substituted
    pub sku_fallback: bool,
    pub name: String,
    pub price: i64,
    pub stock: i64,
    pub category: &'static str,
    pub brand: String,
    pub active: bool,
    pub source: Provenance,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sale {
    pub index: u64,
    pub date: Option<Date>,
    pub pos_id: i64,
    pub invoice: String,
    pub product_code: String,
    pub article_code: String,
    pub client_code: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub amount: i64,
    pub detail: String,
    pub customer: String,
    pub total: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Client {
    pub index: u64,
    /// `None` when the code field is blank or not all digits
    pub code: Option<u64>,
    pub phone: String,
    pub tax_id: String,
    pub name: String,
    pub address: String,
    pub locality: String,
    pub province: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProductDoc {
    pub sku: String,
    pub name: String,
    pub price: i64,
    pub stock: i64,
    pub category: String,
    pub brand: String,
    pub active: bool,
    pub source: Provenance,
}

impl ProductDoc {
    /// `None` for an empty slot: blank SKU and blank name.
    pub fn from_product(p: &Product) -> Option<Self> {
        // Blank SKU and blank name is an unused slot in the legacy file, not
        // a product; keying it as LEGACY-<index> would create phantom rows.
        if p.sku.is_empty() || (p.sku_fallback && p.name.is_empty()) {
            return None;
        }
        Some(Self {
            sku: p.sku.clone(),
            name: p.name.clone(),
            price: p.price,
            stock: p.stock,
            category: p.category.to_string(),
            brand: p.brand.clone(),
            active: p.active,
            source: p.source,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_code: String,
    pub article_code: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderDoc {
    /// Idempotency key: `INV-<invoice>`
    pub legacy_ref: String,
    pub order_date: Date,
    pub pos_id: i64,
    pub customer_name: String,
    pub client_code: String,
    pub lines: Vec<OrderLine>,
    pub total: i64,
    pub status: String,
    pub source: Provenance,
}

pub const ORDER_REF_PREFIX: &str = "INV-";

impl OrderDoc {
    /// `None` when the sale has no date or no invoice number to key on.
    pub fn from_sale(s: &Sale) -> Option<Self> {
        let date = s.date?;
        if s.invoice.is_empty() {
            return None;
        }
        Some(Self {
            legacy_ref: format!("{ORDER_REF_PREFIX}{}", s.invoice),
            order_date: date,
            pos_id: s.pos_id,
            customer_name: s.customer.clone(),
            client_code: s.client_code.clone(),
            lines: vec![OrderLine {
                product_code: s.product_code.clone(),
                article_code: s.article_code.clone(),
                description: s.detail.clone(),
                quantity: s.quantity,
                unit_price: s.unit_price,
                amount: s.amount,
            }],
            total: s.total,
            status: "completed".to_string(),
            source: Provenance::Legacy,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientDoc {
    pub id: Uuid,
    pub code: u64,
    pub name: String,
    pub phone: String,
    pub tax_id: String,
    pub address: String,
    pub locality: String,
    pub province: String,
    pub source: Provenance,
}

/// Same code, same id, on every run.
pub fn client_id_for(code: u64) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("possync:client:{code}").as_bytes())
}

impl ClientDoc {
    pub fn from_client(c: &Client) -> Option<Self> {
        let code = c.code?;
        Some(Self {
            id: client_id_for(code),
            code,
            name: c.name.clone(),
            phone: c.phone.clone(),
            tax_id: c.tax_id.clone(),
            address: c.address.clone(),
            locality: c.locality.clone(),
            province: c.province.clone(),
            source: Provenance::Legacy,
        })
    }
}
