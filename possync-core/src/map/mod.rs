//! Positional extraction of domain records from raw legacy records.
//!
//! Every extractor is total: out-of-range or garbage bytes degrade to empty
//! strings, zero or `None`. Output depends only on the record bytes and the
//! offset table for its kind.

pub mod category;
pub mod text;

use crate::domain::{Client, Product, Provenance, Sale};
use crate::read::record::RawRecord;

use self::category::map_category;
use self::text::{parse_code, parse_int, parse_yyyymmdd};

/// `(start, len)` within a record; byte 0 is the deletion flag.
pub type Span = (usize, usize);

pub mod product_layout {
    use super::Span;
    pub const SKU: Span = (1, 13);
    pub const NAME: Span = (14, 40);
    pub const CATEGORY: Span = (54, 10);
    pub const BRAND: Span = (64, 20);
    pub const PRICE: Span = (84, 12);
    pub const STOCK: Span = (96, 8);
    pub const RECORD_LEN: usize = 104;
}

pub mod sale_layout {
    use super::Span;
    pub const DATE: Span = (1, 8);
    pub const POS: Span = (9, 4);
    pub const INVOICE: Span = (13, 12);
    pub const PRODUCT: Span = (25, 13);
    pub const ARTICLE: Span = (38, 13);
    pub const CLIENT: Span = (51, 8);
    pub const QUANTITY: Span = (59, 8);
    pub const UNIT_PRICE: Span = (67, 12);
    pub const AMOUNT: Span = (79, 12);
    pub const DETAIL: Span = (91, 40);
    pub const RECORD_LEN: usize = 131;
}

pub mod client_layout {
    use super::Span;
    pub const CODE: Span = (1, 8);
    pub const NAME: Span = (9, 40);
    pub const ADDRESS: Span = (49, 40);
    pub const LOCALITY: Span = (89, 25);
    pub const PROVINCE: Span = (114, 20);
    pub const PHONE: Span = (134, 20);
    pub const TAX_ID: Span = (154, 13);
    pub const RECORD_LEN: usize = 167;
}

pub const WALK_IN_CUSTOMER: &str = "Walk-in customer";

#[inline]
fn at(rec: &RawRecord<'_>, (start, len): Span) -> String {
    rec.field(start, len)
}

pub fn fallback_sku(index: u64) -> String {
    format!("LEGACY-{index}")
}

pub fn extract_product(rec: &RawRecord<'_>) -> Product {
    use product_layout as l;
    let raw_sku = at(rec, l::SKU);
    let sku_fallback = raw_sku.is_empty();
    Product {
        index: rec.index,
        sku: if sku_fallback {
            fallback_sku(rec.index)
        } else {
            raw_sku
        },
        sku_fallback,
        name: at(rec, l::NAME),
        price: parse_int(&at(rec, l::PRICE)),
        stock: parse_int(&at(rec, l::STOCK)),
        category: map_category(&at(rec, l::CATEGORY)),
        brand: at(rec, l::BRAND),
        active: true,
        source: Provenance::Legacy,
    }
}

pub fn extract_sale(rec: &RawRecord<'_>) -> Sale {
    use sale_layout as l;
    let client_code = at(rec, l::CLIENT);
    let quantity = parse_int(&at(rec, l::QUANTITY));
    let unit_price = parse_int(&at(rec, l::UNIT_PRICE));
    let amount = parse_int(&at(rec, l::AMOUNT));
    let customer = if client_code.is_empty() {
        WALK_IN_CUSTOMER.to_string()
    } else {
        format!("Client {client_code}")
    };
    let total = if amount != 0 {
        amount
    } else {
        quantity.saturating_mul(unit_price)
    };
    Sale {
        index: rec.index,
        date: parse_yyyymmdd(&at(rec, l::DATE)),
        pos_id: parse_int(&at(rec, l::POS)),
        invoice: at(rec, l::INVOICE),
        product_code: at(rec, l::PRODUCT),
        article_code: at(rec, l::ARTICLE),
        client_code,
        quantity,
        unit_price,
        amount,
        detail: at(rec, l::DETAIL),
        customer,
        total,
    }
}

pub fn extract_client(rec: &RawRecord<'_>) -> Client {
    use client_layout as l;
    Client {
        index: rec.index,
        code: parse_code(&at(rec, l::CODE)),
        phone: at(rec, l::PHONE),
        tax_id: at(rec, l::TAX_ID),
        name: at(rec, l::NAME),
        address: at(rec, l::ADDRESS),
        locality: at(rec, l::LOCALITY),
        province: at(rec, l::PROVINCE),
    }
}
