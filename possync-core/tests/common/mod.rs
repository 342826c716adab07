#![allow(dead_code)]

use std::path::Path;

use possync_core::container::fields::HEADER_TERMINATOR;
use possync_core::container::header::{FileHeader, HEADER_MIN_LEN};
use possync_core::map::{Span, client_layout, product_layout, sale_layout};

/// Blank (space-filled) record with `(span, value)` pairs laid in.
pub fn row(record_len: usize, fields: &[(Span, &str)]) -> Vec<u8> {
    let mut buf = vec![b' '; record_len];
    for ((start, width), value) in fields {
        let bytes = value.as_bytes();
        let n = bytes.len().min(*width);
        buf[*start..*start + n].copy_from_slice(&bytes[..n]);
    }
    buf
}

/// Header, one character descriptor per named span, terminator, records.
pub fn dbf(fields: &[(&str, Span)], record_len: usize, rows: &[Vec<u8>]) -> Vec<u8> {
    let header_len = HEADER_MIN_LEN + fields.len() * 32 + 1;
    let header = FileHeader {
        version: 3,
        year_offset: 125,
        month: 3,
        day: 1,
        num_records: rows.len() as u32,
        header_len: header_len as u16,
        record_len: record_len as u16,
    };
    let mut out = Vec::new();
    header.write_to(&mut out).unwrap();
    for (name, (_, width)) in fields {
        let mut d = [0u8; 32];
        let n = name.len().min(11);
        d[..n].copy_from_slice(&name.as_bytes()[..n]);
        d[11] = b'C';
        d[16] = *width as u8;
        out.extend_from_slice(&d);
    }
    out.push(HEADER_TERMINATOR);
    for r in rows {
        assert_eq!(r.len(), record_len);
        out.extend_from_slice(r);
    }
    out
}

pub fn product(sku: &str, name: &str, category: &str, price: &str) -> Vec<u8> {
    use product_layout as l;
    row(
        l::RECORD_LEN,
        &[
            (l::SKU, sku),
            (l::NAME, name),
            (l::CATEGORY, category),
            (l::PRICE, price),
            (l::STOCK, "1"),
        ],
    )
}

pub fn sale(date: &str, invoice: &str, qty: &str, unit: &str) -> Vec<u8> {
    use sale_layout as l;
    row(
        l::RECORD_LEN,
        &[
            (l::DATE, date),
            (l::POS, "1"),
            (l::INVOICE, invoice),
            (l::PRODUCT, "7790001"),
            (l::QUANTITY, qty),
            (l::UNIT_PRICE, unit),
        ],
    )
}

pub fn client(code: &str, name: &str) -> Vec<u8> {
    use client_layout as l;
    row(l::RECORD_LEN, &[(l::CODE, code), (l::NAME, name)])
}

pub fn products_file(rows: &[Vec<u8>]) -> Vec<u8> {
    use product_layout as l;
    dbf(
        &[
            ("CODIGO", l::SKU),
            ("DESCRIP", l::NAME),
            ("RUBRO", l::CATEGORY),
            ("MARCA", l::BRAND),
            ("PRECIO", l::PRICE),
            ("STOCK", l::STOCK),
        ],
        l::RECORD_LEN,
        rows,
    )
}

pub fn sales_file(rows: &[Vec<u8>]) -> Vec<u8> {
    use sale_layout as l;
    dbf(
        &[
            ("FECHA", l::DATE),
            ("PUESTO", l::POS),
            ("FACTURA", l::INVOICE),
            ("PRODUCTO", l::PRODUCT),
            ("ARTICULO", l::ARTICLE),
            ("CLIENTE", l::CLIENT),
            ("CANTIDAD", l::QUANTITY),
            ("PRECIO", l::UNIT_PRICE),
            ("IMPORTE", l::AMOUNT),
            ("DETALLE", l::DETAIL),
        ],
        l::RECORD_LEN,
        rows,
    )
}

pub fn clients_file(rows: &[Vec<u8>]) -> Vec<u8> {
    use client_layout as l;
    dbf(
        &[
            ("CODIGO", l::CODE),
            ("NOMBRE", l::NAME),
            ("DOMICILIO", l::ADDRESS),
            ("LOCALIDAD", l::LOCALITY),
            ("PROVINCIA", l::PROVINCE),
            ("TELEFONO", l::PHONE),
            ("CUIT", l::TAX_ID),
        ],
        l::RECORD_LEN,
        rows,
    )
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) {
    std::fs::write(dir.join(name), bytes).unwrap();
}
