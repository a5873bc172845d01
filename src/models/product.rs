//! Product catalog entities, consumed at the boundary only. Products are
//! produced by external processing stages and ingested here by identity and
//! spatial/temporal attributes; their lifecycle is owned elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub product_type_id: i64,
    pub processor_id: i64,
    pub site_id: i64,
    pub job_id: Option<i64>,
    pub name: String,
    pub full_path: String,
    pub created_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
    pub quicklook_path: Option<String>,
    /// WKT footprint of the product extent
    pub footprint: Option<String>,
    pub archived: bool,
    pub archive_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_type_id: i64,
    pub processor_id: i64,
    pub site_id: i64,
    pub job_id: Option<i64>,
    pub name: String,
    pub full_path: String,
    pub created_at: DateTime<Utc>,
    pub quicklook_path: Option<String>,
    pub footprint: Option<String>,
}

/// A product due for archival, with the destination the archiver should
/// move it to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductToArchive {
    pub product_id: i64,
    pub current_path: String,
    pub archive_path: String,
}

/// Archiver report for one moved product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedProduct {
    pub product_id: i64,
    pub archive_path: String,
}
