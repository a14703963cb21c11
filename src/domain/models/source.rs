//! Source domain model and sharded-table naming rules.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{codes, DomainResult, Fault};

/// A governed source: one database (and table set) on one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub bu: String,
    pub cluster_id: String,
    pub cluster_name: String,
    pub database_name: String,
    /// Comma-separated table list. More than one entry means a sharded set
    /// named `<base>_<n>`.
    pub tables_name: String,
    pub creator: String,
    pub editor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn tables(&self) -> Vec<String> {
        self.tables_name
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Verify a comma-separated table list is either a single table or one
/// sharded set, and return `(is_sharded, base_name)`.
///
/// Shards are named `<base>_<n>` where `<n>` is the numeric suffix after the
/// last underscore; every listed table must share the same base.
pub fn check_same_sharding_tables(tables_name: &str) -> Result<(bool, String), Fault> {
    let tables: Vec<&str> = tables_name.split(',').filter(|s| !s.is_empty()).collect();
    if tables.is_empty() {
        return Err(Fault::new(codes::SOURCE_SHARDING_NAME_ERR, "table name empty"));
    }
    if tables.len() == 1 {
        return Ok((false, tables[0].to_string()));
    }

    let base = match tables[0].rsplit_once('_') {
        Some((base, _)) if !base.is_empty() => base.to_string(),
        _ => {
            return Err(Fault::new(
                codes::SOURCE_SHARDING_NAME_ERR,
                format!("unable to derive the sharding base name from table ({})", tables[0]),
            ))
        }
    };

    for table in &tables {
        let conforms = table
            .strip_prefix(base.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()));
        if !conforms {
            return Err(Fault::new(
                codes::SOURCE_SHARDING_NAME_ERR,
                format!("table ({table}) does not follow the sharding naming rule ({base}_<n>)"),
            ));
        }
    }

    Ok((true, base))
}

/// Instantiate a destination table name from its template.
///
/// `{source_table}` expands to the sharding base name of the source tables
/// and `{YYYY-MM}` to the month of `today`.
pub fn generate_dest_table_name(
    src_tables_name: &str,
    template: &str,
    today: NaiveDate,
) -> DomainResult<String> {
    let (_, base) = check_same_sharding_tables(src_tables_name)?;
    let month = today.format("%Y-%m").to_string();
    Ok(template.replace("{source_table}", &base).replace("{YYYY-MM}", &month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_table_not_sharded() {
        let (sharded, base) = check_same_sharding_tables("orders").unwrap();
        assert!(!sharded);
        assert_eq!(base, "orders");
    }

    #[test]
    fn test_sharded_set() {
        let (sharded, base) = check_same_sharding_tables("orders_0,orders_1,orders_2").unwrap();
        assert!(sharded);
        assert_eq!(base, "orders");
    }

    #[test]
    fn test_multi_segment_base() {
        let (sharded, base) = check_same_sharding_tables("user_orders_0,user_orders_1").unwrap();
        assert!(sharded);
        assert_eq!(base, "user_orders");
    }

    #[test]
    fn test_mixed_set_rejected() {
        assert!(check_same_sharding_tables("orders_0,invoices_1").is_err());
        assert!(check_same_sharding_tables("orders_0,orders_x").is_err());
        assert!(check_same_sharding_tables("").is_err());
    }

    #[test]
    fn test_dest_table_template() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let name = generate_dest_table_name("orders_0,orders_1", "{source_table}_arch_{YYYY-MM}", today).unwrap();
        assert_eq!(name, "orders_arch_2024-03");
    }
}
