use super::field::RecordSchema;
use super::record::CdcAnnotation;

/// An OLAP destination table with last-write-wins deduplication.
///
/// Rows sharing the `order_by` key collapse to the one with the highest
/// `position`; rows with `isDeleted = 1` are filtered at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationTable {
  pub name: &'static str,
  pub order_by: &'static [&'static str],
}

impl DestinationTable {
  pub const VERSION_COLUMN: &'static str = CdcAnnotation::POSITION_KEY;
  pub const DELETED_COLUMN: &'static str = CdcAnnotation::DELETED_KEY;

  /// `CREATE TABLE IF NOT EXISTS` statement for a `ReplacingMergeTree`
  /// holding records of `schema`.
  pub fn create_table_sql(&self, database: &str, schema: &RecordSchema) -> String {
    let columns: Vec<String> = schema
      .fields
      .iter()
      .chain(CdcAnnotation::FIELDS.iter())
      .map(|f| format!("    `{}` {}", f.name, f.ddl_type()))
      .collect();

    let order_by: Vec<String> = self.order_by.iter().map(|c| format!("`{c}`")).collect();

    format!(
      "CREATE TABLE IF NOT EXISTS `{db}`.`{table}`\n(\n{columns}\n)\n\
       ENGINE = ReplacingMergeTree(`{ver}`, `{del}`)\n\
       ORDER BY ({order_by})",
      db = database,
      table = self.name,
      columns = columns.join(",\n"),
      ver = Self::VERSION_COLUMN,
      del = Self::DELETED_COLUMN,
      order_by = order_by.join(", "),
    )
  }
}
